use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest as _, Sha256};

/// Length of a rendered digest: 32 bytes as lowercase hex.
pub const DIGEST_HEX_LEN: usize = 64;

/// SHA-256 of the UTF-8 bytes of a piece of text, rendered as lowercase hex.
///
/// This is the authoritative digest sent to the card. It always hashes,
/// so the empty string maps to the well-known empty-input SHA-256 value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    pub fn of(text: &str) -> Self {
        Self(hex::encode(Sha256::digest(text.as_bytes())))
    }

    /// Accepts exactly 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        let well_formed = s.len() == DIGEST_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        well_formed.then(|| Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw 32-byte prehash.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        // Invariant: the inner string is always 64 valid hex chars.
        hex::decode_to_slice(&self.0, &mut out).unwrap_or_default();
        out
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Digest shown while the user is typing.
///
/// Empty text shows nothing rather than the hash of zero bytes. Do not
/// fold this into [`Digest::of`]: the card always receives a real hash.
pub fn display_digest(text: &str) -> String {
    if text.is_empty() {
        String::new()
    } else {
        Digest::of(text).0
    }
}

/// A pending display recomputation.
#[derive(Debug, Clone)]
pub struct DigestTicket {
    seq: u64,
    text: String,
}

impl DigestTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Latest-wins holder for the display digest.
///
/// Every edit takes a ticket; a computation only lands if its ticket is
/// still the most recent one issued, whatever order they complete in.
#[derive(Debug, Default)]
pub struct DigestTracker {
    issued: AtomicU64,
    shown: Mutex<Shown>,
}

#[derive(Debug, Default)]
struct Shown {
    seq: u64,
    digest: String,
}

impl DigestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, text: impl Into<String>) -> DigestTicket {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        DigestTicket {
            seq,
            text: text.into(),
        }
    }

    /// Computes the ticket's digest and publishes it if nothing newer was
    /// issued in the meantime. Returns whether it was published.
    pub fn finish(&self, ticket: DigestTicket) -> bool {
        let digest = display_digest(&ticket.text);
        self.publish(ticket.seq, digest)
    }

    fn publish(&self, seq: u64, digest: String) -> bool {
        if seq != self.issued.load(Ordering::SeqCst) {
            tracing::trace!(seq, "discarding stale digest");
            return false;
        }
        let mut shown = match self.shown.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if seq < shown.seq {
            return false;
        }
        shown.seq = seq;
        shown.digest = digest;
        true
    }

    /// Convenience for synchronous callers: begin and finish in one step.
    pub fn update(&self, text: impl Into<String>) -> bool {
        let ticket = self.begin(text);
        self.finish(ticket)
    }

    pub fn current(&self) -> String {
        match self.shown.lock() {
            Ok(guard) => guard.digest.clone(),
            Err(poisoned) => poisoned.into_inner().digest.clone(),
        }
    }
}
