use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{info, warn};

use crate::capability::{KEY_SLOT, SignRequest, SignResult, SigningCapability};
use crate::digest::Digest;
use crate::error::SignError;

/// Drives one signing attempt at a time against a [`SigningCapability`].
///
/// Each call hashes the text it is given, dispatches exactly one `sign`
/// command and maps the outcome. A call made while another is outstanding
/// fails with [`SignError::Busy`] and dispatches nothing. There is no
/// timeout or retry here; a caller that gives up just drops the future.
pub struct SignOrchestrator<C> {
    capability: C,
    key_slot: u8,
    in_flight: AtomicBool,
    attempts: AtomicU64,
}

impl<C: SigningCapability> SignOrchestrator<C> {
    pub fn new(capability: C) -> Self {
        Self {
            capability,
            key_slot: KEY_SLOT,
            in_flight: AtomicBool::new(false),
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn request_signature(&self, text: &str) -> Result<SignResult, SignError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            warn!("rejecting sign request while another is in flight");
            return Err(SignError::Busy);
        };
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        let digest = Digest::of(text);
        let request = SignRequest::new(self.key_slot, &digest);
        info!(attempt, key_slot = self.key_slot, %digest, "dispatching sign request");

        let outcome = match self.capability.sign(&request).await {
            Ok(response) => SignResult::try_from(response),
            Err(error) => Err(error),
        };

        match &outcome {
            Ok(_) => info!(attempt, "sign request completed"),
            Err(error) => warn!(attempt, %error, "sign request failed"),
        }
        outcome
    }

    /// Number of attempts that reached dispatch.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn capability(&self) -> &C {
        &self.capability
    }
}

/// Holds the in-flight flag; clears it on drop, including when the
/// owning future is abandoned.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag).unwrap();
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
