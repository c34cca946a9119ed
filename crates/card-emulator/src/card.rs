use std::ops::RangeInclusive;

use anyhow::Result;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, signature::hazmat::PrehashSigner};
use nfc_signer::Digest;
use serde_json::{Value, json};
use sha2::{Digest as _, Sha256};

use crate::error::CardError;

/// Key slots the card exposes.
pub const KEY_SLOTS: RangeInclusive<u8> = 1..=3;

/// Stand-in for a tap-to-sign card holding secp256k1 keys.
///
/// Created from a seed string; the key in slot `n` is the SHA-256 hash of
/// the seed followed by the byte `n`.
pub struct SoftwareCard {
    keys: Vec<SigningKey>,
}

impl SoftwareCard {
    pub fn from_seed(seed: &str) -> Result<Self> {
        let keys = KEY_SLOTS
            .map(|slot| {
                let hash = Sha256::new()
                    .chain_update(seed.as_bytes())
                    .chain_update([slot])
                    .finalize();
                SigningKey::from_bytes((&hash).into())
                    .map_err(|e| anyhow::anyhow!("invalid seed for key slot {slot}: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    /// Uncompressed SEC1 public key (65 bytes) for a slot.
    pub fn public_key_bytes(&self, slot: u8) -> Option<Vec<u8>> {
        self.key(slot).map(|key| {
            key.verifying_key()
                .to_encoded_point(false)
                .as_bytes()
                .to_vec()
        })
    }

    /// Runs a card command. Only `sign` is implemented.
    pub fn execute(&self, command: &Value) -> Result<Value, CardError> {
        let name = command.get("name").and_then(Value::as_str).unwrap_or_default();
        match name {
            "sign" => {
                let slot = parse_key_slot(command.get("keyNo"))?;
                let digest = command
                    .get("digest")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CardError::InvalidDigest("missing".into()))?;
                let digest = Digest::from_hex(digest)
                    .ok_or_else(|| CardError::InvalidDigest(digest.to_string()))?;
                self.sign(slot, &digest)
            }
            other => Err(CardError::UnsupportedCommand(other.to_string())),
        }
    }

    fn sign(&self, slot: u8, digest: &Digest) -> Result<Value, CardError> {
        let key = self
            .key(slot)
            .ok_or_else(|| CardError::InvalidKeySlot(slot.to_string()))?;
        let (signature, recovery_id): (Signature, RecoveryId) = key
            .sign_prehash(&digest.to_bytes())
            .map_err(|e| CardError::Signing(e.to_string()))?;

        let raw = signature.to_bytes();
        let public_key = key.verifying_key().to_encoded_point(false);
        tracing::debug!(slot, %digest, "signed digest");

        Ok(json!({
            "input": {
                "keyNo": slot,
                "digest": digest.as_str(),
            },
            "signature": {
                "raw": {
                    "r": hex::encode(&raw[..32]),
                    "s": hex::encode(&raw[32..]),
                    "v": 27 + recovery_id.to_byte(),
                },
                "der": hex::encode(signature.to_der().as_bytes()),
            },
            "publicKey": hex::encode(public_key.as_bytes()),
        }))
    }

    fn key(&self, slot: u8) -> Option<&SigningKey> {
        if KEY_SLOTS.contains(&slot) {
            self.keys.get(usize::from(slot - 1))
        } else {
            None
        }
    }
}

fn parse_key_slot(value: Option<&Value>) -> Result<u8, CardError> {
    let value = value.ok_or_else(|| CardError::InvalidKeySlot("missing".into()))?;
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .filter(|slot| KEY_SLOTS.contains(slot))
        .ok_or_else(|| CardError::InvalidKeySlot(value.to_string()))
}
