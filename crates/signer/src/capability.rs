use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::error::SignError;

/// On-card key used for every signature.
pub const KEY_SLOT: u8 = 1;

const SIGN_COMMAND: &str = "sign";

/// A single `sign` command for the card.
///
/// Serializes as `{"name":"sign","keyNo":1,"digest":"<64 hex>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    name: String,
    key_no: u8,
    digest: String,
}

impl SignRequest {
    pub fn new(key_slot: u8, digest: &Digest) -> Self {
        Self {
            name: SIGN_COMMAND.to_string(),
            key_no: key_slot,
            digest: digest.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_slot(&self) -> u8 {
        self.key_no
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// What the card hands back for a `sign` command. Anything beyond the
/// public key and DER signature is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    #[serde(default)]
    pub public_key: String,
    pub signature: ResponseSignature,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSignature {
    #[serde(default)]
    pub der: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Public key and DER signature as displayed to the user. Neither is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignResult {
    pub public_key: String,
    pub signature_der: String,
}

impl TryFrom<SignResponse> for SignResult {
    type Error = SignError;

    fn try_from(response: SignResponse) -> Result<Self, Self::Error> {
        if response.public_key.is_empty() {
            return Err(SignError::Transport("response is missing publicKey".into()));
        }
        if response.signature.der.is_empty() {
            return Err(SignError::Transport("response is missing signature.der".into()));
        }
        Ok(Self {
            public_key: response.public_key,
            signature_der: response.signature.der,
        })
    }
}

/// Something that can get a digest signed by a card.
///
/// The call may involve the user physically tapping a card, so it can take
/// arbitrarily long. Implementations classify their own failures.
pub trait SigningCapability: Send + Sync {
    fn sign(
        &self,
        request: &SignRequest,
    ) -> impl Future<Output = Result<SignResponse, SignError>> + Send;
}

impl<C: SigningCapability> SigningCapability for Arc<C> {
    fn sign(
        &self,
        request: &SignRequest,
    ) -> impl Future<Output = Result<SignResponse, SignError>> + Send {
        (**self).sign(request)
    }
}

impl<C: SigningCapability> SigningCapability for &C {
    fn sign(
        &self,
        request: &SignRequest,
    ) -> impl Future<Output = Result<SignResponse, SignError>> + Send {
        (**self).sign(request)
    }
}
