#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use nfc_signer::{SignError, SignRequest, SignResponse, SigningCapability};
use serde_json::json;
use tokio::sync::Notify;

pub fn response(public_key: &str, der: &str) -> SignResponse {
    serde_json::from_value(json!({
        "publicKey": public_key,
        "signature": {"der": der},
    }))
    .unwrap()
}

/// Answers every request immediately with the same outcome.
pub struct CannedCard {
    outcome: Result<SignResponse, SignError>,
    requests: Mutex<Vec<SignRequest>>,
}

impl CannedCard {
    pub fn succeeding(public_key: &str, der: &str) -> Self {
        Self::with_outcome(Ok(response(public_key, der)))
    }

    pub fn failing(error: SignError) -> Self {
        Self::with_outcome(Err(error))
    }

    pub fn with_outcome(outcome: Result<SignResponse, SignError>) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<SignRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SigningCapability for CannedCard {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, SignError> {
        self.requests.lock().unwrap().push(request.clone());
        self.outcome.clone()
    }
}

/// Records the request, then holds the answer until [`GatedCard::release`].
/// The answer embeds the digest it was asked to sign.
#[derive(Default)]
pub struct GatedCard {
    dispatched: Notify,
    gate: Notify,
    calls: AtomicUsize,
    requests: Mutex<Vec<SignRequest>>,
}

impl GatedCard {
    pub async fn wait_dispatched(&self) {
        self.dispatched.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<SignRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl SigningCapability for GatedCard {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, SignError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.dispatched.notify_one();
        self.gate.notified().await;
        Ok(response(
            &format!("pk-{}", request.digest()),
            &format!("der-{}", request.digest()),
        ))
    }
}

/// Plays back a fixed sequence of outcomes, one per request.
pub struct ScriptedCard {
    script: Mutex<VecDeque<Result<SignResponse, SignError>>>,
}

impl ScriptedCard {
    pub fn new(script: impl IntoIterator<Item = Result<SignResponse, SignError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

impl SigningCapability for ScriptedCard {
    async fn sign(&self, _request: &SignRequest) -> Result<SignResponse, SignError> {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SignError::Transport("script exhausted".into())))
    }
}
