use std::sync::{Mutex, MutexGuard};

use crate::capability::{SignResult, SigningCapability};
use crate::digest::DigestTracker;
use crate::error::SignError;
use crate::orchestrator::SignOrchestrator;

/// Everything the user sees: the text being edited, its digest, the last
/// signature obtained and the last notification.
///
/// The state lock is never held across an await, so the text can keep
/// changing while a signature is pending.
pub struct Session<C> {
    orchestrator: SignOrchestrator<C>,
    digest: DigestTracker,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    text: String,
    result: Option<SignResult>,
    notification: Option<String>,
}

impl<C: SigningCapability> Session<C> {
    pub fn new(capability: C) -> Self {
        Self {
            orchestrator: SignOrchestrator::new(capability),
            digest: DigestTracker::new(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        let text = text.into();
        let ticket = {
            let mut state = self.state();
            state.text = text.clone();
            self.digest.begin(text)
        };
        self.digest.finish(ticket);
    }

    pub fn text(&self) -> String {
        self.state().text.clone()
    }

    /// Digest of the current text, or empty when there is no text.
    pub fn display_digest(&self) -> String {
        self.digest.current()
    }

    pub fn result(&self) -> Option<SignResult> {
        self.state().result.clone()
    }

    pub fn notification(&self) -> Option<String> {
        self.state().notification.clone()
    }

    /// Signs the text as it is right now.
    ///
    /// On success the public key and signature are replaced together and any
    /// earlier notification is cleared. On failure they are left alone and
    /// the error becomes the notification.
    pub async fn sign(&self) -> Result<SignResult, SignError> {
        let text = self.text();
        let outcome = self.orchestrator.request_signature(&text).await;

        let mut state = self.state();
        match &outcome {
            Ok(result) => {
                state.result = Some(result.clone());
                state.notification = None;
            }
            Err(error) => state.notification = Some(error.notification()),
        }
        outcome
    }

    pub fn reset(&self) {
        self.digest.update(String::new());
        *self.state() = State::default();
    }

    pub fn orchestrator(&self) -> &SignOrchestrator<C> {
        &self.orchestrator
    }

    fn state(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
