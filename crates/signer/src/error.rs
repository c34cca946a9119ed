/// Why a signing attempt failed.
///
/// There is no encoding variant: text arrives as `&str`, which is valid
/// UTF-8 by construction, so canonicalization cannot fail.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignError {
    /// The bridge could not be reached, or no suitable card was presented.
    #[error("signing device unavailable: {0}")]
    DeviceUnavailable(String),
    /// The card answered but refused the command.
    #[error("signing device rejected the request: {0}")]
    DeviceRejected(String),
    #[error("transport failure: {0}")]
    Transport(String),
    /// A platform primitive the signing path depends on is missing.
    #[error("environment error: {0}")]
    Environment(String),
    #[error("a signing attempt is already in progress")]
    Busy,
}

impl SignError {
    /// Text shown to the user for this failure.
    pub fn notification(&self) -> String {
        format!("Error: {self}")
    }
}

impl From<serde_json::Error> for SignError {
    fn from(error: serde_json::Error) -> Self {
        Self::Transport(format!("malformed bridge message: {error}"))
    }
}
