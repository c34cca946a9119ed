use nfc_signer::bridge::BridgeException;

/// Failures raised by the emulated card while executing a command.
#[derive(Debug, thiserror::Error)]
pub enum CardError {
    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),
    #[error("invalid keyNo: {0}")]
    InvalidKeySlot(String),
    #[error("invalid digest: {0}")]
    InvalidDigest(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

impl CardError {
    /// Renders the error the way a real card reports it over the bridge.
    pub fn to_exception(&self) -> BridgeException {
        let name = match self {
            CardError::Signing(_) => "HaloTagError",
            _ => "HaloLogicError",
        };
        BridgeException {
            kind: "exception".into(),
            name: name.into(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfc_signer::SignError;
    use nfc_signer::bridge::classify_exception;

    #[test]
    fn command_errors_are_logic_errors() {
        let exception = CardError::InvalidKeySlot("9".into()).to_exception();
        assert_eq!(exception.name, "HaloLogicError");
        assert_eq!(exception.message, "invalid keyNo: 9");
    }

    #[test]
    fn signing_failure_is_tag_error() {
        let exception = CardError::Signing("bad nonce".into()).to_exception();
        assert_eq!(exception.name, "HaloTagError");
    }

    #[test]
    fn card_errors_classify_as_rejected() {
        for error in [
            CardError::UnsupportedCommand("get_pkeys".into()),
            CardError::InvalidDigest("zz".into()),
            CardError::Signing("bad nonce".into()),
        ] {
            assert!(matches!(
                classify_exception(&error.to_exception()),
                SignError::DeviceRejected(_)
            ));
        }
    }
}
