use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::SignError;

const MAX_FRAME_SIZE: usize = 1024 * 1024; // 1 MB

/// Client → bridge messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeRequest {
    /// Run a card command against the tapped card identified by `handle`.
    ExecHalo {
        handle: String,
        uid: String,
        command: Value,
    },
}

/// Bridge → client messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BridgeEvent {
    WsConnected,
    ReaderAdded { data: ReaderData },
    ReaderRemoved { data: ReaderData },
    /// A card entered the reader's field.
    HandleAdded { data: HandleData },
    /// The card left the field.
    HandleRemoved { data: HandleData },
    ExecSuccess { uid: String, data: ExecSuccessData },
    ExecException { uid: String, data: ExecExceptionData },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaderData {
    pub reader_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleData {
    pub handle: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecSuccessData {
    pub res: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecExceptionData {
    pub exception: BridgeException,
}

/// Failure reported by the bridge or the card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeException {
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub message: String,
}

/// Maps a bridge exception onto the signing error taxonomy.
pub fn classify_exception(exception: &BridgeException) -> SignError {
    let detail = if exception.message.is_empty() {
        exception.name.clone()
    } else {
        format!("{}: {}", exception.name, exception.message)
    };

    match exception.name.as_str() {
        "NFCMethodNotSupported"
        | "NFCAbortedError"
        | "NFCPermissionRequestDenied"
        | "NFCBadTransportError" => SignError::DeviceUnavailable(detail),
        "HaloLogicError" | "HaloTagError" => SignError::DeviceRejected(detail),
        _ => SignError::Transport(detail),
    }
}

/// Serialize a message into a text frame.
pub fn encode_frame<T: Serialize>(msg: &T) -> Result<String, SignError> {
    Ok(serde_json::to_string(msg)?)
}

/// Parse a text frame.
pub fn decode_frame<T: DeserializeOwned>(frame: &str) -> Result<T, SignError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(SignError::Transport(format!(
            "frame too large: {} bytes (max {MAX_FRAME_SIZE})",
            frame.len()
        )));
    }
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exception(name: &str) -> BridgeException {
        BridgeException {
            kind: "exception".into(),
            name: name.into(),
            message: "details".into(),
        }
    }

    #[test]
    fn exec_request_wire_format() {
        let request = BridgeRequest::ExecHalo {
            handle: "h1".into(),
            uid: "sign-1".into(),
            command: json!({"name": "sign"}),
        };
        let value: Value = serde_json::from_str(&encode_frame(&request).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "exec_halo", "handle": "h1", "uid": "sign-1", "command": {"name": "sign"}})
        );
    }

    #[test]
    fn decodes_handle_added() {
        let event: BridgeEvent =
            decode_frame(r#"{"event":"handle_added","data":{"handle":"abc"}}"#).unwrap();
        assert_eq!(
            event,
            BridgeEvent::HandleAdded {
                data: HandleData { handle: "abc".into() }
            }
        );
    }

    #[test]
    fn decodes_exec_exception() {
        let event: BridgeEvent = decode_frame(
            r#"{"event":"exec_exception","uid":"sign-1","data":{"exception":{"kind":"exception","name":"HaloLogicError","message":"bad keyNo"}}}"#,
        )
        .unwrap();
        match event {
            BridgeEvent::ExecException { uid, data } => {
                assert_eq!(uid, "sign-1");
                assert_eq!(data.exception.name, "HaloLogicError");
            }
            other => panic!("expected ExecException, got {other:?}"),
        }
    }

    #[test]
    fn unknown_events_are_tolerated() {
        let event: BridgeEvent =
            decode_frame(r#"{"event":"pong","data":{"anything":1}}"#).unwrap();
        assert_eq!(event, BridgeEvent::Unknown);
    }

    #[test]
    fn garbage_frame_is_transport_error() {
        let result: Result<BridgeEvent, _> = decode_frame("not json");
        assert!(matches!(result, Err(SignError::Transport(_))));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let frame = " ".repeat(MAX_FRAME_SIZE + 1);
        let result: Result<BridgeEvent, _> = decode_frame(&frame);
        assert!(matches!(result, Err(SignError::Transport(msg)) if msg.contains("too large")));
    }

    #[test]
    fn missing_device_classifies_as_unavailable() {
        for name in [
            "NFCMethodNotSupported",
            "NFCAbortedError",
            "NFCPermissionRequestDenied",
            "NFCBadTransportError",
        ] {
            assert!(
                matches!(classify_exception(&exception(name)), SignError::DeviceUnavailable(_)),
                "{name}"
            );
        }
    }

    #[test]
    fn card_errors_classify_as_rejected() {
        for name in ["HaloLogicError", "HaloTagError"] {
            assert!(
                matches!(classify_exception(&exception(name)), SignError::DeviceRejected(_)),
                "{name}"
            );
        }
    }

    #[test]
    fn other_errors_classify_as_transport() {
        let error = classify_exception(&exception("NFCOperationError"));
        assert_eq!(
            error,
            SignError::Transport("NFCOperationError: details".into())
        );
    }
}
