use std::sync::atomic::{AtomicU64, Ordering};

use async_tungstenite::tokio::connect_async;
use async_tungstenite::tungstenite::{self, Message};
use futures::{SinkExt, Stream, StreamExt};
use tracing::{debug, info};

use super::protocol::{BridgeEvent, BridgeRequest, classify_exception, decode_frame, encode_frame};
use crate::capability::{SignRequest, SignResponse, SigningCapability};
use crate::error::SignError;

pub const DEFAULT_BRIDGE_URL: &str = "ws://127.0.0.1:32868/ws";

/// [`SigningCapability`] backed by a local NFC bridge reached over a
/// WebSocket.
///
/// Every `sign` call opens its own connection, waits for a card to be
/// tapped, runs one command and closes the connection again.
pub struct BridgeClient {
    url: String,
    next_uid: AtomicU64,
}

impl BridgeClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            next_uid: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn exec(&self, request: &SignRequest) -> Result<SignResponse, SignError> {
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| self.connect_error(e))?;
        info!(url = %self.url, "connected to bridge, waiting for card");

        let handle = loop {
            match next_event(&mut ws).await? {
                BridgeEvent::HandleAdded { data } => break data.handle,
                other => debug!(?other, "ignoring bridge event while waiting for card"),
            }
        };
        debug!(%handle, "card presented");

        let uid = format!("sign-{}", self.next_uid.fetch_add(1, Ordering::Relaxed));
        let frame = encode_frame(&BridgeRequest::ExecHalo {
            handle: handle.clone(),
            uid: uid.clone(),
            command: serde_json::to_value(request)?,
        })?;
        ws.send(Message::Text(frame)).await.map_err(transport_error)?;

        let outcome = loop {
            match next_event(&mut ws).await? {
                BridgeEvent::ExecSuccess { uid: id, data } if id == uid => {
                    break serde_json::from_value::<SignResponse>(data.res).map_err(SignError::from);
                }
                BridgeEvent::ExecException { uid: id, data } if id == uid => {
                    break Err(classify_exception(&data.exception));
                }
                BridgeEvent::HandleRemoved { data } if data.handle == handle => {
                    break Err(SignError::DeviceUnavailable(
                        "card was removed before signing completed".into(),
                    ));
                }
                other => debug!(?other, "ignoring unrelated bridge event"),
            }
        };

        if let Err(e) = ws.close(None).await {
            debug!(error = %e, "closing bridge connection");
        }
        outcome
    }

    fn connect_error(&self, error: tungstenite::Error) -> SignError {
        match error {
            tungstenite::Error::Tls(e) => SignError::Environment(format!("TLS unavailable: {e}")),
            tungstenite::Error::Url(e) => {
                SignError::Transport(format!("invalid bridge url {}: {e}", self.url))
            }
            tungstenite::Error::HttpFormat(e) => {
                SignError::Transport(format!("invalid bridge url {}: {e}", self.url))
            }
            other => {
                SignError::DeviceUnavailable(format!("cannot reach bridge at {}: {other}", self.url))
            }
        }
    }
}

impl SigningCapability for BridgeClient {
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, SignError> {
        self.exec(request).await
    }
}

async fn next_event<S>(ws: &mut S) -> Result<BridgeEvent, SignError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return decode_frame(&text),
            Some(Ok(Message::Close(_))) | None => {
                return Err(SignError::DeviceUnavailable(
                    "bridge closed the connection".into(),
                ));
            }
            Some(Ok(other)) => debug!(?other, "ignoring non-text frame"),
            Some(Err(e)) => return Err(transport_error(e)),
        }
    }
}

fn transport_error(error: tungstenite::Error) -> SignError {
    match error {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            SignError::DeviceUnavailable("bridge closed the connection".into())
        }
        tungstenite::Error::Io(e) => SignError::DeviceUnavailable(format!("bridge i/o: {e}")),
        other => SignError::Transport(other.to_string()),
    }
}
