use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use nfc_signer::bridge::{
    BridgeEvent, BridgeException, BridgeRequest, ExecExceptionData, ExecSuccessData, HandleData,
    ReaderData, decode_frame, encode_frame,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::card::SoftwareCard;

const READER_NAME: &str = "Software Card Reader";

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct AppState {
    pub card: Arc<SoftwareCard>,
    /// How long after a client connects the card is "tapped".
    pub tap_delay: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(|| async move { (StatusCode::OK, "Ok").into_response() }))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Binds `host:port` and serves until `shutdown` is cancelled.
pub async fn run(host: &str, port: u16, state: AppState, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding {host}:{port}"))?;
    serve(listener, state, shutdown).await
}

pub async fn serve(listener: TcpListener, state: AppState, shutdown: CancellationToken) -> Result<()> {
    info!(addr = %listener.local_addr()?, "card emulator listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .context("serving bridge")
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let handle = format!("card-{}", NEXT_HANDLE.fetch_add(1, Ordering::Relaxed));
    if let Err(e) = serve_card(&mut socket, &state, &handle).await {
        warn!(%handle, error = %e, "bridge session ended with error");
    }
}

async fn serve_card(socket: &mut WebSocket, state: &AppState, handle: &str) -> Result<()> {
    send_event(socket, &BridgeEvent::WsConnected).await?;
    send_event(
        socket,
        &BridgeEvent::ReaderAdded {
            data: ReaderData {
                reader_name: READER_NAME.to_string(),
            },
        },
    )
    .await?;

    tokio::time::sleep(state.tap_delay).await;
    send_event(
        socket,
        &BridgeEvent::HandleAdded {
            data: HandleData {
                handle: handle.to_string(),
            },
        },
    )
    .await?;
    debug!(%handle, "card tapped");

    while let Some(msg) = socket.recv().await {
        let text = match msg.context("receiving frame")? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let request: BridgeRequest = match decode_frame(text.as_str()) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "ignoring malformed request");
                continue;
            }
        };

        let BridgeRequest::ExecHalo {
            handle: target,
            uid,
            command,
        } = request;

        let event = if target != handle {
            exception(
                uid,
                BridgeException {
                    kind: "exception".into(),
                    name: "NFCBadTransportError".into(),
                    message: format!("unknown handle {target}"),
                },
            )
        } else {
            match state.card.execute(&command) {
                Ok(res) => BridgeEvent::ExecSuccess {
                    uid,
                    data: ExecSuccessData { res },
                },
                Err(e) => {
                    info!(error = %e, "card rejected command");
                    exception(uid, e.to_exception())
                }
            }
        };
        send_event(socket, &event).await?;
    }
    Ok(())
}

fn exception(uid: String, exception: BridgeException) -> BridgeEvent {
    BridgeEvent::ExecException {
        uid,
        data: ExecExceptionData { exception },
    }
}

async fn send_event(socket: &mut WebSocket, event: &BridgeEvent) -> Result<()> {
    let frame = encode_frame(event)?;
    socket
        .send(Message::Text(frame.into()))
        .await
        .context("sending bridge event")
}
