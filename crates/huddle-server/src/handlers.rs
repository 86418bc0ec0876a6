//! Connection handlers for the Huddle server.
//!
//! This module owns the WebSocket session lifecycle: handshake, draining the
//! user's outbound queue, and feeding inbound frames to the dispatcher.

use crate::config::Config;
use crate::dispatch::{delivery_frame, dispatch, error_frame, validate_name};
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use bytes::BytesMut;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use huddle_core::{Router as ChatRouter, RouterConfig};
use huddle_protocol::{codec, codes, Frame, PROTOCOL_VERSION};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

type WsSender = SplitSink<WebSocket, Message>;
type WsReceiver = SplitStream<WebSocket>;

/// Shared server state.
pub struct AppState {
    /// The chat router.
    pub router: ChatRouter,
    /// Server configuration.
    pub config: Config,
    /// One permit per live session, up to `limits.max_connections`.
    sessions: Arc<Semaphore>,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let router_config = RouterConfig {
            queue_capacity: config.limits.queue_capacity,
            enqueue_timeout: config.limits.enqueue_timeout(),
        };

        Self {
            router: ChatRouter::with_config(router_config),
            sessions: Arc::new(Semaphore::new(config.limits.max_connections)),
            config,
        }
    }
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    let state = Arc::new(AppState::new(config.clone()));

    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {}", e);
        }
    }

    let app = app(state);

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!("Huddle server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router for the WebSocket endpoint and health check.
pub fn app(state: Arc<AppState>) -> Router {
    let ws_path = state.config.transport.websocket_path.clone();
    Router::new()
        .route(&ws_path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    axum::Json(health_body(&state))
}

fn health_body(state: &AppState) -> serde_json::Value {
    let stats = state.router.stats();
    serde_json::json!({
        "status": "ok",
        "name": state.config.name,
        "environment": state.config.environment,
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": stats.room_count,
        "connections": stats.connection_count,
        "subscriptions": stats.total_subscriptions,
    })
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle a WebSocket session from handshake to close.
async fn handle_websocket(socket: WebSocket, state: Arc<AppState>) {
    let _metrics_guard = ConnectionMetricsGuard::new();
    let (mut sender, mut receiver) = socket.split();
    let mut read_buffer = BytesMut::with_capacity(4096);

    let handshake = tokio::time::timeout(
        state.config.heartbeat.timeout(),
        await_connect(&mut sender, &mut receiver, &mut read_buffer),
    )
    .await;
    let (user, version) = match handshake {
        Ok(Some(accepted)) => accepted,
        Ok(None) => return,
        Err(_) => {
            debug!("Handshake timed out");
            return;
        }
    };

    // Held until the session ends.
    let Ok(_permit) = Arc::clone(&state.sessions).try_acquire_owned() else {
        warn!(user = %user, "Connection limit reached");
        let _ = send_frame(
            &mut sender,
            &error_frame(0, codes::UNAVAILABLE, "Connection limit reached"),
        )
        .await;
        return;
    };

    // Dropping the handle on any exit path below releases the user's queue.
    let mut inbox = state.router.connect(user.clone());

    let connected = Frame::connected(&user, version, state.config.heartbeat.interval_ms as u32);
    if send_frame(&mut sender, &connected).await.is_err() {
        error!(user = %user, "Failed to send Connected frame");
        return;
    }
    info!(user = %user, "Session started");

    let idle_timeout = state.config.heartbeat.timeout();
    let mut deadline = tokio::time::Instant::now() + idle_timeout;

    loop {
        tokio::select! {
            biased;

            delivery = inbox.recv() => {
                let Some(delivery) = delivery else {
                    info!(user = %user, "Queue closed by a newer session or disconnect");
                    break;
                };
                if send_frame(&mut sender, &delivery_frame(&delivery)).await.is_err() {
                    break;
                }
            }

            msg = receiver.next() => {
                deadline = tokio::time::Instant::now() + idle_timeout;
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        metrics::record_message(data.len(), "inbound");
                        read_buffer.extend_from_slice(&data);
                        if process_buffer(&state, &user, &mut read_buffer, &mut sender).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        read_buffer.extend_from_slice(text.as_bytes());
                        if process_buffer(&state, &user, &mut read_buffer, &mut sender).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        debug!(user = %user, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(user = %user, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(user = %user, "WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = tokio::time::sleep_until(deadline) => {
                warn!(user = %user, "Session idle timeout");
                break;
            }
        }
    }

    drop(inbox);
    info!(user = %user, "Session ended");
}

/// Read frames until a valid `Connect` arrives.
///
/// Returns the session's user and negotiated version, or `None` if the
/// client went away or sent something other than a valid handshake.
async fn await_connect(
    sender: &mut WsSender,
    receiver: &mut WsReceiver,
    read_buffer: &mut BytesMut,
) -> Option<(String, u8)> {
    loop {
        match codec::decode_from(read_buffer) {
            Ok(Some(Frame::Connect { version, user })) => {
                let reply = match (PROTOCOL_VERSION.negotiate(version), validate_name(&user)) {
                    (Ok(version), Ok(())) => return Some((user, version)),
                    (Err(e), _) => error_frame(0, codes::UNSUPPORTED_VERSION, e.to_string()),
                    (_, Err(reason)) => {
                        error_frame(0, codes::INVALID_ARGUMENT, format!("user: {reason}"))
                    }
                };
                let _ = send_frame(sender, &reply).await;
                return None;
            }
            Ok(Some(other)) => {
                let reply = error_frame(
                    other.request_id().unwrap_or(0),
                    codes::UNAUTHENTICATED,
                    "Connect must be the first frame",
                );
                let _ = send_frame(sender, &reply).await;
                return None;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Malformed handshake");
                metrics::record_error("protocol");
                return None;
            }
        }

        match receiver.next().await {
            Some(Ok(Message::Binary(data))) => read_buffer.extend_from_slice(&data),
            Some(Ok(Message::Text(text))) => read_buffer.extend_from_slice(text.as_bytes()),
            Some(Ok(Message::Ping(data))) => {
                if sender.send(Message::Pong(data)).await.is_err() {
                    return None;
                }
            }
            Some(Ok(Message::Pong(_))) => {}
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return None,
        }
    }
}

/// Dispatch every complete frame in the buffer.
///
/// Fails only when the socket can no longer be written to or the stream is
/// malformed; request-level failures become `Error` frames.
async fn process_buffer(
    state: &AppState,
    user: &str,
    read_buffer: &mut BytesMut,
    sender: &mut WsSender,
) -> Result<()> {
    loop {
        let frame = match codec::decode_from(read_buffer) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(e) => {
                error!(user = %user, error = %e, "Frame decoding error");
                let _ = send_frame(sender, &error_frame(0, codes::INVALID_ARGUMENT, e.to_string()))
                    .await;
                return Err(e.into());
            }
        };

        let start = Instant::now();
        let reply = dispatch(&state.router, &state.config.limits, user, frame).await;
        metrics::record_latency(start.elapsed().as_secs_f64());

        if let Some(reply) = reply {
            send_frame(sender, &reply).await?;
        }
    }
}

/// Send a frame to the WebSocket.
async fn send_frame(sender: &mut WsSender, frame: &Frame) -> Result<()> {
    let data = codec::encode(frame)?;
    metrics::record_message(data.len(), "outbound");
    sender.send(Message::Binary(data.to_vec())).await?;
    Ok(())
}
