//! WebSocket handler for live game traffic.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. The socket gets a fresh connection id and is registered with the lobby,
//!    which answers with `init`
//! 3. Two tasks run until either ends:
//!    - Send task: relays lobby messages and pings on the heartbeat interval
//!    - Receive task: rate limits inbound text and forwards it to the lobby
//! 4. On exit the lobby is told the connection is gone; the seat it held stays
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//! ws.onmessage = (event) => handle(JSON.parse(event.data));
//! ws.send(JSON.stringify({ type: "create", userId: myId }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use hilo_poker::{LobbyHandle, lobby::ConnectionId, messages::ServerMessage};
use log::{debug, error, info};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{
    sync::mpsc,
    time::{Duration, Instant, MissedTickBehavior, interval_at},
};
use uuid::Uuid;

use super::{AppState, rate_limiter::RateLimiter};
use crate::{logging, metrics};

/// Messages the lobby may queue for one socket before it starts dropping them.
const OUTBOUND_BUFFER: usize = 256;

/// Upgrade HTTP connection to WebSocket for game communication.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id: ConnectionId = Uuid::new_v4();
    let label = connection_id.to_string();
    let opened_at = Instant::now();
    let (sink, stream) = socket.split();

    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    if let Err(e) = state.lobby.connect(connection_id, outbound_tx).await {
        error!("Failed to register connection {connection_id}: {e}");
        return;
    }

    logging::log_connection(&label, true, None);
    metrics::websocket_connection_opened();

    let alive = Arc::new(AtomicBool::new(true));
    let heartbeat = state.config.connection.heartbeat_interval();
    let limiter = RateLimiter::for_connection(&state.config.connection);

    let mut send_task = tokio::spawn(send_loop(
        sink,
        outbound_rx,
        heartbeat,
        alive.clone(),
        label.clone(),
    ));
    let mut recv_task = tokio::spawn(recv_loop(
        stream,
        state.lobby.clone(),
        connection_id,
        limiter,
        alive,
    ));

    // Whichever side finishes first takes the other down with it.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    if let Err(e) = state.lobby.disconnect(connection_id).await {
        debug!("Lobby gone before connection {connection_id} closed: {e}");
    }

    metrics::websocket_connection_closed();
    logging::log_connection(&label, false, Some(opened_at.elapsed().as_secs()));
}

/// Relay lobby messages to the client and keep the heartbeat going.
async fn send_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<ServerMessage>,
    heartbeat: Duration,
    alive: Arc<AtomicBool>,
    label: String,
) {
    let mut ticker = interval_at(Instant::now() + heartbeat, heartbeat);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = outbound.recv() => {
                let Some(message) = message else {
                    break;
                };
                let json = match message.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", message.kind(), e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
                metrics::websocket_messages_sent();
            }

            _ = ticker.tick() => {
                // No pong since the previous ping.
                if !alive.swap(false, Ordering::Relaxed) {
                    logging::log_security_event(
                        "dead_heartbeat",
                        &label,
                        "No pong within one heartbeat interval, closing",
                    );
                    metrics::dead_heartbeats_total();
                    break;
                }
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

/// Forward client text to the lobby until the socket closes or misbehaves.
async fn recv_loop(
    mut stream: SplitStream<WebSocket>,
    lobby: LobbyHandle,
    connection_id: ConnectionId,
    mut limiter: RateLimiter,
    alive: Arc<AtomicBool>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if !limiter.check() {
                    logging::log_security_event(
                        "rate_limit",
                        &connection_id.to_string(),
                        "Inbound message rate exceeded, closing",
                    );
                    metrics::rate_limit_hits_total("ws");
                    break;
                }

                if lobby
                    .inbound(connection_id, text.as_str().to_owned())
                    .await
                    .is_err()
                {
                    error!("Lobby closed while connection {connection_id} was open");
                    break;
                }
            }
            Ok(Message::Pong(_)) => {
                alive.store(true, Ordering::Relaxed);
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed by client: {connection_id}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error on {connection_id}: {e}");
                break;
            }
        }
    }
}
