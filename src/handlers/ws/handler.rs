//! WebSocket relay handler
//!
//! Owns the lifecycle of one browser channel: upgrade, reader loop, writer
//! task, transcription worker and connection-slot release.

use axum::{
    extract::{
        FromRequestParts, Request, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::select;
use tokio::time::{Duration, Instant, sleep_until};
use tower::util::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::middleware::ClientIp;
use crate::middleware::connection_limit::is_websocket_upgrade;
use crate::state::AppState;

use super::messages::{MAX_INBOUND_MESSAGE_SIZE, MessageRoute};
use super::processor::{
    ChannelContext, TRANSCRIPTION_QUEUE_SIZE, handle_payload, run_transcription_worker,
};

/// Outbound queue depth per channel
const CHANNEL_BUFFER_SIZE: usize = 256;

/// How long the writer gets to flush a close frame on shutdown
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Relay entry point
///
/// WebSocket upgrade requests open a relay channel. Any other request is
/// answered from the static asset directory when one is configured, so the
/// browser client and its socket can share one origin.
pub async fn ws_relay_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    if !is_websocket_upgrade(&request) {
        return serve_static(&state, request).await;
    }

    let (mut parts, _body) = request.into_parts();
    let client_ip = parts.extensions.get::<ClientIp>().map(|ip| ip.0);

    let ws = match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => ws,
        Err(rejection) => {
            warn!("Rejected WebSocket upgrade: {}", rejection);
            return rejection.into_response();
        }
    };

    let failed_state = state.clone();
    ws.max_frame_size(MAX_INBOUND_MESSAGE_SIZE)
        .max_message_size(MAX_INBOUND_MESSAGE_SIZE)
        .on_failed_upgrade(move |e| {
            warn!("WebSocket upgrade failed: {}", e);
            if let Some(ip) = client_ip {
                failed_state.release_connection(ip);
            }
        })
        .on_upgrade(move |socket| handle_relay_socket(socket, state, client_ip))
}

async fn serve_static(state: &AppState, request: Request) -> Response {
    let Some(dir) = state.config.static_dir.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match ServeDir::new(dir).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(infallible) => match infallible {},
    }
}

/// Handle one relay channel until the client leaves or goes idle
async fn handle_relay_socket(socket: WebSocket, app_state: Arc<AppState>, client_ip: Option<IpAddr>) {
    let conn_id = Uuid::new_v4();
    info!(
        conn_id = %conn_id,
        active_connections = app_state.ws_connection_count(),
        "Client connected"
    );

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);
    let (transcript_tx, transcript_rx) = mpsc::channel::<String>(TRANSCRIPTION_QUEUE_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let result = match route {
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                    Err(e) => {
                        error!("Failed to serialize outgoing message: {}", e);
                        continue;
                    }
                },
                MessageRoute::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let worker_task = tokio::spawn(run_transcription_worker(
        conn_id,
        app_state.responder.clone(),
        transcript_rx,
        message_tx.clone(),
    ));

    let ctx = ChannelContext {
        conn_id,
        message_tx,
        transcript_tx,
    };

    let idle_timeout = app_state.config.idle_timeout();
    let mut last_activity = Instant::now();

    loop {
        select! {
            msg_result = receiver.next() => {
                last_activity = Instant::now();

                match msg_result {
                    Some(Ok(msg)) => {
                        if !process_relay_message(msg, &ctx).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        debug!(conn_id = %conn_id, "WebSocket stream ended");
                        break;
                    }
                }
            }
            _ = sleep_until(last_activity + idle_timeout) => {
                warn!(
                    conn_id = %conn_id,
                    "Connection idle for {}s, closing",
                    last_activity.elapsed().as_secs()
                );
                let _ = ctx.message_tx.send(MessageRoute::Close).await;
                break;
            }
        }
    }

    // Cleanup: pending replies are dropped, the writer gets a moment to flush
    worker_task.abort();
    drop(ctx);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, sender_task)
        .await
        .is_err()
    {
        debug!(conn_id = %conn_id, "Writer did not drain in time");
    }

    if let Some(ip) = client_ip {
        app_state.release_connection(ip);
    }

    info!(
        conn_id = %conn_id,
        active_connections = app_state.ws_connection_count(),
        "Client disconnected"
    );
}

/// Process one WebSocket frame
///
/// # Returns
/// * `bool` - true to continue processing, false to terminate the connection
async fn process_relay_message(msg: Message, ctx: &ChannelContext) -> bool {
    match msg {
        Message::Text(text) => {
            debug!(conn_id = %ctx.conn_id, "Received text message: {} bytes", text.len());
            handle_payload(text.as_bytes(), ctx).await
        }
        Message::Binary(data) => {
            debug!(conn_id = %ctx.conn_id, "Received binary message: {} bytes", data.len());
            handle_payload(&data, ctx).await
        }
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!(conn_id = %ctx.conn_id, "Close frame received");
            false
        }
    }
}
