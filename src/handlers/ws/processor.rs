//! WebSocket message processing
//!
//! Dispatches parsed relay messages and runs the per-channel transcription
//! worker that keeps replies in send order.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::responder::Responder;

use super::messages::{IncomingMessage, MessageRoute, OutgoingMessage};

/// Maximum transcriptions waiting for a reply on one channel.
///
/// A transcription arriving while the queue is full is answered with the same
/// `error` message as a malformed payload; clients cannot tell the two apart.
pub const TRANSCRIPTION_QUEUE_SIZE: usize = 32;

/// Per-channel handles used while dispatching messages.
pub struct ChannelContext {
    pub conn_id: Uuid,
    pub message_tx: mpsc::Sender<MessageRoute>,
    pub transcript_tx: mpsc::Sender<String>,
}

/// Handle one inbound payload, text or binary.
///
/// # Returns
/// * `bool` - true to continue processing, false to terminate the connection
pub async fn handle_payload(raw: &[u8], ctx: &ChannelContext) -> bool {
    match IncomingMessage::parse(raw) {
        Ok(msg) => handle_incoming_message(msg, ctx).await,
        Err(e) => {
            warn!(conn_id = %ctx.conn_id, "Failed to parse message: {}", e);
            send(ctx, OutgoingMessage::parse_error()).await
        }
    }
}

/// Process a parsed message based on its type.
pub async fn handle_incoming_message(msg: IncomingMessage, ctx: &ChannelContext) -> bool {
    match msg {
        IncomingMessage::Transcription { text } => {
            info!(
                conn_id = %ctx.conn_id,
                chars = text.chars().count(),
                "Transcription received"
            );
            match ctx.transcript_tx.try_send(text) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        conn_id = %ctx.conn_id,
                        queue_size = TRANSCRIPTION_QUEUE_SIZE,
                        "Transcription queue full, rejecting message with the generic processing error"
                    );
                    send(ctx, OutgoingMessage::parse_error()).await
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn_id = %ctx.conn_id, "Transcription worker stopped");
                    false
                }
            }
        }
        IncomingMessage::Ping => send(ctx, OutgoingMessage::Pong).await,
        IncomingMessage::Unknown { kind } => {
            debug!(conn_id = %ctx.conn_id, kind = ?kind, "Ignoring message of unknown type");
            true
        }
    }
}

async fn send(ctx: &ChannelContext, message: OutgoingMessage) -> bool {
    if ctx
        .message_tx
        .send(MessageRoute::Outgoing(message))
        .await
        .is_err()
    {
        debug!(conn_id = %ctx.conn_id, "Writer closed, dropping message");
        return false;
    }
    true
}

/// Answer queued transcriptions one at a time, in arrival order.
///
/// Ends when the queue is closed or the writer goes away.
pub async fn run_transcription_worker(
    conn_id: Uuid,
    responder: Arc<Responder>,
    mut transcript_rx: mpsc::Receiver<String>,
    message_tx: mpsc::Sender<MessageRoute>,
) {
    while let Some(text) = transcript_rx.recv().await {
        let reply = responder.generate(&text).await;
        debug!(conn_id = %conn_id, chars = reply.chars().count(), "Reply generated");

        if message_tx
            .send(MessageRoute::Outgoing(OutgoingMessage::AiResponse { text: reply }))
            .await
            .is_err()
        {
            debug!(conn_id = %conn_id, "Channel closed, dropping pending response");
            break;
        }
    }
}
