// crates/chat-server/src/receiver.rs

//! Per-connection receiver worker.
//!
//! Life of a connection, from this task's point of view:
//!
//! ```text
//! Connected ──welcome ok──▶ Reading ──EOF──────▶ Disconnected ─┐
//!     │                        ├────read error──▶ Errored ──────┤
//!     │                        └────shutdown────▶ Cancelled ────┤
//!     └──welcome failed─────────────────────────────────────────┴▶ Deregistered
//! ```
//!
//! The read side is owned here; the write side lives in the registry,
//! where the broadcaster reaches it.

use std::io;
use std::sync::Arc;

use bytes::BytesMut;
use chat_core::{ChatMessage, ConnectionId, Handle};
use chat_protocol::{encode_line, format_welcome, LineDecoder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, info, warn};

use crate::broker::Broker;

const READ_CHUNK: usize = 1024;

/// Why a receiver stopped.
#[derive(Debug)]
pub enum ReceiverExit {
    /// The welcome could not be written; arrival was never announced.
    WelcomeFailed(io::Error),

    /// The peer closed the connection.
    Disconnected,

    /// Reading from the socket failed.
    Errored(io::Error),

    /// The server is shutting down.
    Cancelled,
}

/// Run the receiver loop for a single connection.
pub async fn run_receiver<R, W>(
    broker: Arc<Broker<W>>,
    client_id: ConnectionId,
    handle: Handle,
    mut reader: R,
) -> ReceiverExit
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    if broker.welcome() {
        let mut greeting = BytesMut::new();
        encode_line(&format_welcome(client_id), &mut greeting);
        if let Err(e) = broker.registry().unicast(handle, &greeting).await {
            debug!(client_id = client_id.0, error = %e, "Welcome failed, dropping connection");
            broker.registry().remove(handle).await;
            return ReceiverExit::WelcomeFailed(e);
        }
    }

    let exit = if broker.enqueue(ChatMessage::joined(client_id)).await {
        read_loop(&broker, client_id, &mut reader).await
    } else {
        ReceiverExit::Cancelled
    };

    match &exit {
        ReceiverExit::Errored(e) => warn!(client_id = client_id.0, error = %e, "Read error"),
        other => info!(client_id = client_id.0, exit = ?other, "Client disconnected"),
    }

    // Deregister first, so the departure notice is not sent back to us.
    broker.registry().remove(handle).await;
    if !broker.shutdown().is_triggered() {
        broker.enqueue(ChatMessage::left(client_id)).await;
    }

    exit
}

async fn read_loop<R, W>(broker: &Broker<W>, client_id: ConnectionId, reader: &mut R) -> ReceiverExit
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut decoder = LineDecoder::new(broker.max_line_len());
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            biased;
            _ = broker.shutdown().wait() => return ReceiverExit::Cancelled,
            read = reader.read(&mut chunk) => read,
        };

        match read {
            Ok(0) => {
                // A final unterminated line is still a message.
                if let Some(tail) = decoder.finish() {
                    forward(broker, client_id, tail).await;
                }
                return ReceiverExit::Disconnected;
            }
            Ok(n) => {
                decoder.extend(&chunk[..n]);
                while let Some(line) = decoder.next_line() {
                    if !forward(broker, client_id, line).await {
                        return ReceiverExit::Cancelled;
                    }
                }
            }
            Err(e) => return ReceiverExit::Errored(e),
        }
    }
}

/// Push one line as a chat message. Blank lines are dropped.
async fn forward<W>(broker: &Broker<W>, client_id: ConnectionId, line: String) -> bool
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    if line.trim().is_empty() {
        return true;
    }
    debug!(client_id = client_id.0, %line, "Received line");
    broker.enqueue(ChatMessage::text(client_id, line)).await
}
