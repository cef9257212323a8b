//! Central broadcast loop.
//!
//! This task is the only consumer of the message queue and the only
//! writer of the transcript. For every message it:
//!
//! 1. appends the formatted line to the transcript (failure is fatal),
//! 2. writes the same line to every registered connection, pruning the
//!    ones whose socket is gone.
//!
//! Because a single task does both steps in order, every client sees
//! messages in transcript order.

use std::sync::Arc;

use bytes::BytesMut;
use chat_core::Transcript;
use chat_protocol::{encode_line, format_message};
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use crate::broker::Broker;
use crate::error::ServerError;

/// Run the broadcast loop until shutdown or a transcript write failure.
pub async fn run_broadcaster<W>(
    broker: Arc<Broker<W>>,
    mut transcript: Transcript,
) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut out = BytesMut::with_capacity(512);

    loop {
        let msg = tokio::select! {
            biased;
            _ = broker.shutdown().wait() => break,
            msg = broker.queue().pop() => msg,
        };

        let line = format_message(&msg);
        transcript
            .append_line(&line)
            .await
            .map_err(|source| ServerError::TranscriptWrite {
                path: transcript.path().to_path_buf(),
                source,
            })?;

        out.clear();
        encode_line(&line, &mut out);
        let fan_out = broker.registry().broadcast(&out).await;

        debug!(
            client_id = msg.sender.0,
            delivered = fan_out.delivered,
            pruned = fan_out.pruned.len(),
            "Broadcast {}",
            line
        );
        for id in fan_out.pruned {
            info!(client_id = id.0, "Pruned dead connection");
        }
    }

    info!("Broadcaster shutting down");
    Ok(())
}
