//! Shared broker context.
//!
//! One [`Broker`] is created per server and handed to every task as an
//! `Arc` at spawn time. It owns everything the tasks coordinate on:
//! the connection registry, the message queue, the shutdown signal and
//! the id counter.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chat_core::{ChatMessage, ConnectionId, CoreError, Handle, MessageQueue, ShutdownSignal};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::{JoinHandle, JoinSet};
use tracing::info;

use crate::config::Config;
use crate::receiver::{self, ReceiverExit};
use crate::registry::{Connection, Registry};

#[derive(Debug)]
pub struct Broker<W> {
    registry: Registry<W>,
    queue: MessageQueue<ChatMessage>,
    shutdown: ShutdownSignal,
    next_id: AtomicU64,
    welcome: bool,
    max_line_len: usize,
}

impl<W> Broker<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(config: &Config) -> Self {
        Broker {
            registry: Registry::new(),
            queue: MessageQueue::new(config.queue_capacity),
            shutdown: ShutdownSignal::new(),
            next_id: AtomicU64::new(1),
            welcome: config.welcome,
            max_line_len: config.max_line_len,
        }
    }

    pub fn registry(&self) -> &Registry<W> {
        &self.registry
    }

    pub fn queue(&self) -> &MessageQueue<ChatMessage> {
        &self.queue
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    pub fn welcome(&self) -> bool {
        self.welcome
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a freshly accepted connection and spawn its receiver.
    pub async fn attach<R>(
        self: &Arc<Self>,
        peer: SocketAddr,
        reader: R,
        writer: W,
    ) -> Result<(ConnectionId, JoinHandle<ReceiverExit>), CoreError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (id, handle) = self.register(peer, writer).await?;
        let task = tokio::spawn(receiver::run_receiver(Arc::clone(self), id, handle, reader));
        Ok((id, task))
    }

    /// Like [`Broker::attach`], but the receiver joins `workers` so the
    /// caller can wait for it on the way out.
    pub async fn attach_to<R>(
        self: &Arc<Self>,
        workers: &mut JoinSet<ReceiverExit>,
        peer: SocketAddr,
        reader: R,
        writer: W,
    ) -> Result<ConnectionId, CoreError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (id, handle) = self.register(peer, writer).await?;
        workers.spawn(receiver::run_receiver(Arc::clone(self), id, handle, reader));
        Ok(id)
    }

    async fn register(&self, peer: SocketAddr, writer: W) -> Result<(ConnectionId, Handle), CoreError> {
        let id = self.next_connection_id();
        let handle = self
            .registry
            .add(Connection::new(id, peer, writer))
            .await?;
        Ok((id, handle))
    }

    /// Queue `msg` for broadcast, giving up if shutdown starts first.
    ///
    /// Returns whether the message was queued.
    pub async fn enqueue(&self, msg: ChatMessage) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.wait() => false,
            _ = self.queue.push(msg) => true,
        }
    }

    /// Begin shutdown and close every registered connection.
    ///
    /// Only the first caller does the work; later calls return `false`
    /// without touching the registry.
    pub async fn terminate(&self) -> bool {
        if !self.shutdown.trigger() {
            return false;
        }
        let closed = self.registry.close_all_and_clear().await;
        info!(closed, "Closed all connections");
        true
    }
}
