//! Registry of live connections.
//!
//! One async mutex guards a [`ConnectionList`]. Adding, removing,
//! iterating and broadcasting all take that same lock, so a broadcast
//! pass never interleaves with a receiver deregistering itself.
//!
//! The broadcaster holds the lock across its socket writes. Nothing
//! that holds this lock ever waits on the message queue.
//!
//! A peer that stops reading can stall a write forever. Closing the
//! registry first flips a latch that every in-flight write races
//! against, so the writer gives the lock back and
//! [`Registry::close_all_and_clear`] can always get it.

use std::io;
use std::net::SocketAddr;

use chat_core::{ConnectionId, ConnectionList, CoreError, Handle, ShutdownSignal, Visit};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

/// Write side of one client connection, as stored in the registry.
#[derive(Debug)]
pub struct Connection<W> {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub writer: W,
}

impl<W> Connection<W> {
    pub fn new(id: ConnectionId, peer: SocketAddr, writer: W) -> Self {
        Connection { id, peer, writer }
    }
}

/// Result of one [`Registry::broadcast`] pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOut {
    /// Connections that received the full payload.
    pub delivered: usize,

    /// Connections whose write failed and that were removed.
    pub pruned: Vec<ConnectionId>,
}

#[derive(Debug)]
pub struct Registry<W> {
    list: Mutex<ConnectionList<Connection<W>>>,
    closing: ShutdownSignal,
}

impl<W> Default for Registry<W> {
    fn default() -> Self {
        Registry {
            list: Mutex::new(ConnectionList::new()),
            closing: ShutdownSignal::new(),
        }
    }
}

impl<W> Registry<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection. Fails only if the arena cannot grow.
    pub async fn add(&self, conn: Connection<W>) -> Result<Handle, CoreError> {
        self.list.lock().await.push_back(conn)
    }

    /// Detach the connection behind `handle`.
    ///
    /// `None` if it is already gone, e.g. pruned by a broadcast.
    pub async fn remove(&self, handle: Handle) -> Option<Connection<W>> {
        self.list.lock().await.remove(handle)
    }

    pub async fn len(&self) -> usize {
        self.list.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.list.lock().await.is_empty()
    }

    pub async fn contains(&self, handle: Handle) -> bool {
        self.list.lock().await.contains(handle)
    }

    /// Ids of all live connections, in insertion order.
    pub async fn ids(&self) -> Vec<ConnectionId> {
        self.list
            .lock()
            .await
            .iter()
            .map(|(_, conn)| conn.id)
            .collect()
    }

    /// Visit every connection under the lock; `visit` may prune the one
    /// it is looking at.
    pub async fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&mut Connection<W>) -> Visit,
    {
        self.list.lock().await.for_each(|_, conn| visit(conn));
    }

    /// Write `bytes` to a single connection.
    pub async fn unicast(&self, handle: Handle, bytes: &[u8]) -> io::Result<()> {
        let mut list = self.list.lock().await;
        let conn = list
            .get_mut(handle)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "connection not registered"))?;
        self.write_flush(&mut conn.writer, bytes).await
    }

    /// Write `bytes` to every connection in insertion order.
    ///
    /// A connection whose write fails is removed in the same pass; there
    /// is no retry and nobody is told. Its receiver will notice on its
    /// next read and announce the departure.
    ///
    /// If the registry starts closing mid-pass, the pass stops where it
    /// is and the remaining connections are left to the close.
    pub async fn broadcast(&self, bytes: &[u8]) -> FanOut {
        let mut list = self.list.lock().await;
        let mut fan_out = FanOut::default();

        let mut cursor = list.first();
        while let Some(handle) = cursor {
            cursor = list.next_after(handle);
            let Some(conn) = list.get_mut(handle) else {
                continue;
            };
            match self.write_flush(&mut conn.writer, bytes).await {
                Ok(()) => fan_out.delivered += 1,
                Err(_) if self.closing.is_triggered() => break,
                Err(e) => {
                    debug!(client_id = conn.id.0, error = %e, "write failed, pruning");
                    fan_out.pruned.push(conn.id);
                    list.remove(handle);
                }
            }
        }

        fan_out
    }

    /// Shut down every connection's write side and empty the registry.
    ///
    /// Returns how many connections were closed.
    pub async fn close_all_and_clear(&self) -> usize {
        // Abort any stalled write holding the lock before waiting for it.
        self.closing.trigger();
        let drained = self.list.lock().await.drain();
        let closed = drained.len();
        for mut conn in drained {
            debug!(client_id = conn.id.0, "closing connection");
            let _ = conn.writer.shutdown().await;
        }
        closed
    }

    /// Whether [`Registry::close_all_and_clear`] has been called.
    pub fn is_closing(&self) -> bool {
        self.closing.is_triggered()
    }

    async fn write_flush(&self, writer: &mut W, bytes: &[u8]) -> io::Result<()> {
        tokio::select! {
            biased;
            _ = self.closing.wait() => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "registry closing",
            )),
            written = async {
                writer.write_all(bytes).await?;
                writer.flush().await
            } => written,
        }
    }
}
