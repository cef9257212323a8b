//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Accepts new TCP connections, up to `max_clients` at a time.
//! - Registers each connection with the broker, which spawns its
//!   receiver task.
//! - Runs the single broadcaster task.
//! - Tears everything down once the shutdown signal fires.
//!
//! The per-connection logic and the broadcast loop live in `receiver`
//! and `broadcaster` respectively.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chat_core::Transcript;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::broadcaster;
use crate::config::Config;
use crate::error::ServerError;
use crate::receiver::ReceiverExit;
use crate::signal;
use crate::types::{SharedBroker, TcpBroker};

/// Pause after a failed accept, so running out of descriptors does not
/// turn the loop into a busy spin.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Source of inbound TCP connections.
///
/// Implemented for [`TcpListener`]; tests wrap one to inject failures.
pub trait Incoming: Send + 'static {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl Incoming for TcpListener {
    fn accept(&mut self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }
}

/// A bound, not yet running, chat server.
pub struct Server<L = TcpListener> {
    listener: L,
    broker: SharedBroker,
    transcript: Transcript,
    max_clients: usize,
}

impl Server {
    /// Bind the listener and open the transcript.
    pub async fn bind(config: Config) -> Result<Self, ServerError> {
        let addr = config.socket_addr_string();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        Server::with_listener(listener, config).await
    }
}

impl<L: Incoming> Server<L> {
    /// Serve connections from an already bound `listener`.
    pub async fn with_listener(listener: L, config: Config) -> Result<Self, ServerError> {
        let transcript = Transcript::open(&config.log_path)
            .await
            .map_err(|source| ServerError::TranscriptOpen {
                path: config.log_path.clone(),
                source,
            })?;

        Ok(Server {
            listener,
            broker: Arc::new(TcpBroker::new(&config)),
            transcript,
            max_clients: config.max_clients,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle for triggering shutdown or inspecting the registry.
    pub fn broker(&self) -> SharedBroker {
        Arc::clone(&self.broker)
    }

    /// Accept connections until shutdown, then wait for the broadcaster
    /// and every receiver to finish.
    ///
    /// Returns an error if the broadcaster failed (transcript write).
    /// Accept failures are logged and retried.
    pub async fn run(self) -> Result<(), ServerError> {
        let Server {
            mut listener,
            broker,
            transcript,
            max_clients,
        } = self;

        info!(addr = ?listener.local_addr().ok(), "Listening for incoming connections");

        let mut broadcaster = tokio::spawn(broadcaster::run_broadcaster(
            Arc::clone(&broker),
            transcript,
        ));
        let mut receivers = JoinSet::new();

        let mut finished = None;
        loop {
            tokio::select! {
                biased;
                _ = broker.shutdown().wait() => break,
                joined = &mut broadcaster => {
                    finished = Some(joined);
                    break;
                }
                Some(exited) = receivers.join_next() => reap(exited),
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        accept_connection(&broker, &mut receivers, stream, peer, max_clients).await
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }

        broker.terminate().await;

        let joined = match finished {
            Some(joined) => joined,
            None => broadcaster.await,
        };
        let outcome = joined.map_err(ServerError::from).and_then(|r| r);
        if let Err(e) = &outcome {
            error!(error = %e, "Broadcaster stopped");
        }

        while let Some(exited) = receivers.join_next().await {
            reap(exited);
        }

        info!("Server stopped");
        outcome
    }
}

/// Bind, install the Ctrl-C handler and serve until shutdown.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let server = Server::bind(config).await?;
    signal::spawn_shutdown_handler(server.broker());
    server.run().await
}

fn reap(exited: Result<ReceiverExit, tokio::task::JoinError>) {
    match exited {
        Ok(exit) => debug!(exit = ?exit, "Receiver finished"),
        Err(e) => error!(error = %e, "Receiver task failed"),
    }
}

async fn accept_connection(
    broker: &SharedBroker,
    receivers: &mut JoinSet<ReceiverExit>,
    stream: TcpStream,
    peer: SocketAddr,
    max_clients: usize,
) {
    if broker.shutdown().is_triggered() {
        return;
    }

    let current_clients = broker.registry().len().await;
    if current_clients >= max_clients {
        warn!(
            %peer,
            max_clients,
            "Rejecting connection: connection limit reached"
        );
        // Just drop the stream; client will see the connection closed.
        return;
    }

    let (reader, writer) = stream.into_split();
    match broker.attach_to(receivers, peer, reader, writer).await {
        Ok(client_id) => {
            info!(client_id = client_id.0, %peer, "Accepted connection");
        }
        Err(e) => {
            // Only this connection is lost; keep serving the rest.
            error!(%peer, error = %e, "Failed to register connection");
        }
    }
}
