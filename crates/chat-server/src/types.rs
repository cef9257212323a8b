//! Shared types for the chat TCP server.
//!
//! This module defines:
//! - `TcpBroker`: the broker as used over real sockets
//! - `SharedBroker`: the handle every task gets at spawn time

use std::sync::Arc;

use tokio::net::tcp::OwnedWriteHalf;

use crate::broker::Broker;

pub use chat_core::ConnectionId;

/// Broker whose registered connections are TCP write halves.
pub type TcpBroker = Broker<OwnedWriteHalf>;

/// Broker context handed to the acceptor, receivers and broadcaster.
pub type SharedBroker = Arc<TcpBroker>;
