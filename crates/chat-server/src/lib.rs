//! chat-server
//!
//! Multi-client TCP chatroom server.
//!
//! Receivers push into a bounded queue, a single broadcaster drains it,
//! appends each line to the transcript and fans it out to every
//! registered connection.

pub mod broadcaster;
pub mod broker;
pub mod config;
pub mod error;
pub mod receiver;
pub mod registry;
pub mod server;
pub mod types;

// internal, not re-exported
mod signal;

pub use broker::Broker;
pub use config::Config;
pub use error::{ConfigError, ServerError};
pub use receiver::ReceiverExit;
pub use registry::{Connection, FanOut, Registry};
pub use server::{Incoming, Server};
