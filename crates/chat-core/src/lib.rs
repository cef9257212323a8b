//! chat-core
//!
//! Transport-agnostic building blocks of the chat broker:
//! - connection arena with stable handles
//! - bounded message queue with backpressure
//! - one-shot shutdown signal
//! - chat message types
//! - append-only transcript file

pub mod connection_list;
pub mod error;
pub mod message;
pub mod queue;
pub mod shutdown;
pub mod transcript;

pub use connection_list::{ConnectionList, Handle, Visit};
pub use error::CoreError;
pub use message::{Body, ChatMessage, ConnectionId};
pub use queue::{MessageQueue, DEFAULT_QUEUE_CAPACITY};
pub use shutdown::ShutdownSignal;
pub use transcript::Transcript;
