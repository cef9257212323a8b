//! Message types flowing through the broker.
//!
//! These are **transport-agnostic**: the sender is a structured field,
//! never text embedded in the payload. Turning a [`ChatMessage`] into a
//! wire line is the job of the `chat-protocol` crate.

use std::fmt;

/// Identifier for a connected client.
///
/// Unique over the lifetime of the server process and shown to users
/// as `#<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// The sender just connected.
    Joined,

    /// The sender disconnected.
    Left,

    /// One line of chat text, without its line terminator.
    Text(String),
}

/// A single entry in the chat transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: ConnectionId,
    pub body: Body,
}

impl ChatMessage {
    pub fn joined(sender: ConnectionId) -> Self {
        ChatMessage {
            sender,
            body: Body::Joined,
        }
    }

    pub fn left(sender: ConnectionId) -> Self {
        ChatMessage {
            sender,
            body: Body::Left,
        }
    }

    pub fn text(sender: ConnectionId, text: impl Into<String>) -> Self {
        ChatMessage {
            sender,
            body: Body::Text(text.into()),
        }
    }
}
