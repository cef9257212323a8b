// crates/chat-protocol/src/line_codec.rs

//! Text wire format.
//!
//! Every server → client line is one of:
//!
//! - Welcome (unicast, never logged):
//!   `Connected. You are client #<id>.`
//!
//! - Join notice:
//!   `* client #<id> joined`
//!
//! - Departure notice:
//!   `* client #<id> left`
//!
//! - Chat line:
//!   `[#<id>] <text>`
//!
//! Lines are `\n` terminated on the wire; the functions here deal in
//! lines without the terminator, except [`encode_line`].
//!
//! Client → server traffic has no structure at all: each line the user
//! types becomes the `<text>` of a chat line.

use bytes::{BufMut, BytesMut};

use chat_core::{Body, ChatMessage, ConnectionId};

const WELCOME_PREFIX: &str = "Connected. You are client #";
const NOTICE_PREFIX: &str = "* client #";

/// A parsed server → client line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerLine {
    /// The id the server assigned to *this* connection.
    Welcome(ConnectionId),

    /// A broadcast message.
    Message(ChatMessage),
}

/// Format a broadcast message as a single line (no terminator).
pub fn format_message(msg: &ChatMessage) -> String {
    let id = msg.sender.0;
    match &msg.body {
        Body::Joined => format!("{NOTICE_PREFIX}{id} joined"),
        Body::Left => format!("{NOTICE_PREFIX}{id} left"),
        Body::Text(text) => format!("[#{id}] {text}"),
    }
}

/// Format the welcome line sent to a freshly accepted connection.
pub fn format_welcome(id: ConnectionId) -> String {
    format!("{WELCOME_PREFIX}{}.", id.0)
}

/// Append `line` plus `\n` to `buf`.
pub fn encode_line(line: &str, buf: &mut BytesMut) {
    buf.reserve(line.len() + 1);
    buf.put_slice(line.as_bytes());
    buf.put_u8(b'\n');
}

/// Parse one server line (without its terminator; a trailing `\r` or
/// `\n` is tolerated).
///
/// Returns `None` for anything that does not match the format above.
pub fn parse_server_line(line: &str) -> Option<ServerLine> {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.strip_prefix(WELCOME_PREFIX) {
        let id = rest.strip_suffix('.')?;
        return Some(ServerLine::Welcome(parse_id(id)?));
    }

    if let Some(rest) = line.strip_prefix(NOTICE_PREFIX) {
        let (id, what) = rest.split_once(' ')?;
        let sender = parse_id(id)?;
        let body = match what {
            "joined" => Body::Joined,
            "left" => Body::Left,
            _ => return None,
        };
        return Some(ServerLine::Message(ChatMessage { sender, body }));
    }

    let rest = line.strip_prefix("[#")?;
    let (id, text) = rest.split_once("] ")?;
    Some(ServerLine::Message(ChatMessage::text(parse_id(id)?, text)))
}

fn parse_id(s: &str) -> Option<ConnectionId> {
    // Reject signs and whitespace that `u64::from_str` would accept or trim.
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok().map(ConnectionId)
}
