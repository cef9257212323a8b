//! chat-protocol
//!
//! Wire-level handling for the chatroom.
//!
//! Turns logical [`chat_core::ChatMessage`]s into text lines and back,
//! and frames a raw TCP byte stream into lines.
//!
//! - [`framing`]    : byte stream → lines, with a line length cap
//! - [`line_codec`] : server line format (welcome, notices, chat)

pub mod framing;
pub mod line_codec;

pub use framing::{LineDecoder, DEFAULT_MAX_LINE_LEN};
pub use line_codec::{
    encode_line,
    format_message,
    format_welcome,
    parse_server_line,
    ServerLine,
};
