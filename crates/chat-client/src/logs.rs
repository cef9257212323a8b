// crates/chat-client/src/logs.rs

//! Client-side transcripts.
//!
//! - global log: every line received from the server, verbatim.
//! - personal log: the text of this user's own messages, as echoed back
//!   by the server. Echoes are recognised by the sender id the server
//!   announced in its welcome line.

use std::io;
use std::path::Path;

use chat_core::{Body, ConnectionId, Transcript};
use chat_protocol::{parse_server_line, ServerLine};

pub struct ClientLogs {
    global: Transcript,
    personal: Transcript,
    me: Option<ConnectionId>,
}

impl ClientLogs {
    pub async fn open(global: &Path, personal: &Path) -> io::Result<Self> {
        Ok(ClientLogs {
            global: Transcript::open(global).await?,
            personal: Transcript::open(personal).await?,
            me: None,
        })
    }

    /// Our id, once the welcome line has been seen.
    pub fn me(&self) -> Option<ConnectionId> {
        self.me
    }

    /// Record one received line.
    pub async fn record(&mut self, line: &str) -> io::Result<()> {
        self.global.append_line(line).await?;

        match parse_server_line(line) {
            Some(ServerLine::Welcome(id)) => self.me = Some(id),
            Some(ServerLine::Message(msg)) if Some(msg.sender) == self.me => {
                if let Body::Text(text) = msg.body {
                    self.personal.append_line(&text).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}
