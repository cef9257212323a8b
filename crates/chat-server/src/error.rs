//! Error types for the chat server.
//!
//! Per-connection I/O failures never show up here: a broken socket only
//! ends that connection's receiver, or gets the connection pruned by
//! the broadcaster. What remains is either a startup failure or a
//! failure that stops the whole server.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open transcript {}", .path.display())]
    TranscriptOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Broadcasting without logging would break the transcript, so this
    /// one stops the server.
    #[error("failed to append to transcript {}", .path.display())]
    TranscriptWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("broadcaster task failed")]
    Broadcaster(#[from] JoinError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("environment variable {key} has invalid value {value:?}")]
    Env { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
