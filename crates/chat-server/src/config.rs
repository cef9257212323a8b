//! Configuration for the chat server.
//!
//! Values are layered, later sources winning:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file (`--config`),
//! 3. environment variables,
//! 4. command-line arguments (applied by `main`).
//!
//! Recognised environment variables:
//!
//! - `CHAT_BIND_ADDR`      (default: "0.0.0.0")
//! - `CHAT_PORT`           (default: "9000")
//! - `CHAT_MAX_CLIENTS`    (default: "10")
//! - `CHAT_QUEUE_CAPACITY` (default: "10")
//! - `CHAT_MAX_LINE_LEN`   (default: "255")
//! - `CHAT_LOG_FILE`       (default: "chat_server.log")

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chat_core::DEFAULT_QUEUE_CAPACITY;
use chat_protocol::DEFAULT_MAX_LINE_LEN;
use serde::Deserialize;

use crate::error::ConfigError;

/// Upper bound accepted for `max_line_len`.
pub const MAX_LINE_LEN_LIMIT: usize = 64 * 1024;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on. `0` asks the OS for a free port.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Slots in the message queue between receivers and the broadcaster.
    pub queue_capacity: usize,

    /// Longest line, in bytes, forwarded as a single chat message.
    pub max_line_len: usize,

    /// Transcript of every broadcast line.
    pub log_path: PathBuf,

    /// Greet each new connection with its client id.
    pub welcome: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9000,
            max_clients: 10,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            log_path: PathBuf::from("chat_server.log"),
            welcome: true,
        }
    }
}

/// On-disk shape of the TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    bind_addr: Option<String>,
    port: Option<u16>,
    max_clients: Option<usize>,
    queue_capacity: Option<usize>,
    max_line_len: Option<usize>,
    log_file: Option<PathBuf>,
    welcome: Option<bool>,
}

impl Config {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults overridden by the TOML file at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Config::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overridden by TOML `text`.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let file: FileConfig = toml::from_str(text)?;
        let mut config = Config::default();
        config.merge_file(file);
        Ok(config)
    }

    /// Apply `CHAT_*` environment variables on top of `self`.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| env::var(key).ok())
    }

    /// Same as [`Config::apply_env`], reading variables through `lookup`.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("CHAT_BIND_ADDR") {
            self.bind_addr = addr;
        }
        override_parsed(&lookup, "CHAT_PORT", &mut self.port)?;
        override_parsed(&lookup, "CHAT_MAX_CLIENTS", &mut self.max_clients)?;
        override_parsed(&lookup, "CHAT_QUEUE_CAPACITY", &mut self.queue_capacity)?;
        override_parsed(&lookup, "CHAT_MAX_LINE_LEN", &mut self.max_line_len)?;
        if let Some(path) = lookup("CHAT_LOG_FILE") {
            self.log_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Invalid("connection limit must be at least 1"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacity must be at least 1"));
        }
        if self.max_line_len == 0 {
            return Err(ConfigError::Invalid("max line length must be at least 1"));
        }
        if self.max_line_len > MAX_LINE_LEN_LIMIT {
            return Err(ConfigError::Invalid("max line length must be at most 65536"));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn merge_file(&mut self, file: FileConfig) {
        if let Some(v) = file.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = file.port {
            self.port = v;
        }
        if let Some(v) = file.max_clients {
            self.max_clients = v;
        }
        if let Some(v) = file.queue_capacity {
            self.queue_capacity = v;
        }
        if let Some(v) = file.max_line_len {
            self.max_line_len = v;
        }
        if let Some(v) = file.log_file {
            self.log_path = v;
        }
        if let Some(v) = file.welcome {
            self.welcome = v;
        }
    }
}

fn override_parsed<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        match value.trim().parse::<T>() {
            Ok(parsed) => *slot = parsed,
            Err(_) => return Err(ConfigError::Env { key, value }),
        }
    }
    Ok(())
}
