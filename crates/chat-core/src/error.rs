//! Error types for the broker core.
//!
//! Most core operations are infallible. The queue waits instead of
//! failing, and stale registry handles are reported as `None`. The one
//! real failure is running out of memory while growing the connection
//! arena.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The connection arena could not grow.
    #[error("out of memory while registering a connection")]
    OutOfMemory,
}
