//! Error types shared by the gamepad core
//!
//! A disconnected peer or a missing transport is not an error: the dispatcher
//! skips the send and the next mutation tries again. Everything that does
//! reach the caller is collected here.

/// Errors surfaced by codec, state machines, configuration and the work queue
#[derive(Debug, thiserror::Error)]
pub enum GamepadError {
    /// An inbound or inspected report did not have the fixed wire size
    #[error("Malformed report: expected {expected} bytes, got {actual}")]
    MalformedReport { expected: usize, actual: usize },

    /// A raw button or d-pad value outside the defined set
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// The deferred work queue has been torn down
    #[error("Deferred queue closed")]
    QueueClosed,

    /// The deferred work queue has no free slot
    #[error("Deferred queue full")]
    QueueFull,
}
