/// Errors that can occur in link operations.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] linkprobe_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] linkprobe_frame::FrameError),

    /// A command parameter was rejected before reaching the wire.
    #[error("invalid command: {0}")]
    Command(#[from] CommandError),
}

/// A command parameter outside the range the radio accepts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("{name} must be between {min} and {max}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("invalid {name} {value:?} (expected {expected})")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("text too long ({len} bytes, max {max})")]
    TextTooLong { len: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, LinkError>;
