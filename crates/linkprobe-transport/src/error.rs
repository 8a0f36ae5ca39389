/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: serialport::Error,
    },

    /// The serial driver rejected a configuration change.
    #[error("serial configuration failed: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No attached device matched the requested identifier.
    #[error("no serial bridge matches {identifier:?}")]
    NotFound { identifier: String },
}

pub type Result<T> = std::result::Result<T, TransportError>;
