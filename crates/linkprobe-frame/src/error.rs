/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An escape marker was followed by something other than 0, 1 or 2.
    #[error("malformed escape sequence (0xF2 followed by {0:#04x})")]
    MalformedEscape(u8),

    /// The frame does not start with SOF or never reaches EOF.
    #[error("missing frame delimiter")]
    MissingDelimiter,

    /// The encoded frame would not fit the radio's wire buffer.
    #[error("frame too long ({size} bytes on the wire, max {max})")]
    FrameTooLong { size: usize, max: usize },

    /// The payload exceeds what a single frame may carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The decoded frame is shorter than header plus checksum.
    #[error("frame too short ({0} bytes)")]
    TooShort(usize),

    /// The header length field disagrees with the received byte count.
    #[error("length mismatch (header says {declared}, received {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The CRC-16 trailer does not match the frame contents.
    #[error("crc mismatch (expected {expected:#06x}, got {actual:#06x})")]
    CrcMismatch { expected: u16, actual: u16 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport refused a control operation.
    #[error("transport error: {0}")]
    Transport(#[from] linkprobe_transport::TransportError),

    /// The device stopped delivering bytes.
    #[error("connection closed")]
    ConnectionClosed,
}

impl FrameError {
    /// Whether this error describes a damaged frame rather than a failing link.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            FrameError::MalformedEscape(_)
                | FrameError::MissingDelimiter
                | FrameError::TooShort(_)
                | FrameError::LengthMismatch { .. }
                | FrameError::CrcMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
