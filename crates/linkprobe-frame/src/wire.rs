//! Wire-level constants and the framing mode selector.
//!
//! Byte-stuffed frames reserve four marker values; a payload byte equal to
//! SOF, EOF or ESC is sent as ESC followed by 0, 1 or 2.

/// Start of frame.
pub const SOF: u8 = 0xF0;

/// End of frame.
pub const EOF: u8 = 0xF1;

/// Escape marker.
pub const ESC: u8 = 0xF2;

/// Start of the 3-byte out-of-band header (WHITE-HEADER mode).
pub const SOH: u8 = 0xF3;

/// First byte of every vendor configuration command, and of device
/// acknowledgements in length-prefixed mode.
pub const VENDOR_PREFIX: u8 = 0xCC;

/// Largest frame the radio accepts on the wire.
pub const MAX_WIRE_LEN: usize = 240;

/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD: usize = 120;

/// Length of the out-of-band header in WHITE-HEADER and LENGTH-PREFIXED modes.
pub const OOB_HEADER_LEN: usize = 3;

/// Destination address every node accepts.
pub const BROADCAST: u8 = 255;

/// Framing used on the serial link. The discriminants are the protocol ids
/// the radio firmware uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireMode {
    /// `SOF | stuffed | EOF | rssi`
    White = 0,
    /// `SOH | len | slot | SOF | stuffed | EOF`
    WhiteHeader = 1,
    /// `len | type | rssi | body`
    LengthPrefixed = 2,
    /// Unframed passthrough.
    Plain = 3,
}

impl WireMode {
    /// Decode a protocol id; only the two low bits are significant.
    pub fn from_id(id: u8) -> Self {
        match id & 0x03 {
            0 => WireMode::White,
            1 => WireMode::WhiteHeader,
            2 => WireMode::LengthPrefixed,
            _ => WireMode::Plain,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Whether frames are byte-stuffed between SOF and EOF.
    pub fn is_stuffed(self) -> bool {
        matches!(self, WireMode::White | WireMode::WhiteHeader)
    }

    /// Returns a human-readable name for the mode.
    pub fn name(self) -> &'static str {
        match self {
            WireMode::White => "white",
            WireMode::WhiteHeader => "white+",
            WireMode::LengthPrefixed => "red+",
            WireMode::Plain => "plain",
        }
    }
}

/// Returns true if `byte` must be escaped inside a stuffed frame.
pub fn is_reserved(byte: u8) -> bool {
    matches!(byte, SOF | EOF | ESC)
}

/// Convert a trailing RSSI byte (positive magnitude) to dBm.
pub fn rssi_from_magnitude(byte: u8) -> i8 {
    (byte as i8).wrapping_neg()
}
