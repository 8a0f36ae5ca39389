//! Radio link framing.
//!
//! Every data frame carries a 9-byte logical header and a CRC-16/XMODEM
//! trailer, then goes on the wire in one of four modes:
//! - WHITE: byte-stuffed between SOF and EOF, RSSI byte appended on receive
//! - WHITE-HEADER: the same with a 3-byte out-of-band header in front
//! - LENGTH-PREFIXED: 3-byte header, logical bytes unescaped
//! - PLAIN: raw passthrough
//!
//! [`StreamReassembler`] turns arbitrarily split serial reads back into
//! frames; [`FrameWriter`] also carries the radio's vendor commands.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod header;
pub mod reader;
pub mod reassembler;
pub mod vendor;
pub mod wire;
pub mod writer;

pub use checksum::{crc16, CRC_LEN};
pub use codec::{decode_escape, encode_frame, encode_logical, escape_into};
pub use error::{FrameError, Result};
pub use header::{FrameHeader, FrameType, LinkFrame, HEADER_SIZE};
pub use reader::FrameReader;
pub use reassembler::{
    parse_stuffed, FrameCursor, ParseResult, Reassembled, ReassemblerConfig, StreamReassembler,
};
pub use vendor::VendorCommand;
pub use wire::{WireMode, BROADCAST, EOF, ESC, MAX_PAYLOAD, MAX_WIRE_LEN, SOF, SOH, VENDOR_PREFIX};
pub use writer::FrameWriter;
