use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum::{crc16, CRC_LEN};
use crate::error::{FrameError, Result};
use crate::wire::MAX_PAYLOAD;

/// Logical header: len (1) + dest (1) + src (1) + index (1) + type (1) + timestamp (4 LE).
pub const HEADER_SIZE: usize = 9;

/// Frame type carried in the logical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    LowLatency,
    FileXfer,
    SetRadioChannel,
    SetRadioRate,
    Unknown(u8),
}

impl From<u8> for FrameType {
    fn from(value: u8) -> Self {
        match value {
            0 => FrameType::LowLatency,
            1 => FrameType::FileXfer,
            2 => FrameType::SetRadioChannel,
            3 => FrameType::SetRadioRate,
            other => FrameType::Unknown(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(value: FrameType) -> Self {
        match value {
            FrameType::LowLatency => 0,
            FrameType::FileXfer => 1,
            FrameType::SetRadioChannel => 2,
            FrameType::SetRadioRate => 3,
            FrameType::Unknown(other) => other,
        }
    }
}

/// Decoded logical header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Header plus payload length (the checksum is not counted).
    pub len: u8,
    pub dest: u8,
    pub src: u8,
    /// Rotating 8-bit sequence index.
    pub index: u8,
    pub kind: FrameType,
    /// Sender's monotonic clock, microseconds within the current second.
    pub timestamp: u32,
}

impl FrameHeader {
    /// Append the packed header to `dst`.
    pub fn put(&self, dst: &mut BytesMut) {
        dst.put_u8(self.len);
        dst.put_u8(self.dest);
        dst.put_u8(self.src);
        dst.put_u8(self.index);
        dst.put_u8(self.kind.into());
        dst.put_u32_le(self.timestamp);
    }

    /// Parse a packed header from the front of `src`.
    ///
    /// Returns `None` if fewer than [`HEADER_SIZE`] bytes are present.
    pub fn parse(mut src: &[u8]) -> Option<Self> {
        if src.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            len: src.get_u8(),
            dest: src.get_u8(),
            src: src.get_u8(),
            index: src.get_u8(),
            kind: FrameType::from(src.get_u8()),
            timestamp: src.get_u32_le(),
        })
    }
}

/// A logical link frame: header and payload, before checksum and framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFrame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl LinkFrame {
    /// Build a frame, deriving the header length from the payload.
    pub fn new(
        dest: u8,
        src: u8,
        index: u8,
        kind: FrameType,
        timestamp: u32,
        payload: impl Into<Bytes>,
    ) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self {
            header: FrameHeader {
                len: (HEADER_SIZE + payload.len()) as u8,
                dest,
                src,
                index,
                kind,
                timestamp,
            },
            payload,
        })
    }

    /// Size of the logical frame including the checksum trailer.
    pub fn logical_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CRC_LEN
    }

    /// Append header, payload and little-endian CRC-16 to `dst`.
    pub fn put_logical(&self, dst: &mut BytesMut) {
        let start = dst.len();
        dst.reserve(self.logical_len());
        self.header.put(dst);
        dst.put_slice(&self.payload);
        let crc = crc16(&dst[start..]);
        dst.put_u16_le(crc);
    }

    pub fn to_logical(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(self.logical_len());
        self.put_logical(&mut out);
        out
    }

    /// Validate and parse a logical frame (header, payload, CRC trailer).
    pub fn from_logical(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE + CRC_LEN {
            return Err(FrameError::TooShort(bytes.len()));
        }

        let (body, trailer) = bytes.split_at(bytes.len() - CRC_LEN);
        let received = u16::from_le_bytes([trailer[0], trailer[1]]);
        let computed = crc16(body);
        if received != computed {
            return Err(FrameError::CrcMismatch {
                expected: computed,
                actual: received,
            });
        }

        let header = FrameHeader::parse(body).ok_or(FrameError::TooShort(bytes.len()))?;
        if header.len as usize != body.len() {
            return Err(FrameError::LengthMismatch {
                declared: header.len as usize,
                actual: body.len(),
            });
        }

        Ok(Self {
            header,
            payload: Bytes::copy_from_slice(&body[HEADER_SIZE..]),
        })
    }
}
