use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::header::LinkFrame;
use crate::wire::{is_reserved, WireMode, EOF, ESC, MAX_WIRE_LEN, OOB_HEADER_LEN, SOF, SOH};

/// Frame type byte written in the out-of-band header of outgoing frames.
const OOB_FRAME_TYPE: u8 = 1;

/// Append the byte-stuffed form of `logical` (no delimiters) to `dst`.
pub fn escape_into(logical: &[u8], dst: &mut BytesMut) {
    for &byte in logical {
        match byte {
            SOF => dst.put_slice(&[ESC, 0]),
            EOF => dst.put_slice(&[ESC, 1]),
            ESC => dst.put_slice(&[ESC, 2]),
            other => dst.put_u8(other),
        }
    }
}

/// Number of bytes `logical` occupies once stuffed (no delimiters).
pub fn escaped_len(logical: &[u8]) -> usize {
    logical.len() + logical.iter().filter(|&&b| is_reserved(b)).count()
}

/// Encode logical bytes (header, payload, CRC) into wire bytes.
///
/// Wire formats:
/// ```text
/// White           SOF │ stuffed │ EOF
/// WhiteHeader     SOH │ len │ slot │ SOF │ stuffed │ EOF
/// LengthPrefixed  len │ 0x01 │ slot │ logical
/// Plain           logical
/// ```
///
/// Nothing is written when the result would exceed [`MAX_WIRE_LEN`].
pub fn encode_logical(logical: &[u8], mode: WireMode, slot: u8, dst: &mut BytesMut) -> Result<()> {
    let size = match mode {
        WireMode::White => escaped_len(logical) + 2,
        WireMode::WhiteHeader => OOB_HEADER_LEN + escaped_len(logical) + 2,
        WireMode::LengthPrefixed => OOB_HEADER_LEN + logical.len(),
        WireMode::Plain => logical.len(),
    };
    if size > MAX_WIRE_LEN {
        return Err(FrameError::FrameTooLong {
            size,
            max: MAX_WIRE_LEN,
        });
    }

    dst.reserve(size);
    match mode {
        WireMode::White => {
            dst.put_u8(SOF);
            escape_into(logical, dst);
            dst.put_u8(EOF);
        }
        WireMode::WhiteHeader => {
            dst.put_slice(&[SOH, logical.len() as u8, slot, SOF]);
            escape_into(logical, dst);
            dst.put_u8(EOF);
        }
        WireMode::LengthPrefixed => {
            dst.put_slice(&[logical.len() as u8, OOB_FRAME_TYPE, slot]);
            dst.put_slice(logical);
        }
        WireMode::Plain => dst.put_slice(logical),
    }
    Ok(())
}

/// Encode a link frame (CRC appended) into wire bytes for `mode`.
pub fn encode_frame(frame: &LinkFrame, mode: WireMode, slot: u8, dst: &mut BytesMut) -> Result<()> {
    let logical = frame.to_logical();
    encode_logical(&logical, mode, slot, dst)
}

/// Reverse byte stuffing.
///
/// `wire` must start with SOF and contain EOF; anything after EOF (such as
/// a trailing RSSI byte) is ignored.
pub fn decode_escape(wire: &[u8]) -> Result<BytesMut> {
    let Some((&SOF, body)) = wire.split_first() else {
        return Err(FrameError::MissingDelimiter);
    };

    let mut out = BytesMut::with_capacity(body.len());
    let mut bytes = body.iter();
    while let Some(&byte) = bytes.next() {
        match byte {
            EOF => return Ok(out),
            ESC => match bytes.next() {
                Some(0) => out.put_u8(SOF),
                Some(1) => out.put_u8(EOF),
                Some(2) => out.put_u8(ESC),
                Some(&other) => return Err(FrameError::MalformedEscape(other)),
                None => return Err(FrameError::MissingDelimiter),
            },
            other => out.put_u8(other),
        }
    }
    Err(FrameError::MissingDelimiter)
}
