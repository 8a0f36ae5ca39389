//! Frame check sequence.
//!
//! CRC-16/XMODEM: polynomial 0x1021, initial value 0, MSB first, no final
//! XOR. Computed over the unstuffed header and payload, sent little-endian.

use crc::{Crc, CRC_16_XMODEM};

/// Length of the checksum trailer.
pub const CRC_LEN: usize = 2;

const LINK_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Checksum of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    LINK_CRC.checksum(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitwise(bytes: &[u8]) -> u16 {
        let mut crc: u16 = 0;
        for &b in bytes {
            crc ^= (b as u16) << 8;
            for _ in 0..8 {
                crc = if crc & 0x8000 != 0 {
                    (crc << 1) ^ 0x1021
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn check_value() {
        assert_eq!(crc16(b"123456789"), 0x31C3);
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn matches_shift_register() {
        let frame = [0x16, 0x0A, 0x0B, 0x2A, 0x00, 0x10, 0x27, 0x00, 0x00, 0x55, 0xF0, 0xF1];
        assert_eq!(crc16(&frame), bitwise(&frame));
    }
}
