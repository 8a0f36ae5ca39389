//! Radio configuration commands.
//!
//! Every command starts with [`VENDOR_PREFIX`] followed by an opcode and
//! little-endian arguments. They are written while the control line is in
//! command position (see [`FrameWriter::send_command`](crate::FrameWriter::send_command)).

use bytes::{BufMut, BytesMut};

use crate::wire::VENDOR_PREFIX;

/// A single vendor command as it goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorCommand {
    /// Channel index, already offset from the ZigBee channel number.
    SetChannel(u8),
    /// 0 = master on, 1 = master off.
    SetMaster(u8),
    /// 1 = 250 kbit/s, 2 = 1 Mbit/s, 3 = 2 Mbit/s.
    SetRate(u8),
    /// Dwell bounds of the hopping sequence.
    SetHopParams { low: u16, high: u16 },
    SetHopSlots(u8),
    SetHopStretch(u16),
    /// Radio-side UART baud rate.
    SetBaud(u32),
    SetSlotMask(u8),
    /// Bandwidth code in the low nibble, slot in bits 4..=6.
    SetBandwidth { slot: u8, bandwidth: u8 },
    SetRegion(u8),
    SetProtocol(u8),
    GetTrafficStats,
    GetRedTrafficStats,
}

impl VendorCommand {
    /// Opcode byte following the prefix.
    pub fn opcode(&self) -> u8 {
        match self {
            VendorCommand::SetChannel(_) => 0x02,
            VendorCommand::SetMaster(_) => 0x03,
            VendorCommand::SetBaud(_) => 0x50,
            VendorCommand::SetRegion(_) => 0x60,
            VendorCommand::SetRate(_) => 0x66,
            VendorCommand::SetHopParams { .. } => 0x67,
            VendorCommand::SetHopSlots(_) => 0x68,
            VendorCommand::SetHopStretch(_) => 0x69,
            VendorCommand::GetTrafficStats => 0x6A,
            VendorCommand::GetRedTrafficStats => 0x6B,
            VendorCommand::SetProtocol(_) => 0x80,
            VendorCommand::SetSlotMask(_) => 0x81,
            VendorCommand::SetBandwidth { .. } => 0x82,
        }
    }

    /// Append the encoded command to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(VENDOR_PREFIX);
        dst.put_u8(self.opcode());
        match *self {
            VendorCommand::SetChannel(v)
            | VendorCommand::SetMaster(v)
            | VendorCommand::SetRate(v)
            | VendorCommand::SetHopSlots(v)
            | VendorCommand::SetSlotMask(v)
            | VendorCommand::SetRegion(v) => dst.put_u8(v),
            VendorCommand::SetProtocol(v) => dst.put_u8(v & 0x03),
            VendorCommand::SetHopParams { low, high } => {
                dst.put_u16_le(low);
                dst.put_u16_le(high);
            }
            VendorCommand::SetHopStretch(v) => dst.put_u16_le(v),
            VendorCommand::SetBaud(v) => dst.put_u32_le(v),
            VendorCommand::SetBandwidth { slot, bandwidth } => {
                dst.put_u8(bandwidth.wrapping_add((slot << 4) & 0x70));
            }
            VendorCommand::GetTrafficStats | VendorCommand::GetRedTrafficStats => {}
        }
    }

    pub fn to_bytes(&self) -> BytesMut {
        let mut out = BytesMut::with_capacity(6);
        self.encode(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_commands() {
        assert_eq!(VendorCommand::SetChannel(4).to_bytes().as_ref(), &[0xCC, 0x02, 4]);
        assert_eq!(VendorCommand::SetMaster(1).to_bytes().as_ref(), &[0xCC, 0x03, 1]);
        assert_eq!(VendorCommand::SetRate(3).to_bytes().as_ref(), &[0xCC, 0x66, 3]);
        assert_eq!(VendorCommand::SetRegion(19).to_bytes().as_ref(), &[0xCC, 0x60, 19]);
        assert_eq!(VendorCommand::SetSlotMask(0x1F).to_bytes().as_ref(), &[0xCC, 0x81, 0x1F]);
    }

    #[test]
    fn multi_byte_arguments_are_little_endian() {
        assert_eq!(
            VendorCommand::SetHopParams {
                low: 0x0102,
                high: 0x0304
            }
            .to_bytes()
            .as_ref(),
            &[0xCC, 0x67, 0x02, 0x01, 0x04, 0x03]
        );
        assert_eq!(
            VendorCommand::SetHopStretch(1500).to_bytes().as_ref(),
            &[0xCC, 0x69, 0xDC, 0x05]
        );
        assert_eq!(
            VendorCommand::SetBaud(115_200).to_bytes().as_ref(),
            &[0xCC, 0x50, 0x00, 0xC2, 0x01, 0x00]
        );
    }

    #[test]
    fn bandwidth_packs_slot_into_high_nibble() {
        assert_eq!(
            VendorCommand::SetBandwidth {
                slot: 2,
                bandwidth: 3
            }
            .to_bytes()
            .as_ref(),
            &[0xCC, 0x82, 0x23]
        );
        assert_eq!(
            VendorCommand::SetBandwidth {
                slot: 0x0F,
                bandwidth: 1
            }
            .to_bytes()
            .as_ref(),
            &[0xCC, 0x82, 0x71]
        );
    }

    #[test]
    fn protocol_keeps_two_low_bits() {
        assert_eq!(VendorCommand::SetProtocol(6).to_bytes().as_ref(), &[0xCC, 0x80, 2]);
    }

    #[test]
    fn stats_requests_have_no_arguments() {
        assert_eq!(VendorCommand::GetTrafficStats.to_bytes().as_ref(), &[0xCC, 0x6A]);
        assert_eq!(VendorCommand::GetRedTrafficStats.to_bytes().as_ref(), &[0xCC, 0x6B]);
    }
}
