//! Commands handed from the control path to the transmit loop.
//!
//! Constructors validate parameters so an out-of-range value never reaches
//! the mailbox, let alone the wire.

use std::fmt;
use std::str::FromStr;

use linkprobe_frame::{WireMode, MAX_PAYLOAD};

use crate::error::CommandError;

/// Valid transmit interval, milliseconds.
pub const INTERVAL_RANGE_MS: (u32, u32) = (1, 100);

/// Lowest and highest ZigBee channel the radio can tune to.
pub const CHANNEL_RANGE: (u32, u32) = (11, 26);

/// Number of radio regions.
pub const REGION_COUNT: u32 = 20;

/// Highest valid TDMA slot number.
pub const MAX_SLOT: u32 = 31;

/// Highest slot number the slot mask and bandwidth commands address.
pub const MAX_MASK_SLOT: u32 = 4;

/// Largest plain-text payload accepted by `send plain`.
pub const MAX_TEXT_LEN: usize = 256;

/// Radio modulation / data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rate {
    Oqpsk250K,
    Gfsk1M,
    Gfsk2M,
}

impl Rate {
    /// Code the firmware uses for this rate.
    pub fn code(self) -> u8 {
        match self {
            Rate::Oqpsk250K => 1,
            Rate::Gfsk1M => 2,
            Rate::Gfsk2M => 3,
        }
    }
}

impl FromStr for Rate {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "250K" => Ok(Rate::Oqpsk250K),
            "1M" => Ok(Rate::Gfsk1M),
            "2M" => Ok(Rate::Gfsk2M),
            _ => Err(CommandError::Invalid {
                name: "rate",
                value: s.to_string(),
                expected: "250K, 1M or 2M",
            }),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rate::Oqpsk250K => "250K",
            Rate::Gfsk1M => "1M",
            Rate::Gfsk2M => "2M",
        })
    }
}

/// Destination and slot of generated data frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub dest: u8,
    pub slot: u8,
}

/// A pending instruction for the transmit loop.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Nop,
    StartPeriodic(Target),
    StopPeriodic,
    SendOnce(Target),
    SendPlain(Vec<u8>),
    SetInterval(u32),
    SetLength(usize),
    /// ZigBee channel number (11..=26).
    SetChannel(u8),
    SetMaster(bool),
    SetRate(Rate),
    SetRegion(u8),
    SetHopParams {
        low: u16,
        high: u16,
        slots: u8,
    },
    SetHopStretch(u16),
    SetBaud(u32),
    SetSlotMask(u8),
    SetBandwidth {
        slot: u8,
        rate: Rate,
    },
    SetProtocol(WireMode),
    GetStats,
    GetRedStats,
}

fn check_range(name: &'static str, value: i64, min: u32, max: u32) -> Result<(), CommandError> {
    if value < i64::from(min) || value > i64::from(max) {
        return Err(CommandError::OutOfRange {
            name,
            value,
            min: i64::from(min),
            max: i64::from(max),
        });
    }
    Ok(())
}

impl Command {
    pub fn start_periodic(dest: i64, slot: i64) -> Result<Self, CommandError> {
        Ok(Command::StartPeriodic(target(dest, slot)?))
    }

    pub fn send_once(dest: i64, slot: i64) -> Result<Self, CommandError> {
        Ok(Command::SendOnce(target(dest, slot)?))
    }

    pub fn send_plain(text: impl Into<Vec<u8>>) -> Result<Self, CommandError> {
        let text = text.into();
        if text.len() > MAX_TEXT_LEN {
            return Err(CommandError::TextTooLong {
                len: text.len(),
                max: MAX_TEXT_LEN,
            });
        }
        Ok(Command::SendPlain(text))
    }

    /// Transmit cadence in milliseconds (1..=100).
    pub fn interval(ms: i64) -> Result<Self, CommandError> {
        check_range("interval", ms, INTERVAL_RANGE_MS.0, INTERVAL_RANGE_MS.1)?;
        Ok(Command::SetInterval(ms as u32))
    }

    /// Payload bytes per periodic frame (1..=120).
    pub fn length(bytes: i64) -> Result<Self, CommandError> {
        check_range("length", bytes, 1, MAX_PAYLOAD as u32)?;
        Ok(Command::SetLength(bytes as usize))
    }

    pub fn channel(zigbee_channel: i64) -> Result<Self, CommandError> {
        check_range("channel", zigbee_channel, CHANNEL_RANGE.0, CHANNEL_RANGE.1)?;
        Ok(Command::SetChannel(zigbee_channel as u8))
    }

    pub fn master(value: &str) -> Result<Self, CommandError> {
        match value.to_ascii_lowercase().as_str() {
            "on" => Ok(Command::SetMaster(true)),
            "off" => Ok(Command::SetMaster(false)),
            _ => Err(CommandError::Invalid {
                name: "master",
                value: value.to_string(),
                expected: "on or off",
            }),
        }
    }

    pub fn rate(value: &str) -> Result<Self, CommandError> {
        Ok(Command::SetRate(value.parse()?))
    }

    pub fn region(region: i64) -> Result<Self, CommandError> {
        check_range("region", region, 0, REGION_COUNT - 1)?;
        Ok(Command::SetRegion(region as u8))
    }

    pub fn hop_params(low: i64, high: i64, slots: i64) -> Result<Self, CommandError> {
        check_range("hop low", low, 0, u32::from(u16::MAX))?;
        check_range("hop high", high, 0, u32::from(u16::MAX))?;
        check_range("hop slots", slots, 0, u32::from(u8::MAX))?;
        Ok(Command::SetHopParams {
            low: low as u16,
            high: high as u16,
            slots: slots as u8,
        })
    }

    pub fn hop_stretch(us: i64) -> Result<Self, CommandError> {
        check_range("hop stretch", us, 0, u32::from(u16::MAX))?;
        Ok(Command::SetHopStretch(us as u16))
    }

    pub fn baud(baud: i64) -> Result<Self, CommandError> {
        check_range("baud", baud, 1, u32::MAX)?;
        Ok(Command::SetBaud(baud as u32))
    }

    /// Enable the listed slots (each 0..=4).
    pub fn slot_mask(slots: &[i64]) -> Result<Self, CommandError> {
        let mut mask = 0u8;
        for &slot in slots {
            check_range("slot", slot, 0, MAX_MASK_SLOT)?;
            mask |= 1 << slot;
        }
        Ok(Command::SetSlotMask(mask))
    }

    pub fn bandwidth(slot: i64, rate: &str) -> Result<Self, CommandError> {
        check_range("slot", slot, 0, MAX_MASK_SLOT)?;
        Ok(Command::SetBandwidth {
            slot: slot as u8,
            rate: rate.parse()?,
        })
    }

    /// Wire protocol id: 0 white, 1 white+, 2 red+, 3 plain.
    pub fn protocol(id: i64) -> Result<Self, CommandError> {
        check_range("protocol", id, 0, 3)?;
        Ok(Command::SetProtocol(WireMode::from_id(id as u8)))
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, Command::Nop)
    }
}

fn target(dest: i64, slot: i64) -> Result<Target, CommandError> {
    check_range("destination", dest, 0, u32::from(u8::MAX))?;
    check_range("slot", slot, 0, MAX_SLOT)?;
    Ok(Target {
        dest: dest as u8,
        slot: slot as u8,
    })
}
