//! The transmit loop.
//!
//! Each tick takes the pending command from the [`Mailbox`], acts on it,
//! then sends one data frame if periodic sending is armed or a one-shot
//! frame is queued. Vendor command failures are logged and survived; a
//! failed data frame write ends the loop.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use linkprobe_frame::{FrameError, FrameType, FrameWriter, LinkFrame, VendorCommand};
use linkprobe_transport::Transport;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::command::{Command, Target};
use crate::error::Result;
use crate::mailbox::Mailbox;
use crate::settings::LinkSettings;

/// Default pause between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(20);

/// Default payload of a periodic frame; 22 bytes with the header.
pub const DEFAULT_PAYLOAD_LEN: usize = 13;

/// Byte periodic payloads are filled with.
pub const FILLER_BYTE: u8 = 0x55;

/// Pause between the two halves of a hop parameter update.
pub const HOP_COMMAND_GAP: Duration = Duration::from_millis(10);

/// Transmit loop configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Time slept after each tick. Default: 20 ms.
    pub interval: Duration,
    /// Payload bytes per periodic frame. Default: 13.
    pub payload_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            payload_len: DEFAULT_PAYLOAD_LEN,
        }
    }
}

/// What a tick put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub index: u8,
    pub wire_len: usize,
}

/// Owns the write side of the transport and runs the transmit loop.
pub struct Transmitter<T, C> {
    writer: FrameWriter<T>,
    mailbox: Arc<Mailbox>,
    settings: Arc<LinkSettings>,
    clock: C,
    config: LinkConfig,
    periodic: Option<Target>,
    one_shot: Option<Target>,
    index: u8,
}

impl<T: Transport, C: Clock> Transmitter<T, C> {
    pub fn new(
        transport: T,
        mailbox: Arc<Mailbox>,
        settings: Arc<LinkSettings>,
        clock: C,
        config: LinkConfig,
    ) -> Self {
        Self {
            writer: FrameWriter::new(transport),
            mailbox,
            settings,
            clock,
            config,
            periodic: None,
            one_shot: None,
            index: 0,
        }
    }

    /// Put the control line in data position before the first tick.
    pub fn prepare(&mut self) {
        if let Err(err) = self.writer.get_mut().set_control_line(true) {
            warn!(error = %err, "could not switch the command/data line");
        }
    }

    /// Run one iteration: drain the mailbox, act, maybe send a frame.
    pub fn tick(&mut self) -> Result<Option<Sent>> {
        let command = self.mailbox.take();
        if !command.is_nop() {
            debug!(?command, "command taken");
            self.apply(command);
        }

        let Some(target) = self.one_shot.take().or(self.periodic) else {
            return Ok(None);
        };
        self.send_data(target)
    }

    /// Tick and sleep forever; returns only when a data frame write fails.
    pub fn run(&mut self) -> Result<()> {
        self.prepare();
        loop {
            if let Err(err) = self.tick() {
                error!(error = %err, "transmit loop stopped");
                return Err(err);
            }
            thread::sleep(self.config.interval);
        }
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Whether periodic sending is armed.
    pub fn periodic_target(&self) -> Option<Target> {
        self.periodic
    }

    /// Sequence index of the last frame sent.
    pub fn last_index(&self) -> u8 {
        self.index
    }

    pub fn writer(&self) -> &FrameWriter<T> {
        &self.writer
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Nop => {}
            Command::StartPeriodic(target) => {
                info!(dest = target.dest, slot = target.slot, "periodic sending started");
                self.periodic = Some(target);
            }
            Command::StopPeriodic => {
                info!("periodic sending stopped");
                self.periodic = None;
            }
            Command::SendOnce(target) => self.one_shot = Some(target),
            Command::SendPlain(text) => {
                if let Err(err) = self.writer.send_raw(&text) {
                    warn!(error = %err, "plain text write failed");
                }
            }
            Command::SetInterval(ms) => {
                self.config.interval = Duration::from_millis(u64::from(ms));
            }
            Command::SetLength(len) => self.config.payload_len = len,
            Command::SetChannel(channel) => {
                self.vendor(VendorCommand::SetChannel(channel.saturating_sub(11)));
            }
            Command::SetMaster(on) => self.vendor(VendorCommand::SetMaster(u8::from(!on))),
            Command::SetRate(rate) => self.vendor(VendorCommand::SetRate(rate.code())),
            Command::SetRegion(region) => self.vendor(VendorCommand::SetRegion(region)),
            Command::SetHopParams { low, high, slots } => {
                self.vendor(VendorCommand::SetHopParams { low, high });
                thread::sleep(HOP_COMMAND_GAP);
                self.vendor(VendorCommand::SetHopSlots(slots));
            }
            Command::SetHopStretch(us) => self.vendor(VendorCommand::SetHopStretch(us)),
            Command::SetBaud(baud) => {
                self.vendor(VendorCommand::SetBaud(baud));
                match self.writer.set_baud(baud) {
                    Ok(()) => info!(baud, "local baud rate changed"),
                    Err(err) => warn!(baud, error = %err, "failed to change local baud rate"),
                }
            }
            Command::SetSlotMask(mask) => self.vendor(VendorCommand::SetSlotMask(mask)),
            Command::SetBandwidth { slot, rate } => self.vendor(VendorCommand::SetBandwidth {
                slot,
                bandwidth: rate.code(),
            }),
            Command::SetProtocol(mode) => {
                self.vendor(VendorCommand::SetProtocol(mode.id()));
                self.settings.set_wire_mode(mode);
                info!(mode = mode.name(), "wire mode changed");
            }
            Command::GetStats => self.vendor(VendorCommand::GetTrafficStats),
            Command::GetRedStats => self.vendor(VendorCommand::GetRedTrafficStats),
        }
    }

    fn vendor(&mut self, command: VendorCommand) {
        if let Err(err) = self.writer.send_command(&command) {
            warn!(?command, error = %err, "vendor command failed");
        }
    }

    fn send_data(&mut self, target: Target) -> Result<Option<Sent>> {
        self.index = self.index.wrapping_add(1);
        let frame = LinkFrame::new(
            target.dest,
            self.settings.own_address(),
            self.index,
            FrameType::LowLatency,
            self.clock.now_usec(),
            vec![FILLER_BYTE; self.config.payload_len],
        )?;

        match self
            .writer
            .send_frame(&frame, self.settings.wire_mode(), target.slot)
        {
            Ok(wire_len) => Ok(Some(Sent {
                index: self.index,
                wire_len,
            })),
            Err(err @ FrameError::FrameTooLong { .. }) => {
                warn!(error = %err, "frame not sent");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::ErrorKind;

    use linkprobe_frame::{decode_escape, WireMode, EOF, SOF, SOH};
    use linkprobe_transport::{MemoryTransport, TransportEvent};

    use super::*;
    use crate::clock::FixedClock;
    use crate::command::Rate;
    use crate::error::LinkError;

    struct Rig {
        transport: MemoryTransport,
        mailbox: Arc<Mailbox>,
        settings: Arc<LinkSettings>,
        clock: Arc<FixedClock>,
        tx: Transmitter<MemoryTransport, Arc<FixedClock>>,
    }

    fn rig() -> Rig {
        let transport = MemoryTransport::new();
        let mailbox = Arc::new(Mailbox::new());
        let settings = Arc::new(LinkSettings::new(10));
        let clock = Arc::new(FixedClock::new(250_000));
        let tx = Transmitter::new(
            transport.clone(),
            Arc::clone(&mailbox),
            Arc::clone(&settings),
            Arc::clone(&clock),
            LinkConfig::default(),
        );
        Rig {
            transport,
            mailbox,
            settings,
            clock,
            tx,
        }
    }

    fn vendor_writes(transport: &MemoryTransport) -> Vec<Vec<u8>> {
        transport
            .events()
            .into_iter()
            .filter_map(|event| match event {
                TransportEvent::Write(bytes) => Some(bytes),
                _ => None,
            })
            .collect()
    }

    fn sent_frame(transport: &MemoryTransport) -> LinkFrame {
        let logical = decode_escape(&transport.written()).unwrap();
        LinkFrame::from_logical(&logical).unwrap()
    }

    #[test]
    fn idle_tick_writes_nothing() {
        let mut r = rig();
        assert_eq!(r.tx.tick().unwrap(), None);
        assert!(r.transport.events().is_empty());
    }

    #[test]
    fn periodic_frame_contents() {
        let mut r = rig();
        r.mailbox
            .submit(Command::StartPeriodic(Target { dest: 20, slot: 0 }));

        let sent = r.tx.tick().unwrap().unwrap();
        assert_eq!(sent.index, 1);

        let frame = sent_frame(&r.transport);
        assert_eq!(frame.header.dest, 20);
        assert_eq!(frame.header.src, 10);
        assert_eq!(frame.header.index, 1);
        assert_eq!(frame.header.kind, FrameType::LowLatency);
        assert_eq!(frame.header.timestamp, 250_000);
        assert_eq!(frame.header.len, 22);
        assert_eq!(frame.payload.as_ref(), &[FILLER_BYTE; DEFAULT_PAYLOAD_LEN]);
    }

    #[test]
    fn periodic_sending_continues_until_stopped() {
        let mut r = rig();
        r.mailbox
            .submit(Command::StartPeriodic(Target { dest: 20, slot: 0 }));
        for expected in 1..=3u8 {
            assert_eq!(r.tx.tick().unwrap().unwrap().index, expected);
        }

        r.mailbox.submit(Command::StopPeriodic);
        assert_eq!(r.tx.tick().unwrap(), None);
        assert_eq!(r.tx.periodic_target(), None);
    }

    #[test]
    fn sequence_index_wraps() {
        let mut r = rig();
        r.mailbox
            .submit(Command::StartPeriodic(Target { dest: 20, slot: 0 }));
        for _ in 0..255 {
            r.tx.tick().unwrap();
        }
        assert_eq!(r.tx.last_index(), 255);
        assert_eq!(r.tx.tick().unwrap().unwrap().index, 0);
    }

    #[test]
    fn one_shot_sends_exactly_once() {
        let mut r = rig();
        r.mailbox.submit(Command::SendOnce(Target { dest: 7, slot: 2 }));

        assert!(r.tx.tick().unwrap().is_some());
        assert_eq!(r.tx.tick().unwrap(), None);
        assert_eq!(sent_frame(&r.transport).header.dest, 7);
    }

    #[test]
    fn length_and_interval_apply_to_later_frames() {
        let mut r = rig();
        r.mailbox.submit(Command::SetLength(40));
        r.tx.tick().unwrap();
        r.mailbox.submit(Command::SetInterval(5));
        r.tx.tick().unwrap();
        r.mailbox
            .submit(Command::StartPeriodic(Target { dest: 1, slot: 0 }));
        r.tx.tick().unwrap();

        assert_eq!(r.tx.config().interval, Duration::from_millis(5));
        assert_eq!(sent_frame(&r.transport).payload.len(), 40);
    }

    #[test]
    fn last_submitted_command_wins() {
        let mut r = rig();
        r.mailbox.submit(Command::SetRate(Rate::Gfsk1M));
        r.mailbox.submit(Command::SetRegion(5));
        r.tx.tick().unwrap();

        assert_eq!(vendor_writes(&r.transport), vec![vec![0xCC, 0x60, 5]]);
    }

    #[test]
    fn vendor_command_bytes() {
        let cases = [
            (Command::SetChannel(11), vec![vec![0xCC, 0x02, 0]]),
            (Command::SetChannel(26), vec![vec![0xCC, 0x02, 15]]),
            (Command::SetMaster(true), vec![vec![0xCC, 0x03, 0]]),
            (Command::SetMaster(false), vec![vec![0xCC, 0x03, 1]]),
            (Command::SetRate(Rate::Oqpsk250K), vec![vec![0xCC, 0x66, 1]]),
            (Command::SetHopStretch(600), vec![vec![0xCC, 0x69, 0x58, 0x02]]),
            (Command::SetSlotMask(0b101), vec![vec![0xCC, 0x81, 0b101]]),
            (
                Command::SetBandwidth {
                    slot: 4,
                    rate: Rate::Gfsk2M,
                },
                vec![vec![0xCC, 0x82, 0x43]],
            ),
            (Command::GetStats, vec![vec![0xCC, 0x6A]]),
            (Command::GetRedStats, vec![vec![0xCC, 0x6B]]),
            (
                Command::SetHopParams {
                    low: 1000,
                    high: 3000,
                    slots: 8,
                },
                vec![vec![0xCC, 0x67, 0xE8, 0x03, 0xB8, 0x0B], vec![0xCC, 0x68, 8]],
            ),
        ];

        for (command, expected) in cases {
            let mut r = rig();
            r.mailbox.submit(command.clone());
            r.tx.tick().unwrap();
            assert_eq!(vendor_writes(&r.transport), expected, "{command:?}");
        }
    }

    #[test]
    fn vendor_command_uses_command_line_position() {
        let mut r = rig();
        r.mailbox.submit(Command::GetStats);
        r.tx.tick().unwrap();
        assert_eq!(r.transport.control_line_changes(), vec![false, true]);
    }

    #[test]
    fn baud_change_is_sent_then_applied_locally() {
        let mut r = rig();
        r.mailbox.submit(Command::SetBaud(230_400));
        r.tx.tick().unwrap();

        let events = r.transport.events();
        assert_eq!(
            events[1],
            TransportEvent::Write(vec![0xCC, 0x50, 0x00, 0x84, 0x03, 0x00])
        );
        assert_eq!(events.last(), Some(&TransportEvent::Baud(230_400)));
    }

    #[test]
    fn protocol_change_switches_local_framing() {
        let mut r = rig();
        r.mailbox.submit(Command::SetProtocol(WireMode::WhiteHeader));
        r.tx.tick().unwrap();
        assert_eq!(r.settings.wire_mode(), WireMode::WhiteHeader);
        assert_eq!(vendor_writes(&r.transport), vec![vec![0xCC, 0x80, 1]]);

        r.transport.clear_events();
        r.mailbox
            .submit(Command::StartPeriodic(Target { dest: 3, slot: 6 }));
        r.tx.tick().unwrap();

        let wire = r.transport.written();
        assert_eq!(&wire[..4], &[SOH, 24, 6, SOF]);
        assert_eq!(*wire.last().unwrap(), EOF);
    }

    #[test]
    fn plain_text_bypasses_framing() {
        let mut r = rig();
        r.mailbox.submit(Command::SendPlain(b"AT\r\n".to_vec()));
        assert_eq!(r.tx.tick().unwrap(), None);
        assert_eq!(r.transport.written(), b"AT\r\n");
    }

    #[test]
    fn failed_vendor_command_is_survivable() {
        let mut r = rig();
        r.transport.fail_writes(ErrorKind::BrokenPipe);
        r.mailbox.submit(Command::GetStats);
        assert_eq!(r.tx.tick().unwrap(), None);
    }

    #[test]
    fn failed_data_write_is_fatal() {
        let mut r = rig();
        r.transport.fail_writes(ErrorKind::BrokenPipe);
        r.mailbox
            .submit(Command::StartPeriodic(Target { dest: 3, slot: 0 }));

        let err = r.tx.tick().unwrap_err();
        assert!(matches!(err, LinkError::Frame(FrameError::Io(_))));
        assert!(r.tx.run().is_err());
    }

    #[test]
    fn timestamp_follows_clock() {
        let mut r = rig();
        r.clock.set(999_999);
        r.mailbox.submit(Command::SendOnce(Target { dest: 3, slot: 0 }));
        r.tx.tick().unwrap();
        assert_eq!(sent_frame(&r.transport).header.timestamp, 999_999);
    }

    #[test]
    fn own_address_change_applies_to_next_frame() {
        let mut r = rig();
        r.settings.set_own_address(77);
        r.mailbox.submit(Command::SendOnce(Target { dest: 3, slot: 0 }));
        r.tx.tick().unwrap();
        assert_eq!(sent_frame(&r.transport).header.src, 77);
    }

    #[test]
    fn prepare_selects_data_position() {
        let mut r = rig();
        r.tx.prepare();
        assert_eq!(r.transport.control_line_changes(), vec![true]);
    }
}
