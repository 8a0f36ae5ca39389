//! The receive pipeline: read, reassemble, decode, account.

use std::io::Read;
use std::sync::Arc;

use bytes::Bytes;
use linkprobe_frame::{
    decode_escape, FrameError, FrameReader, LinkFrame, Reassembled, ReassemblerConfig,
};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::settings::LinkSettings;
use crate::telemetry::{Recorded, Telemetry};

/// Something the receive side observed, for display.
#[derive(Debug)]
pub enum ReceiveEvent {
    /// A frame passed every check and went through telemetry.
    Frame {
        frame: LinkFrame,
        rssi: i8,
        /// Bytes as they were delimited on the wire.
        raw: Bytes,
        recorded: Recorded,
    },
    /// Bad escape sequence or missing terminator.
    Malformed { raw: Bytes, error: FrameError },
    /// Checksum or header length check failed.
    Corrupt { raw: Bytes, error: FrameError },
    /// Device acknowledgement in length-prefixed mode.
    Acknowledgement(Bytes),
    /// Raw bytes received in plain mode.
    Plain(Bytes),
}

/// Owns the read side of the transport and the statistics table.
pub struct Receiver<T, C> {
    reader: FrameReader<T>,
    telemetry: Telemetry,
    settings: Arc<LinkSettings>,
    clock: C,
}

impl<T: Read, C: Clock> Receiver<T, C> {
    pub fn new(transport: T, settings: Arc<LinkSettings>, clock: C) -> Self {
        Self::with_config(transport, settings, clock, ReassemblerConfig::default())
    }

    pub fn with_config(
        transport: T,
        settings: Arc<LinkSettings>,
        clock: C,
        config: ReassemblerConfig,
    ) -> Self {
        Self {
            reader: FrameReader::with_config(transport, config),
            telemetry: Telemetry::new(Arc::clone(&settings)),
            settings,
            clock,
        }
    }

    /// Perform one read and process everything it completed.
    ///
    /// Any error is fatal to the read loop.
    pub fn poll_once(&mut self) -> Result<Vec<ReceiveEvent>> {
        let units = self.reader.read_frames(self.settings.wire_mode())?;
        Ok(units
            .into_iter()
            .filter_map(|unit| self.process(unit))
            .collect())
    }

    fn process(&mut self, unit: Reassembled) -> Option<ReceiveEvent> {
        match unit {
            Reassembled::Stuffed { wire, rssi } => {
                self.telemetry.note_frame();
                match decode_escape(&wire) {
                    Ok(logical) => Some(self.accept(wire, &logical, rssi)),
                    Err(error) => {
                        self.telemetry.note_malformed();
                        warn!(error = %error, len = wire.len(), "malformed frame dropped");
                        Some(ReceiveEvent::Malformed { raw: wire, error })
                    }
                }
            }
            Reassembled::Prefixed { body, rssi } => {
                if body.is_empty() {
                    return None;
                }
                self.telemetry.note_frame();
                Some(self.accept(body.clone(), &body, rssi))
            }
            Reassembled::Acknowledgement(bytes) => {
                debug!(len = bytes.len(), "device acknowledgement");
                Some(ReceiveEvent::Acknowledgement(bytes))
            }
            Reassembled::Plain(bytes) => Some(ReceiveEvent::Plain(bytes)),
        }
    }

    fn accept(&mut self, raw: Bytes, logical: &[u8], rssi: i8) -> ReceiveEvent {
        match LinkFrame::from_logical(logical) {
            Ok(frame) => {
                let recorded = self
                    .telemetry
                    .record(&frame.header, rssi, self.clock.now_usec());
                ReceiveEvent::Frame {
                    frame,
                    rssi,
                    raw,
                    recorded,
                }
            }
            Err(error) => {
                self.telemetry.note_crc_error();
                debug!(error = %error, "frame failed integrity check");
                ReceiveEvent::Corrupt { raw, error }
            }
        }
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn telemetry_mut(&mut self) -> &mut Telemetry {
        &mut self.telemetry
    }

    pub fn settings(&self) -> &Arc<LinkSettings> {
        &self.settings
    }

    pub fn reader(&self) -> &FrameReader<T> {
        &self.reader
    }
}
