//! Stream reassembly.
//!
//! The serial driver hands over bytes in arbitrary chunks: a read can hold
//! several frames, the tail of one frame and the head of the next, or a
//! lone fragment. [`StreamReassembler`] owns a fixed working buffer, keeps
//! the unfinished tail between reads, and yields every complete unit.
//!
//! Stuffed frames are located with [`parse_stuffed`], which walks a
//! [`FrameCursor`] over the buffer:
//!
//! ```text
//! SEARCHING ──SOH──▶ header (3 bytes, last one SOF) ──▶ IN_FRAME ──EOF──▶ COMPLETE
//!     └───────SOF──────────────────────────────────────────▲
//! ```
//!
//! A SOF seen inside a frame restarts the frame there, dropping the stale
//! prefix. Headerless frames carry RSSI in the byte after EOF; framed ones
//! carry it in the middle header byte.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::wire::{rssi_from_magnitude, WireMode, EOF, OOB_HEADER_LEN, SOF, SOH, VENDOR_PREFIX};

/// Default size of the working buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 400;

/// Default silence after which retained partial data is discarded.
pub const DEFAULT_RESYNC_GAP: Duration = Duration::from_millis(2);

/// Configuration for the stream reassembler.
#[derive(Debug, Clone)]
pub struct ReassemblerConfig {
    /// Working buffer size in bytes. Default: 400.
    pub buffer_capacity: usize,
    /// Inter-read silence that invalidates a retained partial frame. Default: 2 ms.
    pub resync_gap: Duration,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            resync_gap: DEFAULT_RESYNC_GAP,
        }
    }
}

/// Candidate frame region inside the working buffer, `begin..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCursor {
    pub begin: usize,
    pub end: usize,
}

impl FrameCursor {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Outcome of one [`parse_stuffed`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseResult {
    /// No frame start in the scanned region; nothing worth keeping.
    NotFound,
    /// A frame starts at `begin` but its end has not arrived yet.
    Truncated { begin: usize },
    /// `frame` spans SOF through EOF; scanning resumes at `next`.
    Complete {
        frame: FrameCursor,
        next: usize,
        rssi: i8,
    },
}

/// Scan `buf[start..]` for the next stuffed frame.
///
/// `header_rssi` carries the RSSI parsed from an out-of-band header across
/// calls, so a header frame whose body was truncated is still completed
/// with the header's RSSI once the rest arrives.
pub fn parse_stuffed(buf: &[u8], start: usize, header_rssi: &mut Option<i8>) -> ParseResult {
    let len = buf.len();
    let mut p = start;

    loop {
        while p < len && buf[p] != SOF && buf[p] != SOH {
            p += 1;
        }
        if p >= len {
            return ParseResult::NotFound;
        }
        if buf[p] == SOF {
            break;
        }

        // SOH: three header bytes, the last of them SOF.
        if p + OOB_HEADER_LEN >= len {
            return ParseResult::Truncated { begin: p };
        }
        if buf[p + OOB_HEADER_LEN] != SOF {
            trace!(at = p, "header not followed by SOF, skipping");
            p += 1;
            continue;
        }
        *header_rssi = Some(buf[p + 2] as i8);
        p += OOB_HEADER_LEN;
        break;
    }

    let mut begin = p;
    p += 1;
    while p < len && buf[p] != EOF {
        if buf[p] == SOF {
            trace!(stale = p - begin, "frame restarted");
            begin = p;
            // The restarted frame brings its own header, if it has one.
            if p >= OOB_HEADER_LEN && buf[p - OOB_HEADER_LEN] == SOH {
                *header_rssi = Some(buf[p - 1] as i8);
            }
        }
        p += 1;
    }
    if p >= len {
        return ParseResult::Truncated { begin };
    }

    let frame = FrameCursor { begin, end: p + 1 };
    match *header_rssi {
        Some(rssi) => {
            *header_rssi = None;
            ParseResult::Complete {
                frame,
                next: p + 1,
                rssi,
            }
        }
        None if p + 1 < len => ParseResult::Complete {
            frame,
            next: p + 2,
            rssi: rssi_from_magnitude(buf[p + 1]),
        },
        None => ParseResult::Truncated { begin },
    }
}

/// A complete unit extracted from the byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reassembled {
    /// Byte-stuffed frame, SOF through EOF inclusive.
    Stuffed { wire: Bytes, rssi: i8 },
    /// Length-prefixed frame body (the 3-byte header stripped).
    Prefixed { body: Bytes, rssi: i8 },
    /// Device acknowledgement seen in length-prefixed mode; not data.
    Acknowledgement(Bytes),
    /// Bytes received in plain mode.
    Plain(Bytes),
}

/// Turns arbitrary read chunks into complete frames.
#[derive(Debug)]
pub struct StreamReassembler {
    buf: Vec<u8>,
    filled: usize,
    header_rssi: Option<i8>,
    last_feed: Option<Instant>,
    config: ReassemblerConfig,
}

impl Default for StreamReassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamReassembler {
    /// Create a reassembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(ReassemblerConfig::default())
    }

    /// Create a reassembler with explicit configuration.
    pub fn with_config(config: ReassemblerConfig) -> Self {
        Self {
            buf: vec![0; config.buffer_capacity.max(1)],
            filled: 0,
            header_rssi: None,
            last_feed: None,
            config,
        }
    }

    /// Bytes retained from previous reads (the offset of the next read).
    pub fn retained(&self) -> usize {
        self.filled
    }

    /// Room left for the next read.
    pub fn spare_capacity(&self) -> usize {
        self.buf.len() - self.filled
    }

    /// Drop any retained partial frame.
    pub fn reset(&mut self) {
        self.filled = 0;
        self.header_rssi = None;
    }

    /// Current reassembler configuration.
    pub fn config(&self) -> &ReassemblerConfig {
        &self.config
    }

    /// Append a chunk read at `at` and extract everything that completed.
    ///
    /// Bytes that do not fit the working buffer are dropped; read at most
    /// [`spare_capacity`](Self::spare_capacity) bytes to avoid that.
    pub fn feed(&mut self, mode: WireMode, chunk: &[u8], at: Instant) -> Vec<Reassembled> {
        if let Some(last) = self.last_feed {
            let gap = at.saturating_duration_since(last);
            if gap > self.config.resync_gap && (self.filled > 0 || self.header_rssi.is_some()) {
                debug!(gap_us = gap.as_micros() as u64, dropped = self.filled, "resync after silence");
                self.reset();
            }
        }
        self.last_feed = Some(at);

        if mode == WireMode::Plain {
            self.reset();
            return vec![Reassembled::Plain(Bytes::copy_from_slice(chunk))];
        }

        let take = chunk.len().min(self.spare_capacity());
        if take < chunk.len() {
            warn!(dropped = chunk.len() - take, "working buffer full, dropping bytes");
        }
        self.buf[self.filled..self.filled + take].copy_from_slice(&chunk[..take]);
        self.filled += take;

        let out = match mode {
            WireMode::LengthPrefixed => self.drain_prefixed(),
            _ => self.drain_stuffed(),
        };

        if self.filled >= self.buf.len() {
            warn!(size = self.filled, "partial frame fills the working buffer, dropping it");
            self.reset();
        }
        out
    }

    fn drain_stuffed(&mut self) -> Vec<Reassembled> {
        let mut out = Vec::new();
        let mut start = 0;

        loop {
            let region = &self.buf[..self.filled];
            match parse_stuffed(region, start, &mut self.header_rssi) {
                ParseResult::Complete { frame, next, rssi } => {
                    out.push(Reassembled::Stuffed {
                        wire: Bytes::copy_from_slice(&region[frame.begin..frame.end]),
                        rssi,
                    });
                    if next >= self.filled {
                        self.filled = 0;
                        break;
                    }
                    start = next;
                }
                ParseResult::Truncated { begin } => {
                    self.buf.copy_within(begin..self.filled, 0);
                    self.filled -= begin;
                    trace!(retained = self.filled, "truncated frame");
                    break;
                }
                ParseResult::NotFound => {
                    self.reset();
                    break;
                }
            }
        }
        out
    }

    fn drain_prefixed(&mut self) -> Vec<Reassembled> {
        let mut out = Vec::new();

        while self.filled > 0 {
            if self.buf[0] == VENDOR_PREFIX && self.filled >= OOB_HEADER_LEN {
                out.push(Reassembled::Acknowledgement(Bytes::copy_from_slice(
                    &self.buf[..self.filled],
                )));
                self.filled = 0;
                break;
            }

            let expected = self.buf[0] as usize + OOB_HEADER_LEN;
            if self.filled < expected {
                break;
            }

            out.push(Reassembled::Prefixed {
                body: Bytes::copy_from_slice(&self.buf[OOB_HEADER_LEN..expected]),
                rssi: self.buf[2] as i8,
            });
            self.buf.copy_within(expected..self.filled, 0);
            self.filled -= expected;
        }
        out
    }
}
