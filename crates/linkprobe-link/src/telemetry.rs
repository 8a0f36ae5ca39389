//! Per-node link statistics.
//!
//! One record per source address (0..=254) accumulates frame counts,
//! sequence gaps, one-way latency and a short RSSI window. Records live as
//! long as the [`Telemetry`] value and are only ever zeroed, never removed.

use std::sync::Arc;

use linkprobe_frame::{FrameHeader, BROADCAST};
use serde::Serialize;
use tracing::trace;

use crate::clock::USEC_PER_SEC;
use crate::settings::LinkSettings;

/// Number of addressable nodes; 255 is broadcast.
pub const NODE_COUNT: usize = 255;

/// Initial latency minimum (100 ms) so the first sample always lowers it.
pub const LATENCY_MIN_SENTINEL: u32 = 100_000;

/// RSSI samples kept before the running average restarts.
pub const RSSI_WINDOW: u32 = 10;

/// Statistics for one source node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStats {
    pub last_index: u8,
    pub frames_received: u32,
    pub frames_lost: u32,
    pub latency_min: u32,
    pub latency_max: u32,
    pub latency_sum: u64,
    pub latency_samples: u32,
    pub rssi_sum: i32,
    pub rssi_samples: u32,
}

impl Default for NodeStats {
    fn default() -> Self {
        Self {
            last_index: 0,
            frames_received: 0,
            frames_lost: 0,
            latency_min: LATENCY_MIN_SENTINEL,
            latency_max: 0,
            latency_sum: 0,
            latency_samples: 0,
            rssi_sum: 0,
            rssi_samples: 0,
        }
    }
}

impl NodeStats {
    /// Received plus lost.
    pub fn total_frames(&self) -> u32 {
        self.frames_received.saturating_add(self.frames_lost)
    }

    pub fn average_rssi(&self) -> i32 {
        if self.rssi_samples == 0 {
            return 0;
        }
        self.rssi_sum / self.rssi_samples as i32
    }

    pub fn loss_percent(&self) -> f64 {
        let total = self.total_frames();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.frames_lost) * 100.0 / f64::from(total)
    }

    pub fn average_latency_us(&self) -> f64 {
        if self.latency_samples == 0 {
            return 0.0;
        }
        self.latency_sum as f64 / f64::from(self.latency_samples)
    }

    fn record(&mut self, index: u8, latency: u32, rssi: i8) -> u32 {
        let first = self.frames_received == 0;
        self.frames_received += 1;

        self.latency_sum += u64::from(latency);
        self.latency_samples += 1;
        self.latency_max = self.latency_max.max(latency);
        self.latency_min = self.latency_min.min(latency);

        let lost = if first {
            0
        } else {
            u32::from(index.wrapping_sub(self.last_index).wrapping_sub(1))
        };
        self.frames_lost += lost;
        self.last_index = index;

        if self.rssi_samples > RSSI_WINDOW {
            self.rssi_sum = i32::from(rssi);
            self.rssi_samples = 1;
        } else {
            self.rssi_sum += i32::from(rssi);
            self.rssi_samples += 1;
        }

        lost
    }
}

/// Receive-side counters not tied to a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Frames extracted from the byte stream, good or bad.
    pub frames_received: u32,
    /// Frames with a bad escape sequence or missing terminator.
    pub malformed_frames: u32,
    /// Frames failing the checksum or the header length check.
    pub crc_errors: u32,
    /// Valid frames addressed to another node.
    pub frames_ignored: u32,
}

/// Outcome of [`Telemetry::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    Accepted { src: u8, latency_us: u32, lost: u32 },
    NotForUs { dest: u8 },
    /// The broadcast address never originates frames.
    InvalidSource,
}

/// One-way latency for a frame stamped at `timestamp`, assuming the true
/// delay is below one second.
pub fn latency_usec(now_usec: u32, timestamp: u32) -> u32 {
    if now_usec >= timestamp {
        now_usec - timestamp
    } else {
        (now_usec + USEC_PER_SEC).saturating_sub(timestamp)
    }
}

/// The statistics table plus global counters.
#[derive(Debug)]
pub struct Telemetry {
    nodes: Vec<NodeStats>,
    counters: Counters,
    settings: Arc<LinkSettings>,
}

impl Telemetry {
    pub fn new(settings: Arc<LinkSettings>) -> Self {
        Self {
            nodes: vec![NodeStats::default(); NODE_COUNT],
            counters: Counters::default(),
            settings,
        }
    }

    /// Account for a decoded frame received with `rssi` at `now_usec`.
    ///
    /// Frames for other nodes are counted as ignored and otherwise leave
    /// the table untouched.
    pub fn record(&mut self, header: &FrameHeader, rssi: i8, now_usec: u32) -> Recorded {
        if header.dest != BROADCAST && header.dest != self.settings.own_address() {
            self.counters.frames_ignored += 1;
            return Recorded::NotForUs { dest: header.dest };
        }
        let Some(node) = self.nodes.get_mut(usize::from(header.src)) else {
            return Recorded::InvalidSource;
        };

        let latency_us = latency_usec(now_usec, header.timestamp);
        let lost = node.record(header.index, latency_us, rssi);
        trace!(src = header.src, index = header.index, latency_us, lost, rssi, "frame recorded");

        Recorded::Accepted {
            src: header.src,
            latency_us,
            lost,
        }
    }

    /// A unit was extracted from the byte stream.
    pub fn note_frame(&mut self) {
        self.counters.frames_received += 1;
    }

    pub fn note_malformed(&mut self) {
        self.counters.malformed_frames += 1;
    }

    pub fn note_crc_error(&mut self) {
        self.counters.crc_errors += 1;
    }

    /// Reset every record and counter to its initial state.
    pub fn clear(&mut self) {
        self.nodes.fill(NodeStats::default());
        self.counters = Counters::default();
    }

    /// Nodes that have delivered at least one frame.
    pub fn snapshot(&self) -> impl Iterator<Item = (u8, &NodeStats)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, stats)| stats.frames_received > 0)
            .map(|(src, stats)| (src as u8, stats))
    }

    pub fn node(&self, src: u8) -> Option<&NodeStats> {
        self.nodes.get(usize::from(src))
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Summary suitable for display or serialization.
    pub fn report(&self) -> StatsReport {
        let counters = self.counters;
        let crc_error_percent = if counters.frames_received == 0 {
            0.0
        } else {
            f64::from(counters.crc_errors) * 100.0 / f64::from(counters.frames_received)
        };
        StatsReport {
            nodes: self
                .snapshot()
                .map(|(node, stats)| NodeReport::new(node, stats))
                .collect(),
            counters,
            crc_error_percent,
        }
    }
}

/// Display form of one node's statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub node: u8,
    pub avg_rssi_dbm: i32,
    pub total_frames: u32,
    pub lost_frames: u32,
    pub lost_percent: f64,
    pub latency_avg_ms: f64,
    pub latency_min_ms: f64,
    pub latency_max_ms: f64,
}

impl NodeReport {
    pub fn new(node: u8, stats: &NodeStats) -> Self {
        Self {
            node,
            avg_rssi_dbm: stats.average_rssi(),
            total_frames: stats.total_frames(),
            lost_frames: stats.frames_lost,
            lost_percent: stats.loss_percent(),
            latency_avg_ms: stats.average_latency_us() / 1000.0,
            latency_min_ms: f64::from(stats.latency_min) / 1000.0,
            latency_max_ms: f64::from(stats.latency_max) / 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub nodes: Vec<NodeReport>,
    pub counters: Counters,
    pub crc_error_percent: f64,
}
