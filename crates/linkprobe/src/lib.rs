//! Bench tool for radio links reached through a USB serial bridge.
//!
//! linkprobe drives a radio board with periodic timestamped frames and
//! measures what comes back: per-node latency, loss and RSSI.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial device access and bridge discovery
//! - [`frame`]: wire framing, byte stuffing and stream reassembly
//! - [`link`]: transmit loop, command mailbox and telemetry

/// Re-export transport types.
pub mod transport {
    pub use linkprobe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use linkprobe_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use linkprobe_link::*;
}
