//! Serial transport abstraction.
//!
//! Provides the byte pipe the rest of linkprobe runs over:
//! - [`Transport`], a `Read + Write` stream that can also change baud rate
//!   and toggle the command/data control line
//! - [`SerialTransport`], the `serialport`-backed implementation
//! - [`locate`], USB bridge discovery by serial number or port name
//! - [`MemoryTransport`], an in-memory double for tests and dry runs
//!
//! This is the lowest layer of linkprobe. Framing, telemetry and the
//! transmit loop all build on top of it.

pub mod error;
pub mod locate;
pub mod memory;
pub mod serial;
pub mod traits;

#[cfg(unix)]
pub mod readiness;

pub use error::{Result, TransportError};
pub use locate::{bridges, locate, Bridge, BRIDGE_PID, BRIDGE_VID};
pub use memory::{MemoryTransport, TransportEvent};
pub use serial::SerialTransport;
pub use traits::Transport;
