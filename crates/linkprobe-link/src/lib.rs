//! Link-level coordination for radio bench testing.
//!
//! Ties the frame layer to a running test session:
//! - [`Command`] and [`Mailbox`], the single-slot handoff from the operator
//!   to the transmit loop
//! - [`Transmitter`], which sends periodic frames and vendor commands
//! - [`Receiver`], which decodes inbound frames into [`Telemetry`]
//! - [`LinkSettings`], state shared by both sides

pub mod clock;
pub mod command;
pub mod error;
pub mod mailbox;
pub mod receiver;
pub mod settings;
pub mod telemetry;
pub mod transmitter;

pub use clock::{Clock, FixedClock, MonotonicClock, USEC_PER_SEC};
pub use command::{Command, Rate, Target, REGION_COUNT};
pub use error::{CommandError, LinkError, Result};
pub use mailbox::Mailbox;
pub use receiver::{ReceiveEvent, Receiver};
pub use settings::{LinkSettings, DEFAULT_OWN_ADDRESS};
pub use telemetry::{
    latency_usec, Counters, NodeReport, NodeStats, Recorded, StatsReport, Telemetry,
};
pub use transmitter::{LinkConfig, Sent, Transmitter, DEFAULT_INTERVAL, DEFAULT_PAYLOAD_LEN};
