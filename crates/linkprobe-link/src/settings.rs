//! Link state shared between the control path and the transmit loop.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use linkprobe_frame::WireMode;

/// Address this node answers to unless configured otherwise.
pub const DEFAULT_OWN_ADDRESS: u8 = 10;

/// Own address, dump flag and current wire mode.
///
/// The wire mode is written by the transmit loop when the radio accepts a
/// protocol change and read by the receive path before every read.
#[derive(Debug)]
pub struct LinkSettings {
    own_address: AtomicU8,
    dump: AtomicBool,
    mode: AtomicU8,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::new(DEFAULT_OWN_ADDRESS)
    }
}

impl LinkSettings {
    pub fn new(own_address: u8) -> Self {
        Self {
            own_address: AtomicU8::new(own_address),
            dump: AtomicBool::new(false),
            mode: AtomicU8::new(WireMode::White.id()),
        }
    }

    pub fn own_address(&self) -> u8 {
        self.own_address.load(Ordering::Relaxed)
    }

    pub fn set_own_address(&self, address: u8) {
        self.own_address.store(address, Ordering::Relaxed);
    }

    /// Whether received frames are printed as they arrive.
    pub fn dump_mode(&self) -> bool {
        self.dump.load(Ordering::Relaxed)
    }

    pub fn set_dump_mode(&self, on: bool) {
        self.dump.store(on, Ordering::Relaxed);
    }

    pub fn wire_mode(&self) -> WireMode {
        WireMode::from_id(self.mode.load(Ordering::Acquire))
    }

    pub fn set_wire_mode(&self, mode: WireMode) {
        self.mode.store(mode.id(), Ordering::Release);
    }
}
