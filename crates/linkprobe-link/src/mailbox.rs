//! Single-slot command handoff.
//!
//! Producers overwrite whatever is pending; the transmit loop takes the slot
//! once per tick and leaves a no-op behind. Neither side ever waits on the
//! other beyond the few instructions the lock is held for.

use std::mem;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::command::Command;

#[derive(Debug, Default)]
pub struct Mailbox {
    slot: Mutex<Command>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place `command` in the slot, replacing any unconsumed command.
    ///
    /// Returns the command that was overwritten, if any.
    pub fn submit(&self, command: Command) -> Option<Command> {
        let previous = mem::replace(&mut *self.lock(), command);
        if previous.is_nop() {
            None
        } else {
            debug!(?previous, "pending command overwritten");
            Some(previous)
        }
    }

    /// Take the pending command, leaving a no-op.
    pub fn take(&self) -> Command {
        mem::take(&mut *self.lock())
    }

    /// Whether a command is waiting.
    pub fn is_pending(&self) -> bool {
        !self.lock().is_nop()
    }

    fn lock(&self) -> MutexGuard<'_, Command> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
