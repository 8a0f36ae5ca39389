//! In-memory transport.
//!
//! Reads are served from a queue of scripted chunks, one chunk per `read`
//! call, so callers can reproduce exactly how bytes arrive from a serial
//! driver. Everything written and every control change is recorded.

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::traits::Transport;

/// One recorded interaction with the transport, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Write(Vec<u8>),
    Drain,
    Baud(u32),
    ControlLine(bool),
}

#[derive(Debug)]
enum ReadStep {
    Chunk(Vec<u8>),
    Error(ErrorKind),
}

#[derive(Debug, Default)]
struct Inner {
    reads: VecDeque<ReadStep>,
    events: Vec<TransportEvent>,
    write_error: Option<ErrorKind>,
}

/// Cloneable in-memory [`Transport`]; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTransport {
    /// Create an empty transport. Reads return `Ok(0)` until chunks are queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk to be returned by a single `read` call.
    pub fn push_read(&self, chunk: &[u8]) {
        self.lock().reads.push_back(ReadStep::Chunk(chunk.to_vec()));
    }

    /// Queue a read failure.
    pub fn push_read_error(&self, kind: ErrorKind) {
        self.lock().reads.push_back(ReadStep::Error(kind));
    }

    /// Make every subsequent write fail with `kind`.
    pub fn fail_writes(&self, kind: ErrorKind) {
        self.lock().write_error = Some(kind);
    }

    /// All bytes written so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Write(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    /// Every recorded interaction, in order.
    pub fn events(&self) -> Vec<TransportEvent> {
        self.lock().events.clone()
    }

    /// Forget recorded interactions (queued reads are kept).
    pub fn clear_events(&self) {
        self.lock().events.clear();
    }

    pub fn baud_changes(&self) -> Vec<u32> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                TransportEvent::Baud(baud) => Some(*baud),
                _ => None,
            })
            .collect()
    }

    pub fn control_line_changes(&self) -> Vec<bool> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                TransportEvent::ControlLine(data) => Some(*data),
                _ => None,
            })
            .collect()
    }

    pub fn drain_count(&self) -> usize {
        self.lock()
            .events
            .iter()
            .filter(|event| matches!(event, TransportEvent::Drain))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Read for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        match inner.reads.pop_front() {
            None => Ok(0),
            Some(ReadStep::Error(kind)) => Err(io::Error::from(kind)),
            Some(ReadStep::Chunk(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    let rest = chunk.split_off(n);
                    inner.reads.push_front(ReadStep::Chunk(rest));
                }
                Ok(n)
            }
        }
    }
}

impl Write for MemoryTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        if let Some(kind) = inner.write_error {
            return Err(io::Error::from(kind));
        }
        inner.events.push(TransportEvent::Write(buf.to_vec()));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn set_baud(&mut self, baud: u32) -> Result<()> {
        self.lock().events.push(TransportEvent::Baud(baud));
        Ok(())
    }

    fn set_control_line(&mut self, data: bool) -> Result<()> {
        self.lock().events.push(TransportEvent::ControlLine(data));
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.lock().events.push(TransportEvent::Drain);
        Ok(())
    }
}
