use std::io::{ErrorKind, Read};
use std::time::Instant;

use crate::error::{FrameError, Result};
use crate::reassembler::{Reassembled, ReassemblerConfig, StreamReassembler};
use crate::wire::WireMode;

/// Reads from any `Read` stream and reassembles complete frames.
///
/// Each call performs at most one physical read, sized so the working
/// buffer never overflows. Partial frames are retained between calls.
pub struct FrameReader<T> {
    inner: T,
    chunk: Vec<u8>,
    reassembler: StreamReassembler,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, ReassemblerConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: ReassemblerConfig) -> Self {
        let capacity = config.buffer_capacity.max(1);
        Self {
            inner,
            chunk: vec![0; capacity],
            reassembler: StreamReassembler::with_config(config),
        }
    }

    /// Read once and return every unit that completed.
    ///
    /// A read that times out or is interrupted yields nothing. Returns
    /// `Err(FrameError::ConnectionClosed)` when the stream reports EOF.
    pub fn read_frames(&mut self, mode: WireMode) -> Result<Vec<Reassembled>> {
        let at = Instant::now();
        let room = self.reassembler.spare_capacity().min(self.chunk.len());

        let read = match self.inner.read(&mut self.chunk[..room]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => n,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                return Ok(Vec::new())
            }
            Err(err) => return Err(FrameError::Io(err)),
        };

        Ok(self.reassembler.feed(mode, &self.chunk[..read], at))
    }

    /// Bytes of an unfinished frame held over from earlier reads.
    pub fn retained(&self) -> usize {
        self.reassembler.retained()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current reassembler configuration.
    pub fn config(&self) -> &ReassemblerConfig {
        self.reassembler.config()
    }
}
