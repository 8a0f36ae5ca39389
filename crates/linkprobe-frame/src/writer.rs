use std::io::ErrorKind;
use std::thread;
use std::time::Duration;

use bytes::BytesMut;
use linkprobe_transport::Transport;
use tracing::trace;

use crate::codec::{encode_frame, encode_logical};
use crate::error::{FrameError, Result};
use crate::header::LinkFrame;
use crate::vendor::VendorCommand;
use crate::wire::{WireMode, MAX_WIRE_LEN};

/// Time the radio needs after a command before the line returns to data.
pub const COMMAND_SETTLE: Duration = Duration::from_micros(500);

/// Writes frames and vendor commands to a [`Transport`].
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Transport> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_WIRE_LEN),
        }
    }

    /// Encode a frame for `mode`, write it and wait for it to leave.
    ///
    /// Returns the number of wire bytes written.
    pub fn send_frame(&mut self, frame: &LinkFrame, mode: WireMode, slot: u8) -> Result<usize> {
        self.buf.clear();
        encode_frame(frame, mode, slot, &mut self.buf)?;
        self.flush_buf()
    }

    /// Frame already-built logical bytes for `mode` and send them.
    pub fn send_logical(&mut self, logical: &[u8], mode: WireMode, slot: u8) -> Result<usize> {
        self.buf.clear();
        encode_logical(logical, mode, slot, &mut self.buf)?;
        self.flush_buf()
    }

    /// Send bytes without any framing.
    pub fn send_raw(&mut self, bytes: &[u8]) -> Result<usize> {
        self.buf.clear();
        self.buf.extend_from_slice(bytes);
        self.flush_buf()
    }

    /// Send a vendor command with the control line in command position.
    ///
    /// The line is returned to data position even when the write fails.
    pub fn send_command(&mut self, command: &VendorCommand) -> Result<()> {
        self.buf.clear();
        command.encode(&mut self.buf);
        trace!(bytes = ?&self.buf[..], "vendor command");

        self.inner.set_control_line(false)?;
        let written = self.flush_buf();
        thread::sleep(COMMAND_SETTLE);
        self.inner.set_control_line(true)?;
        written.map(|_| ())
    }

    /// Change the local baud rate.
    pub fn set_baud(&mut self, baud: u32) -> Result<()> {
        self.inner.set_baud(baud).map_err(Into::into)
    }

    fn flush_buf(&mut self) -> Result<usize> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.inner.drain()?;
        Ok(offset)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use linkprobe_transport::{MemoryTransport, TransportEvent};

    use super::*;
    use crate::codec::decode_escape;
    use crate::header::FrameType;
    use crate::wire::{EOF, SOF};

    fn frame() -> LinkFrame {
        LinkFrame::new(255, 10, 7, FrameType::LowLatency, 1000, vec![0x55; 13]).unwrap()
    }

    #[test]
    fn frame_is_written_then_drained() {
        let transport = MemoryTransport::new();
        let mut writer = FrameWriter::new(transport.clone());

        let n = writer.send_frame(&frame(), WireMode::White, 0).unwrap();

        let written = transport.written();
        assert_eq!(written.len(), n);
        assert_eq!(written[0], SOF);
        assert_eq!(*written.last().unwrap(), EOF);
        let logical = decode_escape(&written).unwrap();
        assert_eq!(LinkFrame::from_logical(&logical).unwrap(), frame());
        assert_eq!(transport.events().last(), Some(&TransportEvent::Drain));
    }

    #[test]
    fn command_toggles_control_line_around_write() {
        let transport = MemoryTransport::new();
        let mut writer = FrameWriter::new(transport.clone());

        writer.send_command(&VendorCommand::SetRate(2)).unwrap();

        assert_eq!(
            transport.events(),
            vec![
                TransportEvent::ControlLine(false),
                TransportEvent::Write(vec![0xCC, 0x66, 2]),
                TransportEvent::Drain,
                TransportEvent::ControlLine(true),
            ]
        );
    }

    #[test]
    fn failed_command_still_restores_data_line() {
        let transport = MemoryTransport::new();
        transport.fail_writes(ErrorKind::BrokenPipe);
        let mut writer = FrameWriter::new(transport.clone());

        let err = writer.send_command(&VendorCommand::GetTrafficStats).unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
        assert_eq!(transport.control_line_changes(), vec![false, true]);
    }

    #[test]
    fn write_error_is_reported() {
        let transport = MemoryTransport::new();
        transport.fail_writes(ErrorKind::BrokenPipe);
        let mut writer = FrameWriter::new(transport);

        let err = writer.send_frame(&frame(), WireMode::White, 0).unwrap_err();
        assert!(matches!(err, FrameError::Io(_)));
    }

    #[test]
    fn oversized_frame_writes_nothing() {
        let transport = MemoryTransport::new();
        let mut writer = FrameWriter::new(transport.clone());

        let err = writer
            .send_logical(&[SOF; 120], WireMode::White, 0)
            .unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLong { .. }));
        assert!(transport.written().is_empty());
    }

    #[test]
    fn raw_bytes_are_unframed() {
        let transport = MemoryTransport::new();
        let mut writer = FrameWriter::new(transport.clone());

        writer.send_raw(b"AT\r\n").unwrap();
        assert_eq!(transport.written(), b"AT\r\n");
    }

    #[test]
    fn baud_change_reaches_transport() {
        let transport = MemoryTransport::new();
        let mut writer = FrameWriter::new(transport.clone());

        writer.set_baud(921_600).unwrap();
        assert_eq!(transport.baud_changes(), vec![921_600]);
    }
}
