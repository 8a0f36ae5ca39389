use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

#[cfg(unix)]
type NativePort = serialport::TTYPort;
#[cfg(windows)]
type NativePort = serialport::COMPort;

/// Serial port transport.
///
/// Opens the device as 8N1 with no flow control. The control line is DTR:
/// asserted while vendor commands are written, released for data.
pub struct SerialTransport {
    port: NativePort,
    path: String,
}

impl SerialTransport {
    /// Read timeout applied to the port. Reads normally follow a readiness
    /// wait, so this only bounds a read racing with a device hang-up.
    pub const READ_TIMEOUT: Duration = Duration::from_millis(100);

    /// Open a serial device at the given line speed.
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Self::READ_TIMEOUT)
            .open_native()
            .map_err(|source| TransportError::Open {
                path: path.to_string(),
                source,
            })?;

        info!(path, baud, "opened serial device");
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// Clone the port into an independent handle (new file descriptor).
    ///
    /// The transmit loop writes through one handle while the foreground
    /// loop reads through the other.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self.port.try_clone_native()?;
        Ok(Self {
            port,
            path: self.path.clone(),
        })
    }

    /// Device path this transport was opened on.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialTransport {
    fn set_baud(&mut self, baud: u32) -> Result<()> {
        self.port.set_baud_rate(baud)?;
        info!(path = %self.path, baud, "changed line speed");
        Ok(())
    }

    fn set_control_line(&mut self, data: bool) -> Result<()> {
        self.port.write_data_terminal_ready(!data)?;
        debug!(data, "control line");
        Ok(())
    }
}

#[cfg(unix)]
impl std::os::fd::AsRawFd for SerialTransport {
    fn as_raw_fd(&self) -> std::os::fd::RawFd {
        self.port.as_raw_fd()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_missing_device_reports_path() {
        let err = SerialTransport::open("/dev/linkprobe-does-not-exist", 115_200).unwrap_err();
        match err {
            TransportError::Open { path, .. } => assert_eq!(path, "/dev/linkprobe-does-not-exist"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
