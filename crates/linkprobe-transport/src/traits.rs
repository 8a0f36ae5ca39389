use std::io::{Read, Write};

use crate::error::Result;

/// A byte stream to the radio device.
///
/// On top of plain I/O the device needs two out-of-band controls: the line
/// speed, and a control line that tells the radio whether the bytes that
/// follow are vendor commands or data.
pub trait Transport: Read + Write + Send {
    /// Change the line speed of the local port.
    fn set_baud(&mut self, baud: u32) -> Result<()>;

    /// Put the control line in data (`true`) or command (`false`) position.
    fn set_control_line(&mut self, data: bool) -> Result<()>;

    /// Block until everything written so far has left the port.
    fn drain(&mut self) -> Result<()> {
        self.flush().map_err(Into::into)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn set_baud(&mut self, baud: u32) -> Result<()> {
        (**self).set_baud(baud)
    }

    fn set_control_line(&mut self, data: bool) -> Result<()> {
        (**self).set_control_line(data)
    }

    fn drain(&mut self) -> Result<()> {
        (**self).drain()
    }
}
