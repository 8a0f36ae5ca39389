//! USB serial bridge discovery.
//!
//! The radio boards hang off a Silicon Labs CP210x USB-UART bridge. When
//! several boards are attached, the one to open is picked by its USB serial
//! number or by the tail of its device path.

use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

use crate::error::{Result, TransportError};

/// USB vendor id of the CP210x bridge.
pub const BRIDGE_VID: u16 = 0x10c4;
/// USB product id of the CP210x bridge.
pub const BRIDGE_PID: u16 = 0xea60;

/// Find the device path of the bridge matching `identifier`.
pub fn locate(identifier: &str) -> Result<String> {
    let ports = serialport::available_ports()?;
    debug!(count = ports.len(), "enumerated serial ports");
    select_port(&ports, identifier)
        .map(str::to_string)
        .ok_or_else(|| TransportError::NotFound {
            identifier: identifier.to_string(),
        })
}

/// An attached bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bridge {
    pub path: String,
    pub serial_number: Option<String>,
}

/// List every attached bridge, in enumeration order.
pub fn bridges() -> Result<Vec<Bridge>> {
    Ok(collect_bridges(&serialport::available_ports()?))
}

fn collect_bridges(ports: &[SerialPortInfo]) -> Vec<Bridge> {
    ports
        .iter()
        .filter(|port| is_bridge(port))
        .map(|port| Bridge {
            path: port.port_name.clone(),
            serial_number: match &port.port_type {
                SerialPortType::UsbPort(usb) => usb.serial_number.clone(),
                _ => None,
            },
        })
        .collect()
}

fn select_port<'a>(ports: &'a [SerialPortInfo], identifier: &str) -> Option<&'a str> {
    ports
        .iter()
        .filter(|port| is_bridge(port))
        .find(|port| matches_identifier(port, identifier))
        .map(|port| port.port_name.as_str())
}

fn is_bridge(port: &SerialPortInfo) -> bool {
    match &port.port_type {
        SerialPortType::UsbPort(usb) => usb.vid == BRIDGE_VID && usb.pid == BRIDGE_PID,
        _ => false,
    }
}

fn matches_identifier(port: &SerialPortInfo, identifier: &str) -> bool {
    let serial_matches = match &port.port_type {
        SerialPortType::UsbPort(usb) => usb
            .serial_number
            .as_deref()
            .is_some_and(|serial| serial.eq_ignore_ascii_case(identifier)),
        _ => false,
    };
    serial_matches || port.port_name.ends_with(identifier)
}
