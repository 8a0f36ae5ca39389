use clap::{Args, Subcommand};
use linkprobe_link::DEFAULT_OWN_ADDRESS;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod ports;
pub mod session;
pub mod version;

/// Default line speed of the bridge.
pub const DEFAULT_BAUD: u32 = 115_200;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show version information.
    Version(VersionArgs),
    /// List attached serial bridges.
    Ports(PortsArgs),
}

/// Without a subcommand the interactive session starts.
pub fn run(command: Option<Command>, session: SessionArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Some(Command::Version(args)) => version::run(args),
        Some(Command::Ports(args)) => ports::run(args, format),
        None => session::run(session, format),
    }
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Serial device to open.
    #[arg(long, short = 'D', value_name = "TTY", env = "LINKPROBE_DEVICE")]
    pub device: Option<String>,
    /// Bridge to open, by USB serial number or port name suffix. Wins over --device.
    #[arg(long, short = 'l', value_name = "ID")]
    pub location: Option<String>,
    /// Line speed.
    #[arg(long, short = 'b', default_value_t = DEFAULT_BAUD)]
    pub baud: u32,
    /// Address of this node.
    #[arg(long, short = 'a', default_value_t = DEFAULT_OWN_ADDRESS)]
    pub address: u8,
    /// Pause between periodic frames, milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub interval: u32,
    /// Payload bytes per periodic frame.
    #[arg(long, value_name = "BYTES", default_value_t = 13, value_parser = clap::value_parser!(u8).range(1..=120))]
    pub length: u8,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}
