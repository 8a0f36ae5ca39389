//! The interactive session: transmit thread plus a foreground loop that
//! services the radio and the terminal.

use crate::cmd::SessionArgs;
use crate::exit::{transport_error, CliError, CliResult, USAGE};

/// Pick the device path: an explicit bridge location wins over `--device`.
pub fn resolve_device(args: &SessionArgs) -> CliResult<String> {
    if let Some(location) = &args.location {
        return linkprobe_transport::locate(location)
            .map_err(|err| transport_error("bridge lookup failed", err));
    }
    args.device.clone().ok_or_else(|| {
        CliError::new(
            USAGE,
            "missing device (--device or --location required)",
        )
    })
}

#[cfg(unix)]
pub use self::unix::run;

#[cfg(not(unix))]
pub fn run(args: SessionArgs, _format: crate::output::OutputFormat) -> CliResult<i32> {
    resolve_device(&args)?;
    Err(CliError::new(
        crate::exit::INTERNAL,
        "interactive sessions are only supported on unix hosts",
    ))
}

/// Collects terminal input and hands out complete lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append `chunk` and return every line it completed, without terminators.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line).trim_end().to_string());
        }
        lines
    }

    /// Whatever was typed after the last newline.
    pub fn take_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = String::from_utf8_lossy(&self.pending).trim_end().to_string();
        self.pending.clear();
        Some(rest)
    }
}

#[cfg(unix)]
mod unix {
    use std::io::{self, Read, Write};
    use std::os::fd::AsRawFd;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use linkprobe_link::{
        LinkConfig, LinkSettings, Mailbox, MonotonicClock, Receiver, Telemetry, Transmitter,
    };
    use linkprobe_transport::readiness::wait_readable;
    use linkprobe_transport::SerialTransport;
    use tracing::info;

    use super::{resolve_device, LineBuffer};
    use crate::cmd::SessionArgs;
    use crate::exit::{io_error, link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
    use crate::output::{write_event, OutputFormat};
    use crate::shell::{Flow, Shell, PROMPT};

    /// Exit status after Ctrl-C.
    const INTERRUPTED: i32 = 130;

    /// Larger than the standard input buffer, so reads never leave data
    /// behind in it where `poll` cannot see.
    const STDIN_CHUNK: usize = 64 * 1024;

    pub fn run(args: SessionArgs, format: OutputFormat) -> CliResult<i32> {
        let path = resolve_device(&args)?;
        let transport = SerialTransport::open(&path, args.baud)
            .map_err(|err| transport_error("open failed", err))?;
        let write_half = transport
            .try_clone()
            .map_err(|err| transport_error("open failed", err))?;

        let mailbox = Arc::new(Mailbox::new());
        let settings = Arc::new(LinkSettings::new(args.address));
        let config = LinkConfig {
            interval: Duration::from_millis(u64::from(args.interval)),
            payload_len: usize::from(args.length),
        };

        let mut transmitter = Transmitter::new(
            write_half,
            Arc::clone(&mailbox),
            Arc::clone(&settings),
            MonotonicClock,
            config,
        );
        thread::Builder::new()
            .name("transmit".to_string())
            .spawn(move || {
                if let Err(err) = transmitter.run() {
                    let err = link_error("transmit failed", err);
                    eprintln!("error: {err}");
                    std::process::exit(err.code);
                }
            })
            .map_err(|err| io_error("transmit thread failed to start", err))?;

        install_ctrlc_handler()?;
        info!(path = %path, baud = args.baud, address = args.address, "session started");

        let receiver = Receiver::new(transport, Arc::clone(&settings), MonotonicClock);
        let shell = Shell::new(mailbox, Arc::clone(&settings), format);
        foreground(receiver, &shell, &settings, format)
    }

    fn foreground(
        mut receiver: Receiver<SerialTransport, MonotonicClock>,
        shell: &Shell,
        settings: &LinkSettings,
        format: OutputFormat,
    ) -> CliResult<i32> {
        let serial_fd = receiver.reader().get_ref().as_raw_fd();
        let stdin = io::stdin();
        let stdin_fd = stdin.as_raw_fd();
        let mut stdout = io::stdout();
        let mut lines = LineBuffer::default();
        let mut chunk = vec![0u8; STDIN_CHUNK];

        prompt(&mut stdout)?;
        loop {
            let ready = wait_readable(&[serial_fd, stdin_fd], None)
                .map_err(|err| io_error("poll failed", err))?;

            if ready[0] {
                let events = receiver
                    .poll_once()
                    .map_err(|err| link_error("receive failed", err))?;
                if settings.dump_mode() {
                    let mut out = stdout.lock();
                    for event in &events {
                        write_event(&mut out, event, format)
                            .map_err(|err| io_error("stdout", err))?;
                    }
                }
            }

            if ready[1] {
                let n = stdin
                    .lock()
                    .read(&mut chunk)
                    .map_err(|err| io_error("stdin", err))?;
                let mut input = lines.push(&chunk[..n]);
                if n == 0 {
                    input.extend(lines.take_rest());
                }
                for line in input {
                    if execute(shell, &line, receiver.telemetry_mut(), &mut stdout)? == Flow::Quit {
                        return Ok(SUCCESS);
                    }
                }
                if n == 0 {
                    return Ok(SUCCESS);
                }
                prompt(&mut stdout)?;
            }
        }
    }

    fn execute(
        shell: &Shell,
        line: &str,
        telemetry: &mut Telemetry,
        stdout: &mut io::Stdout,
    ) -> CliResult<Flow> {
        let mut out = stdout.lock();
        shell
            .execute(line, telemetry, &mut out)
            .map_err(|err| io_error("stdout", err))
    }

    fn prompt(stdout: &mut io::Stdout) -> CliResult<()> {
        let mut out = stdout.lock();
        out.write_all(PROMPT.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|err| io_error("stdout", err))
    }

    fn install_ctrlc_handler() -> CliResult<()> {
        ctrlc::set_handler(|| {
            println!();
            std::process::exit(INTERRUPTED);
        })
        .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::DEFAULT_BAUD;

    fn args() -> SessionArgs {
        SessionArgs {
            device: None,
            location: None,
            baud: DEFAULT_BAUD,
            address: 10,
            interval: 20,
            length: 13,
        }
    }

    #[test]
    fn device_is_required() {
        let err = resolve_device(&args()).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn device_path_is_used_as_given() {
        let args = SessionArgs {
            device: Some("/dev/ttyUSB3".to_string()),
            ..args()
        };
        assert_eq!(resolve_device(&args).unwrap(), "/dev/ttyUSB3");
    }

    #[test]
    fn lines_are_split_on_newline() {
        let mut buffer = LineBuffer::default();
        assert!(buffer.push(b"sta").is_empty());
        assert_eq!(buffer.push(b"t\r\nsend off\nhel"), vec!["stat", "send off"]);
        assert_eq!(buffer.take_rest().as_deref(), Some("hel"));
        assert_eq!(buffer.take_rest(), None);
    }

    #[test]
    fn empty_line_is_still_a_line() {
        let mut buffer = LineBuffer::default();
        assert_eq!(buffer.push(b"\n"), vec![""]);
    }
}
