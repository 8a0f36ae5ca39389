mod cmd;
mod exit;
mod logging;
mod output;
mod shell;

use clap::Parser;

use crate::cmd::{Command, SessionArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "linkprobe",
    version,
    about = "Radio link bench tool: periodic test frames, latency, loss and RSSI"
)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,

    /// Output format for statistics and dumped frames.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Command>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, cli.session, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_flags_parse() {
        let cli = Cli::try_parse_from([
            "linkprobe", "-D", "/dev/ttyUSB0", "-b", "921600", "-a", "7", "--interval", "5",
            "--length", "64",
        ])
        .expect("session args should parse");

        assert!(cli.command.is_none());
        assert_eq!(cli.session.device.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(cli.session.baud, 921_600);
        assert_eq!(cli.session.address, 7);
        assert_eq!(cli.session.interval, 5);
        assert_eq!(cli.session.length, 64);
    }

    #[test]
    fn defaults_match_the_bench_setup() {
        let cli = Cli::try_parse_from(["linkprobe", "-l", "14A0"]).expect("location should parse");
        assert_eq!(cli.session.location.as_deref(), Some("14A0"));
        assert_eq!(cli.session.baud, cmd::DEFAULT_BAUD);
        assert_eq!(cli.session.address, 10);
        assert_eq!(cli.session.interval, 20);
        assert_eq!(cli.session.length, 13);
        assert_eq!(cli.log_level, LogLevel::Warn);
    }

    #[test]
    fn interval_out_of_range_is_rejected() {
        let err = Cli::try_parse_from(["linkprobe", "-D", "/dev/null", "--interval", "101"])
            .expect_err("interval above 100 ms should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn address_must_fit_a_byte() {
        let err = Cli::try_parse_from(["linkprobe", "-a", "256"])
            .expect_err("address above 255 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_version_subcommand() {
        let cli = Cli::try_parse_from(["linkprobe", "version", "--extended"])
            .expect("version args should parse");
        assert!(matches!(cli.command, Some(Command::Version(ref args)) if args.extended));
    }

    #[test]
    fn global_format_applies_to_subcommands() {
        let cli = Cli::try_parse_from(["linkprobe", "ports", "--format", "json"])
            .expect("ports args should parse");
        assert!(matches!(cli.command, Some(Command::Ports(_))));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }
}
