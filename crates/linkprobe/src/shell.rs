//! Line-oriented command shell.
//!
//! Each line is split into a command name and arguments, looked up
//! case-insensitively and turned into a mailbox submission, a settings
//! change or a statistics printout. Parameters are validated here so the
//! transmit loop only ever sees well-formed commands.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use linkprobe_link::{Command, CommandError, LinkSettings, Mailbox, Telemetry, REGION_COUNT};

use crate::cmd::version::version_line;
use crate::output::{write_stats, OutputFormat};

pub const PROMPT: &str = "> ";

/// What the caller should do after a line was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const COMMANDS: &[(&str, &str)] = &[
    ("ver", "Returns current version"),
    ("dump", "Switch on/off dumping of received frames"),
    ("send", "Send various types of frames over the serial port"),
    ("interval", "Set the interval between low latency frames"),
    ("len", "Set the length of the low latency frames"),
    ("set", "Set various parameters"),
    ("addr", "Show or set the address of this node"),
    ("stat", "Show/clear statistics"),
    ("spy", "Spy on the current radio channel"),
    ("quit", "Quit program"),
    ("exit", "Exit program"),
    ("help", "Show this help; for individual command help, use <command> -h"),
];

const SEND_USAGE: &str = "Usage:\tsend ll dest_addr\n\
                          \tsend llh dest_addr slot_number\n\
                          \tsend once dest_addr [slot_number]\n\
                          \tsend off\n\
                          \tsend plain \"text\"\n\
                          \twhere dest_addr 0...255, slot_number 0...31";

const SET_USAGE: &str =
    "Usage:\tset { zch | master | rate | hop | stretch | region | baud | proto | bw | slot }";

/// Pauses between repeated submissions of `set zch` and `set region`.
#[derive(Debug, Clone)]
pub struct ShellConfig {
    /// Gap between channel rounds. Default: 20 ms.
    pub channel_round_gap: Duration,
    /// Gap between region rounds. Default: 100 ms.
    pub region_round_gap: Duration,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            channel_round_gap: Duration::from_millis(20),
            region_round_gap: Duration::from_millis(100),
        }
    }
}

pub struct Shell {
    mailbox: Arc<Mailbox>,
    settings: Arc<LinkSettings>,
    format: OutputFormat,
    config: ShellConfig,
}

impl Shell {
    pub fn new(mailbox: Arc<Mailbox>, settings: Arc<LinkSettings>, format: OutputFormat) -> Self {
        Self::with_config(mailbox, settings, format, ShellConfig::default())
    }

    pub fn with_config(
        mailbox: Arc<Mailbox>,
        settings: Arc<LinkSettings>,
        format: OutputFormat,
        config: ShellConfig,
    ) -> Self {
        Self {
            mailbox,
            settings,
            format,
            config,
        }
    }

    /// Execute one input line. Empty lines do nothing.
    pub fn execute(
        &self,
        line: &str,
        telemetry: &mut Telemetry,
        out: &mut impl Write,
    ) -> io::Result<Flow> {
        let words = tokenize(line);
        let Some((name, rest)) = words.split_first() else {
            return Ok(Flow::Continue);
        };
        let args: Vec<&str> = rest.iter().map(String::as_str).collect();

        match name.to_ascii_lowercase().as_str() {
            "ver" => writeln!(out, "{}", version_line())?,
            "dump" => self.dump(&args, out)?,
            "send" => self.send(&args, out)?,
            "interval" => self.interval(&args, out)?,
            "len" => self.length(&args, out)?,
            "set" => self.set(&args, out)?,
            "addr" => self.address(&args, out)?,
            "stat" => self.stat(&args, telemetry, out)?,
            "spy" => self.spy(&args)?,
            "quit" | "exit" => return Ok(Flow::Quit),
            "help" => help(out)?,
            _ => writeln!(out, "Unknown command")?,
        }
        Ok(Flow::Continue)
    }

    fn submit(&self, command: Result<Command, CommandError>, out: &mut impl Write) -> io::Result<()> {
        match command {
            Ok(command) => {
                self.mailbox.submit(command);
                Ok(())
            }
            Err(err) => writeln!(out, "Invalid parameter: {err}"),
        }
    }

    fn dump(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        match args.first().map(|a| a.to_ascii_lowercase()).as_deref() {
            None => writeln!(
                out,
                "Received frames are {}dumped to the console",
                if self.settings.dump_mode() { "" } else { "not " }
            ),
            Some("on") => {
                self.settings.set_dump_mode(true);
                Ok(())
            }
            Some("off") => {
                self.settings.set_dump_mode(false);
                Ok(())
            }
            Some(_) => writeln!(out, "Usage:\tdump {{ on | off }}"),
        }
    }

    fn send(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        let Some(kind) = args.first() else {
            return writeln!(out, "{SEND_USAGE}");
        };
        let command = match (kind.to_ascii_lowercase().as_str(), &args[1..]) {
            ("off", _) => Ok(Command::StopPeriodic),
            ("ll", [dest, ..]) => {
                integer("destination", dest).and_then(|dest| Command::start_periodic(dest, 0))
            }
            ("llh", [dest, slot, ..]) => integer("destination", dest)
                .and_then(|dest| Ok((dest, integer("slot", slot)?)))
                .and_then(|(dest, slot)| Command::start_periodic(dest, slot)),
            ("once", [dest, rest @ ..]) => integer("destination", dest)
                .and_then(|dest| {
                    let slot = rest.first().map_or(Ok(0), |s| integer("slot", s))?;
                    Ok((dest, slot))
                })
                .and_then(|(dest, slot)| Command::send_once(dest, slot)),
            ("plain", [text, ..]) => Command::send_plain(unescape(text)),
            ("-h", _) => return writeln!(out, "{SEND_USAGE}"),
            _ => return writeln!(out, "Invalid parameter"),
        };
        self.submit(command, out)
    }

    fn interval(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        match args.first() {
            Some(&"-h") | None => writeln!(out, "Usage:\tinterval <nn>"),
            Some(value) => match integer("interval", value).and_then(Command::interval) {
                Ok(command) => self.submit(Ok(command), out),
                Err(_) => writeln!(out, "Invalid parameter, should be between 1 and 100 (ms)"),
            },
        }
    }

    fn length(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        match args.first() {
            Some(&"-h") | None => writeln!(out, "Usage:\tlen <nn>"),
            Some(value) => match integer("length", value).and_then(Command::length) {
                Ok(command) => self.submit(Ok(command), out),
                Err(_) => writeln!(out, "Invalid parameter, should be between 1 and 120 (bytes)"),
            },
        }
    }

    fn set(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        let [what, params @ ..] = args else {
            return writeln!(out, "{SET_USAGE}");
        };
        if params.is_empty() {
            return writeln!(out, "{SET_USAGE}");
        }

        match what.to_ascii_lowercase().as_str() {
            "zch" => self.set_channel(params, out),
            "region" => self.set_region(params, out),
            "master" => self.submit(Command::master(params[0]), out),
            "rate" => self.submit(Command::rate(params[0]), out),
            "hop" => match params {
                [low, high, slots] => {
                    let command = integer("hop low", low).and_then(|low| {
                        Command::hop_params(low, integer("hop high", high)?, integer("hop slots", slots)?)
                    });
                    self.submit(command, out)
                }
                _ => writeln!(out, "Insufficient arguments (set hop <low> <high> <slots>)"),
            },
            "stretch" => match params {
                [us] => self.submit(integer("hop stretch", us).and_then(Command::hop_stretch), out),
                _ => writeln!(out, "Hop stretch (in us; min 500, max hop_high - 500)"),
            },
            "baud" => match params {
                [baud] => self.submit(integer("baud", baud).and_then(Command::baud), out),
                _ => writeln!(out, "Insufficient arguments (set baud <rate>)"),
            },
            "proto" => match integer("protocol", params[0]).and_then(Command::protocol) {
                Ok(command) => self.submit(Ok(command), out),
                Err(_) => writeln!(
                    out,
                    "Invalid parameter, must be 0 - white, 1 - white+, 2 - red+, 3 - plain"
                ),
            },
            "slot" => {
                let slots: Result<Vec<i64>, CommandError> =
                    params.iter().map(|s| integer("slot", s)).collect();
                match slots.and_then(|slots| Command::slot_mask(&slots)) {
                    Ok(command) => self.submit(Ok(command), out),
                    Err(_) => writeln!(out, "<slot#> can be from 0 to 4"),
                }
            }
            "bw" => match params {
                [slot, rate] => {
                    self.submit(integer("slot", slot).and_then(|slot| Command::bandwidth(slot, rate)), out)
                }
                _ => writeln!(
                    out,
                    "Insufficient arguments (set bw <slot> <bw>)\n<slot#> 0 to 4; <bw>: 250K, 1M, 2M"
                ),
            },
            _ => writeln!(out, "Invalid parameter"),
        }
    }

    /// `set zch <channel> [rounds]`: submit the channel, then repeat it
    /// `rounds` more times.
    fn set_channel(&self, params: &[&str], out: &mut impl Write) -> io::Result<()> {
        let command = match integer("channel", params[0]).and_then(Command::channel) {
            Ok(command) => command,
            Err(_) => {
                return writeln!(
                    out,
                    "Invalid parameter (only channels 11 to 26 are accepted)"
                )
            }
        };
        let rounds = match rounds(params) {
            Ok(rounds) => rounds,
            Err(err) => return writeln!(out, "Invalid parameter: {err}"),
        };

        for round in 0..=rounds {
            if round > 0 {
                thread::sleep(self.config.channel_round_gap);
            }
            self.mailbox.submit(command.clone());
        }
        Ok(())
    }

    /// `set region <region> [rounds]`: submit the region, then step through
    /// the following regions (wrapping) for `rounds` more submissions.
    fn set_region(&self, params: &[&str], out: &mut impl Write) -> io::Result<()> {
        let first = match integer("region", params[0]) {
            Ok(region) if Command::region(region).is_ok() => region,
            _ => return writeln!(out, "Invalid region"),
        };
        let rounds = match rounds(params) {
            Ok(rounds) => rounds,
            Err(err) => return writeln!(out, "Invalid parameter: {err}"),
        };

        for round in 0..=rounds {
            if round > 0 {
                thread::sleep(self.config.region_round_gap);
            }
            let region = (first + round) % i64::from(REGION_COUNT);
            self.submit(Command::region(region), out)?;
        }
        Ok(())
    }

    fn address(&self, args: &[&str], out: &mut impl Write) -> io::Result<()> {
        match args.first() {
            None => writeln!(out, "Own address {}", self.settings.own_address()),
            Some(value) => match integer("address", value)
                .and_then(|value| u8::try_from(value).map_err(|_| out_of_range("address", value)))
            {
                Ok(address) => {
                    self.settings.set_own_address(address);
                    Ok(())
                }
                Err(err) => writeln!(out, "Invalid parameter: {err}"),
            },
        }
    }

    fn stat(&self, args: &[&str], telemetry: &mut Telemetry, out: &mut impl Write) -> io::Result<()> {
        match args.first() {
            None => write_stats(out, &telemetry.report(), self.format),
            Some(arg) if arg.eq_ignore_ascii_case("clear") => {
                telemetry.clear();
                Ok(())
            }
            Some(_) => writeln!(out, "Usage:\tstat [clear]"),
        }
    }

    fn spy(&self, args: &[&str]) -> io::Result<()> {
        let command = match args.first() {
            Some(arg) if arg.eq_ignore_ascii_case("red") => Command::GetRedStats,
            _ => Command::GetStats,
        };
        self.mailbox.submit(command);
        Ok(())
    }
}

fn help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Following commands are available:")?;
    for (name, description) in COMMANDS {
        writeln!(out, "  {name:<10}{description}")?;
    }
    Ok(())
}

fn integer(name: &'static str, text: &str) -> Result<i64, CommandError> {
    text.trim().parse().map_err(|_| CommandError::Invalid {
        name,
        value: text.to_string(),
        expected: "an integer",
    })
}

fn out_of_range(name: &'static str, value: i64) -> CommandError {
    CommandError::OutOfRange {
        name,
        value,
        min: 0,
        max: i64::from(u8::MAX),
    }
}

/// Largest repeat count for `set zch` and `set region`. Rounds are slept on
/// the foreground thread, which stops reading the radio meanwhile.
pub const MAX_ROUNDS: i64 = 255;

/// Optional trailing repeat count.
fn rounds(params: &[&str]) -> Result<i64, CommandError> {
    match params.get(1) {
        None => Ok(0),
        Some(text) => {
            let rounds = integer("rounds", text)?;
            if !(0..=MAX_ROUNDS).contains(&rounds) {
                return Err(CommandError::OutOfRange {
                    name: "rounds",
                    value: rounds,
                    min: 0,
                    max: MAX_ROUNDS,
                });
            }
            Ok(rounds)
        }
    }
}

/// Split a line into words. A word starting with `"` runs to the next `"`
/// (or the end of the line) and may contain spaces.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();

    loop {
        while chars.next_if(|c| c.is_ascii_whitespace()).is_some() {}
        let Some(first) = chars.next() else {
            break;
        };

        let mut word = String::new();
        if first == '"' {
            for c in chars.by_ref() {
                if c == '"' {
                    break;
                }
                word.push(c);
            }
        } else {
            word.push(first);
            while let Some(c) = chars.next_if(|c| !c.is_ascii_whitespace()) {
                word.push(c);
            }
        }
        words.push(word);
    }
    words
}

/// Expand `\r`, `\n` and `\\`; any other escaped character stands for
/// itself. A trailing lone backslash is kept.
pub fn unescape(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();
    while let Some(byte) = bytes.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }
        match bytes.next() {
            Some(b'r') => out.push(b'\r'),
            Some(b'n') => out.push(b'\n'),
            Some(other) => out.push(other),
            None => out.push(b'\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use linkprobe_frame::WireMode;
    use linkprobe_link::{Rate, Target};

    use super::*;

    struct Rig {
        shell: Shell,
        mailbox: Arc<Mailbox>,
        settings: Arc<LinkSettings>,
        telemetry: Telemetry,
    }

    fn rig() -> Rig {
        let mailbox = Arc::new(Mailbox::new());
        let settings = Arc::new(LinkSettings::new(10));
        let config = ShellConfig {
            channel_round_gap: Duration::ZERO,
            region_round_gap: Duration::ZERO,
        };
        Rig {
            shell: Shell::with_config(
                Arc::clone(&mailbox),
                Arc::clone(&settings),
                OutputFormat::Pretty,
                config,
            ),
            telemetry: Telemetry::new(Arc::clone(&settings)),
            mailbox,
            settings,
        }
    }

    impl Rig {
        fn run(&mut self, line: &str) -> (Flow, String) {
            let mut out = Vec::new();
            let flow = self
                .shell
                .execute(line, &mut self.telemetry, &mut out)
                .unwrap();
            (flow, String::from_utf8(out).unwrap())
        }
    }

    #[test]
    fn tokenizer_handles_quotes_and_spacing() {
        assert_eq!(tokenize("send  plain \"a b\"  x\n"), vec!["send", "plain", "a b", "x"]);
        assert_eq!(tokenize("say \"unterminated text"), vec!["say", "unterminated text"]);
        assert_eq!(tokenize("x \"\" y"), vec!["x", "", "y"]);
        assert!(tokenize("   \r\n").is_empty());
    }

    #[test]
    fn escapes_expand() {
        assert_eq!(unescape(r"AT\r\n"), b"AT\r\n");
        assert_eq!(unescape(r"a\\b"), b"a\\b");
        assert_eq!(unescape(r"\q"), b"q");
        assert_eq!(unescape("end\\"), b"end\\");
    }

    #[test]
    fn unknown_and_empty_lines() {
        let mut rig = rig();
        assert_eq!(rig.run("bogus 1 2").1, "Unknown command\n");
        assert_eq!(rig.run("").1, "");
        assert!(!rig.mailbox.is_pending());
    }

    #[test]
    fn command_names_are_case_insensitive() {
        let mut rig = rig();
        rig.run("SEND LL 12");
        assert_eq!(
            rig.mailbox.take(),
            Command::StartPeriodic(Target { dest: 12, slot: 0 })
        );
        assert_eq!(rig.run("Quit").0, Flow::Quit);
        assert_eq!(rig.run("exit").0, Flow::Quit);
    }

    #[test]
    fn send_variants_reach_the_mailbox() {
        let mut rig = rig();
        rig.run("send llh 7 3");
        assert_eq!(rig.mailbox.take(), Command::StartPeriodic(Target { dest: 7, slot: 3 }));
        rig.run("send once 255");
        assert_eq!(rig.mailbox.take(), Command::SendOnce(Target { dest: 255, slot: 0 }));
        rig.run("send off");
        assert_eq!(rig.mailbox.take(), Command::StopPeriodic);
        rig.run(r#"send plain "AT+X\r\n""#);
        assert_eq!(rig.mailbox.take(), Command::SendPlain(b"AT+X\r\n".to_vec()));
    }

    #[test]
    fn invalid_send_leaves_mailbox_empty() {
        let mut rig = rig();
        assert!(rig.run("send llh 7 32").1.starts_with("Invalid parameter"));
        assert!(rig.run("send ll abc").1.starts_with("Invalid parameter"));
        assert_eq!(rig.run("send sideways").1, "Invalid parameter\n");
        assert!(rig.run("send").1.starts_with("Usage:\tsend ll dest_addr"));
        assert!(!rig.mailbox.is_pending());
    }

    #[test]
    fn interval_and_length_ranges() {
        let mut rig = rig();
        rig.run("interval 50");
        assert_eq!(rig.mailbox.take(), Command::SetInterval(50));
        assert_eq!(
            rig.run("interval 0").1,
            "Invalid parameter, should be between 1 and 100 (ms)\n"
        );
        rig.run("len 120");
        assert_eq!(rig.mailbox.take(), Command::SetLength(120));
        assert_eq!(
            rig.run("len 121").1,
            "Invalid parameter, should be between 1 and 120 (bytes)\n"
        );
        assert!(!rig.mailbox.is_pending());
    }

    #[test]
    fn set_parameters() {
        let mut rig = rig();
        rig.run("set rate 1m");
        assert_eq!(rig.mailbox.take(), Command::SetRate(Rate::Gfsk1M));
        rig.run("set master off");
        assert_eq!(rig.mailbox.take(), Command::SetMaster(false));
        rig.run("set hop 1000 5000 8");
        assert_eq!(
            rig.mailbox.take(),
            Command::SetHopParams {
                low: 1000,
                high: 5000,
                slots: 8
            }
        );
        rig.run("set proto 2");
        assert_eq!(rig.mailbox.take(), Command::SetProtocol(WireMode::LengthPrefixed));
        rig.run("set slot 0 1 4");
        assert_eq!(rig.mailbox.take(), Command::SetSlotMask(0b1_0011));
        rig.run("set bw 2 250K");
        assert_eq!(
            rig.mailbox.take(),
            Command::SetBandwidth {
                slot: 2,
                rate: Rate::Oqpsk250K
            }
        );
        rig.run("set baud 921600");
        assert_eq!(rig.mailbox.take(), Command::SetBaud(921_600));
    }

    #[test]
    fn set_rejects_bad_values() {
        let mut rig = rig();
        assert_eq!(
            rig.run("set zch 27").1,
            "Invalid parameter (only channels 11 to 26 are accepted)\n"
        );
        assert_eq!(rig.run("set slot 1 5").1, "<slot#> can be from 0 to 4\n");
        assert!(rig.run("set hop 1 2").1.starts_with("Insufficient arguments"));
        assert_eq!(rig.run("set region 20").1, "Invalid region\n");
        assert!(rig.run("set zch").1.starts_with("Usage:\tset"));
        assert!(!rig.mailbox.is_pending());
    }

    #[test]
    fn region_rounds_step_and_wrap() {
        let mut rig = rig();
        rig.run("set region 18 3");
        // Without a transmit loop draining the slot only the last survives.
        assert_eq!(rig.mailbox.take(), Command::SetRegion(1));
    }

    #[test]
    fn rounds_are_capped() {
        let mut rig = rig();
        assert_eq!(
            rig.run("set zch 11 100000000").1,
            "Invalid parameter: rounds must be between 0 and 255, got 100000000\n"
        );
        assert_eq!(
            rig.run("set region 3 256").1,
            "Invalid parameter: rounds must be between 0 and 255, got 256\n"
        );
        assert!(!rig.mailbox.is_pending());

        rig.run("set zch 11 255");
        assert_eq!(rig.mailbox.take(), Command::SetChannel(11));
    }

    #[test]
    fn channel_rounds_repeat_the_channel() {
        let mut rig = rig();
        rig.run("set zch 15 2");
        assert_eq!(rig.mailbox.take(), Command::SetChannel(15));
    }

    #[test]
    fn dump_toggles_settings() {
        let mut rig = rig();
        assert_eq!(rig.run("dump").1, "Received frames are not dumped to the console\n");
        rig.run("dump ON");
        assert!(rig.settings.dump_mode());
        assert_eq!(rig.run("dump").1, "Received frames are dumped to the console\n");
        rig.run("dump off");
        assert!(!rig.settings.dump_mode());
    }

    #[test]
    fn address_can_be_changed() {
        let mut rig = rig();
        assert_eq!(rig.run("addr").1, "Own address 10\n");
        rig.run("addr 42");
        assert_eq!(rig.settings.own_address(), 42);
        assert!(rig.run("addr 300").1.starts_with("Invalid parameter"));
        assert_eq!(rig.settings.own_address(), 42);
    }

    #[test]
    fn spy_requests_traffic_stats() {
        let mut rig = rig();
        rig.run("spy");
        assert_eq!(rig.mailbox.take(), Command::GetStats);
        rig.run("spy red");
        assert_eq!(rig.mailbox.take(), Command::GetRedStats);
    }

    #[test]
    fn stat_clear_resets_counters() {
        let mut rig = rig();
        rig.telemetry.note_frame();
        rig.telemetry.note_crc_error();
        rig.run("stat clear");
        assert_eq!(rig.telemetry.counters().frames_received, 0);
        assert_eq!(rig.run("stat").1, "");
    }

    #[test]
    fn help_lists_every_command() {
        let mut rig = rig();
        let (_, text) = rig.run("help");
        assert!(text.starts_with("Following commands are available:\n"));
        assert!(text.contains("  ver       Returns current version\n"));
        assert_eq!(text.lines().count(), COMMANDS.len() + 1);
    }

    #[test]
    fn ver_prints_version() {
        let mut rig = rig();
        assert!(rig.run("ver").1.contains(env!("CARGO_PKG_VERSION")));
    }
}
