use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use linkprobe_link::{ReceiveEvent, Recorded, StatsReport};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn write_stats(out: &mut impl Write, report: &StatsReport, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(report).map_err(io::Error::other)?;
            writeln!(out, "{json}")
        }
        OutputFormat::Table => {
            if report.nodes.is_empty() {
                return writeln!(out, "No frames received");
            }
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "NODE", "RSSI dBm", "FRAMES", "LOST", "LOST %", "AVG ms", "MIN ms", "MAX ms",
                ]);
            for node in &report.nodes {
                table.add_row(vec![
                    node.node.to_string(),
                    node.avg_rssi_dbm.to_string(),
                    node.total_frames.to_string(),
                    node.lost_frames.to_string(),
                    format!("{:.2}", node.lost_percent),
                    format!("{:.2}", node.latency_avg_ms),
                    format!("{:.2}", node.latency_min_ms),
                    format!("{:.2}", node.latency_max_ms),
                ]);
            }
            writeln!(out, "{table}")?;
            write_crc_line(out, report)
        }
        OutputFormat::Pretty => {
            for node in &report.nodes {
                writeln!(
                    out,
                    "Node {}: avg rssi: {} dBm, total frames {}, lost frames {} ({:.2}%)",
                    node.node,
                    node.avg_rssi_dbm,
                    node.total_frames,
                    node.lost_frames,
                    node.lost_percent
                )?;
                writeln!(
                    out,
                    "Average/min/max latency (ms): {:.2}/{:.2}/{:.2}",
                    node.latency_avg_ms, node.latency_min_ms, node.latency_max_ms
                )?;
            }
            if report.nodes.is_empty() {
                return Ok(());
            }
            write_crc_line(out, report)
        }
        OutputFormat::Raw => {
            for node in &report.nodes {
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{:.2}\t{:.3}\t{:.3}\t{:.3}",
                    node.node,
                    node.avg_rssi_dbm,
                    node.total_frames,
                    node.lost_frames,
                    node.lost_percent,
                    node.latency_avg_ms,
                    node.latency_min_ms,
                    node.latency_max_ms
                )?;
            }
            Ok(())
        }
    }
}

fn write_crc_line(out: &mut impl Write, report: &StatsReport) -> io::Result<()> {
    writeln!(
        out,
        "Frames with CRC errors {} ({:.2}% from total frames received)",
        report.counters.crc_errors, report.crc_error_percent
    )
}

#[derive(Serialize, Default)]
struct EventOutput {
    event: &'static str,
    len: usize,
    bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rssi: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dest: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lost: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl EventOutput {
    fn new(event: &ReceiveEvent) -> Self {
        let raw = event_bytes(event);
        let mut out = Self {
            len: raw.len(),
            bytes: hex(raw),
            ..Self::default()
        };
        match event {
            ReceiveEvent::Frame {
                frame,
                rssi,
                recorded,
                ..
            } => {
                out.event = "frame";
                out.rssi = Some(*rssi);
                out.src = Some(frame.header.src);
                out.dest = Some(frame.header.dest);
                out.index = Some(frame.header.index);
                if let Recorded::Accepted {
                    latency_us, lost, ..
                } = recorded
                {
                    out.latency_ms = Some(f64::from(*latency_us) / 1000.0);
                    out.lost = Some(*lost);
                }
            }
            ReceiveEvent::Malformed { error, .. } => {
                out.event = "malformed";
                out.error = Some(error.to_string());
            }
            ReceiveEvent::Corrupt { error, .. } => {
                out.event = "corrupt";
                out.error = Some(error.to_string());
            }
            ReceiveEvent::Acknowledgement(_) => out.event = "ack",
            ReceiveEvent::Plain(_) => out.event = "plain",
        }
        out
    }
}

/// Print a received unit while dump mode is on.
pub fn write_event(out: &mut impl Write, event: &ReceiveEvent, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string(&EventOutput::new(event)).map_err(io::Error::other)?;
            writeln!(out, "{json}")
        }
        OutputFormat::Raw => {
            out.write_all(event_bytes(event))?;
            out.flush()
        }
        OutputFormat::Table | OutputFormat::Pretty => match event {
            ReceiveEvent::Frame { raw, rssi, .. } => {
                writeln!(out, "{:3} bytes, rssi {:03} dBm: {}", raw.len(), rssi, hex(raw))
            }
            ReceiveEvent::Malformed { raw, error } | ReceiveEvent::Corrupt { raw, error } => {
                writeln!(out, "{:3} bytes, {}: {}", raw.len(), error, hex(raw))
            }
            ReceiveEvent::Acknowledgement(bytes) => writeln!(out, "ack: {}", hex(bytes)),
            ReceiveEvent::Plain(bytes) => {
                write!(out, "{}", String::from_utf8_lossy(bytes))?;
                out.flush()
            }
        },
    }
}

fn event_bytes(event: &ReceiveEvent) -> &[u8] {
    match event {
        ReceiveEvent::Frame { raw, .. }
        | ReceiveEvent::Malformed { raw, .. }
        | ReceiveEvent::Corrupt { raw, .. } => raw,
        ReceiveEvent::Acknowledgement(bytes) | ReceiveEvent::Plain(bytes) => bytes,
    }
}

pub fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkprobe_frame::{FrameError, FrameHeader, FrameType};
    use linkprobe_link::{LinkSettings, Telemetry};

    use super::*;

    fn report() -> StatsReport {
        let mut telemetry = Telemetry::new(Arc::new(LinkSettings::new(10)));
        for (index, timestamp) in [(1u8, 1_000u32), (3, 2_000)] {
            telemetry.note_frame();
            telemetry.record(
                &FrameHeader {
                    len: 22,
                    dest: 10,
                    src: 4,
                    index,
                    kind: FrameType::LowLatency,
                    timestamp,
                },
                -60,
                timestamp + 1_500,
            );
        }
        telemetry.report()
    }

    fn render(report: &StatsReport, format: OutputFormat) -> String {
        let mut out = Vec::new();
        write_stats(&mut out, report, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn pretty_stats_use_classic_layout() {
        let text = render(&report(), OutputFormat::Pretty);
        let mut lines = text.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("Node 4: avg rssi: -60 dBm, total frames "));
        assert_eq!(
            lines.next().unwrap(),
            "Average/min/max latency (ms): 1.50/1.50/1.50"
        );
        assert!(lines.next().unwrap().starts_with("Frames with CRC errors 0"));
    }

    #[test]
    fn json_stats_are_one_line() {
        let text = render(&report(), OutputFormat::Json);
        assert_eq!(text.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["nodes"][0]["node"], 4);
        assert_eq!(value["counters"]["frames_received"], 2);
    }

    #[test]
    fn empty_table_says_so() {
        let empty = Telemetry::new(Arc::new(LinkSettings::default())).report();
        assert_eq!(render(&empty, OutputFormat::Table), "No frames received\n");
        assert_eq!(render(&empty, OutputFormat::Pretty), "");
    }

    #[test]
    fn corrupt_event_prints_error_and_bytes() {
        let event = ReceiveEvent::Corrupt {
            raw: bytes::Bytes::from_static(&[0xf0, 0x01, 0xf1]),
            error: FrameError::TooShort(1),
        };
        let mut out = Vec::new();
        write_event(&mut out, &event, OutputFormat::Pretty).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "  3 bytes, frame too short (1 bytes): f0 01 f1\n"
        );
    }

    #[test]
    fn hex_is_space_separated() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00 ab 10");
        assert_eq!(hex(&[]), "");
    }
}
