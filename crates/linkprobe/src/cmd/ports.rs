use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use linkprobe_transport::{bridges, Bridge};
use serde::Serialize;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct BridgeOutput<'a> {
    path: &'a str,
    serial_number: Option<&'a str>,
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let found = bridges().map_err(|err| transport_error("port enumeration failed", err))?;
    println!("{}", render(&found, format));
    Ok(SUCCESS)
}

fn render(found: &[Bridge], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            let out: Vec<BridgeOutput<'_>> = found
                .iter()
                .map(|b| BridgeOutput {
                    path: &b.path,
                    serial_number: b.serial_number.as_deref(),
                })
                .collect();
            serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DEVICE", "SERIAL"]);
            for bridge in found {
                table.add_row(vec![
                    bridge.path.clone(),
                    bridge.serial_number.clone().unwrap_or_else(|| "-".to_string()),
                ]);
            }
            table.to_string()
        }
        OutputFormat::Pretty | OutputFormat::Raw => found
            .iter()
            .map(|b| match &b.serial_number {
                Some(serial) => format!("{} {serial}", b.path),
                None => b.path.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found() -> Vec<Bridge> {
        vec![
            Bridge {
                path: "/dev/ttyUSB0".to_string(),
                serial_number: Some("14A0".to_string()),
            },
            Bridge {
                path: "/dev/ttyUSB1".to_string(),
                serial_number: None,
            },
        ]
    }

    #[test]
    fn json_lists_paths_and_serials() {
        let value: serde_json::Value =
            serde_json::from_str(&render(&found(), OutputFormat::Json)).unwrap();
        assert_eq!(value[0]["path"], "/dev/ttyUSB0");
        assert_eq!(value[0]["serial_number"], "14A0");
        assert!(value[1]["serial_number"].is_null());
    }

    #[test]
    fn pretty_is_one_line_per_bridge() {
        assert_eq!(
            render(&found(), OutputFormat::Pretty),
            "/dev/ttyUSB0 14A0\n/dev/ttyUSB1"
        );
    }
}
