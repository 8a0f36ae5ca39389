use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

/// One-line identification, also answered by the shell's `ver`.
pub fn version_line() -> String {
    format!("linkprobe {}", env!("CARGO_PKG_VERSION"))
}

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("{}", version_line());
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("LINKPROBE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "wire: max frame {} bytes, max payload {} bytes",
        linkprobe_frame::MAX_WIRE_LEN,
        linkprobe_frame::MAX_PAYLOAD
    );
    println!("interactive: {}", cfg!(unix));

    Ok(SUCCESS)
}
