//! Configuration lookup and command-line overrides shared by all commands.

use std::path::{Path, PathBuf};

use cosim_config::{discover_config, load_config, resolve_settings, CosimConfig, SimSettings};

use crate::{GlobalArgs, RunArgs};

/// Loads the configuration named by `--config`, or `./cosim.toml` if present.
///
/// A `--config` naming a directory is searched for `cosim.toml`; a missing
/// file there yields the defaults, as in the current directory.
pub fn load_file_config(global: &GlobalArgs) -> Result<CosimConfig, Box<dyn std::error::Error>> {
    let config = match &global.config {
        Some(path) => {
            let p = PathBuf::from(path);
            if p.is_dir() {
                discover_config(&p)?
            } else {
                load_config(&p)?
            }
        }
        None => discover_config(&std::env::current_dir()?)?,
    };
    Ok(config)
}

/// Applies `run` flags on top of file values.
pub fn apply_overrides(config: &mut CosimConfig, args: &RunArgs) {
    if args.vcd {
        config.trace.vcd = true;
    }
    if args.trace {
        config.trace.text = true;
    }
    if let Some(dir) = &args.log_dir {
        config.trace.dir = PathBuf::from(dir);
    }
    if let Some(ticks) = args.baud_period {
        config.uart.baud_period = Some(ticks);
        config.uart.baud_rate = None;
    }
    if args.jtag {
        config.debug.enabled = true;
    }
    if let Some(port) = args.jtag_port {
        config.debug.enabled = true;
        config.debug.port = port;
    }
}

/// Loads, overrides and validates the settings for one invocation.
///
/// Validation runs after the overrides, so a flag can stand in for a bad
/// file value.
pub fn effective_settings(
    global: &GlobalArgs,
    args: Option<&RunArgs>,
) -> Result<SimSettings, Box<dyn std::error::Error>> {
    let mut config = load_file_config(global)?;
    if let Some(args) = args {
        apply_overrides(&mut config, args);
    }
    Ok(resolve_settings(&config)?)
}

/// Path of a trace file inside the configured trace directory.
pub fn trace_path(settings: &SimSettings, file_name: &str) -> PathBuf {
    Path::new(&settings.trace_dir).join(file_name)
}
