//! `cosim run`: clock the reference SoC against the host console.
//!
//! Resolves settings from `cosim.toml` and flags, wires an [`EchoSoc`] to
//! stdin/stdout through the serial line model, runs until the SoC finishes,
//! and reports a summary on stderr. Stdout carries only UART bytes.

use cosim_config::SimSettings;
use cosim_sim::{simulate, EchoSoc, ResetTiming, RunConfig, RunSummary, StdConsole};
use log::info;

use crate::settings::{effective_settings, trace_path};
use crate::{GlobalArgs, ReportFormat, RunArgs};

/// Waveform file name inside the trace directory.
pub const VCD_FILE_NAME: &str = "tb.vcd";

/// Text trace file name inside the trace directory.
pub const TEXT_TRACE_FILE_NAME: &str = "tb.trace";

/// Runs the `cosim run` command.
///
/// Returns exit code 0 once the SoC requests the end of simulation.
pub fn run(args: &RunArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = effective_settings(global, Some(args))?;
    let config = run_config(&settings);

    info!(
        "simulating echo soc at {} ({}), reset {} ticks",
        settings.frequency, settings.baud, settings.reset_ticks
    );
    let soc = EchoSoc::new(
        settings.baud,
        settings.banner.as_bytes().to_vec(),
        settings.finish_byte,
    );
    let summary = simulate(soc, StdConsole::new(), &config)?;

    if args.format == ReportFormat::Json || !global.quiet {
        eprintln!("{}", render_summary(&summary, args.format, &config)?);
    }
    Ok(0)
}

/// Translates resolved settings into a simulator run configuration.
pub fn run_config(settings: &SimSettings) -> RunConfig {
    RunConfig {
        baud: settings.baud,
        timing: ResetTiming {
            reset_ticks: settings.reset_ticks,
            settle_ticks: settings.settle_ticks,
        },
        vcd_path: settings
            .vcd
            .then(|| trace_path(settings, VCD_FILE_NAME)),
        text_trace_path: settings
            .text_trace
            .then(|| trace_path(settings, TEXT_TRACE_FILE_NAME)),
        debug_port: settings.debug_port,
    }
}

/// Formats the end-of-run report.
pub fn render_summary(
    summary: &RunSummary,
    format: ReportFormat,
    config: &RunConfig,
) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Json => serde_json::to_string_pretty(summary),
        ReportFormat::Text => {
            let mut text = format!(
                "   Simulation finished after {} ticks ({} ns): {} bytes from DUT, {} bytes to DUT",
                summary.ticks, summary.end_time, summary.bytes_from_dut, summary.bytes_to_dut
            );
            if let Some(path) = &config.vcd_path {
                text.push_str(&format!("\n   Waveform: {}", path.display()));
            }
            Ok(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            ticks: 1200,
            bytes_from_dut: 17,
            bytes_to_dut: 3,
            end_time: 12_000,
            baud_period: 440,
        }
    }

    #[test]
    fn run_config_from_default_settings() {
        let config = run_config(&SimSettings::default());
        assert_eq!(config.timing, ResetTiming::DEFAULT);
        assert_eq!(config.baud.ticks(), 0x1B8);
        assert!(config.vcd_path.is_none());
        assert!(config.text_trace_path.is_none());
        assert!(config.debug_port.is_none());
    }

    #[test]
    fn trace_files_land_in_trace_dir() {
        let settings = SimSettings {
            vcd: true,
            text_trace: true,
            ..SimSettings::default()
        };
        let config = run_config(&settings);
        assert_eq!(config.vcd_path, Some(PathBuf::from("./log/tb.vcd")));
        assert_eq!(config.text_trace_path, Some(PathBuf::from("./log/tb.trace")));
    }

    #[test]
    fn text_summary() {
        let text = render_summary(&summary(), ReportFormat::Text, &RunConfig::default()).unwrap();
        assert!(text.contains("1200 ticks"));
        assert!(text.contains("17 bytes from DUT"));
        assert!(!text.contains("Waveform"));
    }

    #[test]
    fn text_summary_names_waveform() {
        let config = RunConfig {
            vcd_path: Some(PathBuf::from("log/tb.vcd")),
            ..RunConfig::default()
        };
        let text = render_summary(&summary(), ReportFormat::Text, &config).unwrap();
        assert!(text.contains("Waveform: log/tb.vcd"));
    }

    #[test]
    fn json_summary() {
        let json = render_summary(&summary(), ReportFormat::Json, &RunConfig::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ticks"], 1200);
        assert_eq!(value["bytes_to_dut"], 3);
        assert_eq!(value["baud_period"], 440);
    }
}
