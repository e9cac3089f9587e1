//! The `cosim` command-line driver for the co-simulation harness.
//!
//! Provides `cosim run` to clock the reference SoC against the host console
//! and `cosim check` to validate a configuration file. Verilator-style
//! plusargs (`+vcd`, `+trace`) are accepted anywhere on the command line.

#![warn(missing_docs)]

mod check;
mod run;
mod settings;

use std::process;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

/// Clock-accurate co-simulation with UART line emulation.
#[derive(Parser, Debug)]
#[command(name = "cosim", version, about = "HDL co-simulation driver")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `cosim.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run; `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clock the reference SoC against stdin/stdout until it finishes.
    Run(RunArgs),
    /// Load and validate the configuration, then print the effective settings.
    Check,
}

/// Arguments for the `cosim run` subcommand.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Record a VCD waveform to `<log-dir>/tb.vcd` (plusarg `+vcd`).
    #[arg(long)]
    pub vcd: bool,

    /// Open the text trace log `<log-dir>/tb.trace` (plusarg `+trace`).
    #[arg(long)]
    pub trace: bool,

    /// Directory for trace output.
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Ticks per serial bit, overriding the configuration.
    #[arg(long, value_parser = parse_ticks)]
    pub baud_period: Option<u32>,

    /// Start the remote bitbang JTAG server.
    #[arg(long)]
    pub jtag: bool,

    /// TCP port for the remote bitbang server (implies `--jtag`).
    #[arg(long)]
    pub jtag_port: Option<u16>,

    /// Format of the run summary printed to stderr.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Run summary output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    #[default]
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

impl GlobalArgs {
    /// Log level selected by `--quiet` / `--verbose`.
    pub fn log_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::Error
        } else if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

/// Accepts decimal or `0x`-prefixed hexadecimal tick counts.
fn parse_ticks(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid tick count '{s}': {e}"))
}

/// Global options that consume the following argument.
const GLOBAL_VALUE_OPTIONS: &[&str] = &["--config"];

/// Index of the subcommand token, skipping global options and their values.
fn subcommand_index(args: &[String]) -> Option<usize> {
    let mut i = 1;
    while i < args.len() {
        let arg = args[i].as_str();
        if GLOBAL_VALUE_OPTIONS.contains(&arg) {
            i += 2;
        } else if arg.starts_with('-') {
            i += 1;
        } else {
            return Some(i);
        }
    }
    None
}

/// Rewrites Verilator-style plusargs into `run` flags.
///
/// `+vcd` and `+trace` are removed from wherever they appear. They become
/// `--vcd` / `--trace` at the end of a `run` command line; with no
/// subcommand, `run` is inserted so the flags have somewhere to land. Other
/// subcommands do not start a simulation and drop them.
pub fn rewrite_plusargs<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut out = Vec::new();
    let mut flags = Vec::new();
    for arg in args {
        match arg.as_str() {
            "+vcd" => flags.push("--vcd".to_string()),
            "+trace" => flags.push("--trace".to_string()),
            _ => out.push(arg),
        }
    }
    if flags.is_empty() {
        return out;
    }
    let subcommand = subcommand_index(&out).map(|i| out[i].clone());
    match subcommand.as_deref() {
        Some("run") => out.extend(flags),
        Some(_) => {}
        None => {
            out.push("run".to_string());
            out.extend(flags);
        }
    }
    out
}

fn init_logging(global: &GlobalArgs) {
    env_logger::Builder::new()
        .filter_level(global.log_level())
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse_from(rewrite_plusargs(std::env::args()));

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Some(Command::Run(ref args)) => run::run(args, &global),
        None => run::run(&RunArgs::default(), &global),
        Some(Command::Check) => check::run(&global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
