//! Configuration types deserialized from `cosim.toml`.
//!
//! Every section is optional; a missing file or an empty file yields the
//! settings the SoC harness has always run with.

use serde::Deserialize;
use std::path::PathBuf;

/// The top-level run configuration parsed from `cosim.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CosimConfig {
    /// Clock, reset and settle timing.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Serial line timing.
    #[serde(default)]
    pub uart: UartConfig,
    /// Waveform and text trace output.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Remote debug transport.
    #[serde(default)]
    pub debug: DebugConfig,
    /// Reference SoC model behaviour.
    #[serde(default)]
    pub model: ModelConfig,
}

/// Clock and reset sequencing.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClockConfig {
    /// The DUT clock frequency (e.g., "50MHz"), parsed to
    /// [`Frequency`](cosim_common::Frequency). Only used to derive a baud
    /// period from `uart.baud_rate`.
    #[serde(default = "default_frequency")]
    pub frequency: String,
    /// Number of ticks the active-low reset input is held at 0.
    #[serde(default = "default_reset_ticks")]
    pub reset_ticks: u64,
    /// Number of leading ticks during which the serial line is not sampled.
    #[serde(default = "default_settle_ticks")]
    pub settle_ticks: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            reset_ticks: default_reset_ticks(),
            settle_ticks: default_settle_ticks(),
        }
    }
}

fn default_frequency() -> String {
    "50MHz".to_string()
}

fn default_reset_ticks() -> u64 {
    10
}

fn default_settle_ticks() -> u64 {
    2
}

/// Serial line timing. At most one of the two fields may be set; with
/// neither, the SoC's default divisor of `0x1B8` is used.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UartConfig {
    /// Ticks per bit-time.
    pub baud_period: Option<u32>,
    /// Bits per second, converted to ticks using `clock.frequency`.
    pub baud_rate: Option<u32>,
}

/// Trace output settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceConfig {
    /// Directory receiving `tb.vcd` and `tb.trace`.
    #[serde(default = "default_trace_dir")]
    pub dir: PathBuf,
    /// Record a VCD waveform.
    #[serde(default)]
    pub vcd: bool,
    /// Open the plain-text trace log.
    #[serde(default)]
    pub text: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            dir: default_trace_dir(),
            vcd: false,
            text: false,
        }
    }
}

fn default_trace_dir() -> PathBuf {
    PathBuf::from("./log")
}

/// Remote bitbang debug transport settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Listen for a debug client.
    #[serde(default)]
    pub enabled: bool,
    /// Local TCP port to listen on.
    #[serde(default = "default_debug_port")]
    pub port: u16,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_debug_port(),
        }
    }
}

fn default_debug_port() -> u16 {
    9823
}

/// Settings for the bundled reference SoC.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Byte that, once received, makes the SoC finish the run.
    #[serde(default = "default_finish_byte")]
    pub finish_byte: u8,
    /// Greeting the SoC transmits after reset.
    #[serde(default = "default_banner")]
    pub banner: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            finish_byte: default_finish_byte(),
            banner: default_banner(),
        }
    }
}

fn default_finish_byte() -> u8 {
    0x04
}

fn default_banner() -> String {
    "echo soc ready\r\n".to_string()
}
