//! Resolution of a parsed configuration into concrete run settings.

use std::path::PathBuf;

use cosim_common::{BaudPeriod, Frequency};

use crate::error::ConfigError;
use crate::types::CosimConfig;

/// Fully resolved settings for one simulation run.
///
/// Every value here has been validated; the tick loop never has to reject a
/// setting once it has started.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSettings {
    /// DUT clock frequency.
    pub frequency: Frequency,
    /// Ticks per serial bit.
    pub baud: BaudPeriod,
    /// Ticks during which reset is held active.
    pub reset_ticks: u64,
    /// Leading ticks during which the serial line is not sampled.
    pub settle_ticks: u64,
    /// Directory for trace output files.
    pub trace_dir: PathBuf,
    /// Whether to record a VCD waveform.
    pub vcd: bool,
    /// Whether to open the plain-text trace log.
    pub text_trace: bool,
    /// TCP port for the remote bitbang server, if enabled.
    pub debug_port: Option<u16>,
    /// Byte that ends a reference SoC run.
    pub finish_byte: u8,
    /// Greeting sent by the reference SoC.
    pub banner: String,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            frequency: Frequency::DESIGN_CLOCK,
            baud: BaudPeriod::DEFAULT,
            reset_ticks: 10,
            settle_ticks: 2,
            trace_dir: PathBuf::from("./log"),
            vcd: false,
            text_trace: false,
            debug_port: None,
            finish_byte: 0x04,
            banner: "echo soc ready\r\n".to_string(),
        }
    }
}

/// Resolves and validates a parsed configuration.
///
/// The baud period comes from `uart.baud_period` if set, from
/// `clock.frequency / uart.baud_rate` if that is set instead, and defaults
/// to `0x1B8` otherwise.
pub fn resolve_settings(config: &CosimConfig) -> Result<SimSettings, ConfigError> {
    let frequency = config
        .clock
        .frequency
        .parse::<Frequency>()
        .map_err(|e| ConfigError::invalid("clock.frequency", e.to_string()))?;

    let baud = match (config.uart.baud_period, config.uart.baud_rate) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::invalid(
                "uart.baud_period",
                "mutually exclusive with uart.baud_rate",
            ))
        }
        (Some(ticks), None) => BaudPeriod::new(ticks)
            .map_err(|e| ConfigError::invalid("uart.baud_period", e.to_string()))?,
        (None, Some(rate)) => BaudPeriod::from_rate(frequency, rate).map_err(|e| {
            ConfigError::invalid("uart.baud_rate", format!("{rate} at {frequency}: {e}"))
        })?,
        (None, None) => BaudPeriod::DEFAULT,
    };

    if config.clock.settle_ticks > config.clock.reset_ticks {
        return Err(ConfigError::invalid(
            "clock.settle_ticks",
            format!(
                "{} must not exceed clock.reset_ticks ({})",
                config.clock.settle_ticks, config.clock.reset_ticks
            ),
        ));
    }

    if config.debug.enabled && config.debug.port == 0 {
        return Err(ConfigError::invalid("debug.port", "must be non-zero"));
    }

    Ok(SimSettings {
        frequency,
        baud,
        reset_ticks: config.clock.reset_ticks,
        settle_ticks: config.clock.settle_ticks,
        trace_dir: config.trace.dir.clone(),
        vcd: config.trace.vcd,
        text_trace: config.trace.text,
        debug_port: config.debug.enabled.then_some(config.debug.port),
        finish_byte: config.model.finish_byte,
        banner: config.model.banner.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    #[test]
    fn default_settings() {
        let s = SimSettings::default();
        assert_eq!(s.baud, BaudPeriod::DEFAULT);
        assert_eq!(s.reset_ticks, 10);
        assert_eq!(s.settle_ticks, 2);
        assert_eq!(s.debug_port, None);
        assert_eq!(s.frequency, Frequency::DESIGN_CLOCK);
    }

    #[test]
    fn empty_config_resolves_to_defaults() {
        let s = resolve_settings(&CosimConfig::default()).unwrap();
        assert_eq!(s, SimSettings::default());
    }

    #[test]
    fn explicit_baud_period() {
        let config = load_config_from_str("[uart]\nbaud_period = 0x10\n").unwrap();
        let s = resolve_settings(&config).unwrap();
        assert_eq!(s.baud.ticks(), 16);
    }

    #[test]
    fn baud_rate_uses_clock_frequency() {
        let config =
            load_config_from_str("[clock]\nfrequency = \"10MHz\"\n[uart]\nbaud_rate = 9600\n")
                .unwrap();
        let s = resolve_settings(&config).unwrap();
        assert_eq!(s.baud.ticks(), 1042);
    }

    #[test]
    fn bad_frequency_names_field() {
        let mut config = CosimConfig::default();
        config.clock.frequency = "fast".into();
        let err = resolve_settings(&config).unwrap_err();
        assert_eq!(err.field(), Some("clock.frequency"));
        assert_eq!(
            err.to_string(),
            "invalid clock.frequency: invalid frequency: 'fast'"
        );
    }

    #[test]
    fn debug_port_only_when_enabled() {
        let config = load_config_from_str("[debug]\nport = 4444\n").unwrap();
        assert_eq!(resolve_settings(&config).unwrap().debug_port, None);

        let config = load_config_from_str("[debug]\nenabled = true\nport = 4444\n").unwrap();
        assert_eq!(resolve_settings(&config).unwrap().debug_port, Some(4444));
    }
}
