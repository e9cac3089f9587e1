//! `cosim check`: validate configuration and print the effective settings.

use cosim_config::SimSettings;

use crate::settings::effective_settings;
use crate::GlobalArgs;

/// Runs the `cosim check` command.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let settings = effective_settings(global, None)?;
    if !global.quiet {
        print!("{}", describe(&settings));
    }
    Ok(0)
}

/// Renders settings as `key = value` lines.
pub fn describe(settings: &SimSettings) -> String {
    let debug = match settings.debug_port {
        Some(port) => format!("remote bitbang on 127.0.0.1:{port}"),
        None => "disabled".to_string(),
    };
    let rate = settings.baud.bit_rate(settings.frequency);
    format!(
        "clock.frequency = {}\n\
         clock.reset_ticks = {}\n\
         clock.settle_ticks = {}\n\
         uart.baud_period = {:#x} ({})\n\
         uart.bit_rate = {rate:.0} bps\n\
         trace.dir = {}\n\
         trace.vcd = {}\n\
         trace.text = {}\n\
         debug = {debug}\n\
         model.finish_byte = {:#04x}\n\
         model.banner = {:?}\n",
        settings.frequency,
        settings.reset_ticks,
        settings.settle_ticks,
        settings.baud.ticks(),
        settings.baud,
        settings.trace_dir.display(),
        settings.vcd,
        settings.text_trace,
        settings.finish_byte,
        settings.banner,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_defaults() {
        let text = describe(&SimSettings::default());
        assert!(text.contains("clock.frequency = 50MHz\n"));
        assert!(text.contains("uart.baud_period = 0x1b8 (440 ticks/bit)\n"));
        assert!(text.contains("uart.bit_rate = 113636 bps\n"));
        assert!(text.contains("debug = disabled\n"));
        assert!(text.contains("model.finish_byte = 0x04\n"));
        assert!(text.contains("model.banner = \"echo soc ready\\r\\n\"\n"));
    }

    #[test]
    fn describe_debug_port() {
        let settings = SimSettings {
            debug_port: Some(9823),
            ..SimSettings::default()
        };
        assert!(describe(&settings).contains("debug = remote bitbang on 127.0.0.1:9823"));
    }
}
