//! Logging initialization.
//!
//! `tracing-subscriber` to stderr (stdout is reserved for command output),
//! pretty or JSON. RUST_LOG overrides the computed filter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ONNX Runtime logs session setup at info; keep it out of batch output.
const QUIET_TARGETS: &str = "ort=warn";

/// Filter directive for a configured level, with `--verbose` forcing debug.
fn filter_directive(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level };
    format!("{level},{QUIET_TARGETS}")
}

/// Initialize the logging subsystem.
pub fn init(level: &str, verbose: bool, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level, verbose)));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section, with CLI overrides.
pub fn init_from_config(
    config: &batchtag_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let json_format = json_logs_override || config.logging.format == "json";
    init(&config.logging.level, verbose_override, json_format);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_configured_level() {
        assert_eq!(filter_directive("warn", false), "warn,ort=warn");
    }

    #[test]
    fn test_verbose_forces_debug() {
        assert_eq!(filter_directive("error", true), "debug,ort=warn");
    }
}
