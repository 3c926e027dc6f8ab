// # ddnsd support library
//
// Shared plumbing for the `ddnsd` and `ddns-probe-server` binaries. This is a
// THIN integration layer: reconciliation logic lives in ddns-core.

pub mod output;
pub mod settings;

use anyhow::Result;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: Pass succeeded (record created, updated or already correct)
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
/// - 3: Pass finished but nothing usable was published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdnsExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    PassFailed = 3,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Parse a `DDNS_LOG_LEVEL` value
pub fn parse_log_level(value: &str) -> Result<Level> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "DDNS_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

/// Install the global tracing subscriber
///
/// Logs go to stderr; stdout is reserved for the pass report.
pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level(" warn ").unwrap(), Level::WARN);
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(DdnsExitCode::Success as u8, 0);
        assert_eq!(DdnsExitCode::PassFailed as u8, 3);
    }
}
