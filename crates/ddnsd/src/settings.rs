//! Binary-level settings read from `DDNS_*` environment variables
//!
//! Reconciler configuration itself is `ddns_core::DdnsConfig`; this module
//! only covers the knobs that change how the binary runs.

use anyhow::Result;
use ddns_core::DdnsConfig;
use std::path::PathBuf;
use tracing::Level;

use crate::parse_log_level;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "conf/config.json";

/// Report format on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Runner settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub config_path: PathBuf,
    pub dry_run: bool,
    pub output: OutputFormat,
    pub log_level: Level,
    /// Cloudflare API base override
    pub api_base: Option<String>,
}

impl RunSettings {
    /// Read settings through `lookup` (the process environment in `main`)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dry_run = match get("DDNS_MODE").as_deref().map(str::trim) {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!(
                "DDNS_MODE '{}' is not valid. Valid modes: live, dry-run",
                other
            ),
        };

        let output = match get("DDNS_OUTPUT").map(|v| v.trim().to_lowercase()).as_deref() {
            None | Some("text") => OutputFormat::Text,
            Some("json") => OutputFormat::Json,
            Some(other) => anyhow::bail!(
                "DDNS_OUTPUT '{}' is not valid. Valid formats: text, json",
                other
            ),
        };

        let log_level = match get("DDNS_LOG_LEVEL") {
            Some(v) => parse_log_level(&v)?,
            None => Level::INFO,
        };

        Ok(Self {
            config_path: get("DDNS_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            dry_run,
            output,
            log_level,
            api_base: get("DDNS_CLOUDFLARE_API_BASE"),
        })
    }

    /// Load, override and validate the reconciler configuration
    pub fn load_config<F>(&self, lookup: F) -> Result<DdnsConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DdnsConfig::load(&self.config_path)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Best-effort configuration for echoing in a failure report
    ///
    /// Unreadable files and bad overrides are skipped rather than reported.
    pub fn echo_config<F>(&self, lookup: F) -> DdnsConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DdnsConfig::load(&self.config_path).unwrap_or_default();
        // Overrides before the failing key still apply
        if let Err(e) = config.apply_overrides(lookup) {
            tracing::debug!("Ignoring override error while building report: {}", e);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = RunSettings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.config_path, PathBuf::from("conf/config.json"));
        assert!(!settings.dry_run);
        assert_eq!(settings.output, OutputFormat::Text);
        assert_eq!(settings.log_level, Level::INFO);
        assert_eq!(settings.api_base, None);
    }

    #[test]
    fn test_overrides() {
        let settings = RunSettings::from_lookup(lookup(&[
            ("DDNS_MODE", "dry-run"),
            ("DDNS_OUTPUT", "JSON"),
            ("DDNS_LOG_LEVEL", "debug"),
            ("DDNS_CONFIG", "/etc/ddns/config.json"),
        ]))
        .unwrap();

        assert!(settings.dry_run);
        assert_eq!(settings.output, OutputFormat::Json);
        assert_eq!(settings.log_level, Level::DEBUG);
        assert_eq!(settings.config_path, PathBuf::from("/etc/ddns/config.json"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(RunSettings::from_lookup(lookup(&[("DDNS_MODE", "maybe")])).is_err());
        assert!(RunSettings::from_lookup(lookup(&[("DDNS_OUTPUT", "yaml")])).is_err());
    }

    #[test]
    fn test_load_config_from_env_only() {
        let vars = [
            ("DDNS_PROVIDER_API_TOKEN", "token"),
            ("DDNS_PROVIDER_ZONE_ID", "zone"),
            ("DDNS_DOMAIN", "example.com"),
            ("DDNS_RECORD_NAME", "home"),
            ("DDNS_PROBE_SERVER", "198.51.100.1"),
            ("DDNS_PROBE_PORT", "8066"),
            ("DDNS_CONFIG", "/nonexistent/ddns/config.json"),
        ];
        let settings = RunSettings::from_lookup(lookup(&vars)).unwrap();
        let config = settings.load_config(lookup(&vars)).unwrap();

        assert_eq!(config.record_fqdn(), "home.example.com");
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn test_echo_config_survives_invalid_config() {
        let vars = [
            ("DDNS_CONFIG", "/nonexistent/ddns/config.json"),
            ("DDNS_PROBE_SERVER", "198.51.100.1"),
            ("DDNS_PROBE_PORT", "8066"),
        ];
        let settings = RunSettings::from_lookup(lookup(&vars)).unwrap();
        assert!(settings.load_config(lookup(&vars)).is_err());

        let echo = settings.echo_config(lookup(&vars));
        assert_eq!(echo.server_ip, "198.51.100.1");
        assert_eq!(echo.server_port, 8066);
    }

    #[test]
    fn test_load_config_rejects_incomplete() {
        let vars = [("DDNS_CONFIG", "/nonexistent/ddns/config.json")];
        let settings = RunSettings::from_lookup(lookup(&vars)).unwrap();
        assert!(settings.load_config(lookup(&vars)).is_err());
    }
}
