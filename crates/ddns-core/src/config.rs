//! Configuration types for the DDNS system
//!
//! A [`DdnsConfig`] is built once at process start and handed to the
//! reconciler; nothing reads configuration from global state.
//!
//! ## Sources
//!
//! 1. A JSON file (missing file → [`DdnsConfig::default`])
//! 2. `DDNS_*` overrides applied with [`DdnsConfig::apply_overrides`]
//!
//! The file keys follow the established on-disk format:
//!
//! ```json
//! {
//!   "apiKey": "…",
//!   "email": "ops@example.com",
//!   "zoneID": "023e105f4ecef8ad9ca31a8372d0c353",
//!   "domain": "example.com",
//!   "recordName": "home",
//!   "serverIP": "198.51.100.1",
//!   "serverPort": 8066,
//!   "timeout": 10
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::publisher::record_fqdn;
use crate::traits::{AddressFamily, VantagePoint};

/// Default probe timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Longest accepted probe timeout (seconds)
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Main DDNS configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DdnsConfig {
    /// Provider API token
    /// ⚠️ NEVER log this value
    #[serde(rename = "apiKey")]
    pub api_token: String,

    /// Account e-mail (informational; bearer auth does not need it)
    pub email: String,

    /// Zone identifier at the provider
    #[serde(rename = "zoneID")]
    pub zone_id: String,

    /// Zone / domain name (e.g. "example.com")
    pub domain: String,

    /// Record label inside the zone; empty means the zone apex
    #[serde(rename = "recordName")]
    pub record_name: String,

    /// Vantage-point address (hostname or IP)
    #[serde(rename = "serverIP")]
    pub server_ip: String,

    /// Vantage-point port
    #[serde(rename = "serverPort")]
    pub server_port: u16,

    /// Probe timeout in seconds
    #[serde(rename = "timeout")]
    pub timeout_secs: u64,

    /// Address families to consider
    #[serde(rename = "ipVersion")]
    pub ip_version: IpVersion,

    /// Restrict enumeration to one interface (e.g. "eth0")
    pub interface: Option<String>,
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("api_token", &"<REDACTED>")
            .field("email", &self.email)
            .field("zone_id", &self.zone_id)
            .field("domain", &self.domain)
            .field("record_name", &self.record_name)
            .field("server_ip", &self.server_ip)
            .field("server_port", &self.server_port)
            .field("timeout_secs", &self.timeout_secs)
            .field("ip_version", &self.ip_version)
            .field("interface", &self.interface)
            .finish()
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            email: String::new(),
            zone_id: String::new(),
            domain: String::new(),
            record_name: String::new(),
            server_ip: String::new(),
            server_port: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            ip_version: IpVersion::default(),
            interface: None,
        }
    }
}

impl DdnsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, crate::Error> {
        serde_json::from_str(json)
            .map_err(|e| crate::Error::config(format!("Invalid configuration JSON: {}", e)))
    }

    /// Load a configuration file
    ///
    /// A missing file yields the default configuration. A file that exists
    /// but cannot be read or parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                tracing::debug!("Loaded configuration file {}", path.display());
                Self::from_json_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(crate::Error::config(format!(
                "Cannot read configuration file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Apply `DDNS_*` overrides
    ///
    /// `lookup` maps a variable name to its value; the daemon passes the
    /// process environment. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), crate::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DDNS_PROVIDER_API_TOKEN") {
            self.api_token = v;
        }
        if let Some(v) = get("DDNS_PROVIDER_EMAIL") {
            self.email = v;
        }
        if let Some(v) = get("DDNS_PROVIDER_ZONE_ID") {
            self.zone_id = v;
        }
        if let Some(v) = get("DDNS_DOMAIN") {
            self.domain = v;
        }
        if let Some(v) = lookup("DDNS_RECORD_NAME") {
            // An explicitly empty label selects the apex
            self.record_name = v.trim().to_string();
        }
        if let Some(v) = get("DDNS_PROBE_SERVER") {
            self.server_ip = v;
        }
        if let Some(v) = get("DDNS_PROBE_PORT") {
            self.server_port = v.trim().parse().map_err(|_| {
                crate::Error::config(format!("DDNS_PROBE_PORT is not a valid port: {}", v))
            })?;
        }
        if let Some(v) = get("DDNS_PROBE_TIMEOUT") {
            self.timeout_secs = v.trim().parse().map_err(|_| {
                crate::Error::config(format!("DDNS_PROBE_TIMEOUT is not a number: {}", v))
            })?;
        }
        if let Some(v) = get("DDNS_IP_VERSION") {
            self.ip_version = v.parse()?;
        }
        if let Some(v) = get("DDNS_IP_INTERFACE") {
            self.interface = Some(v);
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.api_token.is_empty() {
            return Err(crate::Error::config("API token cannot be empty"));
        }
        if self.zone_id.is_empty() {
            return Err(crate::Error::config("Zone ID cannot be empty"));
        }
        if self.domain.is_empty() {
            return Err(crate::Error::config("Domain cannot be empty"));
        }
        if self.domain.starts_with('.') || self.domain.ends_with('.') {
            return Err(crate::Error::config(format!(
                "Domain must not start or end with a dot: {}",
                self.domain
            )));
        }
        if self.record_name.starts_with('.') || self.record_name.ends_with('.') {
            return Err(crate::Error::config(format!(
                "Record name must not start or end with a dot: {}",
                self.record_name
            )));
        }
        if self.server_ip.is_empty() {
            return Err(crate::Error::config("Probe server address cannot be empty"));
        }
        if self.server_port == 0 {
            return Err(crate::Error::config("Probe server port must be > 0"));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Probe timeout must be between 1 and {} seconds. Got: {}",
                MAX_TIMEOUT_SECS, self.timeout_secs
            )));
        }
        if self.interface.as_ref().is_some_and(|i| i.is_empty()) {
            return Err(crate::Error::config("Interface name cannot be empty"));
        }

        Ok(())
    }

    /// Fully-qualified name of the managed record
    pub fn record_fqdn(&self) -> String {
        record_fqdn(&self.record_name, &self.domain)
    }

    /// Vantage point used by every probe
    pub fn vantage_point(&self) -> VantagePoint {
        VantagePoint::new(self.server_ip.clone(), self.server_port)
    }

    /// Probe timeout
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// IP versions to consider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4 only
    V4,
    /// IPv6 only
    V6,
    /// Both IPv4 and IPv6
    #[default]
    Both,
}

impl IpVersion {
    /// Whether candidates of `family` are considered
    pub fn includes(self, family: AddressFamily) -> bool {
        matches!(
            (self, family),
            (IpVersion::Both, _)
                | (IpVersion::V4, AddressFamily::Ipv4)
                | (IpVersion::V6, AddressFamily::Ipv6)
        )
    }
}

impl FromStr for IpVersion {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v4" | "ipv4" | "4" => Ok(IpVersion::V4),
            "v6" | "ipv6" | "6" => Ok(IpVersion::V6),
            "both" | "all" => Ok(IpVersion::Both),
            other => Err(crate::Error::config(format!(
                "IP version '{}' is not valid. Valid values: v4, v6, both",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn valid() -> DdnsConfig {
        DdnsConfig {
            api_token: "token-value".to_string(),
            zone_id: "zone".to_string(),
            domain: "example.com".to_string(),
            record_name: "home".to_string(),
            server_ip: "198.51.100.1".to_string(),
            server_port: 8066,
            ..DdnsConfig::default()
        }
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DdnsConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, DdnsConfig::default());
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.ip_version, IpVersion::Both);
    }

    #[test]
    fn test_file_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "apiKey": "abc",
                "email": "ops@example.com",
                "zoneID": "zone-1",
                "domain": "example.com",
                "recordName": "home",
                "serverIP": "198.51.100.1",
                "serverPort": 8066,
                "timeout": 5
            }}"#
        )
        .unwrap();

        let config = DdnsConfig::load(file.path()).unwrap();
        assert_eq!(config.api_token, "abc");
        assert_eq!(config.zone_id, "zone-1");
        assert_eq!(config.server_port, 8066);
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.record_fqdn(), "home.example.com");
        assert_eq!(config.vantage_point().to_string(), "198.51.100.1:8066");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            DdnsConfig::load(file.path()),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("DDNS_PROVIDER_API_TOKEN", "from-env"),
            ("DDNS_PROBE_PORT", "9000"),
            ("DDNS_PROBE_TIMEOUT", "3"),
            ("DDNS_IP_VERSION", "v6"),
            ("DDNS_RECORD_NAME", ""),
            ("DDNS_DOMAIN", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = valid();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_token, "from-env");
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.ip_version, IpVersion::V6);
        assert_eq!(config.record_name, "");
        assert_eq!(config.domain, "example.com");
        assert_eq!(config.record_fqdn(), "example.com");
    }

    #[test]
    fn test_override_rejects_bad_port() {
        let mut config = valid();
        let result = config.apply_overrides(|k| {
            (k == "DDNS_PROBE_PORT").then(|| "seventy".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(DdnsConfig::default().validate().is_err());

        let mut config = valid();
        config.api_token.clear();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.server_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_hides_token() {
        let mut config = valid();
        config.api_token = "secret_token_12345".to_string();
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn test_ip_version() {
        assert_eq!("IPv4".parse::<IpVersion>().unwrap(), IpVersion::V4);
        assert!("v5".parse::<IpVersion>().is_err());
        assert!(IpVersion::Both.includes(AddressFamily::Ipv6));
        assert!(!IpVersion::V4.includes(AddressFamily::Ipv6));
    }
}
