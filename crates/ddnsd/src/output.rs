//! Pass report printed on stdout

use ddns_core::{DdnsConfig, ReconciliationResult};
use serde::Serialize;
use std::fmt;

use crate::settings::OutputFormat;

/// Process-level output of one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub message: String,
    #[serde(rename = "serverIP")]
    pub server_ip: String,
    #[serde(rename = "serverPort")]
    pub server_port: u16,
    pub timeout: u64,
    /// Published address, empty when nothing was published
    #[serde(rename = "ipAddr")]
    pub ip_addr: String,
}

impl PassReport {
    pub fn new(config: &DdnsConfig, result: &ReconciliationResult) -> Self {
        Self {
            message: result.message.clone(),
            server_ip: config.server_ip.clone(),
            server_port: config.server_port,
            timeout: config.timeout_secs,
            ip_addr: result.published_address(),
        }
    }

    /// Report for a pass that could not run at all
    ///
    /// Echo fields come from whatever configuration was available.
    pub fn failure(config: &DdnsConfig, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            server_ip: config.server_ip.clone(),
            server_port: config.server_port,
            timeout: config.timeout_secs,
            ip_addr: String::new(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render in the selected stdout format
    pub fn render(&self, format: OutputFormat) -> serde_json::Result<String> {
        match format {
            OutputFormat::Text => Ok(self.to_string()),
            OutputFormat::Json => self.to_json(),
        }
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "result: {}", self.message)?;
        writeln!(f, "serverIP: {}", self.server_ip)?;
        writeln!(f, "serverPort: {}", self.server_port)?;
        writeln!(f, "timeout: {}", self.timeout)?;
        write!(f, "ipAddr: {}", self.ip_addr)
    }
}
