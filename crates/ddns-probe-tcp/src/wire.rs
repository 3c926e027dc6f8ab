//! Control-channel messages
//!
//! ```text
//! client ──► server   "203.0.113.5:41234" | "[2001:db8::5]:41234"
//! server ──► target   32 alphanumeric characters
//! server ──► client   "SUCCESS: Random value sent" | "ERROR: ..."
//! ```

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

/// Largest message either side reads in one go
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Length of the call-back token
pub const TOKEN_LEN: usize = 32;

/// Marker the client looks for in the server's reply
pub const SUCCESS_MARKER: &str = "SUCCESS";

pub const REPLY_SENT: &str = "SUCCESS: Random value sent";
pub const REPLY_INVALID_FORMAT: &str = "ERROR: Invalid address format";
pub const REPLY_CANNOT_CONNECT: &str = "ERROR: Cannot connect to specified address";
pub const REPLY_SEND_FAILED: &str = "ERROR: Failed to send random value";

/// Malformed announcement
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("missing closing bracket")]
    MissingBracket,

    #[error("missing port")]
    MissingPort,

    #[error("empty host")]
    EmptyHost,

    #[error("host is not an IP address: {0}")]
    InvalidHost(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Text the client sends to announce its call-back listener
pub fn format_announcement(listener: SocketAddr) -> String {
    // SocketAddr's Display already brackets IPv6
    listener.to_string()
}

/// Parse an announcement into the call-back address
///
/// Accepts `v4:port` and `[v6]:port`. Hostnames are rejected; the server
/// only ever connects to literal addresses.
pub fn parse_announcement(text: &str) -> Result<SocketAddr, WireError> {
    let text = text.trim();

    let (host, port) = if let Some(rest) = text.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or(WireError::MissingBracket)?;
        let port = tail.strip_prefix(':').ok_or(WireError::MissingPort)?;
        (host, port)
    } else {
        text.rsplit_once(':').ok_or(WireError::MissingPort)?
    };

    if host.is_empty() {
        return Err(WireError::EmptyHost);
    }
    let port = port
        .parse::<u16>()
        .ok()
        .filter(|p| *p != 0)
        .ok_or_else(|| WireError::InvalidPort(port.to_string()))?;

    let ip: IpAddr = host
        .parse()
        .map_err(|_| WireError::InvalidHost(host.to_string()))?;

    Ok(SocketAddr::new(ip, port))
}

/// Whether the server reports a delivered token
pub fn is_success_reply(reply: &str) -> bool {
    reply.contains(SUCCESS_MARKER)
}
