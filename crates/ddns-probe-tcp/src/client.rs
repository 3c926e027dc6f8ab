//! Client side: the reachability capability

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use ddns_core::traits::{ReachabilityCapability, VantagePoint};
use ddns_core::{Error, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::wire::{MAX_MESSAGE_LEN, format_announcement, is_success_reply};

/// TCP call-back reachability test
///
/// For each call:
/// 1. Listen on `candidate:0`
/// 2. Announce the listener to the vantage point
/// 3. Wait for the vantage point's reply
/// 4. On `SUCCESS`, wait for its call-back connection and a non-empty token
///
/// All waiting shares one deadline of `timeout` from the start of the call.
/// Once the announcement is sent, a missing reply, an `ERROR` reply or a
/// silent call-back is `Ok(false)`. The server may still be waiting on its
/// own connect-back timeout when the deadline passes. Failing to talk to
/// the vantage point at all is an error.
#[derive(Debug, Clone, Default)]
pub struct TcpCallbackProbe;

impl TcpCallbackProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ReachabilityCapability for TcpCallbackProbe {
    async fn test(
        &self,
        candidate: IpAddr,
        vantage: &VantagePoint,
        timeout: Duration,
    ) -> Result<bool> {
        let deadline = Instant::now() + timeout;

        let listener = TcpListener::bind(SocketAddr::new(candidate, 0))
            .await
            .map_err(|e| Error::probe(format!("cannot listen on {}: {}", candidate, e)))?;
        let local = listener.local_addr()?;
        debug!("Call-back listener on {}", local);

        let mut control = timeout_at(
            deadline,
            TcpStream::connect((vantage.address.as_str(), vantage.port)),
        )
        .await
        .map_err(|_| Error::probe(format!("timed out connecting to {}", vantage)))?
        .map_err(|e| Error::probe(format!("cannot connect to {}: {}", vantage, e)))?;

        control
            .write_all(format_announcement(local).as_bytes())
            .await
            .map_err(|e| Error::probe(format!("cannot announce to {}: {}", vantage, e)))?;

        let mut buf = vec![0u8; MAX_MESSAGE_LEN];
        let n = match timeout_at(deadline, control.read(&mut buf)).await {
            Ok(read) => read
                .map_err(|e| Error::probe(format!("reading reply from {}: {}", vantage, e)))?,
            Err(_) => {
                debug!("No reply from {} before the deadline", vantage);
                return Ok(false);
            }
        };
        if n == 0 {
            return Err(Error::probe(format!(
                "{} closed the connection without a reply",
                vantage
            )));
        }

        let reply = String::from_utf8_lossy(&buf[..n]);
        debug!("Vantage point replied: {}", reply.trim());
        if !is_success_reply(&reply) {
            return Ok(false);
        }

        let (mut callback, peer) = match timeout_at(deadline, listener.accept()).await {
            Ok(Ok(accepted)) => accepted,
            Ok(Err(e)) => {
                return Err(Error::probe(format!("accepting call-back on {}: {}", local, e)));
            }
            Err(_) => {
                debug!("No call-back on {} before the deadline", local);
                return Ok(false);
            }
        };

        match timeout_at(deadline, callback.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => {
                debug!("Received {} token bytes from {}", n, peer);
                Ok(true)
            }
            _ => {
                debug!("Call-back from {} carried no token", peer);
                Ok(false)
            }
        }
    }

    fn capability_name(&self) -> &'static str {
        "tcp-callback"
    }
}
