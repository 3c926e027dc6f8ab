//! Vantage-point server
//!
//! Accepts control connections, connects back to the announced address and
//! reports whether the token went through. Each control connection is
//! handled on its own task; nothing is shared between them except a cap on
//! how many run at once. Connections over the cap are closed unanswered.
//! Only literal IP addresses are ever called back.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use ddns_core::Result;
use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::wire::{
    MAX_MESSAGE_LEN, REPLY_CANNOT_CONNECT, REPLY_INVALID_FORMAT, REPLY_SEND_FAILED, REPLY_SENT,
    TOKEN_LEN, parse_announcement,
};

/// Default listen port of the vantage point
pub const DEFAULT_PROBE_PORT: u16 = 8066;

/// Time allowed for connecting back to the announced address
pub const CALLBACK_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time a client gets to send its announcement
pub const ANNOUNCEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Control connections handled at once by default
pub const DEFAULT_MAX_HANDLERS: usize = 64;

/// TCP call-back probe server
#[derive(Debug)]
pub struct ProbeServer {
    listener: TcpListener,
    connect_timeout: Duration,
    max_handlers: usize,
}

impl ProbeServer {
    /// Bind the control listener
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            connect_timeout: CALLBACK_CONNECT_TIMEOUT,
            max_handlers: DEFAULT_MAX_HANDLERS,
        })
    }

    /// Override the call-back connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the number of control connections handled at once
    pub fn with_max_handlers(mut self, max_handlers: usize) -> Self {
        self.max_handlers = max_handlers.max(1);
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves
    ///
    /// Accept errors are logged and do not stop the server. Handlers still
    /// in flight when `shutdown` resolves are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Probe server listening on {}", self.local_addr()?);
        let handlers = Arc::new(Semaphore::new(self.max_handlers));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Probe server shutting down");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let permit = match Arc::clone(&handlers).try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => {
                                warn!(
                                    "Dropping control connection from {}: {} handlers busy",
                                    peer, self.max_handlers
                                );
                                continue;
                            }
                        };
                        debug!("Control connection from {}", peer);
                        let connect_timeout = self.connect_timeout;
                        tokio::spawn(async move {
                            if let Err(e) = handle_client(stream, connect_timeout).await {
                                warn!("Control connection from {} failed: {}", peer, e);
                            }
                            drop(permit);
                        });
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                }
            }
        }
    }
}

async fn handle_client(mut stream: TcpStream, connect_timeout: Duration) -> std::io::Result<()> {
    let mut buf = vec![0u8; MAX_MESSAGE_LEN];
    let n = match tokio::time::timeout(ANNOUNCEMENT_TIMEOUT, stream.read(&mut buf)).await {
        Ok(read) => read?,
        Err(_) => {
            debug!("Client sent nothing within {:?}", ANNOUNCEMENT_TIMEOUT);
            return Ok(());
        }
    };
    if n == 0 {
        debug!("No data received from client");
        return Ok(());
    }

    let text = String::from_utf8_lossy(&buf[..n]);
    let reply = match parse_announcement(&text) {
        Ok(target) => call_back(target, connect_timeout).await,
        Err(e) => {
            debug!("Invalid announcement {:?}: {}", text.trim(), e);
            REPLY_INVALID_FORMAT
        }
    };

    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}

async fn call_back(addr: SocketAddr, connect_timeout: Duration) -> &'static str {
    let mut target = match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(target)) => target,
        Ok(Err(e)) => {
            debug!("Cannot connect to {}: {}", addr, e);
            return REPLY_CANNOT_CONNECT;
        }
        Err(_) => {
            debug!("Connecting to {} timed out", addr);
            return REPLY_CANNOT_CONNECT;
        }
    };

    let token = random_token();
    match target.write_all(token.as_bytes()).await {
        Ok(()) => {
            // Best effort; the token is already on the wire
            let _ = target.shutdown().await;
            debug!("Token delivered to {}", addr);
            REPLY_SENT
        }
        Err(e) => {
            debug!("Sending token to {} failed: {}", addr, e);
            REPLY_SEND_FAILED
        }
    }
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
