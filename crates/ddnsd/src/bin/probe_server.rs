// # ddns-probe-server - TCP call-back vantage point
//
// Runs on an externally reachable host. `ddnsd` connects here, announces a
// listener, and this server connects back to prove reachability.
//
// ## Configuration
//
// - `DDNS_PROBE_LISTEN`: Listen address (default `0.0.0.0:8066`)
// - `DDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// Runs until SIGINT or SIGTERM.

use anyhow::Result;
use ddns_probe_tcp::{DEFAULT_PROBE_PORT, ProbeServer};
use ddnsd::{DdnsExitCode, init_tracing, parse_log_level};
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

fn main() -> ExitCode {
    let log_level = match env::var("DDNS_LOG_LEVEL") {
        Ok(value) if !value.trim().is_empty() => match parse_log_level(&value) {
            Ok(level) => level,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return DdnsExitCode::ConfigError.into();
            }
        },
        _ => Level::INFO,
    };

    if let Err(e) = init_tracing(log_level) {
        eprintln!("{}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let listen = env::var("DDNS_PROBE_LISTEN")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| format!("0.0.0.0:{}", DEFAULT_PROBE_PORT));

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let server = match ProbeServer::bind(listen.as_str()).await {
            Ok(server) => server,
            Err(e) => {
                error!("Cannot listen on {}: {}", listen, e);
                return DdnsExitCode::ConfigError;
            }
        };

        let shutdown = async {
            match wait_for_shutdown().await {
                Ok(signal) => info!("Received shutdown signal: {}", signal),
                Err(e) => error!("Signal handling failed, shutting down: {}", e),
            }
        };

        match server.run_until(shutdown).await {
            Ok(()) => DdnsExitCode::Success,
            Err(e) => {
                error!("Probe server error: {}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
