// # ddnsd - DDNS reconciliation runner
//
// ⚠️ ARCHITECTURAL CONSTRAINTS ⚠️
//
// - This is a THIN integration layer ONLY
// - DO NOT add selection, probing or publishing logic here
// - All DDNS logic MUST be in ddns-core
//
// The ddnsd binary is responsible for:
// 1. Reading configuration (JSON file + environment overrides)
// 2. Initializing logging and the runtime
// 3. Wiring the interface source, TCP probe and Cloudflare provider
// 4. Running ONE reconciliation pass and printing the report
//
// Scheduling repeated passes (cron, systemd timer) is the caller's job.
//
// ## Configuration
//
// ### File
// - `DDNS_CONFIG`: Path to the JSON config file (default `conf/config.json`)
//
// ### Overrides
// - `DDNS_PROVIDER_API_TOKEN`, `DDNS_PROVIDER_EMAIL`, `DDNS_PROVIDER_ZONE_ID`
// - `DDNS_DOMAIN`, `DDNS_RECORD_NAME`
// - `DDNS_PROBE_SERVER`, `DDNS_PROBE_PORT`, `DDNS_PROBE_TIMEOUT`
// - `DDNS_IP_VERSION` (v4, v6, both), `DDNS_IP_INTERFACE`
//
// ### Runner
// - `DDNS_MODE`: `live` (default) or `dry-run`
// - `DDNS_OUTPUT`: `text` (default) or `json`
// - `DDNS_LOG_LEVEL`: trace, debug, info (default), warn, error
// - `DDNS_CLOUDFLARE_API_BASE`: Cloudflare API base override
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_API_TOKEN=your_token
// export DDNS_PROVIDER_ZONE_ID=your_zone
// export DDNS_DOMAIN=example.com
// export DDNS_RECORD_NAME=home
// export DDNS_PROBE_SERVER=probe.example.net
// export DDNS_PROBE_PORT=8066
//
// DDNS_OUTPUT=json ddnsd
// ```

use anyhow::Result;
use ddns_core::{DdnsConfig, Reconciler, ReconciliationResult};
use ddns_ip_local::LocalAddressSource;
use ddns_probe_tcp::TcpCallbackProbe;
use ddns_provider_cloudflare::CloudflareProvider;
use ddnsd::output::PassReport;
use ddnsd::settings::{OutputFormat, RunSettings};
use ddnsd::{DdnsExitCode, init_tracing};
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn main() -> ExitCode {
    // Load runner settings from environment
    let settings = match RunSettings::from_lookup(env_lookup) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(settings.log_level) {
        eprintln!("{}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Load and validate reconciler configuration
    let config = match settings.load_config(env_lookup) {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration validation error: {}", e);
            let report = PassReport::failure(
                &settings.echo_config(env_lookup),
                format!("configuration error: {}", e),
            );
            return emit(&report, settings.output, DdnsExitCode::ConfigError);
        }
    };

    info!(
        "Starting ddnsd pass for {} [mode: {}]",
        config.record_fqdn(),
        if settings.dry_run { "DRY-RUN" } else { "LIVE" }
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            let report =
                PassReport::failure(&config, format!("failed to start runtime: {}", e));
            return emit(&report, settings.output, DdnsExitCode::RuntimeError);
        }
    };

    let result = match rt.block_on(run_pass(&config, &settings)) {
        Ok(result) => result,
        Err(e) => {
            error!("Runner error: {}", e);
            let report = PassReport::failure(&config, format!("runner error: {}", e));
            return emit(&report, settings.output, DdnsExitCode::RuntimeError);
        }
    };

    let code = if result.is_success() {
        DdnsExitCode::Success
    } else {
        DdnsExitCode::PassFailed
    };
    emit(&PassReport::new(&config, &result), settings.output, code)
}

/// Print the report on stdout and return `code`
fn emit(report: &PassReport, format: OutputFormat, code: DdnsExitCode) -> ExitCode {
    match report.render(format) {
        Ok(rendered) => {
            println!("{}", rendered);
            code.into()
        }
        Err(e) => {
            error!("Failed to encode report: {}", e);
            DdnsExitCode::RuntimeError.into()
        }
    }
}

/// Wire the components and run one pass
async fn run_pass(config: &DdnsConfig, settings: &RunSettings) -> Result<ReconciliationResult> {
    let mut provider = CloudflareProvider::from_config(config, settings.dry_run)?
        .with_timeout(config.probe_timeout())?;
    if let Some(api_base) = &settings.api_base {
        info!("Using Cloudflare API base {}", api_base);
        provider = provider.with_api_base(api_base.clone());
    }

    let reconciler = Reconciler::new(
        Box::new(LocalAddressSource::from_config(config)),
        Box::new(TcpCallbackProbe::new()),
        Box::new(provider),
        config,
    )?;

    Ok(reconciler.run().await)
}
