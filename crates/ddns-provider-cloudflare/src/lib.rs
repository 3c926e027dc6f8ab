// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 implementation of `DnsProvider`
// for the DDNS reconciler.
//
// ## Behaviour
//
// - ✅ One HTTP request per trait call (GET lookup, POST create, PUT update)
// - ✅ Bearer-token auth against a pre-configured zone
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Cloudflare's `success` / `errors` envelope checked on every response
// - ✅ Dry-run mode for safe testing
// - ✅ Both A and AAAA record support
// - ❌ NO retry logic (callers wrap `Reconciler::run()`)
// - ❌ NO caching (the record is fetched fresh on every pass)
// - ❌ NO zone auto-discovery (the zone ID is configuration)
//
// ### Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS API calls to the configured API base only
// - ✅ Parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Spawn tasks or threads
// - ❌ Decide between create and update (owned by `RecordStoreClient`)
// - ❌ Cache state beyond single request
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - Provider MUST fail fast if token or zone is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddns_core::traits::{DnsProvider, RecordPayload, RecordType, RemoteRecord};
use ddns_core::{DdnsConfig, Error, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Response envelope shared by every Cloudflare API v4 endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

impl<T> ApiResponse<T> {
    fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "request was not successful".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("[{}] {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Cloudflare DNS provider
///
/// # Trust Level: Untrusted
///
/// This provider is isolated, stateless, and single-shot. Deciding what to
/// write is owned by `RecordStoreClient`.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform GET requests (record lookup)
/// - Log the intended POST/PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Zone ID
    zone_id: String,

    /// API base URL (overridable for tests and proxies)
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone holding the managed record
    /// - `dry_run`: If true, perform GET requests but skip writes
    ///
    /// # Errors
    ///
    /// `Error::Config` when the token or zone is empty, `Error::Http` when the
    /// HTTP client cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        zone_id: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        let zone_id = zone_id.into();

        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        if zone_id.is_empty() {
            return Err(Error::config("Cloudflare zone ID cannot be empty"));
        }

        // Build HTTP client with timeout
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from the reconciler configuration
    pub fn from_config(config: &DdnsConfig, dry_run: bool) -> Result<Self> {
        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        Self::new(config.api_token.clone(), config.zone_id.clone(), dry_run)
    }

    /// Replace the per-request HTTP timeout
    ///
    /// # Errors
    ///
    /// `Error::Http` when the HTTP client cannot be rebuilt.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;
        Ok(self)
    }

    /// Point the provider at another API base (no trailing slash)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }

    fn record_url(&self, record_id: &str) -> String {
        format!("{}/{}", self.records_url(), record_id)
    }

    /// Send a request and unwrap the Cloudflare envelope
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<Option<T>> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| Error::provider("cloudflare", format!("HTTP request failed: {}", e)))?;

        // Handle specific HTTP status codes
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            return Err(match status.as_u16() {
                401 | 403 => Error::provider(
                    "cloudflare",
                    format!(
                        "Authentication failed: Invalid API token or insufficient permissions. Status: {}",
                        status
                    ),
                ),
                404 => Error::provider(
                    "cloudflare",
                    format!("{}: zone or record not found. Status: {}", context, status),
                ),
                409 => Error::provider(
                    "cloudflare",
                    format!("Conflict: Record is being updated by another process. Status: {}", status),
                ),
                429 => Error::provider(
                    "cloudflare",
                    format!("Rate limit exceeded. Please retry later. Status: {}", status),
                ),
                500..=599 => Error::provider(
                    "cloudflare",
                    format!("Cloudflare server error (transient): {} - {}", status, error_text),
                ),
                _ => Error::provider(
                    "cloudflare",
                    format!("{}: {} - {}", context, status, error_text),
                ),
            });
        }

        let body: ApiResponse<T> = response.json().await.map_err(|e| {
            Error::provider("cloudflare", format!("Failed to parse response: {}", e))
        })?;

        if !body.success {
            return Err(Error::provider(
                "cloudflare",
                format!("{}: {}", context, body.error_summary()),
            ));
        }

        Ok(body.result)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up the record by type and name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn find_record(
        &self,
        record_type: RecordType,
        name: &str,
    ) -> Result<Option<RemoteRecord>> {
        tracing::debug!("Looking up {} record {}", record_type, name);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("type", record_type.as_str()), ("name", name)]);

        let records: Vec<RemoteRecord> = self
            .execute(request, "Record lookup failed")
            .await
            .map_err(|e| Error::lookup(e.to_string()))?
            .unwrap_or_default();

        let record = records.into_iter().next();
        match &record {
            Some(r) => tracing::debug!("Found record {} -> {}", r.id, r.content),
            None => tracing::debug!("No {} record named {}", record_type, name),
        }
        Ok(record)
    }

    /// Create the record
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type":"A","name":"home.example.com","content":"203.0.113.5","ttl":120,"proxied":false}
    /// ```
    async fn create_record(&self, payload: &RecordPayload) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.records_url(),
                serde_json::to_string(payload)?
            );
            return Ok(());
        }

        let request = self.client.post(self.records_url()).json(payload);
        self.execute::<serde_json::Value>(request, "Failed to create record")
            .await
            .map_err(|e| Error::publish(e.to_string()))?;

        tracing::info!(
            "DNS record created successfully: {} -> {}",
            payload.name,
            payload.content
        );
        Ok(())
    }

    /// Overwrite the record with id `record_id`
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type":"A","name":"home.example.com","content":"203.0.113.5","ttl":120,"proxied":false}
    /// ```
    async fn update_record(&self, record_id: &str, payload: &RecordPayload) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                self.record_url(record_id),
                serde_json::to_string(payload)?
            );
            return Ok(());
        }

        let request = self.client.put(self.record_url(record_id)).json(payload);
        self.execute::<serde_json::Value>(request, "Failed to update record")
            .await
            .map_err(|e| Error::publish(e.to_string()))?;

        tracing::info!(
            "DNS record updated successfully: {} -> {}",
            payload.name,
            payload.content
        );
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
