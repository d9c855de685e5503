// # Cloudflare DNS Provider
//
// Cloudflare API v4 implementation of `dnsync_core::DnsProvider`.
//
// ## Scope
//
// - Lists zones and records one page per call; paging is driven by the core
// - Creates, edits and deletes records by zone id and record id
// - Authenticates with a scoped API token (Bearer) or an account email plus
//   global API key (`X-Auth-Email` / `X-Auth-Key`)
// - Makes exactly one HTTP request per trait call. No retries, backoff or
//   caching: failures are mapped to `Error::Provider` with the HTTP status
//
// ## Dry-Run Mode
//
// Listing calls go to the API as usual. Create, edit and delete are logged
// with their payload and answered locally without touching any record.
//
// ## Security
//
// Credentials never appear in logs or in `Debug` output.
//
// ## API Reference
//
// - List zones: GET `/zones?page=N&per_page=M`
// - List records: GET `/zones/:zone_id/dns_records?page=N&per_page=M`
// - Create record: POST `/zones/:zone_id/dns_records`
// - Edit record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use dnsync_core::pagination::Page;
use dnsync_core::record::{ProviderRecord, RecordPayload, Zone};
use dnsync_core::{Credentials, DnsProvider, Error, Result};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER: &str = "cloudflare";

/// Response envelope shared by every v4 endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
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

/// Body of a successful delete
#[derive(Debug, Deserialize)]
struct Deleted {
    #[allow(dead_code)]
    id: String,
}

/// Cloudflare DNS provider
pub struct CloudflareProvider {
    /// ⚠️ NEVER log this value
    credentials: Credentials,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// API root, overridable for tests
    base_url: String,

    /// Log writes instead of performing them
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider talking to the live API
    ///
    /// Fails with a configuration error when a credential part is empty.
    pub fn new(credentials: Credentials) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            client,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            dry_run: false,
        })
    }

    /// Point the provider at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }
        self.dry_run = dry_run;
        self
    }

    /// Whether writes are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Content-Type", "application/json");

        match &self.credentials {
            Credentials::ApiToken { token } => builder.bearer_auth(token),
            Credentials::GlobalKey { email, key } => builder
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    /// Send a request and unwrap the response envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, action: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(status_error(status, &body, action));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .map_err(|e| Error::Decode(format!("{}: {}", action, e)))?;

        if !envelope.success {
            return Err(Error::provider_status(
                PROVIDER,
                status.as_u16(),
                format!("{} failed: {}", action, describe(&envelope.errors)),
            ));
        }

        envelope
            .result
            .ok_or_else(|| Error::Decode(format!("{}: response has no result", action)))
    }

    fn dry_run_record(&self, zone_id: &str, record_id: &str, payload: &RecordPayload) -> ProviderRecord {
        ProviderRecord {
            id: record_id.to_string(),
            zone_id: zone_id.to_string(),
            zone_name: String::new(),
            name: payload.name.clone(),
            record_type: payload.record_type.clone(),
            content: payload.content.clone(),
            ttl: payload.ttl,
            proxied: payload.proxied.unwrap_or_default(),
            proxiable: false,
            locked: false,
            created_on: None,
            modified_on: None,
            meta: Default::default(),
        }
    }
}

/// Map a failed HTTP status to a provider error
fn status_error(status: StatusCode, body: &str, action: &str) -> Error {
    let detail = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .filter(|envelope| !envelope.errors.is_empty())
        .map(|envelope| describe(&envelope.errors))
        .unwrap_or_else(|| body.trim().to_string());

    let message = match status.as_u16() {
        401 | 403 => format!(
            "Authentication failed: invalid credentials or insufficient permissions. Status: {}",
            status
        ),
        404 => format!("{} failed: not found - {}", action, detail),
        409 => format!("Conflict: record is being updated by another process. Status: {}", status),
        429 => format!("Rate limit exceeded. Please retry later. Status: {}", status),
        500..=599 => format!("Cloudflare server error (transient): {} - {}", status, detail),
        _ => format!("{} failed: {} - {}", action, status, detail),
    };

    Error::provider_status(PROVIDER, status.as_u16(), message)
}

fn describe(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

fn page_query(page: Page) -> [(&'static str, u32); 2] {
    [("page", page.number), ("per_page", page.per_page)]
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    async fn list_zones(&self, page: Page) -> Result<Vec<Zone>> {
        tracing::debug!("Listing zones (page {})", page.number);

        let request = self.request(Method::GET, "/zones").query(&page_query(page));
        self.send(request, "Zone listing").await
    }

    async fn list_records(&self, zone_id: &str, page: Page) -> Result<Vec<ProviderRecord>> {
        tracing::debug!("Listing records of zone {} (page {})", zone_id, page.number);

        let request = self
            .request(Method::GET, &format!("/zones/{}/dns_records", zone_id))
            .query(&page_query(page));
        self.send(request, "Record listing").await
    }

    async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<ProviderRecord> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would POST /zones/{}/dns_records with payload: {}",
                zone_id,
                serde_json::to_string(payload)?
            );
            return Ok(self.dry_run_record(zone_id, "dry-run", payload));
        }

        let request = self
            .request(Method::POST, &format!("/zones/{}/dns_records", zone_id))
            .json(payload);
        self.send(request, "Record creation").await
    }

    async fn edit_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderRecord> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would PUT /zones/{}/dns_records/{} with payload: {}",
                zone_id,
                record_id,
                serde_json::to_string(payload)?
            );
            return Ok(self.dry_run_record(zone_id, record_id, payload));
        }

        let request = self
            .request(
                Method::PUT,
                &format!("/zones/{}/dns_records/{}", zone_id, record_id),
            )
            .json(payload);
        self.send(request, "Record update").await
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would DELETE /zones/{}/dns_records/{}",
                zone_id,
                record_id
            );
            return Ok(());
        }

        let request = self.request(
            Method::DELETE,
            &format!("/zones/{}/dns_records/{}", zone_id, record_id),
        );
        let _: Deleted = self.send(request, "Record deletion").await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}
