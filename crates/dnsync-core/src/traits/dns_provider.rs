// # DNS Provider Trait
//
// Defines the remote contract the reconciliation engine consumes.
//
// ## Implementations
//
// - Cloudflare: `dnsync-cloudflare` crate
//
// ## Contract
//
// - `list_zones` / `list_records` are paginated; a page shorter than
//   `page.per_page` is the last one (see `pagination::paginate`)
// - `create_record` / `edit_record` return the provider's representation of
//   the written record
// - `delete_record` returns nothing
//
// Every method is a single remote call. Retries, caching and matching are
// owned by the core, never by the provider.

use crate::error::Result;
use crate::pagination::Page;
use crate::record::{ProviderRecord, RecordPayload, Zone};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List one page of the account's zones
    async fn list_zones(&self, page: Page) -> Result<Vec<Zone>>;

    /// List one page of the records in a zone
    async fn list_records(&self, zone_id: &str, page: Page) -> Result<Vec<ProviderRecord>>;

    /// Create a record in a zone
    async fn create_record(&self, zone_id: &str, payload: &RecordPayload)
    -> Result<ProviderRecord>;

    /// Overwrite an existing record
    async fn edit_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderRecord>;

    /// Delete a record
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
