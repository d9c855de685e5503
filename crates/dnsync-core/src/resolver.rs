//! Record resolver
//!
//! Finds the provider-side ids of the records a batch is about to write.
//! Records are grouped by registrable domain and each domain's zone is listed
//! exactly once, however many of the batch's records live in it. Zones are
//! listed concurrently.
//!
//! Matching is by the case-insensitive (name, type) pair, so an `A` and an
//! `AAAA` record of the same name are never conflated.

use crate::error::Result;
use crate::pagination::paginate;
use crate::record::{ProviderRecord, RecordKey};
use crate::traits::DnsProvider;
use crate::zones::ZoneDirectory;
use futures_util::TryStreamExt;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Record ids found for one domain, keyed by (name, type)
pub type ResolvedIds = HashMap<RecordKey, String>;

/// Looks up existing records per zone
pub struct RecordResolver {
    provider: Arc<dyn DnsProvider>,
    zones: Arc<ZoneDirectory>,
    page_size: u32,
}

impl RecordResolver {
    /// Create a resolver sharing `zones` with the engine
    pub fn new(provider: Arc<dyn DnsProvider>, zones: Arc<ZoneDirectory>, page_size: u32) -> Self {
        Self {
            provider,
            zones,
            page_size,
        }
    }

    /// Every record in the zone of `domain`
    pub async fn zone_records(&self, domain: &str) -> Result<Vec<ProviderRecord>> {
        let zone_id = self.zones.zone_id_for(domain).await?;
        self.list_zone(&zone_id).await
    }

    async fn list_zone(&self, zone_id: &str) -> Result<Vec<ProviderRecord>> {
        let records: Vec<ProviderRecord> = paginate(self.page_size, |page| {
            self.provider.list_records(zone_id, page)
        })
        .try_collect()
        .await?;

        debug!("Listed {} record(s) in zone {}", records.len(), zone_id);
        Ok(records)
    }

    /// Resolve the wanted keys of every domain
    ///
    /// Each domain gets its own result: a domain whose zone is missing or
    /// whose listing fails does not affect the others. Keys without a
    /// provider-side record are simply absent from that domain's map.
    pub async fn resolve_by_domain(
        &self,
        wanted: &HashMap<String, HashSet<RecordKey>>,
    ) -> HashMap<String, Result<ResolvedIds>> {
        let lookups = wanted.iter().map(|(domain, keys)| async move {
            let ids = self.zone_records(domain).await.map(|records| {
                records
                    .into_iter()
                    .filter_map(|record| {
                        let key = record.key();
                        keys.contains(&key).then_some((key, record.id))
                    })
                    .collect::<ResolvedIds>()
            });
            (domain.clone(), ids)
        });

        join_all(lookups).await.into_iter().collect()
    }

    /// Provider records of every domain, listed once per domain
    pub async fn records_by_domain(
        &self,
        domains: &HashSet<String>,
    ) -> HashMap<String, Result<Vec<ProviderRecord>>> {
        let lookups = domains
            .iter()
            .map(|domain| async move { (domain.clone(), self.zone_records(domain).await) });

        join_all(lookups).await.into_iter().collect()
    }
}

impl std::fmt::Debug for RecordResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordResolver")
            .field("provider", &self.provider.provider_name())
            .field("page_size", &self.page_size)
            .finish()
    }
}
