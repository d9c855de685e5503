//! Zone directory
//!
//! Maps registrable domains to provider zone ids. The map starts empty and is
//! filled lazily: a lookup miss rebuilds it wholesale from the provider's zone
//! listing and retries once. Domains added to the account after the last
//! rebuild are therefore picked up on the next miss.
//!
//! ## Concurrency
//!
//! The map lives behind an [`ArcSwap`]. Readers take a snapshot without
//! locking; a rebuild builds a fresh map and swaps it in whole, so no reader
//! ever observes a partially-built map. Two concurrent misses may both rebuild;
//! the last swap wins and both results are equivalent.

use crate::error::{Error, Result};
use crate::pagination::paginate;
use crate::record::Zone;
use crate::traits::DnsProvider;
use arc_swap::ArcSwap;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Lazily-refreshed domain → zone id map
pub struct ZoneDirectory {
    provider: Arc<dyn DnsProvider>,
    zones: ArcSwap<HashMap<String, String>>,
    page_size: u32,
    refreshes: AtomicUsize,
}

impl ZoneDirectory {
    /// Create an empty directory backed by `provider`
    pub fn new(provider: Arc<dyn DnsProvider>, page_size: u32) -> Self {
        Self {
            provider,
            zones: ArcSwap::from_pointee(HashMap::new()),
            page_size,
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Zone id of a registrable domain
    ///
    /// Rebuilds the map at most once per call. Fails with
    /// [`Error::DomainNotFound`] when the domain is still absent afterwards.
    pub async fn zone_id_for(&self, domain: &str) -> Result<String> {
        let domain = domain.to_ascii_lowercase();

        let cached = self.zones.load().get(&domain).cloned();
        if let Some(id) = cached {
            return Ok(id);
        }

        debug!("Zone for {} not cached, refreshing zone map", domain);
        self.refresh().await?;

        self.zones
            .load()
            .get(&domain)
            .cloned()
            .ok_or_else(|| Error::domain_not_found(domain))
    }

    /// Rebuild the map from the provider's full zone listing
    pub async fn refresh(&self) -> Result<()> {
        let provider = Arc::clone(&self.provider);

        let zones: Vec<Zone> = paginate(self.page_size, |page| {
            let provider = Arc::clone(&provider);
            async move { provider.list_zones(page).await }
        })
        .try_collect()
        .await?;

        let map: HashMap<String, String> = zones
            .into_iter()
            .map(|zone| (zone.name.to_ascii_lowercase(), zone.id))
            .collect();

        info!("Loaded {} zone(s) from {}", map.len(), self.provider.provider_name());

        self.zones.store(Arc::new(map));
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of completed rebuilds
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Number of known zones
    pub fn len(&self) -> usize {
        self.zones.load().len()
    }

    /// Whether no zone is known yet
    pub fn is_empty(&self) -> bool {
        self.zones.load().is_empty()
    }
}

impl std::fmt::Debug for ZoneDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneDirectory")
            .field("provider", &self.provider.provider_name())
            .field("zones", &self.len())
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}
