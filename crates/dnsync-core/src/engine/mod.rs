//! Reconciliation engine
//!
//! The [`Reconciler`] brings provider records in line with a set of
//! [`DesiredRecord`]s. For every record it decides between create and update,
//! fills in defaults, validates content and issues exactly one write.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────┐
//!  DesiredRecord ─▶│  Reconciler  │
//!                  └──────────────┘
//!                         │
//!        ┌────────────────┼─────────────────┐
//!        ▼                ▼                 ▼
//! ┌─────────────┐  ┌──────────────┐  ┌──────────────┐
//! │  IpSource   │  │ZoneDirectory │  │RecordResolver│
//! │ (fill IPs)  │  │ (zone ids)   │  │ (record ids) │
//! └─────────────┘  └──────────────┘  └──────────────┘
//!                         │                 │
//!                         └────────┬────────┘
//!                                  ▼
//!                           ┌─────────────┐
//!                           │ DnsProvider │
//!                           └─────────────┘
//! ```
//!
//! ## Sync flow
//!
//! 1. Discover the current IP once per call, only if some record needs it
//! 2. Parse each record's registrable domain, build and validate its payload
//! 3. List each distinct zone once and match existing records by (name, type)
//! 4. Edit records that were found, create the rest, all concurrently
//!
//! Step 3 finishes before any write of step 4 starts. A record that fails in
//! step 2 or whose zone fails in step 3 is reported in the [`BatchResult`]
//! and makes no remote write. Writes are never skipped, even when the
//! provider already holds the same content.

mod batch;

pub use batch::{BatchResult, RecordOutcome};

use crate::config::EngineConfig;
use crate::domain::registrable_domain;
use crate::error::{Error, Result};
use crate::record::{DesiredRecord, ProviderRecord, RecordKey, RecordPayload, RecordType};
use crate::resolver::RecordResolver;
use crate::traits::{DnsProvider, IpSource};
use crate::validate::validate_content;
use crate::zones::ZoneDirectory;
use futures_util::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A record ready to be written
#[derive(Debug)]
struct Prepared {
    domain: String,
    payload: RecordPayload,
}

/// Content used for records that do not carry their own
#[derive(Debug, Default)]
struct Fill {
    v4: Option<String>,
    v6: Option<String>,
}

impl Fill {
    fn for_type(&self, record_type: &RecordType) -> Option<&str> {
        match record_type {
            RecordType::Aaaa => self.v6.as_deref(),
            _ => self.v4.as_deref(),
        }
    }
}

/// Record reconciliation engine
///
/// One instance per provider account. The zone directory it owns is shared
/// by every call on the instance; nothing else persists between calls.
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    ip_source: Arc<dyn IpSource>,
    zones: Arc<ZoneDirectory>,
    resolver: RecordResolver,
    config: EngineConfig,
}

impl Reconciler {
    /// Create a reconciler
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        ip_source: Arc<dyn IpSource>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;

        let zones = Arc::new(ZoneDirectory::new(
            Arc::clone(&provider),
            config.zone_page_size,
        ));
        let resolver = RecordResolver::new(
            Arc::clone(&provider),
            Arc::clone(&zones),
            config.record_page_size,
        );

        Ok(Self {
            provider,
            ip_source,
            zones,
            resolver,
            config,
        })
    }

    /// The zone directory shared by all calls
    pub fn zones(&self) -> &ZoneDirectory {
        &self.zones
    }

    /// The IP source used to fill record content
    pub fn ip_source(&self) -> &Arc<dyn IpSource> {
        &self.ip_source
    }

    /// Sync a single record
    pub async fn sync_one(&self, record: &DesiredRecord, ip: Option<&str>) -> Result<ProviderRecord> {
        self.sync_many(std::slice::from_ref(record), ip)
            .await?
            .into_iter()
            .next()
            .map(|outcome| outcome.result)
            .unwrap_or_else(|| Err(Error::config("No records to sync")))
    }

    /// Sync a batch of records
    ///
    /// `ip` fills the content of records that have none; when absent the
    /// current public IP is discovered once for the whole batch. The call
    /// itself fails only for an empty batch or a failed IP lookup; every
    /// other failure is reported on its record.
    pub async fn sync_many(&self, records: &[DesiredRecord], ip: Option<&str>) -> Result<BatchResult> {
        let fill = self.effective_ip(records, ip, None).await?;
        self.sync_filled(records, fill).await
    }

    /// Sync a batch with an IPv4 address that was already observed
    ///
    /// Records other than AAAA that have no content of their own are written
    /// with `observed_v4`; no IPv4 lookup is made. AAAA records are still
    /// filled by discovery.
    pub async fn sync_many_observed(
        &self,
        records: &[DesiredRecord],
        observed_v4: Ipv4Addr,
    ) -> Result<BatchResult> {
        let fill = self.effective_ip(records, None, Some(observed_v4)).await?;
        self.sync_filled(records, fill).await
    }

    async fn sync_filled(&self, records: &[DesiredRecord], fill: Fill) -> Result<BatchResult> {

        let prepared: Vec<Result<Prepared>> = records
            .iter()
            .map(|record| self.prepare(record, &fill))
            .collect();

        let mut wanted: HashMap<String, HashSet<RecordKey>> = HashMap::new();
        for p in prepared.iter().flatten() {
            wanted
                .entry(p.domain.clone())
                .or_default()
                .insert(p.payload.key());
        }

        debug!(
            "Resolving {} record(s) across {} zone(s)",
            records.len(),
            wanted.len()
        );
        let resolved = self.resolver.resolve_by_domain(&wanted).await;

        let writes = records.iter().zip(prepared).map(|(record, prepared)| {
            let resolved = &resolved;
            async move {
                let result = match prepared {
                    Ok(prepared) => self.write(prepared, resolved).await,
                    Err(e) => Err(e),
                };
                if let Err(ref e) = result {
                    warn!("Failed to sync {}: {}", record.name, e);
                }
                RecordOutcome {
                    name: record.name.clone(),
                    result,
                }
            }
        });

        let batch = BatchResult::new(join_all(writes).await);
        info!(
            "Synced {}/{} record(s) via {}",
            batch.succeeded().count(),
            batch.len(),
            self.provider.provider_name()
        );
        Ok(batch)
    }

    /// Delete the record with this name and type (`A` when absent)
    pub async fn remove(&self, name: &str, record_type: Option<RecordType>) -> Result<()> {
        let record_type = record_type.unwrap_or_default();
        let domain = registrable_domain(name)?;
        let key = RecordKey::new(name, &record_type);

        let record = self
            .resolver
            .zone_records(&domain)
            .await?
            .into_iter()
            .find(|record| record.key() == key)
            .ok_or_else(|| Error::record_not_found(name, record_type.as_str()))?;

        let zone_id = self.zones.zone_id_for(&domain).await?;
        self.provider.delete_record(&zone_id, &record.id).await?;

        info!("Removed {} ({})", record.name, record.record_type);
        Ok(())
    }

    /// Every record in the zone of `domain`
    pub async fn record_data_for_domain(&self, domain: &str) -> Result<Vec<ProviderRecord>> {
        let zone = registrable_domain(domain)?;
        self.resolver.zone_records(&zone).await
    }

    /// Every record in the zones of `domains`, keyed by the requested domain
    ///
    /// Domains sharing a zone cost a single listing.
    pub async fn record_data_for_domains<S: AsRef<str>>(
        &self,
        domains: &[S],
    ) -> Result<BTreeMap<String, Vec<ProviderRecord>>> {
        let requested = domains
            .iter()
            .map(|domain| {
                let domain = domain.as_ref();
                registrable_domain(domain).map(|zone| (domain.to_string(), zone))
            })
            .collect::<Result<Vec<_>>>()?;

        let zones: HashSet<String> = requested.iter().map(|(_, zone)| zone.clone()).collect();
        let mut listed = self.resolver.records_by_domain(&zones).await;

        let mut by_zone = HashMap::with_capacity(listed.len());
        for zone in zones {
            if let Some(records) = listed.remove(&zone) {
                by_zone.insert(zone, records?);
            }
        }

        Ok(requested
            .into_iter()
            .map(|(domain, zone)| {
                let records = by_zone.get(&zone).cloned().unwrap_or_default();
                (domain, records)
            })
            .collect())
    }

    /// The provider record matching `record`
    ///
    /// Without a type the first record of that name is returned.
    pub async fn record_data_for_record(&self, record: &DesiredRecord) -> Result<ProviderRecord> {
        let domain = registrable_domain(&record.name)?;

        self.resolver
            .zone_records(&domain)
            .await?
            .into_iter()
            .find(|candidate| record.matches(candidate))
            .ok_or_else(|| {
                Error::record_not_found(
                    &record.name,
                    record
                        .record_type
                        .as_ref()
                        .map_or("any", RecordType::as_str),
                )
            })
    }

    /// Every provider record matching one of `records`, one listing per zone
    pub async fn record_data_for_records(
        &self,
        records: &[DesiredRecord],
    ) -> Result<Vec<ProviderRecord>> {
        let mut order = Vec::new();
        let mut by_zone: HashMap<String, Vec<&DesiredRecord>> = HashMap::new();
        for record in records {
            let zone = registrable_domain(&record.name)?;
            if !by_zone.contains_key(&zone) {
                order.push(zone.clone());
            }
            by_zone.entry(zone).or_default().push(record);
        }

        let zones: HashSet<String> = order.iter().cloned().collect();
        let mut listed = self.resolver.records_by_domain(&zones).await;

        let mut found = Vec::new();
        for zone in order {
            let Some(listing) = listed.remove(&zone) else {
                continue;
            };
            let wanted = by_zone.get(&zone).map(Vec::as_slice).unwrap_or_default();
            found.extend(
                listing?
                    .into_iter()
                    .filter(|candidate| wanted.iter().any(|record| record.matches(candidate))),
            );
        }

        Ok(found)
    }

    /// Fetch the IPs the batch needs, and only those
    async fn effective_ip(
        &self,
        records: &[DesiredRecord],
        ip: Option<&str>,
        observed_v4: Option<Ipv4Addr>,
    ) -> Result<Fill> {
        if records.is_empty() {
            return Err(Error::config("No records to sync"));
        }

        if let Some(ip) = ip.map(str::trim).filter(|ip| !ip.is_empty()) {
            return Ok(Fill {
                v4: Some(ip.to_string()),
                v6: Some(ip.to_string()),
            });
        }

        let lacking: Vec<RecordType> = records
            .iter()
            .filter(|record| own_content(record).is_none())
            .map(DesiredRecord::effective_type)
            .collect();

        let mut fill = Fill::default();
        if lacking.iter().any(|t| *t != RecordType::Aaaa) {
            let ip = match observed_v4 {
                Some(ip) => ip,
                None => self.ip_source.current_v4().await?,
            };
            debug!("Current IPv4: {}", ip);
            fill.v4 = Some(ip.to_string());
        }
        if lacking.contains(&RecordType::Aaaa) {
            let ip = self.ip_source.current_v6().await?;
            debug!("Current IPv6: {}", ip);
            fill.v6 = Some(ip.to_string());
        }
        Ok(fill)
    }

    /// Parse the domain, apply defaults and validate one record
    fn prepare(&self, record: &DesiredRecord, fill: &Fill) -> Result<Prepared> {
        let domain = registrable_domain(&record.name)?;
        let record_type = record.effective_type();

        let content = own_content(record)
            .or_else(|| fill.for_type(&record_type))
            .ok_or_else(|| Error::validation(&record.name, "", "record content"))?
            .to_string();

        validate_content(&record.name, &record_type, &content)?;

        Ok(Prepared {
            domain,
            payload: RecordPayload {
                name: record.name.trim().trim_end_matches('.').to_ascii_lowercase(),
                record_type,
                content,
                ttl: record.ttl.unwrap_or(self.config.default_ttl),
                proxied: record.proxied,
                priority: record.priority,
            },
        })
    }

    /// Edit the record if it was resolved, create it otherwise
    async fn write(
        &self,
        prepared: Prepared,
        resolved: &HashMap<String, Result<HashMap<RecordKey, String>>>,
    ) -> Result<ProviderRecord> {
        let record_id = match resolved.get(&prepared.domain) {
            Some(Ok(ids)) => ids.get(&prepared.payload.key()).cloned(),
            Some(Err(e)) => return Err(e.clone()),
            None => None,
        };

        let zone_id = self.zones.zone_id_for(&prepared.domain).await?;
        let payload = &prepared.payload;

        match record_id {
            Some(record_id) => {
                let record = self.provider.edit_record(&zone_id, &record_id, payload).await?;
                info!("Updated {} ({}) -> {}", payload.name, payload.record_type, payload.content);
                Ok(record)
            }
            None => {
                let record = self.provider.create_record(&zone_id, payload).await?;
                info!("Created {} ({}) -> {}", payload.name, payload.record_type, payload.content);
                Ok(record)
            }
        }
    }
}

/// The record's own content, if it carries a non-empty one
fn own_content(record: &DesiredRecord) -> Option<&str> {
    record
        .content
        .as_deref()
        .map(str::trim)
        .filter(|content| !content.is_empty())
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider.provider_name())
            .field("zones", &self.zones)
            .field("config", &self.config)
            .finish()
    }
}
