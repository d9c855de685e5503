//! Public client
//!
//! [`SyncClient`] ties the reconciliation engine, the cron scheduler and the
//! IP watcher together behind one object per provider account.
//!
//! ## Triggers
//!
//! - On demand: [`SyncClient::sync_record`], [`SyncClient::sync_records`]
//! - On a schedule: [`SyncClient::sync_by_cron_time`]
//! - On IP change: [`SyncClient::sync_on_ip_change`]
//!
//! Scheduled and reactive syncs report through [`SyncOptions::on_result`];
//! without a callback their outcome is only logged.

use crate::config::EngineConfig;
use crate::engine::{BatchResult, Reconciler};
use crate::error::{Error, Result};
use crate::record::{DesiredRecord, ProviderRecord, RecordType};
use crate::schedule::{self, ScheduleHandle};
use crate::traits::{DnsProvider, IpSource};
use crate::watch::{IpWatcher, WatchOptions};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Callback receiving the outcome of a scheduled or reactive sync
pub type SyncCallback = Arc<dyn Fn(Result<BatchResult>) + Send + Sync>;

/// Options for scheduled and reactive syncs
#[derive(Clone, Default)]
pub struct SyncOptions {
    /// Fixed content for records without their own; discovered when absent
    pub ip: Option<String>,
    /// Called after every sync
    pub on_result: Option<SyncCallback>,
}

impl SyncOptions {
    /// Use a fixed IP
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Report every sync to `callback`
    pub fn on_result<F>(mut self, callback: F) -> Self
    where
        F: Fn(Result<BatchResult>) + Send + Sync + 'static,
    {
        self.on_result = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("ip", &self.ip)
            .field("on_result", &self.on_result.is_some())
            .finish()
    }
}

/// Identifier of an IP-change listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Dynamic DNS sync client for one provider account
pub struct SyncClient {
    reconciler: Arc<Reconciler>,
    listeners: Mutex<HashMap<ListenerId, IpWatcher>>,
    next_listener: AtomicU64,
    watch_options: WatchOptions,
}

impl SyncClient {
    /// Create a client with the default engine settings
    pub fn new(provider: Arc<dyn DnsProvider>, ip_source: Arc<dyn IpSource>) -> Result<Self> {
        Self::with_config(provider, ip_source, EngineConfig::default())
    }

    /// Create a client with explicit engine settings
    pub fn with_config(
        provider: Arc<dyn DnsProvider>,
        ip_source: Arc<dyn IpSource>,
        config: EngineConfig,
    ) -> Result<Self> {
        Ok(Self {
            reconciler: Arc::new(Reconciler::new(provider, ip_source, config)?),
            listeners: Mutex::new(HashMap::new()),
            next_listener: AtomicU64::new(1),
            watch_options: WatchOptions::default(),
        })
    }

    /// Override the IP polling interval of future listeners (tests)
    pub fn with_poll_interval(mut self, period: std::time::Duration) -> Self {
        self.watch_options.period = period;
        self
    }

    /// The underlying engine
    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Sync one record
    pub async fn sync_record(&self, record: &DesiredRecord, ip: Option<&str>) -> Result<ProviderRecord> {
        self.reconciler.sync_one(record, ip).await
    }

    /// Sync a batch, failing with the first record error in input order
    ///
    /// Records that were written before the failure stay written; use
    /// [`SyncClient::sync_records_detailed`] to see which.
    pub async fn sync_records(
        &self,
        records: &[DesiredRecord],
        ip: Option<&str>,
    ) -> Result<Vec<ProviderRecord>> {
        self.reconciler.sync_many(records, ip).await?.into_result()
    }

    /// Sync a batch and report every record's outcome
    pub async fn sync_records_detailed(
        &self,
        records: &[DesiredRecord],
        ip: Option<&str>,
    ) -> Result<BatchResult> {
        self.reconciler.sync_many(records, ip).await
    }

    /// Delete one record (type `A` when absent)
    pub async fn remove_record(&self, name: &str, record_type: Option<RecordType>) -> Result<()> {
        self.reconciler.remove(name, record_type).await
    }

    /// Every record of a domain's zone
    pub async fn get_record_data_for_domain(&self, domain: &str) -> Result<Vec<ProviderRecord>> {
        self.reconciler.record_data_for_domain(domain).await
    }

    /// Every record of several domains' zones
    pub async fn get_record_data_for_domains<S: AsRef<str>>(
        &self,
        domains: &[S],
    ) -> Result<BTreeMap<String, Vec<ProviderRecord>>> {
        self.reconciler.record_data_for_domains(domains).await
    }

    /// The provider record matching `record`
    pub async fn get_record_data_for_record(&self, record: &DesiredRecord) -> Result<ProviderRecord> {
        self.reconciler.record_data_for_record(record).await
    }

    /// Every provider record matching one of `records`
    pub async fn get_record_data_for_records(
        &self,
        records: &[DesiredRecord],
    ) -> Result<Vec<ProviderRecord>> {
        self.reconciler.record_data_for_records(records).await
    }

    /// Sync `records` at every instant matching `expression`
    ///
    /// A malformed expression fails here, before anything is scheduled.
    /// The schedule runs until the handle is stopped or dropped.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn sync_by_cron_time(
        &self,
        expression: &str,
        records: Vec<DesiredRecord>,
        options: SyncOptions,
    ) -> Result<ScheduleHandle> {
        ensure_records(&records)?;

        let reconciler = Arc::clone(&self.reconciler);
        let records: Arc<[DesiredRecord]> = records.into();
        let options = Arc::new(options);

        schedule::spawn(expression, move || {
            let reconciler = Arc::clone(&reconciler);
            let records = Arc::clone(&records);
            let options = Arc::clone(&options);
            async move {
                info!("Scheduled sync of {} record(s)", records.len());
                run_and_report(&reconciler, &records, &options, None).await;
            }
        })
    }

    /// Sync `records` now and again after every IP change
    ///
    /// The first sync runs as soon as the listener starts. Each listener
    /// polls independently until [`SyncClient::stop_sync_on_ip_change`].
    /// Unless `options.ip` is set, records without content are written with
    /// the IPv4 address the listener observed; AAAA records are discovered.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn sync_on_ip_change(
        &self,
        records: Vec<DesiredRecord>,
        options: SyncOptions,
    ) -> Result<ListenerId> {
        ensure_records(&records)?;

        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let reconciler = Arc::clone(&self.reconciler);
        let records: Arc<[DesiredRecord]> = records.into();
        let options = Arc::new(options);

        let watcher = IpWatcher::spawn_with(
            Arc::clone(self.reconciler.ip_source()),
            WatchOptions {
                notify_initial: true,
                ..self.watch_options
            },
            move |ip| {
                let reconciler = Arc::clone(&reconciler);
                let records = Arc::clone(&records);
                let options = Arc::clone(&options);
                async move {
                    info!("Syncing {} record(s) for IP {} ({})", records.len(), ip, id);
                    run_and_report(&reconciler, &records, &options, Some(ip)).await;
                }
            },
        );

        self.lock_listeners()?.insert(id, watcher);
        info!("Registered IP change {}", id);
        Ok(id)
    }

    /// Stop an IP-change listener
    ///
    /// Returns `false` when the id is unknown or was already stopped.
    pub async fn stop_sync_on_ip_change(&self, id: ListenerId) -> bool {
        let watcher = match self.lock_listeners() {
            Ok(mut listeners) => listeners.remove(&id),
            Err(e) => {
                error!("Cannot stop {}: {}", id, e);
                return false;
            }
        };

        match watcher {
            Some(watcher) => {
                watcher.stop().await;
                info!("Stopped IP change {}", id);
                true
            }
            None => {
                warn!("Unknown IP change {}", id);
                false
            }
        }
    }

    /// Number of running IP-change listeners
    pub fn listener_count(&self) -> usize {
        self.lock_listeners().map(|l| l.len()).unwrap_or_default()
    }

    /// Current public IPv4 address
    pub async fn get_ip(&self) -> Result<Ipv4Addr> {
        self.reconciler.ip_source().current_v4().await
    }

    /// Current public IPv6 address
    pub async fn get_ipv6(&self) -> Result<Ipv6Addr> {
        self.reconciler.ip_source().current_v6().await
    }

    fn lock_listeners(&self) -> Result<std::sync::MutexGuard<'_, HashMap<ListenerId, IpWatcher>>> {
        self.listeners
            .lock()
            .map_err(|_| Error::config("listener registry poisoned"))
    }
}

impl fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncClient")
            .field("reconciler", &self.reconciler)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn ensure_records(records: &[DesiredRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(Error::config("No records to sync"));
    }
    Ok(())
}

/// Sync and hand the outcome to the callback
///
/// A fixed `options.ip` wins over the IPv4 address the watcher `observed`.
async fn run_and_report(
    reconciler: &Reconciler,
    records: &[DesiredRecord],
    options: &SyncOptions,
    observed: Option<Ipv4Addr>,
) {
    let result = match (options.ip.as_deref(), observed) {
        (None, Some(ip)) => reconciler.sync_many_observed(records, ip).await,
        (ip, _) => reconciler.sync_many(records, ip).await,
    };

    match &result {
        Ok(batch) if !batch.is_success() => {
            warn!("{} of {} record(s) failed to sync", batch.failed().count(), batch.len())
        }
        Ok(_) => {}
        Err(e) => error!("Sync failed: {}", e),
    }

    if let Some(callback) = &options.on_result {
        callback(result);
    }
}
