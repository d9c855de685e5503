//! Test doubles and common utilities for the sync contract tests
//!
//! `MockDnsProvider` keeps zones and records in memory, honours page sizes
//! the way the remote API does, and counts every call. `MockIpSource`
//! returns scripted addresses.

#![allow(dead_code)]

use dnsync_core::error::{Error, Result};
use dnsync_core::pagination::Page;
use dnsync_core::record::{ProviderRecord, RecordPayload, RecordType, Zone};
use dnsync_core::traits::{DnsProvider, IpSource};
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn page_of<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    let start = ((page.number - 1) * page.per_page) as usize;
    items
        .iter()
        .skip(start)
        .take(page.per_page as usize)
        .cloned()
        .collect()
}

/// In-memory DNS provider with call counters
#[derive(Default)]
pub struct MockDnsProvider {
    zones: Mutex<Vec<Zone>>,
    records: Mutex<HashMap<String, Vec<ProviderRecord>>>,
    failing_zones: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
    list_zones_calls: AtomicUsize,
    list_records_calls: Mutex<HashMap<String, usize>>,
    create_calls: AtomicUsize,
    edit_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockDnsProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Provider that already holds zones for `names`
    pub fn with_zones(names: &[&str]) -> Arc<Self> {
        let provider = Self::new();
        for name in names {
            provider.add_zone(name);
        }
        provider
    }

    /// Add a zone; its id is `zone-<name>`
    pub fn add_zone(&self, name: &str) -> String {
        let id = zone_id(name);
        self.zones.lock().unwrap().push(Zone {
            id: id.clone(),
            name: name.to_string(),
        });
        self.records.lock().unwrap().entry(id.clone()).or_default();
        id
    }

    /// Put a record into a zone without counting a call
    pub fn seed_record(&self, zone: &str, name: &str, record_type: RecordType, content: &str) -> String {
        let id = self.fresh_id();
        let record = provider_record(&id, zone, name, record_type, content, 1);
        self.records
            .lock()
            .unwrap()
            .entry(zone_id(zone))
            .or_default()
            .push(record);
        id
    }

    /// Make every listing of this zone's records fail
    pub fn fail_listing(&self, zone: &str) {
        self.failing_zones.lock().unwrap().insert(zone_id(zone));
    }

    /// Current records of a zone
    pub fn records_in(&self, zone: &str) -> Vec<ProviderRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&zone_id(zone))
            .cloned()
            .unwrap_or_default()
    }

    pub fn list_zones_calls(&self) -> usize {
        self.list_zones_calls.load(Ordering::SeqCst)
    }

    /// Record-listing calls over all zones, counting every page
    pub fn list_records_calls(&self) -> usize {
        self.list_records_calls.lock().unwrap().values().sum()
    }

    /// Record-listing calls for one zone, counting every page
    pub fn list_records_calls_for(&self, zone: &str) -> usize {
        self.list_records_calls
            .lock()
            .unwrap()
            .get(&zone_id(zone))
            .copied()
            .unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn edit_calls(&self) -> usize {
        self.edit_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.create_calls() + self.edit_calls() + self.delete_calls()
    }

    fn fresh_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn zone_name(&self, zone_id: &str) -> Result<String> {
        self.zones
            .lock()
            .unwrap()
            .iter()
            .find(|zone| zone.id == zone_id)
            .map(|zone| zone.name.clone())
            .ok_or_else(|| Error::provider_status("mock", 404, format!("no zone {zone_id}")))
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_zones(&self, page: Page) -> Result<Vec<Zone>> {
        self.list_zones_calls.fetch_add(1, Ordering::SeqCst);
        Ok(page_of(&self.zones.lock().unwrap(), page))
    }

    async fn list_records(&self, zone_id: &str, page: Page) -> Result<Vec<ProviderRecord>> {
        *self
            .list_records_calls
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default() += 1;

        if self.failing_zones.lock().unwrap().contains(zone_id) {
            return Err(Error::provider_status("mock", 500, "listing failed"));
        }

        let records = self.records.lock().unwrap();
        let zone = records
            .get(zone_id)
            .ok_or_else(|| Error::provider_status("mock", 404, format!("no zone {zone_id}")))?;
        Ok(page_of(zone, page))
    }

    async fn create_record(&self, zone_id: &str, payload: &RecordPayload) -> Result<ProviderRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let zone = self.zone_name(zone_id)?;
        let id = self.fresh_id();
        let record = provider_record(
            &id,
            &zone,
            &payload.name,
            payload.record_type.clone(),
            &payload.content,
            payload.ttl,
        );
        self.records
            .lock()
            .unwrap()
            .entry(zone_id.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn edit_record(
        &self,
        zone_id: &str,
        record_id: &str,
        payload: &RecordPayload,
    ) -> Result<ProviderRecord> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(zone_id)
            .and_then(|zone| zone.iter_mut().find(|r| r.id == record_id))
            .ok_or_else(|| Error::provider_status("mock", 404, format!("no record {record_id}")))?;

        record.name = payload.name.clone();
        record.record_type = payload.record_type.clone();
        record.content = payload.content.clone();
        record.ttl = payload.ttl;
        Ok(record.clone())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        let zone = records
            .get_mut(zone_id)
            .ok_or_else(|| Error::provider_status("mock", 404, format!("no zone {zone_id}")))?;
        let before = zone.len();
        zone.retain(|r| r.id != record_id);
        if zone.len() == before {
            return Err(Error::provider_status("mock", 404, format!("no record {record_id}")));
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

pub fn zone_id(name: &str) -> String {
    format!("zone-{name}")
}

fn provider_record(
    id: &str,
    zone: &str,
    name: &str,
    record_type: RecordType,
    content: &str,
    ttl: u32,
) -> ProviderRecord {
    ProviderRecord {
        id: id.to_string(),
        zone_id: zone_id(zone),
        zone_name: zone.to_string(),
        name: name.to_string(),
        record_type,
        content: content.to_string(),
        ttl,
        proxied: false,
        proxiable: true,
        locked: false,
        created_on: None,
        modified_on: None,
        meta: Default::default(),
    }
}

/// Scripted IP source
pub struct MockIpSource {
    v4: Mutex<Option<Ipv4Addr>>,
    v6: Mutex<Option<Ipv6Addr>>,
    v4_calls: AtomicUsize,
    v6_calls: AtomicUsize,
}

impl MockIpSource {
    pub fn new(v4: Ipv4Addr) -> Arc<Self> {
        Arc::new(Self {
            v4: Mutex::new(Some(v4)),
            v6: Mutex::new(None),
            v4_calls: AtomicUsize::new(0),
            v6_calls: AtomicUsize::new(0),
        })
    }

    /// Source whose every lookup fails
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            v4: Mutex::new(None),
            v6: Mutex::new(None),
            v4_calls: AtomicUsize::new(0),
            v6_calls: AtomicUsize::new(0),
        })
    }

    /// Change the address returned by the next IPv4 lookups
    pub fn set_v4(&self, ip: Ipv4Addr) {
        *self.v4.lock().unwrap() = Some(ip);
    }

    pub fn set_v6(&self, ip: Ipv6Addr) {
        *self.v6.lock().unwrap() = Some(ip);
    }

    pub fn v4_calls(&self) -> usize {
        self.v4_calls.load(Ordering::SeqCst)
    }

    pub fn v6_calls(&self) -> usize {
        self.v6_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for MockIpSource {
    async fn current_v4(&self) -> Result<Ipv4Addr> {
        self.v4_calls.fetch_add(1, Ordering::SeqCst);
        (*self.v4.lock().unwrap()).ok_or_else(|| Error::ip_source("no IPv4 configured"))
    }

    async fn current_v6(&self) -> Result<Ipv6Addr> {
        self.v6_calls.fetch_add(1, Ordering::SeqCst);
        (*self.v6.lock().unwrap()).ok_or_else(|| Error::ip_source("no IPv6 configured"))
    }
}

/// Client over the given doubles with default engine settings
pub fn client(provider: &Arc<MockDnsProvider>, ip: &Arc<MockIpSource>) -> dnsync_core::SyncClient {
    dnsync_core::SyncClient::new(provider.clone(), ip.clone()).expect("client construction succeeds")
}
