// # dnsync-core
//
// Core library for keeping DNS records pointed at the current public IP.
//
// ## Architecture Overview
//
// - **DnsProvider**: trait for the remote zone/record API
// - **IpSource**: trait for public IP discovery
// - **ZoneDirectory**: lazily-refreshed domain → zone id map
// - **RecordResolver**: finds existing record ids, one listing per zone
// - **Reconciler**: create-or-update engine with defaults and validation
// - **SyncClient**: public facade with on-demand, cron and IP-change triggers
//
// ## Design Principles
//
// 1. **Library-First**: providers and IP sources are plugged in as traits
// 2. **Idempotency**: every sync converges on the desired state; re-running
//    it routes through the update path
// 3. **No hidden state**: the zone map is owned by one client instance and
//    record ids are resolved fresh on every call

pub mod client;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod pagination;
pub mod record;
pub mod resolver;
pub mod schedule;
pub mod traits;
pub mod validate;
pub mod watch;
pub mod zones;

mod task;

// Re-export core types for convenience
pub use client::{ListenerId, SyncCallback, SyncClient, SyncOptions};
pub use config::{Credentials, EngineConfig, SyncConfig};
pub use engine::{BatchResult, RecordOutcome, Reconciler};
pub use error::{Error, Result};
pub use record::{DesiredRecord, ProviderRecord, RecordKey, RecordPayload, RecordType, Zone};
pub use schedule::ScheduleHandle;
pub use traits::{DnsProvider, IpSource, IpVersion};
pub use watch::{IP_POLL_INTERVAL, IpWatcher, WatchOptions};
pub use zones::ZoneDirectory;
