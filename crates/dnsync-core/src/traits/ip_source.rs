// # IP Source Trait
//
// Defines how the engine discovers the caller's current public IP.
//
// ## Implementations
//
// - HTTP lookup services with fallback: `dnsync-ip-http` crate
//
// Change detection is not part of this trait: `watch::IpWatcher` polls
// `current_v4()` on a fixed delay.

use crate::error::Result;
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

/// Trait for public IP discovery
///
/// Implementations must be thread-safe and usable across async tasks. Each
/// call performs a fresh lookup; caching would hide IP changes from the
/// watcher.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Current public IPv4 address
    async fn current_v4(&self) -> Result<Ipv4Addr>;

    /// Current public IPv6 address
    async fn current_v6(&self) -> Result<Ipv6Addr>;

    /// Current public address of the given version
    async fn current(&self, version: IpVersion) -> Result<IpAddr> {
        match version {
            IpVersion::V4 => self.current_v4().await.map(IpAddr::V4),
            IpVersion::V6 => self.current_v6().await.map(IpAddr::V6),
        }
    }
}
