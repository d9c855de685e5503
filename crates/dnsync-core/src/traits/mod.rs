//! Core traits for dnsync
//!
//! This module defines the abstract interfaces to the two remote collaborators.
//!
//! - [`DnsProvider`]: zones and records at the DNS provider
//! - [`IpSource`]: public IP discovery

pub mod ip_source;
pub mod dns_provider;

pub use ip_source::{IpSource, IpVersion};
pub use dns_provider::DnsProvider;
