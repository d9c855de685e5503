// # HTTP IP Source
//
// Discovers the public IP by asking external lookup services.
//
// ## Fallback chain
//
// Each IP family has an ordered list of services. A lookup asks them in
// order and returns the first answer that parses as an address of the
// requested family; a service that fails, times out or answers with the
// wrong family is skipped. Only when every service failed does the lookup
// fail, with the last error.
//
// No caching: every call is a fresh lookup, so the IP watcher sees changes.

use async_trait::async_trait;
use dnsync_core::{Error, IpSource, IpVersion, Result};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Default IPv4 lookup services, in fallback order
pub const DEFAULT_V4_SERVICES: &[&str] = &["https://api.ipify.org", "https://ipv4.icanhazip.com"];

/// Default IPv6 lookup services, in fallback order
pub const DEFAULT_V6_SERVICES: &[&str] = &["https://api6.ipify.org", "https://ipv6.icanhazip.com"];

/// Default HTTP timeout per service
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// IP source backed by HTTP lookup services
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    v4_services: Vec<String>,
    v6_services: Vec<String>,
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Source using the default services
    pub fn new() -> Result<Self> {
        Self::with_services(
            DEFAULT_V4_SERVICES.iter().map(|s| s.to_string()).collect(),
            DEFAULT_V6_SERVICES.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Source using custom services, each list in fallback order
    pub fn with_services(v4_services: Vec<String>, v6_services: Vec<String>) -> Result<Self> {
        if v4_services.is_empty() {
            return Err(Error::config("At least one IPv4 lookup service is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            v4_services,
            v6_services,
            client,
        })
    }

    /// Services asked for `version`, in order
    pub fn services(&self, version: IpVersion) -> &[String] {
        match version {
            IpVersion::V4 => &self.v4_services,
            IpVersion::V6 => &self.v6_services,
        }
    }

    /// Ask each service in turn until one answers with the right family
    async fn lookup(&self, version: IpVersion) -> Result<IpAddr> {
        let mut last_error = Error::ip_source(format!("No {:?} lookup service configured", version));

        for url in self.services(version) {
            match self.fetch(url, version).await {
                Ok(ip) => {
                    tracing::debug!("{} answered {}", url, ip);
                    return Ok(ip);
                }
                Err(e) => {
                    tracing::warn!("IP lookup via {} failed, trying next service: {}", url, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn fetch(&self, url: &str, version: IpVersion) -> Result<IpAddr> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!(
                "{} returned HTTP {}",
                url,
                response.status()
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response from {}: {}", url, e)))?;
        let text = text.trim();

        let ip: IpAddr = text
            .parse()
            .map_err(|_| Error::ip_source(format!("{} returned an invalid IP address: {}", url, text)))?;

        match (version, ip) {
            (IpVersion::V4, IpAddr::V4(_)) | (IpVersion::V6, IpAddr::V6(_)) => Ok(ip),
            _ => Err(Error::ip_source(format!(
                "{} returned {} but {:?} was requested",
                url, ip, version
            ))),
        }
    }
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current_v4(&self) -> Result<Ipv4Addr> {
        match self.lookup(IpVersion::V4).await? {
            IpAddr::V4(ip) => Ok(ip),
            IpAddr::V6(ip) => Err(Error::ip_source(format!("Expected IPv4, got: {}", ip))),
        }
    }

    async fn current_v6(&self) -> Result<Ipv6Addr> {
        match self.lookup(IpVersion::V6).await? {
            IpAddr::V6(ip) => Ok(ip),
            IpAddr::V4(ip) => Err(Error::ip_source(format!("Expected IPv6, got: {}", ip))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_services() {
        let source = HttpIpSource::new().unwrap();

        assert_eq!(source.services(IpVersion::V4).len(), 2);
        assert_eq!(source.services(IpVersion::V6)[0], "https://api6.ipify.org");
    }

    #[test]
    fn test_requires_ipv4_service() {
        assert!(matches!(
            HttpIpSource::with_services(Vec::new(), Vec::new()),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_no_ipv6_service_is_an_error() {
        let source = HttpIpSource::with_services(vec!["http://127.0.0.1:9".to_string()], Vec::new())
            .unwrap();

        assert!(matches!(source.current_v6().await, Err(Error::IpSource(_))));
    }
}
