//! Configuration types for dnsync
//!
//! This module defines the configuration a sync client is built from.

use crate::record::DesiredRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Provider credentials
    pub credentials: Credentials,

    /// Records to keep in sync
    pub records: Vec<DesiredRecord>,

    /// Fixed IP used instead of the discovered one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Cron expression for scheduled syncs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration with default engine settings
    pub fn new(credentials: Credentials, records: Vec<DesiredRecord>) -> Self {
        Self {
            credentials,
            records,
            ip: None,
            schedule: None,
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.credentials.validate()?;

        if self.records.is_empty() {
            return Err(crate::Error::config("No records configured"));
        }

        if let Some(record) = self.records.iter().find(|r| r.name.trim().is_empty()) {
            return Err(crate::Error::config(format!(
                "Record name cannot be empty: {:?}",
                record
            )));
        }

        if let Some(ref ip) = self.ip
            && ip.trim().is_empty()
        {
            return Err(crate::Error::config("Fixed IP cannot be empty"));
        }

        if let Some(ref expression) = self.schedule {
            crate::schedule::parse(expression)?;
        }

        self.engine.validate()
    }
}

/// Provider credentials
///
/// Either a scoped API token or an account email plus global API key. The
/// `Debug` implementation never prints the secret parts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// Scoped API token
    ApiToken {
        /// Token value
        token: String,
    },

    /// Account email and global API key
    GlobalKey {
        /// Account email
        email: String,
        /// Global API key
        key: String,
    },
}

impl Credentials {
    /// Token credentials
    pub fn token(token: impl Into<String>) -> Self {
        Credentials::ApiToken {
            token: token.into(),
        }
    }

    /// Email + global key credentials
    pub fn global_key(email: impl Into<String>, key: impl Into<String>) -> Self {
        Credentials::GlobalKey {
            email: email.into(),
            key: key.into(),
        }
    }

    /// Validate that no part is empty
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            Credentials::ApiToken { token } => {
                if token.trim().is_empty() {
                    return Err(crate::Error::config("API token cannot be empty"));
                }
            }
            Credentials::GlobalKey { email, key } => {
                if email.trim().is_empty() {
                    return Err(crate::Error::config("Account email cannot be empty"));
                }
                if key.trim().is_empty() {
                    return Err(crate::Error::config("Global API key cannot be empty"));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"<REDACTED>")
                .finish(),
            Credentials::GlobalKey { email, .. } => f
                .debug_struct("GlobalKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// TTL written when a record does not set one (1 = automatic)
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Page size used when listing a zone's records
    #[serde(default = "default_record_page_size")]
    pub record_page_size: u32,

    /// Page size used when listing the account's zones
    #[serde(default = "default_zone_page_size")]
    pub zone_page_size: u32,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.record_page_size == 0 {
            return Err(crate::Error::config("Record page size must be > 0"));
        }
        if self.zone_page_size == 0 {
            return Err(crate::Error::config("Zone page size must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            record_page_size: default_record_page_size(),
            zone_page_size: default_zone_page_size(),
        }
    }
}

fn default_ttl() -> u32 {
    1
}

fn default_record_page_size() -> u32 {
    100
}

fn default_zone_page_size() -> u32 {
    50
}
