//! Record data model
//!
//! - [`DesiredRecord`]: what the caller wants a record to look like
//! - [`ProviderRecord`]: what the provider currently holds
//! - [`RecordPayload`]: the body sent on create/edit
//! - [`RecordKey`]: the (name, type) identity used to match the two

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// DNS record type
///
/// Parsing is case-insensitive; display is upper case. Types without a
/// dedicated variant are kept verbatim in [`RecordType::Other`] and are
/// never content-validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    /// IPv4 address record
    #[default]
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
    /// Text record
    Txt,
    /// Name server record
    Ns,
    /// Mail exchange record
    Mx,
    /// Any other type, upper-cased
    Other(String),
}

impl RecordType {
    /// Upper-case wire name (e.g. `"AAAA"`)
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Mx => "MX",
            RecordType::Other(other) => other,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(crate::Error::config("Record type cannot be empty"));
        }
        Ok(match upper.as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "MX" => RecordType::Mx,
            _ => RecordType::Other(upper),
        })
    }
}

impl TryFrom<String> for RecordType {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

/// A record the caller wants to exist at the provider
///
/// `record_type` and `content` are optional: the engine defaults the type to
/// `A` and the content to the effective IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredRecord {
    /// Fully-qualified record name (e.g. "home.example.com")
    pub name: String,

    /// Record type; `A` when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<RecordType>,

    /// Record content; the effective IP when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Time-to-live in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,

    /// Whether the provider should proxy traffic for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,

    /// Priority (MX and similar)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl DesiredRecord {
    /// Create a desired record with only a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: None,
            content: None,
            ttl: None,
            proxied: None,
            priority: None,
        }
    }

    /// Set the record type
    pub fn with_type(mut self, record_type: RecordType) -> Self {
        self.record_type = Some(record_type);
        self
    }

    /// Set explicit content
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Set the proxied flag
    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = Some(proxied);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// The type this record is written with
    pub fn effective_type(&self) -> RecordType {
        self.record_type.clone().unwrap_or_default()
    }

    /// Identity key used to find the provider-side record for a write
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, &self.effective_type())
    }

    /// Whether a provider record is what this record asks about
    ///
    /// Without a type any record of that name matches.
    pub fn matches(&self, record: &ProviderRecord) -> bool {
        if !record.name.eq_ignore_ascii_case(&self.name) {
            return false;
        }
        match &self.record_type {
            Some(record_type) => record.record_type == *record_type,
            None => true,
        }
    }
}

/// Provider-side metadata flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    /// Added automatically by the provider
    #[serde(default)]
    pub auto_added: bool,
    /// Managed by a provider app
    #[serde(default)]
    pub managed_by_apps: bool,
    /// Managed by a tunnel
    #[serde(default)]
    pub managed_by_argo_tunnel: bool,
}

/// A record as held by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// Provider record id
    pub id: String,
    /// Zone id the record lives in
    #[serde(default)]
    pub zone_id: String,
    /// Zone name the record lives in
    #[serde(default)]
    pub zone_name: String,
    /// Record name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Record content
    pub content: String,
    /// TTL in seconds (1 = automatic)
    #[serde(default = "default_ttl")]
    pub ttl: u32,
    /// Whether traffic is proxied
    #[serde(default)]
    pub proxied: bool,
    /// Whether the record may be proxied
    #[serde(default)]
    pub proxiable: bool,
    /// Whether the record is locked
    #[serde(default)]
    pub locked: bool,
    /// Creation time
    #[serde(default)]
    pub created_on: Option<DateTime<Utc>>,
    /// Last modification time
    #[serde(default)]
    pub modified_on: Option<DateTime<Utc>>,
    /// Provider metadata
    #[serde(default)]
    pub meta: RecordMeta,
}

impl ProviderRecord {
    /// Identity key of this record
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, &self.record_type)
    }
}

fn default_ttl() -> u32 {
    1
}

/// A provider zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Zone id
    pub id: String,
    /// Zone name, equal to the registrable domain
    pub name: String,
}

/// Body of a create or edit call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    /// Lower-cased record name
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Validated content
    pub content: String,
    /// TTL in seconds
    pub ttl: u32,
    /// Proxied flag, when the caller set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    /// Priority, when the caller set one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
}

impl RecordPayload {
    /// Identity key of the record this payload writes
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.name, &self.record_type)
    }
}

/// Case-insensitive (name, type) identity of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    name: String,
    record_type: String,
}

impl RecordKey {
    /// Build a key; both parts are lower-cased
    pub fn new(name: &str, record_type: &RecordType) -> Self {
        Self {
            name: name.trim_end_matches('.').to_ascii_lowercase(),
            record_type: record_type.as_str().to_ascii_lowercase(),
        }
    }

    /// Lower-cased record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased record type
    pub fn record_type(&self) -> &str {
        &self.record_type
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.record_type)
    }
}
