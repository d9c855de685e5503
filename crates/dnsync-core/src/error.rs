//! Error types for dnsync
//!
//! Every failure of the reconciliation pipeline surfaces to the caller as one
//! of these variants. Nothing inside the core retries or swallows them.

use thiserror::Error;

/// Result type alias for dnsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type
///
/// The type is `Clone` so one failed zone listing can be attached to every
/// record of that zone in a [`BatchResult`](crate::engine::BatchResult).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Missing or malformed constructor input
    #[error("Configuration error: {0}")]
    Config(String),

    /// The record name is not a valid, publicly-registrable hostname
    #[error("Invalid record name '{name}': {reason}")]
    InvalidRecordName {
        /// Offending record name
        name: String,
        /// Why parsing failed
        reason: String,
    },

    /// Record content does not match the grammar of its record type
    #[error("Could not sync record '{name}': '{value}' is not a valid {expected}")]
    Validation {
        /// Record name
        name: String,
        /// Offending content
        value: String,
        /// What the content should have been
        expected: String,
    },

    /// The account has no zone for this domain, even after a refresh
    #[error("Could not find domain '{0}'. Make sure the domain is set up for this account")]
    DomainNotFound(String),

    /// No provider record matches the requested name and type
    #[error("Record not found: {name} (type: {record_type})")]
    RecordNotFound {
        /// Record name
        name: String,
        /// Record type that was searched for
        record_type: String,
    },

    /// Failure reported by the remote provider API
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// HTTP status, when the failure carried one
        status: Option<u16>,
        /// Error message
        message: String,
    },

    /// Malformed cron expression
    #[error("'{expression}' is not a valid cron expression: {reason}")]
    InvalidSchedule {
        /// The rejected expression
        expression: String,
        /// Parser diagnostics
        reason: String,
    },

    /// Public IP discovery failed
    #[error("IP source error: {0}")]
    IpSource(String),

    /// A provider payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid record name error
    pub fn invalid_record_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRecordName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a content validation error
    pub fn validation(
        name: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::Validation {
            name: name.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a "domain not found" error
    pub fn domain_not_found(domain: impl Into<String>) -> Self {
        Self::DomainNotFound(domain.into())
    }

    /// Create a "record not found" error
    pub fn record_not_found(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self::RecordNotFound {
            name: name.into(),
            record_type: record_type.into(),
        }
    }

    /// Create a provider error without an HTTP status
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a provider error for a failed HTTP status
    pub fn provider_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            status: Some(status),
            message: message.into(),
        }
    }

    /// Create an invalid schedule error
    pub fn invalid_schedule(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchedule {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    /// Create an IP source error
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    /// HTTP status of a provider failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
