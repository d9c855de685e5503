//! Daemon configuration from environment variables
//!
//! ### Credentials
//! - `DNSYNC_API_TOKEN`: scoped API token, or
//! - `DNSYNC_EMAIL` + `DNSYNC_API_KEY`: account email and global API key
//!
//! ### Records
//! - `DNSYNC_RECORDS`: comma-separated `name[:TYPE[:content]]`
//! - `DNSYNC_RECORDS_FILE`: path to a JSON array of records
//!
//! Both may be set; the file's records come after the inline ones.
//!
//! ### Sync
//! - `DNSYNC_IP`: fixed IP used instead of the discovered one
//! - `DNSYNC_MODE`: `once`, `cron` or `ip-change` (default)
//! - `DNSYNC_CRON`: cron expression, required for `cron`
//! - `DNSYNC_DRY_RUN`: `true` to log writes instead of performing them
//!
//! ### Logging
//! - `DNSYNC_LOG_LEVEL`: trace, debug, info (default), warn, error

use anyhow::{Context, Result};
use dnsync_core::{Credentials, DesiredRecord, RecordType, SyncConfig};
use std::path::Path;
use tracing::Level;

/// How syncs are triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Sync once and exit
    Once,
    /// Sync on a cron schedule until stopped
    Cron,
    /// Sync at start and after every IP change until stopped
    IpChange,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Mode::Once),
            "cron" => Ok(Mode::Cron),
            "ip-change" | "ip_change" => Ok(Mode::IpChange),
            other => anyhow::bail!(
                "DNSYNC_MODE '{}' is not valid. Valid modes: once, cron, ip-change",
                other
            ),
        }
    }
}

/// Application configuration
#[derive(Debug)]
pub struct Config {
    pub sync: SyncConfig,
    pub mode: Mode,
    pub dry_run: bool,
    pub log_level: Level,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns a variable's value
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let credentials = match (var("DNSYNC_API_TOKEN"), var("DNSYNC_EMAIL"), var("DNSYNC_API_KEY")) {
            (Some(token), _, _) => Credentials::token(token),
            (None, Some(email), Some(key)) => Credentials::global_key(email, key),
            _ => anyhow::bail!(
                "Credentials are required. Set DNSYNC_API_TOKEN, \
                or both DNSYNC_EMAIL and DNSYNC_API_KEY"
            ),
        };

        let mut records = match var("DNSYNC_RECORDS") {
            Some(list) => parse_records(&list)?,
            None => Vec::new(),
        };
        if let Some(path) = var("DNSYNC_RECORDS_FILE") {
            records.extend(load_records_file(Path::new(&path))?);
        }

        let mode = match var("DNSYNC_MODE") {
            Some(mode) => mode.parse()?,
            None => Mode::IpChange,
        };

        let schedule = var("DNSYNC_CRON");
        if mode == Mode::Cron && schedule.is_none() {
            anyhow::bail!("DNSYNC_CRON is required when DNSYNC_MODE=cron");
        }

        let dry_run = match var("DNSYNC_DRY_RUN").as_deref() {
            None => false,
            Some(value) => parse_bool(value)
                .with_context(|| format!("DNSYNC_DRY_RUN '{}' is not a boolean", value))?,
        };

        let log_level = parse_level(var("DNSYNC_LOG_LEVEL").as_deref().unwrap_or("info"))?;

        let mut sync = SyncConfig::new(credentials, records);
        sync.ip = var("DNSYNC_IP");
        sync.schedule = schedule;

        Ok(Self {
            sync,
            mode,
            dry_run,
            log_level,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sync.records.is_empty() {
            anyhow::bail!(
                "At least one record is required. \
                Set it via: export DNSYNC_RECORDS=home.example.com,www.example.com:AAAA"
            );
        }

        self.sync.validate().context("Invalid sync configuration")?;
        Ok(())
    }
}

/// Parse `name[:TYPE[:content]]` entries separated by commas
///
/// The content is everything after the second colon, so IPv6 content can be
/// given inline.
pub fn parse_records(list: &str) -> Result<Vec<DesiredRecord>> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let name = parts.next().unwrap_or_default().trim();
            if name.is_empty() {
                anyhow::bail!("Record entry '{}' has no name", entry);
            }

            let mut record = DesiredRecord::new(name);
            if let Some(record_type) = parts.next().map(str::trim).filter(|t| !t.is_empty()) {
                let record_type: RecordType = record_type
                    .parse()
                    .with_context(|| format!("Record entry '{}' has an invalid type", entry))?;
                record = record.with_type(record_type);
            }
            if let Some(content) = parts.next().map(str::trim).filter(|c| !c.is_empty()) {
                record = record.with_content(content);
            }
            Ok(record)
        })
        .collect()
}

/// Load a JSON array of records
pub fn load_records_file(path: &Path) -> Result<Vec<DesiredRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read DNSYNC_RECORDS_FILE {}", path.display()))?;

    serde_json::from_str(&text)
        .with_context(|| format!("DNSYNC_RECORDS_FILE {} is not a JSON array of records", path.display()))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_level(level: &str) -> Result<Level> {
    Ok(match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => anyhow::bail!(
            "DNSYNC_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_minimal_token_config() {
        let config = config(&[
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS", "home.example.com"),
        ])
        .unwrap();

        assert_eq!(config.mode, Mode::IpChange);
        assert!(!config.dry_run);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.sync.credentials, Credentials::token("token-123"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_global_key_credentials() {
        let config = config(&[
            ("DNSYNC_EMAIL", "me@example.com"),
            ("DNSYNC_API_KEY", "key-456"),
            ("DNSYNC_RECORDS", "home.example.com"),
        ])
        .unwrap();

        assert_eq!(
            config.sync.credentials,
            Credentials::global_key("me@example.com", "key-456")
        );
    }

    #[test]
    fn test_missing_credentials() {
        let err = config(&[("DNSYNC_RECORDS", "home.example.com")]).unwrap_err();
        assert!(err.to_string().contains("Credentials are required"));

        assert!(
            config(&[
                ("DNSYNC_EMAIL", "me@example.com"),
                ("DNSYNC_RECORDS", "home.example.com"),
            ])
            .is_err()
        );
    }

    #[test]
    fn test_record_entries() {
        let records = parse_records(
            "home.example.com, www.example.com:aaaa, txt.example.com:TXT:hello, v6.example.com:AAAA:2001:db8::1",
        )
        .unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0], DesiredRecord::new("home.example.com"));
        assert_eq!(records[1].record_type, Some(RecordType::Aaaa));
        assert_eq!(records[2].content.as_deref(), Some("hello"));
        assert_eq!(records[3].content.as_deref(), Some("2001:db8::1"));
    }

    #[test]
    fn test_record_entry_without_name() {
        assert!(parse_records(":A:1.1.1.1").is_err());
    }

    #[test]
    fn test_records_file_is_appended() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "file.example.com", "type": "CNAME", "content": "home.example.com", "ttl": 300}}]"#
        )
        .unwrap();

        let config = config(&[
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS", "home.example.com"),
            ("DNSYNC_RECORDS_FILE", file.path().to_str().unwrap()),
        ])
        .unwrap();

        let records = &config.sync.records;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "file.example.com");
        assert_eq!(records[1].record_type, Some(RecordType::Cname));
        assert_eq!(records[1].ttl, Some(300));
    }

    #[test]
    fn test_malformed_records_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = config(&[
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS_FILE", file.path().to_str().unwrap()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("not a JSON array"));
    }

    #[test]
    fn test_cron_mode_requires_expression() {
        assert!(
            config(&[
                ("DNSYNC_API_TOKEN", "token-123"),
                ("DNSYNC_RECORDS", "home.example.com"),
                ("DNSYNC_MODE", "cron"),
            ])
            .is_err()
        );

        let config = config(&[
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS", "home.example.com"),
            ("DNSYNC_MODE", "cron"),
            ("DNSYNC_CRON", "*/5 * * * *"),
        ])
        .unwrap();
        assert_eq!(config.mode, Mode::Cron);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_cron_fails_validation() {
        let config = config(&[
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS", "home.example.com"),
            ("DNSYNC_MODE", "cron"),
            ("DNSYNC_CRON", "every five minutes"),
        ])
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_no_records_fails_validation() {
        let config = config(&[("DNSYNC_API_TOKEN", "token-123")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flags_and_level() {
        let config = config(&[
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS", "home.example.com"),
            ("DNSYNC_MODE", "once"),
            ("DNSYNC_DRY_RUN", "TRUE"),
            ("DNSYNC_LOG_LEVEL", "debug"),
            ("DNSYNC_IP", "9.9.9.9"),
        ])
        .unwrap();

        assert_eq!(config.mode, Mode::Once);
        assert!(config.dry_run);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.sync.ip.as_deref(), Some("9.9.9.9"));

        assert!(
            config_err(&[("DNSYNC_DRY_RUN", "maybe")]),
            "invalid boolean is rejected"
        );
        assert!(config_err(&[("DNSYNC_LOG_LEVEL", "loud")]));
        assert!(config_err(&[("DNSYNC_MODE", "sometimes")]));
    }

    fn config_err(extra: &[(&str, &str)]) -> bool {
        let mut vars = vec![
            ("DNSYNC_API_TOKEN", "token-123"),
            ("DNSYNC_RECORDS", "home.example.com"),
        ];
        vars.extend_from_slice(extra);
        config(&vars).is_err()
    }
}
