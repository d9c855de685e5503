//! Registrable-domain extraction
//!
//! The provider organises records by zone and a zone is named after the
//! registrable domain (`example.co.uk` for `a.b.example.co.uk`), so every
//! record name is reduced to its registrable domain before a zone lookup.
//! Suffixes come from the public suffix list; names under an unlisted TLD
//! are rejected.

use crate::error::{Error, Result};

/// Maximum length of a hostname (RFC 1035)
const MAX_NAME_LEN: usize = 253;

/// Maximum length of a single label (RFC 1035)
const MAX_LABEL_LEN: usize = 63;

/// Return the lower-cased registrable domain of `record_name`
///
/// Fails with [`Error::InvalidRecordName`] when the name is not a
/// syntactically valid hostname or is not under a listed public suffix.
///
/// ```
/// use dnsync_core::domain::registrable_domain;
///
/// assert_eq!(registrable_domain("a.b.sub.example.co.uk").unwrap(), "example.co.uk");
/// assert!(registrable_domain("localhost").is_err());
/// ```
pub fn registrable_domain(record_name: &str) -> Result<String> {
    let name = normalize(record_name)?;

    let domain = psl::domain(name.as_bytes()).ok_or_else(|| {
        Error::invalid_record_name(record_name, "no registrable domain under a public suffix")
    })?;

    if !domain.suffix().is_known() {
        return Err(Error::invalid_record_name(
            record_name,
            "top-level domain is not in the public suffix list",
        ));
    }

    String::from_utf8(domain.as_bytes().to_vec())
        .map_err(|_| Error::invalid_record_name(record_name, "name is not valid UTF-8"))
}

/// Whether `name` is a valid, publicly-registrable hostname
pub fn is_registrable(name: &str) -> bool {
    registrable_domain(name).is_ok()
}

/// Lower-case, strip the root dot and check hostname syntax
fn normalize(record_name: &str) -> Result<String> {
    let name = record_name.trim().trim_end_matches('.').to_ascii_lowercase();

    if name.is_empty() {
        return Err(Error::invalid_record_name(record_name, "name is empty"));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(Error::invalid_record_name(
            record_name,
            format!("name is {} chars long (max {})", name.len(), MAX_NAME_LEN),
        ));
    }

    for (index, label) in name.split('.').enumerate() {
        // Wildcard records: only the leftmost label may be '*'
        if label == "*" && index == 0 {
            continue;
        }

        if label.is_empty() {
            return Err(Error::invalid_record_name(record_name, "name has an empty label"));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::invalid_record_name(
                record_name,
                format!("label '{}' is longer than {} chars", label, MAX_LABEL_LEN),
            ));
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::invalid_record_name(
                record_name,
                format!("label '{}' contains invalid characters", label),
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::invalid_record_name(
                record_name,
                format!("label '{}' starts or ends with a hyphen", label),
            ));
        }
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_independent_of_subdomain_depth() {
        assert_eq!(registrable_domain("example.co.uk").unwrap(), "example.co.uk");
        assert_eq!(registrable_domain("sub.example.co.uk").unwrap(), "example.co.uk");
        assert_eq!(
            registrable_domain("a.b.sub.example.co.uk").unwrap(),
            "example.co.uk"
        );
    }

    #[test]
    fn test_lower_cases_and_strips_root_dot() {
        assert_eq!(registrable_domain("WWW.Example.COM.").unwrap(), "example.com");
    }

    #[test]
    fn test_wildcard_label() {
        assert_eq!(registrable_domain("*.example.com").unwrap(), "example.com");
        assert!(registrable_domain("a.*.example.com").is_err());
    }

    #[test]
    fn test_rejects_unlisted_tld() {
        let err = registrable_domain("host.example.notarealtld").unwrap_err();
        assert!(matches!(err, Error::InvalidRecordName { .. }));
    }

    #[test]
    fn test_rejects_bare_suffix() {
        assert!(registrable_domain("co.uk").is_err());
        assert!(registrable_domain("com").is_err());
    }

    #[test]
    fn test_rejects_bad_syntax() {
        assert!(registrable_domain("").is_err());
        assert!(registrable_domain("not a domain!!").is_err());
        assert!(registrable_domain("a..example.com").is_err());
        assert!(registrable_domain("-bad.example.com").is_err());
        assert!(registrable_domain(&format!("{}.example.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_is_registrable() {
        assert!(is_registrable("good.example.org"));
        assert!(!is_registrable("not a domain!!"));
    }
}
