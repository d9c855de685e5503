//! Content validation by record type
//!
//! | type  | content must be                                  |
//! |-------|--------------------------------------------------|
//! | A     | an IPv4 dotted quad                              |
//! | AAAA  | an IPv6 address (compressed, IPv4 tail, ...)     |
//! | CNAME | a valid, publicly-registrable domain name        |
//! | other | anything                                         |

use crate::domain;
use crate::error::{Error, Result};
use crate::record::RecordType;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Check `content` against the grammar of `record_type`
///
/// `record_name` is only used to build the error.
pub fn validate_content(record_name: &str, record_type: &RecordType, content: &str) -> Result<()> {
    let valid = match record_type {
        RecordType::A => content.parse::<Ipv4Addr>().is_ok(),
        RecordType::Aaaa => content.parse::<Ipv6Addr>().is_ok(),
        RecordType::Cname => domain::is_registrable(content),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::validation(record_name, content, expected(record_type)))
    }
}

fn expected(record_type: &RecordType) -> &'static str {
    match record_type {
        RecordType::A => "ipv4",
        RecordType::Aaaa => "ipv6",
        RecordType::Cname => "domain name",
        _ => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4() {
        assert!(validate_content("x.example.com", &RecordType::A, "1.1.1.1").is_ok());
        assert!(validate_content("x.example.com", &RecordType::A, "255.255.255.255").is_ok());
        assert!(validate_content("x.example.com", &RecordType::A, "999.1.1.1").is_err());
        assert!(validate_content("x.example.com", &RecordType::A, "1.1.1").is_err());
        assert!(validate_content("x.example.com", &RecordType::A, "::1").is_err());
    }

    #[test]
    fn test_ipv6_forms() {
        for ok in [
            "2001:0db8:85a3:0000:0000:8a2e:0370:7334",
            "2001:db8::1",
            "::",
            "::ffff:192.0.2.128",
            "64:ff9b::192.0.2.33",
        ] {
            assert!(
                validate_content("x.example.com", &RecordType::Aaaa, ok).is_ok(),
                "{ok} should be valid"
            );
        }

        for bad in ["1.2.3.4", "2001:db8::1::2", "gggg::1", "2001:db8:0:0:0:0:0:0:1"] {
            assert!(
                validate_content("x.example.com", &RecordType::Aaaa, bad).is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_cname() {
        assert!(validate_content("z.example.com", &RecordType::Cname, "good.example.org").is_ok());

        let err =
            validate_content("z.example.com", &RecordType::Cname, "not a domain!!").unwrap_err();
        assert_eq!(
            err,
            Error::validation("z.example.com", "not a domain!!", "domain name")
        );
    }

    #[test]
    fn test_other_types_are_not_checked() {
        assert!(validate_content("t.example.com", &RecordType::Txt, "anything at all").is_ok());
        assert!(
            validate_content("t.example.com", &RecordType::Other("CAA".into()), "").is_ok()
        );
    }
}
