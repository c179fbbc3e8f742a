//! Deterministic entity fingerprints.
//!
//! Organisations are repeated across notices with small differences in case
//! and spacing. A fingerprint over a few identifying fields gives storage
//! layers a stable key for them. Extraction itself never merges entities.

use crate::models::{ContractingBody, Contractor};
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest
pub const FINGERPRINT_LENGTH: usize = 16;

/// Fingerprint of named key fields.
///
/// Fields are taken in name order. Absent and blank values are skipped;
/// present values are trimmed and uppercased, then joined with `|`.
pub fn entity_fingerprint(fields: &[(&str, Option<&str>)]) -> String {
    let mut sorted: Vec<_> = fields.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let parts: Vec<String> = sorted
        .into_iter()
        .filter_map(|(_, value)| value)
        .map(|value| value.trim().to_uppercase())
        .filter(|value| !value.is_empty())
        .collect();

    let digest = Sha256::digest(parts.join("|").as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LENGTH);
    encoded
}

impl ContractingBody {
    pub fn fingerprint(&self) -> String {
        entity_fingerprint(&[
            ("name", Some(self.name.as_str())),
            ("national_id", self.national_id.as_deref()),
            ("town", self.town.as_deref()),
            ("postal_code", self.postal_code.as_deref()),
            ("country_code", self.country_code.as_deref()),
        ])
    }
}

impl Contractor {
    pub fn fingerprint(&self) -> String {
        entity_fingerprint(&[
            ("name", Some(self.name.as_str())),
            ("national_id", self.national_id.as_deref()),
            ("town", self.town.as_deref()),
            ("postal_code", self.postal_code.as_deref()),
            ("country_code", self.country_code.as_deref()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalisation_and_order() {
        let a = entity_fingerprint(&[("name", Some(" Acme Ltd ")), ("town", Some("Leeds"))]);
        let b = entity_fingerprint(&[("town", Some("LEEDS")), ("name", Some("ACME LTD"))]);
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_absent_and_blank_fields_are_skipped() {
        let a = entity_fingerprint(&[("name", Some("Acme")), ("town", None)]);
        let b = entity_fingerprint(&[("name", Some("Acme")), ("town", Some("  "))]);
        let c = entity_fingerprint(&[("name", Some("Acme"))]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_entities_differ_on_key_fields() {
        let first = Contractor {
            name: "Acme".to_string(),
            country_code: Some("DE".to_string()),
            ..Contractor::default()
        };
        let second = Contractor {
            country_code: Some("FR".to_string()),
            ..first.clone()
        };
        let restyled = Contractor {
            name: "ACME".to_string(),
            email: Some("info@acme.example".to_string()),
            ..first.clone()
        };
        assert_ne!(first.fingerprint(), second.fingerprint());
        assert_eq!(first.fingerprint(), restyled.fingerprint());
    }
}
