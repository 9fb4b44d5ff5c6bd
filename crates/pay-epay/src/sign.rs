//! # Signature Codec
//!
//! Deterministic canonicalization of a flat parameter set into the digest
//! the gateway protocol expects, used for both outbound signing and inbound
//! callback verification. Shared and side-effect-free so the two directions
//! cannot drift apart.
//!
//! Canonical form: drop parameters with empty values and the `sign` /
//! `sign_type` fields themselves, sort the remaining keys byte-wise, join
//! as `key=value` pairs with `&`, append the merchant secret, MD5, render
//! as lower-case hex.

use md5::{Digest, Md5};
use std::collections::{BTreeMap, HashMap};

/// Build the canonical signable string (without the secret appended).
fn canonical_string(params: &HashMap<String, String>) -> String {
    let filtered: BTreeMap<&str, &str> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && k.as_str() != "sign" && k.as_str() != "sign_type")
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    filtered
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Compute the digest for a parameter set under the merchant secret.
pub fn sign(params: &HashMap<String, String>, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonical_string(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify the `sign` field of an inbound parameter set.
///
/// Fails closed: a missing `sign` field or a digest mismatch is `false`;
/// this function never panics or errors. Comparison is case-insensitive
/// and constant-time over the digest bytes.
pub fn verify(params: &HashMap<String, String>, secret: &str) -> bool {
    let Some(received) = params.get("sign") else {
        return false;
    };
    constant_time_compare(&received.to_ascii_lowercase(), &sign(params, secret))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_sign_shape() {
        let digest = sign(&params(&[("money", "10.00"), ("pid", "1001")]), "secret");
        assert_eq!(digest.len(), 32);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(digest, digest.to_lowercase());
    }

    #[test]
    fn test_canonical_ordering_and_filtering() {
        // same digest regardless of insertion order, empty values dropped,
        // sign/sign_type never part of the canonical string
        let a = params(&[
            ("money", "10.00"),
            ("pid", "1001"),
            ("param", ""),
            ("sign", "deadbeef"),
            ("sign_type", "MD5"),
        ]);
        let b = params(&[("pid", "1001"), ("money", "10.00")]);
        assert_eq!(sign(&a, "secret"), sign(&b, "secret"));

        assert_eq!(
            canonical_string(&a),
            "money=10.00&pid=1001",
        );
    }

    #[test]
    fn test_keys_sort_bytewise() {
        let p = params(&[("b", "2"), ("a", "1"), ("a1", "3")]);
        assert_eq!(canonical_string(&p), "a=1&a1=3&b=2");
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let mut p = params(&[
            ("pid", "1001"),
            ("out_trade_no", "1700000000000123"),
            ("money", "10.00"),
            ("trade_status", "TRADE_SUCCESS"),
        ]);
        let digest = sign(&p, "merchant-key");
        p.insert("sign".into(), digest.clone());
        p.insert("sign_type".into(), "MD5".into());

        assert!(verify(&p, "merchant-key"));
        assert!(!verify(&p, "other-key"));

        // upper-cased digest still verifies
        p.insert("sign".into(), digest.to_uppercase());
        assert!(verify(&p, "merchant-key"));
    }

    #[test]
    fn test_flipping_any_digest_character_fails() {
        let mut p = params(&[("pid", "1001"), ("money", "10.00")]);
        let digest = sign(&p, "merchant-key");

        for i in 0..digest.len() {
            let mut tampered: Vec<u8> = digest.clone().into_bytes();
            tampered[i] = if tampered[i] == b'0' { b'1' } else { b'0' };
            p.insert("sign".into(), String::from_utf8(tampered).unwrap());
            assert!(!verify(&p, "merchant-key"));
        }
    }

    #[test]
    fn test_missing_sign_fails_closed() {
        let p = params(&[("pid", "1001"), ("money", "10.00")]);
        assert!(!verify(&p, "merchant-key"));
        assert!(!verify(&HashMap::new(), "merchant-key"));
    }
}
