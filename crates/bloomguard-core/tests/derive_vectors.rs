//! Key derivation vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bloomguard_core::protocol::bloomd::encode_multi;
use bloomguard_core::{ClaimSet, KeyDeriver, KeyStrategy, OracleError};


#[test]
fn derive_vectors() {
    let files = [
        "direct_scenario.json",
        "direct_skips_missing_and_unknown.json",
        "direct_no_matching_fields.json",
        "direct_escapes_unsafe_chars.json",
        "hashed_scenario.json",
        "hashed_missing_field_placeholder.json",
        "hashed_float_truncation.json",
    ];

    for f in files {
        let v = vector_loader::load(f);
        let keys: Vec<String> = v
            .deriver()
            .derive(&v.claims)
            .into_iter()
            .map(|k| k.into_string())
            .collect();
        assert_eq!(keys, v.expect_keys, "vector={}", v.description);
    }
}

#[test]
fn hashed_always_yields_fields_plus_one() {
    let fields: Vec<String> = ["sub", "jti", "sid", "azp"].iter().map(|s| s.to_string()).collect();
    let d = KeyDeriver::new(fields.clone(), KeyStrategy::Hashed, ".").unwrap();

    let claim_sets = [
        ClaimSet::new(),
        ClaimSet::new().with("sub", "u1"),
        ClaimSet::new().with("jti", 9_i64).with("azp", "web"),
        ClaimSet::new()
            .with("sub", "u1")
            .with("jti", 9_i64)
            .with("sid", 3.7)
            .with("azp", true)
            .with("extra", "ignored"),
    ];

    for claims in &claim_sets {
        assert_eq!(d.derive(claims).len(), fields.len() + 1, "claims={claims:?}");
    }
}

#[test]
fn direct_is_capped_by_field_count() {
    let d = KeyDeriver::new(vec!["sub".into()], KeyStrategy::Direct, ".").unwrap();
    let claims = ClaimSet::new().with("sub", "u1").with("jti", 1_i64).with("sid", "s");
    let keys = d.derive(&claims);
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].as_str(), "sub-u1");
}

#[test]
fn direct_keys_are_always_encodable() {
    let d = KeyDeriver::new(vec!["sub".into(), "jti".into(), "name".into()], KeyStrategy::Direct, ".")
        .unwrap();
    let claims = ClaimSet::new()
        .with("sub", "user one")
        .with("jti", 42_i64)
        .with("name", "line\nbreak\u{0}  spaced\u{a0}");
    let keys = d.derive(&claims);
    assert_eq!(keys.len(), 3);
    assert_eq!(keys[1].as_str(), "jti-42");
    encode_multi("revoked", &keys).expect("every key is a wire token");
}

#[test]
fn direct_escaping_keeps_distinct_values_distinct() {
    let d = KeyDeriver::new(vec!["sub".into()], KeyStrategy::Direct, ".").unwrap();
    let spaced = d.derive(&ClaimSet::new().with("sub", "a b"));
    let literal = d.derive(&ClaimSet::new().with("sub", "a%20b"));
    assert_ne!(spaced, literal);
    assert_eq!(literal[0].as_str(), "sub-a%2520b");
}

#[test]
fn derivation_is_independent_of_claim_insertion_order() {
    for strategy in [KeyStrategy::Direct, KeyStrategy::Hashed] {
        let d = KeyDeriver::new(vec!["sub".into(), "jti".into()], strategy, ".").unwrap();
        let a = ClaimSet::new().with("sub", "u1").with("jti", 42_i64);
        let b = ClaimSet::new().with("jti", 42_i64).with("sub", "u1");
        assert_eq!(d.derive(&a), d.derive(&b), "strategy={}", strategy.as_str());
    }
}

#[test]
fn integer_and_string_forms_differ_only_by_type_for_hashed() {
    // "42" and 42 stringify identically, so both produce the same keys.
    let d = KeyDeriver::new(vec!["jti".into()], KeyStrategy::Hashed, ".").unwrap();
    let as_int = ClaimSet::new().with("jti", 42_i64);
    let as_str = ClaimSet::new().with("jti", "42");
    let as_uint = ClaimSet::new().with("jti", 42_u64);
    assert_eq!(d.derive(&as_int), d.derive(&as_str));
    assert_eq!(d.derive(&as_int), d.derive(&as_uint));
}

#[test]
fn empty_field_list_is_a_config_error() {
    let err = KeyDeriver::new(vec![], KeyStrategy::Direct, ".").unwrap_err();
    assert!(matches!(err, OracleError::Config(_)));
    assert_eq!(err.kind().as_str(), "CONFIG");
}

#[test]
fn blank_field_or_delimiter_is_rejected() {
    assert!(KeyDeriver::new(vec!["sub".into(), " ".into()], KeyStrategy::Direct, ".").is_err());
    assert!(KeyDeriver::new(vec!["sub".into()], KeyStrategy::Hashed, "").is_err());
}
