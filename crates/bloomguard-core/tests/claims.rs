//! Claim model tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use bloomguard_core::{ClaimSet, ClaimValue};

#[test]
fn json_numbers_keep_their_runtime_shape() {
    let c = ClaimSet::from_json(
        r#"{"sub":"u1","jti":42,"big":18446744073709551615,"exp":1.5,"admin":true,"aud":["a"]}"#,
    )
    .unwrap();
    assert_eq!(c.get("sub"), Some(&ClaimValue::Str("u1".into())));
    assert_eq!(c.get("jti"), Some(&ClaimValue::Int(42)));
    assert_eq!(c.get("big"), Some(&ClaimValue::UInt(u64::MAX)));
    assert_eq!(c.get("exp"), Some(&ClaimValue::Float(1.5)));
    assert!(matches!(c.get("admin"), Some(ClaimValue::Other(_))));
    assert!(matches!(c.get("aud"), Some(ClaimValue::Other(_))));
    assert_eq!(c.len(), 6);
}

#[test]
fn text_forms() {
    assert_eq!(ClaimValue::Int(-7).as_text().as_deref(), Some("-7"));
    assert_eq!(ClaimValue::Float(3.0).as_text().as_deref(), Some("3"));
    assert_eq!(ClaimValue::Float(3.5).as_text(), None);
    assert_eq!(ClaimValue::Float(f64::NAN).as_text(), None);
    assert_eq!(ClaimValue::Float(3.5).truncated_text().as_deref(), Some("3"));
    assert_eq!(ClaimValue::Float(-3.5).truncated_text().as_deref(), Some("-3"));
    assert_eq!(ClaimValue::from(true).truncated_text(), None);
}

#[test]
fn non_object_json_is_rejected() {
    assert!(ClaimSet::from_json("[1,2]").is_err());
    assert!(ClaimSet::from_json("not json").is_err());
}
