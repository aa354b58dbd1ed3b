//! Token claims as seen by the revocation check.
//!
//! Hosts usually hand over claims decoded from JSON, where the same logical
//! field may arrive as an integer, an unsigned integer, a float, or a string.
//! `ClaimValue` keeps all of those apart so key derivation can decide what is
//! integer-like and what is string-like.

use std::borrow::Cow;
use std::collections::HashMap;

use serde::Deserialize;

/// Scalar claim value.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    /// Anything else (bool, null, array, object). Never probed directly.
    Other(serde_json::Value),
}

impl ClaimValue {
    /// Raw text for integer-like and string-like values (base 10 for numbers).
    ///
    /// Floats count as integer-like only when they carry no fraction and fit
    /// in an `i64`. Returns `None` for unrecognized types.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            ClaimValue::Int(v) => Some(Cow::Owned(v.to_string())),
            ClaimValue::UInt(v) => Some(Cow::Owned(v.to_string())),
            ClaimValue::Float(f) if is_integral(*f) => Some(Cow::Owned((*f as i64).to_string())),
            ClaimValue::Str(s) => Some(Cow::Borrowed(s.as_str())),
            ClaimValue::Float(_) | ClaimValue::Other(_) => None,
        }
    }

    /// Text with floats truncated toward zero (saturating, NaN -> 0).
    pub fn truncated_text(&self) -> Option<Cow<'_, str>> {
        match self {
            ClaimValue::Float(f) => Some(Cow::Owned((f.trunc() as i64).to_string())),
            other => other.as_text(),
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl From<i64> for ClaimValue {
    fn from(v: i64) -> Self {
        ClaimValue::Int(v)
    }
}

impl From<u64> for ClaimValue {
    fn from(v: u64) -> Self {
        ClaimValue::UInt(v)
    }
}

impl From<f64> for ClaimValue {
    fn from(v: f64) -> Self {
        ClaimValue::Float(v)
    }
}

impl From<&str> for ClaimValue {
    fn from(v: &str) -> Self {
        ClaimValue::Str(v.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(v: String) -> Self {
        ClaimValue::Str(v)
    }
}

impl From<bool> for ClaimValue {
    fn from(v: bool) -> Self {
        ClaimValue::Other(serde_json::Value::Bool(v))
    }
}

/// Claims of one token, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet {
    fields: HashMap<String, ClaimValue>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object (`{"sub": "u1", "jti": 42}`).
    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<ClaimValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&ClaimValue> {
        self.fields.get(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<ClaimValue>> FromIterator<(K, V)> for ClaimSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let fields = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { fields }
    }
}
