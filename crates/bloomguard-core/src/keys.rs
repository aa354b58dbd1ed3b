//! Probe key derivation (pure, no I/O).
//!
//! Two strategies are supported:
//! - `Direct`: `field-value` for every configured field present in the
//!   claims. Absent fields and unrecognized value types produce no key.
//!   Whitespace, control characters and `%` are percent-escaped so every
//!   key is a single wire token.
//! - `Hashed`: one SHA-256 key per configured field over
//!   `field<delim>value`, plus one key over every value joined by the
//!   delimiter in field order. Absent fields contribute an empty value, so
//!   the key count is always `fields + 1`.

use std::borrow::Cow;
use std::fmt::{self, Write};

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::claims::ClaimSet;
use crate::error::{OracleError, Result};

/// Default delimiter for hashed keys.
pub const DEFAULT_DELIMITER: &str = ".";

/// Separator between field name and value in direct keys.
const DIRECT_SEPARATOR: char = '-';

/// Opaque token submitted to bloomd.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeKey(String);

impl ProbeKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProbeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Key derivation strategy, selected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    #[default]
    Direct,
    Hashed,
}

impl KeyStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyStrategy::Direct => "direct",
            KeyStrategy::Hashed => "hashed",
        }
    }
}

/// Immutable field list + strategy. Construct once, share freely.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    fields: Vec<String>,
    strategy: KeyStrategy,
    delimiter: String,
}

impl KeyDeriver {
    pub fn new(
        fields: Vec<String>,
        strategy: KeyStrategy,
        delimiter: impl Into<String>,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(OracleError::Config("token_keys must not be empty".into()));
        }
        if let Some(bad) = fields.iter().find(|f| f.trim().is_empty()) {
            return Err(OracleError::Config(format!("invalid token key: {bad:?}")));
        }
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(OracleError::Config("delimiter must not be empty".into()));
        }
        Ok(Self {
            fields,
            strategy,
            delimiter,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn strategy(&self) -> KeyStrategy {
        self.strategy
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Derive the ordered probe keys for one token.
    pub fn derive(&self, claims: &ClaimSet) -> Vec<ProbeKey> {
        match self.strategy {
            KeyStrategy::Direct => self.derive_direct(claims),
            KeyStrategy::Hashed => self.derive_hashed(claims),
        }
    }

    fn derive_direct(&self, claims: &ClaimSet) -> Vec<ProbeKey> {
        let mut keys = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let Some(text) = claims.get(field).and_then(|v| v.as_text()) else {
                continue;
            };
            let mut key = String::with_capacity(field.len() + 1 + text.len());
            push_escaped(&mut key, field);
            key.push(DIRECT_SEPARATOR);
            push_escaped(&mut key, &text);
            keys.push(ProbeKey(key));
        }
        keys
    }

    fn derive_hashed(&self, claims: &ClaimSet) -> Vec<ProbeKey> {
        let values: Vec<Cow<'_, str>> = self
            .fields
            .iter()
            .map(|field| {
                claims
                    .get(field)
                    .and_then(|v| v.truncated_text())
                    .unwrap_or(Cow::Borrowed(""))
            })
            .collect();

        let mut keys = Vec::with_capacity(self.fields.len() + 1);
        for (field, value) in self.fields.iter().zip(&values) {
            keys.push(digest([field.as_str(), self.delimiter.as_str(), value]));
        }

        let mut hasher = Sha256::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                hasher.update(self.delimiter.as_bytes());
            }
            hasher.update(value.as_bytes());
        }
        keys.push(ProbeKey(hex::encode(hasher.finalize())));

        keys
    }
}

/// Append `s`, replacing each byte of a whitespace, control or `%` char
/// with `%XX`. Values without such chars are appended unchanged.
fn push_escaped(out: &mut String, s: &str) {
    for c in s.chars() {
        if c == '%' || c.is_whitespace() || c.is_control() {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                let _ = write!(out, "%{b:02X}");
            }
        } else {
            out.push(c);
        }
    }
}

/// Lowercase hex SHA-256 over the concatenated parts.
fn digest<const N: usize>(parts: [&str; N]) -> ProbeKey {
    let mut hasher = Sha256::new();
    for p in parts {
        hasher.update(p.as_bytes());
    }
    ProbeKey(hex::encode(hasher.finalize()))
}
