//! bloomguard core: transport-agnostic claim model, probe key derivation,
//! the bloomd wire codec, and the shared error surface.
//!
//! This crate carries no runtime or socket dependencies so the derivation and
//! codec rules can be tested (and reused by other hosts) without a server.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. A revocation check
//! runs on every authenticated request, so malformed claims or server replies
//! must surface as `OracleError`/`QueryError` values, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod claims;
pub mod error;
pub mod keys;
pub mod protocol;

pub use claims::{ClaimSet, ClaimValue};
pub use error::{ErrorKind, OracleError, QueryError, Result};
pub use keys::{KeyDeriver, KeyStrategy, ProbeKey, DEFAULT_DELIMITER};
