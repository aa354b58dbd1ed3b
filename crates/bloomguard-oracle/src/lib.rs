//! bloomguard oracle library entry.
//!
//! This crate wires the transport, connection manager, membership client and
//! revocation oracle into a `Rejecter` a host authentication pipeline can
//! call once per request. It is consumed by the `bloomguard-check` binary
//! and by integration tests.

pub mod config;
pub mod connection;
pub mod membership;
pub mod obs;
pub mod oracle;
pub mod register;
pub mod transport;

pub use oracle::{NopRejecter, Rejecter, RevocationOracle, Verdict};
pub use register::{register, Registration};
