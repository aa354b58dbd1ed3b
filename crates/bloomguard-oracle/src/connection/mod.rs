//! Connection management for the bloomd session (one connection per oracle).

pub mod manager;

pub use manager::{ConnState, ConnectionManager, ConnectionSettings, Session};
