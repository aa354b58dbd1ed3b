//! Lightweight in-process metrics.
//!
//! Counters and a latency histogram for the revocation check, stored as
//! atomics and rendered in Prometheus text format on demand by the host.

pub mod metrics;

pub use metrics::OracleMetrics;
