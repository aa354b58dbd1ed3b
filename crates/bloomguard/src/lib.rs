//! Top-level facade crate for bloomguard.
//!
//! Re-exports the core types and the oracle library so hosts can depend on a single crate.

pub mod core {
    pub use bloomguard_core::*;
}

pub mod oracle {
    pub use bloomguard_oracle::*;
}
