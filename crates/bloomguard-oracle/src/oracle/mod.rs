//! Revocation decision layer.
//!
//! `Rejecter` is the seam the host pipeline calls once per authenticated
//! request. It has a single boolean return channel: `true` rejects the token,
//! `false` lets it through. Every failure inside folds into `false`.

pub mod nop;
pub mod revocation;

use async_trait::async_trait;

use bloomguard_core::ClaimSet;

pub use nop::NopRejecter;
pub use revocation::{RevocationOracle, Verdict};

#[async_trait]
pub trait Rejecter: Send + Sync {
    /// Whether the token carrying `claims` must be rejected. Never fails.
    async fn check(&self, claims: &ClaimSet) -> bool;
}
