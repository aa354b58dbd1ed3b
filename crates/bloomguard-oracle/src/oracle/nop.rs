use async_trait::async_trait;

use bloomguard_core::ClaimSet;

use super::Rejecter;

/// Stand-in when revocation checking is not configured: nothing is revoked.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopRejecter;

#[async_trait]
impl Rejecter for NopRejecter {
    async fn check(&self, _claims: &ClaimSet) -> bool {
        false
    }
}
