//! Host-facing registration: turn an optional config section into a
//! `Rejecter`, falling back to `NopRejecter` so the host still starts.

use std::sync::Arc;

use bloomguard_core::error::OracleError;

use crate::config::BloomdConfig;
use crate::oracle::{NopRejecter, Rejecter, RevocationOracle};
use crate::transport::Connector;

/// Result of registration. `rejecter` is always usable.
pub struct Registration {
    pub rejecter: Arc<dyn Rejecter>,
    /// Live oracle, when one was built (metrics, connection state).
    pub oracle: Option<Arc<RevocationOracle>>,
    /// Why the no-op fallback was chosen, if it was.
    pub error: Option<OracleError>,
}

impl Registration {
    fn nop(error: Option<OracleError>) -> Self {
        Self {
            rejecter: Arc::new(NopRejecter),
            oracle: None,
            error,
        }
    }

    pub fn is_active(&self) -> bool {
        self.oracle.is_some()
    }
}

pub async fn register(section: Option<&BloomdConfig>, connector: Arc<dyn Connector>) -> Registration {
    let Some(cfg) = section else {
        tracing::debug!("no config for bloomd, revocation checks disabled");
        return Registration::nop(None);
    };

    match RevocationOracle::connect(cfg, connector).await {
        Ok(oracle) => {
            tracing::info!(
                filter = %cfg.name,
                addr = %cfg.server_addr,
                strategy = oracle.deriver().strategy().as_str(),
                fields = ?oracle.deriver().fields(),
                "bloomd revocation checks enabled"
            );
            let oracle = Arc::new(oracle);
            Registration {
                rejecter: oracle.clone(),
                oracle: Some(oracle),
                error: None,
            }
        }
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind().as_str(), "bloomd rejecter unavailable, using no-op");
            Registration::nop(Some(e))
        }
    }
}
