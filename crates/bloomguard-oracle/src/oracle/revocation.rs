use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::time::Instant;

use bloomguard_core::error::Result;
use bloomguard_core::{ClaimSet, KeyDeriver, ProbeKey, QueryError};

use super::Rejecter;
use crate::config::BloomdConfig;
use crate::connection::ConnectionManager;
use crate::membership::MembershipClient;
use crate::obs::OracleMetrics;
use crate::transport::Connector;

/// Outcome of one check. Only `Reject` turns into `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Reject,
    Allow,
    /// No configured field produced a key; nothing to ask.
    NoKeys,
    /// No usable connection (fail open).
    Unavailable,
    /// The membership query failed (fail open).
    QueryFailed,
    /// A panic was caught at the check boundary (fail open).
    Fault,
}

impl Verdict {
    pub fn rejects(self) -> bool {
        matches!(self, Verdict::Reject)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Reject => "reject",
            Verdict::Allow => "allow",
            Verdict::NoKeys => "no_keys",
            Verdict::Unavailable => "unavailable",
            Verdict::QueryFailed => "query_failed",
            Verdict::Fault => "fault",
        }
    }
}

/// Checks token claims against a bloomd filter of revoked identifiers.
///
/// Fails open: when bloomd cannot answer, the token is allowed and the cause
/// is logged. A failed query leaves the connection degraded; the next check
/// repairs it before querying.
pub struct RevocationOracle {
    deriver: KeyDeriver,
    client: MembershipClient,
    conn: ConnectionManager,
    metrics: Arc<OracleMetrics>,
}

impl RevocationOracle {
    /// Validate `cfg` and build the oracle without dialing.
    /// The first check connects.
    pub fn new(cfg: &BloomdConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        cfg.validate()?;
        let metrics = Arc::new(OracleMetrics::default());
        let conn = ConnectionManager::new(
            cfg.server_addr.clone(),
            cfg.name.clone(),
            connector,
            cfg.settings(),
            Arc::clone(&metrics),
        );
        Ok(Self {
            deriver: cfg.deriver()?,
            client: MembershipClient::new(cfg.name.clone()),
            conn,
            metrics,
        })
    }

    /// Build the oracle and, when `eager_connect` is set, connect now.
    pub async fn connect(cfg: &BloomdConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        let oracle = Self::new(cfg, connector)?;
        if cfg.eager_connect {
            oracle.conn.establish().await?;
        }
        Ok(oracle)
    }

    pub fn deriver(&self) -> &KeyDeriver {
        &self.deriver
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }

    pub fn metrics(&self) -> &OracleMetrics {
        &self.metrics
    }

    /// Run one check and report why it ended the way it did.
    pub async fn evaluate(&self, claims: &ClaimSet) -> Verdict {
        let verdict = match AssertUnwindSafe(self.run(claims)).catch_unwind().await {
            Ok(v) => v,
            Err(payload) => {
                tracing::error!(fault = %panic_message(payload.as_ref()), "revocation check panicked");
                Verdict::Fault
            }
        };
        self.metrics.checks.inc(&[("outcome", verdict.as_str())]);
        verdict
    }

    async fn run(&self, claims: &ClaimSet) -> Verdict {
        // One budget for lock wait, inline repair and the query itself.
        let deadline = Instant::now() + self.conn.settings().query_timeout;

        let keys = self.deriver.derive(claims);
        if keys.is_empty() {
            tracing::debug!("no probe keys derived from claims");
            return Verdict::NoKeys;
        }

        let Some(mut session) = self.conn.acquire(deadline).await else {
            tracing::debug!(addr = %self.conn.addr(), "no usable bloomd connection, allowing");
            return Verdict::Unavailable;
        };
        let generation = session.generation();

        let started = Instant::now();
        let result = match session.with_deadline() {
            Some(mut link) => self.client.query(&mut link, &keys).await,
            None => Err(QueryError::Transport("no transport held".into())),
        };
        session.settle(&result);
        drop(session);
        self.metrics.query_duration.observe(&[], started.elapsed());

        match result {
            Ok(hits) => fold(&keys, &hits),
            Err(e) => {
                let kind = e.kind().as_str();
                tracing::warn!(
                    filter = %self.conn.filter(),
                    error = %e,
                    kind,
                    generation,
                    "bloomd query failed, allowing"
                );
                self.metrics.query_errors.inc(&[("kind", kind)]);
                Verdict::QueryFailed
            }
        }
    }
}

#[async_trait]
impl Rejecter for RevocationOracle {
    async fn check(&self, claims: &ClaimSet) -> bool {
        self.evaluate(claims).await.rejects()
    }
}

/// Reject iff any key is reported present.
fn fold(keys: &[ProbeKey], hits: &[bool]) -> Verdict {
    match keys.iter().zip(hits).find(|(_, hit)| **hit) {
        Some((key, _)) => {
            tracing::info!(key = %key, "rejecting by key");
            Verdict::Reject
        }
        None => Verdict::Allow,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(n: usize) -> Vec<ProbeKey> {
        (0..n).map(|i| ProbeKey::new(format!("k{i}"))).collect()
    }

    #[test]
    fn fold_is_a_logical_or() {
        for n in [1, 2, 5] {
            let ks = keys(n);
            assert_eq!(fold(&ks, &vec![false; n]), Verdict::Allow, "n={n}");
            for pos in [0, n / 2, n - 1] {
                let mut hits = vec![false; n];
                hits[pos] = true;
                assert_eq!(fold(&ks, &hits), Verdict::Reject, "n={n} pos={pos}");
            }
        }
    }

    #[test]
    fn only_reject_rejects() {
        for v in [
            Verdict::Allow,
            Verdict::NoKeys,
            Verdict::Unavailable,
            Verdict::QueryFailed,
            Verdict::Fault,
        ] {
            assert!(!v.rejects(), "{}", v.as_str());
        }
        assert!(Verdict::Reject.rejects());
    }

    #[test]
    fn panic_payloads_are_readable() {
        let s: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(s.as_ref()), "boom");
        let s: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(s.as_ref()), "bang");
        let s: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(s.as_ref()), "unknown panic payload");
    }
}
