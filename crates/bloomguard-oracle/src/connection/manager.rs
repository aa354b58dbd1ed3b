//! Single shared connection to bloomd.
//!
//! One async mutex guards the transport and its state. Each check carries
//! one absolute deadline. Lock wait and inline repair draw from it before
//! the query does, so a check never outlives `query_timeout`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{timeout_at, Instant};

use bloomguard_core::error::{OracleError, QueryError, Result};
use bloomguard_core::protocol::bloomd::{encode_info, FilterInfo, InfoDecoder};

use crate::obs::OracleMetrics;
use crate::transport::{Connector, Link, Transport};

/// Lifecycle of the single bloomd connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// No transport held. Reconnect is throttled by `reconnect_backoff`.
    Disconnected,
    Connected,
    /// Transport held but its last exchange failed (or never completed).
    /// Repaired inline by the next caller.
    Degraded,
}

impl ConnState {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connected => "connected",
            ConnState::Degraded => "degraded",
        }
    }
}

/// Timing policy for the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Bound for one whole check: lock wait, inline repair and query.
    pub query_timeout: Duration,
    /// Bound for dial + `info`. An inline repair is further capped by the
    /// caller's deadline.
    pub connect_timeout: Duration,
    /// TCP keep-alive idle period.
    pub keepalive: Duration,
    /// Minimum spacing between reconnect attempts while disconnected.
    pub reconnect_backoff: Duration,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
            keepalive: Duration::from_secs(20),
            reconnect_backoff: Duration::from_secs(5),
        }
    }
}

struct Slot {
    state: ConnState,
    transport: Option<Box<dyn Transport>>,
    generation: u64,
    retry_at: Option<Instant>,
}

/// Owns at most one live connection to bloomd.
///
/// All access goes through one async mutex: a caller holding a `Session`
/// has exclusive use of the transport, and repair happens under the same
/// lock, so concurrent failures collapse into a single reconnect.
pub struct ConnectionManager {
    addr: String,
    filter: String,
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
    slot: Mutex<Slot>,
    next_generation: AtomicU64,
    metrics: Arc<OracleMetrics>,
}

impl ConnectionManager {
    /// Create a manager in the `Disconnected` state. Nothing is dialed yet.
    pub fn new(
        addr: impl Into<String>,
        filter: impl Into<String>,
        connector: Arc<dyn Connector>,
        settings: ConnectionSettings,
        metrics: Arc<OracleMetrics>,
    ) -> Self {
        Self {
            addr: addr.into(),
            filter: filter.into(),
            connector,
            settings,
            slot: Mutex::new(Slot {
                state: ConnState::Disconnected,
                transport: None,
                generation: 0,
                retry_at: None,
            }),
            next_generation: AtomicU64::new(1),
            metrics,
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub async fn state(&self) -> ConnState {
        self.slot.lock().await.state
    }

    /// Identity of the live transport, if any. Changes on every reconnect.
    pub async fn generation(&self) -> Option<u64> {
        let slot = self.slot.lock().await;
        slot.transport.as_ref().map(|_| slot.generation)
    }

    /// Eager connect at construction time, bounded by `connect_timeout`.
    pub async fn establish(&self) -> Result<()> {
        let deadline = Instant::now() + self.settings.connect_timeout;
        let mut slot = self.slot.lock().await;
        if slot.state == ConnState::Connected {
            return Ok(());
        }
        self.repair(&mut slot, deadline).await
    }

    /// Exclusive access to a usable connection, or `None` once `deadline`
    /// passes.
    ///
    /// A `Degraded` connection is repaired first. While `Disconnected`, a
    /// reconnect is attempted only once the backoff has elapsed; otherwise
    /// `None` is returned right away.
    pub async fn acquire(&self, deadline: Instant) -> Option<Session<'_>> {
        let Ok(mut slot) = timeout_at(deadline, self.slot.lock()).await else {
            tracing::debug!(addr = %self.addr, "bloomd connection busy past deadline");
            return None;
        };

        match slot.state {
            ConnState::Connected => {}
            ConnState::Degraded => {
                let _ = self.repair(&mut slot, deadline).await;
            }
            ConnState::Disconnected => {
                if slot.retry_at.is_some_and(|at| Instant::now() < at) {
                    tracing::debug!(state = slot.state.as_str(), "bloomd reconnect deferred by backoff");
                    return None;
                }
                let _ = self.repair(&mut slot, deadline).await;
            }
        }

        (slot.state == ConnState::Connected).then_some(Session { slot, deadline })
    }

    /// Close whatever is held and dial again. Caller holds the lock.
    async fn repair(&self, slot: &mut Slot, deadline: Instant) -> Result<()> {
        if let Some(mut old) = slot.transport.take() {
            let _ = timeout_at(deadline, old.close()).await;
        }

        let deadline = deadline.min(Instant::now() + self.settings.connect_timeout);
        match self.open(deadline).await {
            Ok((transport, info)) => {
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    addr = %self.addr,
                    filter = %info.name,
                    generation,
                    capacity = ?info.capacity(),
                    size = ?info.size(),
                    probability = ?info.probability(),
                    "connected to bloomd"
                );
                slot.transport = Some(transport);
                slot.generation = generation;
                slot.state = ConnState::Connected;
                slot.retry_at = None;
                self.metrics.connects.inc(&[("result", "ok")]);
                Ok(())
            }
            Err(e) => {
                let retry_in_ms =
                    u64::try_from(self.settings.reconnect_backoff.as_millis()).unwrap_or(u64::MAX);
                tracing::error!(
                    addr = %self.addr,
                    filter = %self.filter,
                    error = %e,
                    retry_in_ms,
                    "error connecting to bloomd"
                );
                slot.state = ConnState::Disconnected;
                slot.retry_at = Some(Instant::now() + self.settings.reconnect_backoff);
                self.metrics.connects.inc(&[("result", "failed")]);
                Err(e)
            }
        }
    }

    /// Dial, enable keep-alive, and confirm the filter with `info`, all
    /// before `deadline`.
    async fn open(&self, deadline: Instant) -> Result<(Box<dyn Transport>, FilterInfo)> {
        let mut transport = match timeout_at(deadline, self.connector.connect(&self.addr)).await {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => return Err(OracleError::Connect(format!("dial {}: {e}", self.addr))),
            Err(_) => return Err(OracleError::Connect(format!("dial {}: timed out", self.addr))),
        };

        if let Err(e) = transport.set_keepalive(self.settings.keepalive) {
            let _ = timeout_at(deadline, transport.close()).await;
            return Err(OracleError::Connect(format!("keep-alive: {e}")));
        }

        let described = describe(&mut Link::new(&mut *transport, deadline), &self.filter).await;
        match described {
            Ok(info) => Ok((transport, info)),
            Err(e) => {
                let _ = timeout_at(deadline, transport.close()).await;
                Err(OracleError::Connect(format!("info {}: {e}", self.filter)))
            }
        }
    }
}

/// `info <filter>` round trip.
async fn describe(link: &mut Link<'_>, filter: &str) -> std::result::Result<FilterInfo, QueryError> {
    link.send(&encode_info(filter)).await?;
    let mut decoder = InfoDecoder::new(filter);
    loop {
        let line = link.recv_line().await?;
        if decoder.feed(&line)? {
            return decoder.finish();
        }
    }
}

/// Exclusive, connected handle. Dropping it releases the lock.
pub struct Session<'a> {
    slot: MutexGuard<'a, Slot>,
    deadline: Instant,
}

impl Session<'_> {
    pub fn generation(&self) -> u64 {
        self.slot.generation
    }

    /// Start an exchange bounded by the deadline passed to `acquire`.
    ///
    /// The connection counts as `Degraded` until `settle` reports a clean
    /// outcome, so an exchange abandoned midway (deadline, cancelled
    /// caller, panic) is never reused with stray bytes in flight.
    pub fn with_deadline(&mut self) -> Option<Link<'_>> {
        let deadline = self.deadline;
        self.slot.state = ConnState::Degraded;
        self.slot
            .transport
            .as_mut()
            .map(|t| Link::new(&mut **t, deadline))
    }

    /// Record the outcome of the exchange started by `with_deadline`.
    pub fn settle<T>(&mut self, outcome: &std::result::Result<T, QueryError>) {
        let clean = match outcome {
            Ok(_) => true,
            Err(e) => !e.poisons_connection(),
        };
        if clean {
            self.slot.state = ConnState::Connected;
        }
    }
}
