//! Scripted in-memory bloomd shared by the oracle tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use bloomguard_core::KeyStrategy;
use bloomguard_oracle::config::BloomdConfig;
use bloomguard_oracle::transport::{Connector, Transport};

pub const FILTER: &str = "revoked";

/// Server-side knobs and observations.
#[derive(Debug, Default)]
pub struct Script {
    pub members: HashSet<String>,
    /// Upcoming `multi` writes that fail with a broken pipe.
    pub fail_queries: usize,
    /// Upcoming `multi` replies that drop their last result.
    pub short_replies: usize,
    /// `multi` requests are swallowed and never answered.
    pub hang_queries: bool,
    /// `multi` writes panic inside the transport.
    pub panic_queries: bool,
    pub refuse_connects: bool,
    pub missing_filter: bool,
    /// Time spent dialing before the connection is accepted.
    pub connect_delay: Duration,
    /// Time before the `info` reply is readable.
    pub info_delay: Duration,

    pub connects: usize,
    pub multi_calls: usize,
    pub closes: usize,
    pub keepalive: Option<Duration>,
    /// "connect" | "info" | "multi" | "close", in order.
    pub events: Vec<&'static str>,
}

#[derive(Clone, Default)]
pub struct FakeBloomd {
    state: Arc<Mutex<Script>>,
}

impl FakeBloomd {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revoke(&self, key: &str) {
        self.with(|s| {
            s.members.insert(key.to_string());
        });
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn connects(&self) -> usize {
        self.with(|s| s.connects)
    }

    pub fn multi_calls(&self) -> usize {
        self.with(|s| s.multi_calls)
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.with(|s| s.events.clone())
    }

    pub fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(FakeConnector {
            state: Arc::clone(&self.state),
        })
    }
}

struct FakeConnector {
    state: Arc<Mutex<Script>>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _addr: &str) -> io::Result<Box<dyn Transport>> {
        let delay = {
            let mut s = self.state.lock().unwrap();
            s.connects += 1;
            s.events.push("connect");
            if s.refuse_connects {
                return Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
            }
            s.connect_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(Box::new(FakeTransport {
            state: Arc::clone(&self.state),
            pending: VecDeque::new(),
            hung: false,
            reply_delay: Duration::ZERO,
        }))
    }
}

struct FakeTransport {
    state: Arc<Mutex<Script>>,
    pending: VecDeque<String>,
    hung: bool,
    reply_delay: Duration,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let line = std::str::from_utf8(buf).unwrap().trim_end().to_string();
        let mut parts = line.split(' ');
        let cmd = parts.next().unwrap_or_default();
        let filter = parts.next().unwrap_or_default().to_string();
        let keys: Vec<String> = parts.map(str::to_string).collect();

        let mut s = self.state.lock().unwrap();
        match cmd {
            "info" => {
                s.events.push("info");
                self.reply_delay = s.info_delay;
                if s.missing_filter || filter != FILTER {
                    self.pending.push_back("Filter does not exist\n".into());
                } else {
                    for l in ["START", "capacity 100000", "probability 0.000100", "size 3", "END"] {
                        self.pending.push_back(format!("{l}\n"));
                    }
                }
            }
            "multi" => {
                s.events.push("multi");
                s.multi_calls += 1;
                if s.panic_queries {
                    drop(s);
                    panic!("transport exploded");
                }
                if s.fail_queries > 0 {
                    s.fail_queries -= 1;
                    return Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"));
                }
                if s.hang_queries {
                    self.hung = true;
                    return Ok(());
                }
                let mut answers: Vec<&str> = keys
                    .iter()
                    .map(|k| if s.members.contains(k) { "Yes" } else { "No" })
                    .collect();
                if s.short_replies > 0 {
                    s.short_replies -= 1;
                    answers.pop();
                }
                self.pending.push_back(format!("{}\n", answers.join(" ")));
            }
            other => panic!("unexpected command {other:?}"),
        }
        Ok(())
    }

    async fn read_line(&mut self) -> io::Result<String> {
        if self.hung {
            return std::future::pending().await;
        }
        let delay = std::mem::take(&mut self.reply_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.pending
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no reply queued"))
    }

    fn set_keepalive(&mut self, period: Duration) -> io::Result<()> {
        self.state.lock().unwrap().keepalive = Some(period);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        let mut s = self.state.lock().unwrap();
        s.closes += 1;
        s.events.push("close");
        Ok(())
    }
}

pub fn config(fields: &[&str], strategy: KeyStrategy) -> BloomdConfig {
    BloomdConfig::new(
        FILTER,
        "fake:8673",
        fields.iter().map(|f| f.to_string()).collect(),
        strategy,
    )
}
