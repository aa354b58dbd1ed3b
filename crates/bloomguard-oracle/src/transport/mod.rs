//! Transport capability seam between the protocol logic and the network.
//!
//! - `Connector` opens a fresh `Transport` to an address.
//! - `Transport` is a line-oriented duplex stream with keep-alive and close.
//! - `Link` bounds every read and write of one request by an absolute
//!   deadline, so a slow or half-open peer cannot stall the caller.

pub mod tcp;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{timeout_at, Instant};

use bloomguard_core::QueryError;

pub use tcp::{TcpConnector, TcpTransport};

/// One open connection to the AMQ service.
#[async_trait]
pub trait Transport: Send {
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Read one `\n`-terminated line (terminator included).
    async fn read_line(&mut self) -> io::Result<String>;

    /// Enable keep-alive probes after `period` of idleness.
    fn set_keepalive(&mut self, period: Duration) -> io::Result<()>;

    /// Release the underlying handle. Idempotent.
    async fn close(&mut self) -> io::Result<()>;
}

/// Factory for transports.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, addr: &str) -> io::Result<Box<dyn Transport>>;
}

/// A transport borrowed for one request, bounded by a deadline.
pub struct Link<'a> {
    io: &'a mut dyn Transport,
    deadline: Instant,
}

impl<'a> Link<'a> {
    pub fn new(io: &'a mut dyn Transport, deadline: Instant) -> Self {
        Self { io, deadline }
    }

    pub async fn send(&mut self, buf: &[u8]) -> Result<(), QueryError> {
        match timeout_at(self.deadline, self.io.write_all(buf)).await {
            Ok(res) => res.map_err(io_error),
            Err(_) => Err(QueryError::Deadline),
        }
    }

    pub async fn recv_line(&mut self) -> Result<String, QueryError> {
        match timeout_at(self.deadline, self.io.read_line()).await {
            Ok(res) => res.map_err(io_error),
            Err(_) => Err(QueryError::Deadline),
        }
    }
}

fn io_error(e: io::Error) -> QueryError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => QueryError::Deadline,
        _ => QueryError::Transport(e.to_string()),
    }
}
