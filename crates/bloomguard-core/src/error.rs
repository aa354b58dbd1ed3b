//! Shared error type across bloomguard crates.

use thiserror::Error;

/// Stable, machine-readable error codes (used as metric labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid setup.
    Config,
    /// Could not establish or re-establish the bloomd connection.
    Connect,
    /// Transport write/read failure.
    Transport,
    /// Per-request deadline exceeded.
    Deadline,
    /// Response did not match the protocol.
    Malformed,
    /// Fewer results than submitted keys.
    Short,
    /// The server answered with an error line.
    Server,
    /// A probe key cannot be encoded on the wire.
    InvalidKey,
}

impl ErrorKind {
    /// String representation used in metrics and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Connect => "CONNECT",
            ErrorKind::Transport => "TRANSPORT",
            ErrorKind::Deadline => "DEADLINE",
            ErrorKind::Malformed => "MALFORMED",
            ErrorKind::Short => "SHORT",
            ErrorKind::Server => "SERVER",
            ErrorKind::InvalidKey => "INVALID_KEY",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, OracleError>;

/// Failure of a single membership round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("deadline exceeded")]
    Deadline,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("short response: expected {expected} results, got {got}")]
    Short { expected: usize, got: usize },
    #[error("server error: {0}")]
    Server(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Transport(_) => ErrorKind::Transport,
            QueryError::Deadline => ErrorKind::Deadline,
            QueryError::Malformed(_) => ErrorKind::Malformed,
            QueryError::Short { .. } => ErrorKind::Short,
            QueryError::Server(_) => ErrorKind::Server,
            QueryError::InvalidKey(_) => ErrorKind::InvalidKey,
        }
    }

    /// Whether the connection must be repaired before it is used again.
    ///
    /// `InvalidKey` is raised while encoding, before any byte reaches the
    /// transport, so the stream is still in sync.
    pub fn poisons_connection(&self) -> bool {
        !matches!(self, QueryError::InvalidKey(_))
    }
}

/// Unified error type used by core and oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("connect failed: {0}")]
    Connect(String),
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl OracleError {
    /// Map to a stable code.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OracleError::Config(_) => ErrorKind::Config,
            OracleError::Connect(_) => ErrorKind::Connect,
            OracleError::Query(q) => q.kind(),
        }
    }
}
