//! bloomd line protocol (subset: `info` and `multi`).
//!
//! Requests are single `\n`-terminated lines of space-separated tokens:
//! - `info <filter>` -> `START`, then `<key> <value>` lines, then `END`.
//! - `multi <filter> <k1> <k2> ...` -> one line of `Yes`/`No`, one per key.
//!
//! Errors come back as a single line (`Filter does not exist`,
//! `Client Error: ...`, `Internal Error`).

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{OracleError, QueryError, Result};
use crate::keys::ProbeKey;

/// Default bloomd TCP port.
pub const DEFAULT_PORT: u16 = 8673;

/// Upper bound on `key value` lines accepted in an `info` reply.
pub const MAX_INFO_LINES: usize = 64;

const YES: &str = "Yes";
const NO: &str = "No";
const INFO_START: &str = "START";
const INFO_END: &str = "END";

const SERVER_ERRORS: [&str; 3] = ["Filter does not exist", "Client Error", "Internal Error"];

/// Filter names go on the wire unquoted.
pub fn validate_filter_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(OracleError::Config("filter name is required".into()));
    }
    if !is_wire_token(name) {
        return Err(OracleError::Config(format!(
            "filter name must not contain whitespace or control characters: {name:?}"
        )));
    }
    Ok(())
}

fn is_wire_token(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c.is_control())
}

/// `info <filter>\n`
pub fn encode_info(filter: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(6 + filter.len());
    buf.put_slice(b"info ");
    buf.put_slice(filter.as_bytes());
    buf.put_u8(b'\n');
    buf.freeze()
}

/// `multi <filter> <k1> ... <kn>\n`
///
/// Fails with `InvalidKey` when the batch is empty or a key is not a single
/// wire token. Nothing has been written at that point.
pub fn encode_multi(filter: &str, keys: &[ProbeKey]) -> std::result::Result<Bytes, QueryError> {
    if keys.is_empty() {
        return Err(QueryError::InvalidKey("empty key batch".into()));
    }
    let payload: usize = keys.iter().map(|k| k.as_str().len() + 1).sum();
    let mut buf = BytesMut::with_capacity(7 + filter.len() + payload);
    buf.put_slice(b"multi ");
    buf.put_slice(filter.as_bytes());
    for key in keys {
        if !is_wire_token(key.as_str()) {
            return Err(QueryError::InvalidKey(format!("{:?}", key.as_str())));
        }
        buf.put_u8(b' ');
        buf.put_slice(key.as_str().as_bytes());
    }
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}

fn server_error(line: &str) -> Option<QueryError> {
    SERVER_ERRORS
        .iter()
        .any(|p| line.starts_with(p))
        .then(|| QueryError::Server(line.to_string()))
}

/// Decode a `multi` reply. The result is aligned with the submitted keys.
pub fn decode_multi(line: &str, expected: usize) -> std::result::Result<Vec<bool>, QueryError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if let Some(err) = server_error(line) {
        return Err(err);
    }

    let mut out = Vec::with_capacity(expected);
    for token in line.split_ascii_whitespace() {
        match token {
            YES => out.push(true),
            NO => out.push(false),
            other => {
                return Err(QueryError::Malformed(format!("unexpected token: {other:?}")));
            }
        }
    }

    if out.len() < expected {
        return Err(QueryError::Short {
            expected,
            got: out.len(),
        });
    }
    if out.len() > expected {
        return Err(QueryError::Malformed(format!(
            "expected {expected} results, got {}",
            out.len()
        )));
    }
    Ok(out)
}

/// Filter metadata reported by `info`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInfo {
    pub name: String,
    pub stats: Vec<(String, String)>,
}

impl FilterInfo {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.stats
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn capacity(&self) -> Option<u64> {
        self.get("capacity").and_then(|v| v.parse().ok())
    }

    pub fn size(&self) -> Option<u64> {
        self.get("size").and_then(|v| v.parse().ok())
    }

    pub fn probability(&self) -> Option<f64> {
        self.get("probability").and_then(|v| v.parse().ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InfoState {
    AwaitStart,
    Body,
    Done,
}

/// Incremental decoder for the multi-line `info` reply.
#[derive(Debug)]
pub struct InfoDecoder {
    state: InfoState,
    info: FilterInfo,
}

impl InfoDecoder {
    pub fn new(filter: &str) -> Self {
        Self {
            state: InfoState::AwaitStart,
            info: FilterInfo {
                name: filter.to_string(),
                stats: Vec::new(),
            },
        }
    }

    /// Feed one line. Returns `true` once `END` has been seen.
    pub fn feed(&mut self, line: &str) -> std::result::Result<bool, QueryError> {
        let line = line.trim_end_matches(['\r', '\n']);
        match self.state {
            InfoState::AwaitStart => {
                if line == INFO_START {
                    self.state = InfoState::Body;
                    return Ok(false);
                }
                Err(server_error(line).unwrap_or_else(|| {
                    QueryError::Malformed(format!("expected START, got {line:?}"))
                }))
            }
            InfoState::Body => {
                if line == INFO_END {
                    self.state = InfoState::Done;
                    return Ok(true);
                }
                if self.info.stats.len() >= MAX_INFO_LINES {
                    return Err(QueryError::Malformed("info reply too long".into()));
                }
                let (k, v) = line.split_once(' ').ok_or_else(|| {
                    QueryError::Malformed(format!("invalid info line: {line:?}"))
                })?;
                self.info.stats.push((k.to_string(), v.trim().to_string()));
                Ok(false)
            }
            InfoState::Done => Err(QueryError::Malformed("data after END".into())),
        }
    }

    pub fn finish(self) -> std::result::Result<FilterInfo, QueryError> {
        match self.state {
            InfoState::Done => Ok(self.info),
            _ => Err(QueryError::Malformed("info reply incomplete".into())),
        }
    }
}
