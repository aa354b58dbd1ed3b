//! Batched membership query (`multi`) over a deadline-bound link.
//!
//! One request line, one reply line. No retries here: a failure is returned
//! as-is and the oracle decides what happens to the connection.

use bloomguard_core::protocol::bloomd::{decode_multi, encode_multi};
use bloomguard_core::{ProbeKey, QueryError};

use crate::transport::Link;

#[derive(Debug, Clone)]
pub struct MembershipClient {
    filter: String,
}

impl MembershipClient {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
        }
    }

    /// Ask whether each key is in the filter. The result is aligned with
    /// `keys`; any other reply shape is an error.
    pub async fn query(
        &self,
        link: &mut Link<'_>,
        keys: &[ProbeKey],
    ) -> Result<Vec<bool>, QueryError> {
        let request = encode_multi(&self.filter, keys)?;
        link.send(&request).await?;
        let line = link.recv_line().await?;
        decode_multi(&line, keys.len())
    }
}
