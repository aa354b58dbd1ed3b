//! bloomguard-check
//!
//! Reads one JSON claim object per stdin line and prints `reject` or
//! `allow` for each, using the bloomd section of the given config
//! (default `bloomguard.yaml`).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use bloomguard_core::ClaimSet;
use bloomguard_oracle::{config, register, transport::TcpConnector, Rejecter};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "bloomguard.yaml".into());
    let cfg = config::load_from_file(&path).expect("config load failed");

    let reg = register(cfg.bloomd.as_ref(), Arc::new(TcpConnector)).await;
    if let Some(e) = &reg.error {
        tracing::warn!(error = %e, "revocation checks disabled");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        // Unparsable claims follow the same fail-open rule as the oracle.
        let rejected = match ClaimSet::from_json(&line) {
            Ok(claims) => reg.rejecter.check(&claims).await,
            Err(e) => {
                tracing::warn!(error = %e, "invalid claims json");
                false
            }
        };
        println!("{}", if rejected { "reject" } else { "allow" });
    }

    if let Some(oracle) = &reg.oracle {
        tracing::debug!(metrics = %oracle.metrics().render(), "final metrics");
    }
}
