//! Oracle config loader (strict parsing).

pub mod schema;

use std::fs;

use bloomguard_core::error::{OracleError, Result};

pub use schema::{BloomdConfig, OracleConfig};

pub fn load_from_file(path: &str) -> Result<OracleConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| OracleError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<OracleConfig> {
    let cfg: OracleConfig = serde_yaml::from_str(s)
        .map_err(|e| OracleError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
