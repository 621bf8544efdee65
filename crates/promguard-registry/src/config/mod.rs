//! Registry config loader (strict parsing).

pub mod schema;

use std::fs;

use promguard_core::error::{PromGuardError, Result};

pub use schema::{CounterDecl, DeliveryMode, GaugeDecl, MetricsConfig, NotifySection};

pub fn load_from_file(path: &str) -> Result<MetricsConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PromGuardError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<MetricsConfig> {
    let cfg: MetricsConfig = serde_yaml::from_str(s)
        .map_err(|e| PromGuardError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
