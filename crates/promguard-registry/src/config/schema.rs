use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;
use promguard_core::error::{PromGuardError, Result};
use promguard_core::labels::LabelSet;

use crate::sink::Delivery;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    pub version: u32,

    #[serde(default)]
    pub notify: NotifySection,

    #[serde(default)]
    pub counters: Vec<CounterDecl>,

    #[serde(default)]
    pub gauges: Vec<GaugeDecl>,
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PromGuardError::UnsupportedVersion);
        }

        self.notify.validate()?;

        let mut seen = HashSet::new();
        for c in &self.counters {
            if c.name.is_empty() {
                return Err(PromGuardError::BadConfig("counters[].name must not be empty".into()));
            }
            if !seen.insert(c.labels.identity_key(&c.name)) {
                return Err(PromGuardError::BadConfig(format!(
                    "counter {} declared twice with the same labels",
                    c.name
                )));
            }
        }

        let mut seen = HashSet::new();
        for g in &self.gauges {
            if g.name.is_empty() {
                return Err(PromGuardError::BadConfig("gauges[].name must not be empty".into()));
            }
            if !seen.insert(g.name.as_str()) {
                return Err(PromGuardError::BadConfig(format!("gauge {} declared twice", g.name)));
            }
        }

        Ok(())
    }
}

/// Change notification settings. Off unless explicitly enabled.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifySection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub delivery: DeliveryMode,

    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            enabled: false,
            delivery: DeliveryMode::default(),
            capacity: default_capacity(),
            deadline_ms: None,
        }
    }
}

impl NotifySection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=65536).contains(&self.capacity) {
            return Err(PromGuardError::BadConfig(
                "notify.capacity must be between 1 and 65536".into(),
            ));
        }
        match (self.delivery, self.deadline_ms) {
            (DeliveryMode::Deadline, None) => Err(PromGuardError::BadConfig(
                "notify.deadline_ms is required when delivery is deadline".into(),
            )),
            (DeliveryMode::Deadline, Some(ms)) if !(1..=60000).contains(&ms) => Err(
                PromGuardError::BadConfig("notify.deadline_ms must be between 1 and 60000".into()),
            ),
            (DeliveryMode::Blocking | DeliveryMode::BestEffort, Some(_)) => {
                Err(PromGuardError::BadConfig(
                    "notify.deadline_ms only applies to deadline delivery".into(),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Runtime delivery policy. Call after `validate`.
    pub fn delivery(&self) -> Delivery {
        match self.delivery {
            DeliveryMode::Blocking => Delivery::Blocking,
            DeliveryMode::BestEffort => Delivery::BestEffort,
            DeliveryMode::Deadline => {
                let ms = self.deadline_ms.unwrap_or_else(default_deadline_ms);
                Delivery::Deadline(Duration::from_millis(ms))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    #[default]
    Blocking,
    BestEffort,
    Deadline,
}

fn default_capacity() -> usize {
    1024
}
fn default_deadline_ms() -> u64 {
    50
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CounterDecl {
    pub name: String,
    #[serde(default)]
    pub labels: LabelSet,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GaugeDecl {
    pub name: String,
    #[serde(default)]
    pub initial: Option<f64>,
}
