//! Change events emitted by counters and gauges.
//!
//! Events are outbound signals only; the registry never retains them.

use serde::{Deserialize, Serialize};

use crate::labels::LabelSet;

/// One counter mutation. Carries the increment applied, not the resulting total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountChange {
    pub name: String,
    pub increment: f64,
    pub labels: LabelSet,
}

/// How to read [`GaugeChange::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GaugeChangeKind {
    /// `set`: the new absolute value.
    Absolute,
    /// `inc`/`dec`/`add`/`sub`: the signed amount applied.
    Delta,
}

/// One gauge mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeChange {
    pub name: String,
    pub value: f64,
    pub kind: GaugeChangeKind,
    pub labels: LabelSet,
}

impl GaugeChange {
    pub fn absolute(name: impl Into<String>, value: f64, labels: LabelSet) -> Self {
        Self { name: name.into(), value, kind: GaugeChangeKind::Absolute, labels }
    }

    pub fn delta(name: impl Into<String>, value: f64, labels: LabelSet) -> Self {
        Self { name: name.into(), value, kind: GaugeChangeKind::Delta, labels }
    }
}
