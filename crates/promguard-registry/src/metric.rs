//! Counter and gauge wrappers.
//!
//! Each wrapper owns one backend handle plus its identity, and forwards every
//! mutation to the backend before publishing a change event to the optional
//! sink. Identity (name and labels) never changes after construction.

use std::fmt;
use std::sync::Arc;

use promguard_core::error::{PromGuardError, Result};
use promguard_core::event::{CountChange, GaugeChange, GaugeChangeKind};
use promguard_core::labels::LabelSet;

use crate::sink::EventSink;

/// A value that only ever goes up.
pub trait CounterMetric {
    /// Add 1.
    fn inc(&self) -> Result<()>;
    /// Add `v`; fails with `InvalidArgument` if `v` is negative or NaN.
    fn add(&self, v: f64) -> Result<()>;
}

/// A value that can go up and down.
pub trait GaugeMetric {
    /// Set an absolute value. The emitted event carries `v` itself.
    fn set(&self, v: f64) -> Result<()>;
    fn inc(&self) -> Result<()>;
    fn dec(&self) -> Result<()>;
    /// Add a signed delta.
    fn add(&self, v: f64) -> Result<()>;
    /// Subtract a signed delta; the event carries `-v`.
    fn sub(&self, v: f64) -> Result<()>;
}

pub struct Counter {
    name: String,
    labels: LabelSet,
    inner: prometheus::Counter,
    changes: Option<Arc<dyn EventSink<CountChange>>>,
}

impl Counter {
    pub(crate) fn new(
        name: &str,
        labels: LabelSet,
        inner: prometheus::Counter,
        changes: Option<Arc<dyn EventSink<CountChange>>>,
    ) -> Self {
        Self { name: name.to_string(), labels, inner, changes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Current backend value.
    pub fn get(&self) -> f64 {
        self.inner.get()
    }

    fn signal(&self, increment: f64) -> Result<()> {
        let Some(changes) = &self.changes else {
            return Ok(());
        };
        changes.publish(CountChange {
            name: self.name.clone(),
            increment,
            labels: self.labels.clone(),
        })
    }
}

impl CounterMetric for Counter {
    fn inc(&self) -> Result<()> {
        self.inner.inc();
        self.signal(1.0)
    }

    fn add(&self, v: f64) -> Result<()> {
        // `!(v >= 0.0)` also rejects NaN; the backend would panic on either.
        if !(v >= 0.0) {
            return Err(PromGuardError::InvalidArgument(format!(
                "counter {} cannot be increased by {v}",
                self.name
            )));
        }
        self.inner.inc_by(v);
        self.signal(v)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("value", &self.get())
            .field("notifies", &self.changes.is_some())
            .finish()
    }
}

pub struct Gauge {
    name: String,
    labels: LabelSet,
    inner: prometheus::Gauge,
    changes: Option<Arc<dyn EventSink<GaugeChange>>>,
}

impl Gauge {
    pub(crate) fn new(
        name: &str,
        inner: prometheus::Gauge,
        changes: Option<Arc<dyn EventSink<GaugeChange>>>,
    ) -> Self {
        Self { name: name.to_string(), labels: LabelSet::new(), inner, changes }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Always empty: gauges are identified by name alone.
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Current backend value.
    pub fn get(&self) -> f64 {
        self.inner.get()
    }

    /// Set the backend value without emitting an event. Used for declared
    /// initial values at startup.
    pub(crate) fn seed(&self, v: f64) {
        self.inner.set(v);
    }

    fn signal(&self, value: f64, kind: GaugeChangeKind) -> Result<()> {
        let Some(changes) = &self.changes else {
            return Ok(());
        };
        changes.publish(GaugeChange {
            name: self.name.clone(),
            value,
            kind,
            labels: self.labels.clone(),
        })
    }
}

impl GaugeMetric for Gauge {
    fn set(&self, v: f64) -> Result<()> {
        self.inner.set(v);
        self.signal(v, GaugeChangeKind::Absolute)
    }

    fn inc(&self) -> Result<()> {
        self.inner.inc();
        self.signal(1.0, GaugeChangeKind::Delta)
    }

    fn dec(&self) -> Result<()> {
        self.inner.dec();
        self.signal(-1.0, GaugeChangeKind::Delta)
    }

    fn add(&self, v: f64) -> Result<()> {
        self.inner.add(v);
        self.signal(v, GaugeChangeKind::Delta)
    }

    fn sub(&self, v: f64) -> Result<()> {
        self.inner.sub(v);
        self.signal(-v, GaugeChangeKind::Delta)
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("name", &self.name)
            .field("value", &self.get())
            .field("notifies", &self.changes.is_some())
            .finish()
    }
}
