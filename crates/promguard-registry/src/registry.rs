//! Memoizing metrics registry.
//!
//! Handles are created lazily, registered with the backend exactly once per
//! identity, and cached for the lifetime of the registry. Lookups take the
//! DashMap fast path; creation re-checks under a single lock shared by the
//! counter and gauge caches, so two racing callers never both register the
//! same series with the backend.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use prometheus::{Encoder, Opts, TextEncoder};
use tokio::sync::mpsc;

use promguard_core::error::{PromGuardError, Result};
use promguard_core::event::{CountChange, GaugeChange};
use promguard_core::labels::{LabelSet, MetricKey};

use crate::config::MetricsConfig;
use crate::metric::{Counter, CounterMetric, Gauge, GaugeMetric};
use crate::sink::{channel_pair, ChangeStreams, ChannelSink, Delivery, EventSink};

pub struct MetricsRegistry {
    backend: prometheus::Registry,
    counters: DashMap<MetricKey, Arc<Counter>>,
    gauges: DashMap<String, Arc<Gauge>>,
    create_lock: Mutex<()>,
    counter_sink: Option<Arc<dyn EventSink<CountChange>>>,
    gauge_sink: Option<Arc<dyn EventSink<GaugeChange>>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Registry over a fresh backend, without change notification.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build from config: pre-registers declared metrics and, if
    /// notification is enabled, returns the receiving ends of the change
    /// streams.
    pub fn from_config(cfg: &MetricsConfig) -> Result<(Self, Option<ChangeStreams>)> {
        let mut builder = Self::builder();
        let mut streams = None;
        if cfg.notify.enabled {
            let (counts, gauges, rx) = channel_pair(cfg.notify.capacity, cfg.notify.delivery());
            builder = builder.counter_sink(counts).gauge_sink(gauges);
            streams = Some(rx);
        }
        let registry = builder.build();

        for decl in &cfg.counters {
            registry.counter(&decl.name, &decl.labels)?;
        }
        for decl in &cfg.gauges {
            let gauge = registry.gauge(&decl.name)?;
            if let Some(initial) = decl.initial {
                gauge.seed(initial);
            }
        }

        tracing::info!(
            counters = registry.counter_count(),
            gauges = registry.gauge_count(),
            notify = cfg.notify.enabled,
            "metrics registry ready"
        );
        Ok((registry, streams))
    }

    /// Counter for `(name, labels)`, created and registered on first use.
    pub fn counter(&self, name: &str, labels: &LabelSet) -> Result<Arc<Counter>> {
        let key = labels.identity_key(name);
        if let Some(c) = self.counters.get(&key) {
            return Ok(Arc::clone(c.value()));
        }

        let _guard = self.lock_creation();
        if let Some(c) = self.counters.get(&key) {
            return Ok(Arc::clone(c.value()));
        }

        let counter = Arc::new(self.create_counter(name, labels)?);
        self.counters.insert(key, Arc::clone(&counter));
        Ok(counter)
    }

    /// Increment the counter for `(name, labels)` by 1.
    pub fn inc_counter(&self, name: &str, labels: &LabelSet) -> Result<()> {
        self.counter(name, labels)?.inc()
    }

    /// Gauge for `name`, created and registered on first use.
    pub fn gauge(&self, name: &str) -> Result<Arc<Gauge>> {
        if let Some(g) = self.gauges.get(name) {
            return Ok(Arc::clone(g.value()));
        }

        let _guard = self.lock_creation();
        if let Some(g) = self.gauges.get(name) {
            return Ok(Arc::clone(g.value()));
        }

        let gauge = Arc::new(self.create_gauge(name)?);
        self.gauges.insert(name.to_string(), Arc::clone(&gauge));
        Ok(gauge)
    }

    /// Set the gauge for `name` to `v`.
    pub fn set_gauge(&self, name: &str, v: f64) -> Result<()> {
        self.gauge(name)?.set(v)
    }

    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    pub fn gauge_count(&self) -> usize {
        self.gauges.len()
    }

    /// Underlying backend registry, e.g. for an external scrape handler.
    pub fn backend(&self) -> &prometheus::Registry {
        &self.backend
    }

    /// Render every registered series in Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let families = self.backend.gather();
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&families, &mut buf)
            .map_err(|e| PromGuardError::Internal(format!("encode metrics failed: {e}")))?;
        String::from_utf8(buf)
            .map_err(|e| PromGuardError::Internal(format!("metrics output not utf-8: {e}")))
    }

    // The guarded data is `()`, so a poisoned lock carries no broken state.
    fn lock_creation(&self) -> MutexGuard<'_, ()> {
        self.create_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_counter(&self, name: &str, labels: &LabelSet) -> Result<Counter> {
        let opts = Opts::new(name, name).const_labels(labels.to_const_labels());
        let inner = prometheus::Counter::with_opts(opts).map_err(|e| registration_failed(name, e))?;
        self.backend
            .register(Box::new(inner.clone()))
            .map_err(|e| registration_failed(name, e))?;
        tracing::debug!(name, labels = ?labels, "counter registered");
        Ok(Counter::new(name, labels.clone(), inner, self.counter_sink.clone()))
    }

    fn create_gauge(&self, name: &str) -> Result<Gauge> {
        let inner = prometheus::Gauge::with_opts(Opts::new(name, name))
            .map_err(|e| registration_failed(name, e))?;
        self.backend
            .register(Box::new(inner.clone()))
            .map_err(|e| registration_failed(name, e))?;
        tracing::debug!(name, "gauge registered");
        Ok(Gauge::new(name, inner, self.gauge_sink.clone()))
    }
}

fn registration_failed(name: &str, e: prometheus::Error) -> PromGuardError {
    tracing::error!(name, error = %e, "metric registration failed");
    PromGuardError::Registration { name: name.to_string(), reason: e.to_string() }
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricsRegistry")
            .field("counters", &self.counters.len())
            .field("gauges", &self.gauges.len())
            .field("counter_sink", &self.counter_sink.is_some())
            .field("gauge_sink", &self.gauge_sink.is_some())
            .finish()
    }
}

/// Configures backend and sinks for a [`MetricsRegistry`].
#[derive(Default)]
pub struct RegistryBuilder {
    backend: Option<prometheus::Registry>,
    counter_sink: Option<Arc<dyn EventSink<CountChange>>>,
    gauge_sink: Option<Arc<dyn EventSink<GaugeChange>>>,
}

impl RegistryBuilder {
    /// Register into an existing backend registry instead of a fresh one.
    pub fn backend(mut self, backend: prometheus::Registry) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn counter_sink(mut self, sink: impl EventSink<CountChange> + 'static) -> Self {
        self.counter_sink = Some(Arc::new(sink));
        self
    }

    pub fn gauge_sink(mut self, sink: impl EventSink<GaugeChange> + 'static) -> Self {
        self.gauge_sink = Some(Arc::new(sink));
        self
    }

    /// Publish changes onto caller-owned channels. Either may be omitted.
    pub fn output_channels(
        mut self,
        counts: Option<mpsc::Sender<CountChange>>,
        gauges: Option<mpsc::Sender<GaugeChange>>,
        delivery: Delivery,
    ) -> Self {
        if let Some(tx) = counts {
            self = self.counter_sink(ChannelSink::new("counter", tx, delivery));
        }
        if let Some(tx) = gauges {
            self = self.gauge_sink(ChannelSink::new("gauge", tx, delivery));
        }
        self
    }

    pub fn build(self) -> MetricsRegistry {
        MetricsRegistry {
            backend: self.backend.unwrap_or_default(),
            counters: DashMap::new(),
            gauges: DashMap::new(),
            create_lock: Mutex::new(()),
            counter_sink: self.counter_sink,
            gauge_sink: self.gauge_sink,
        }
    }
}
