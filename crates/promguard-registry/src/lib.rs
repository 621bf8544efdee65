//! promguard registry library entry.
//!
//! Memoizing counter/gauge registry over the `prometheus` backend, with an
//! optional change-notification side channel. Intended to be constructed once
//! by the host process and passed to whatever needs to record metrics.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod metric;
pub mod registry;
pub mod sink;

pub use metric::{Counter, CounterMetric, Gauge, GaugeMetric};
pub use registry::{MetricsRegistry, RegistryBuilder};
pub use sink::{channel_pair, ChangeStreams, ChannelSink, Delivery, EventSink};
