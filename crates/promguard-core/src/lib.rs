//! promguard core: backend-agnostic label sets, change events, and error types.
//!
//! This crate defines the identity and notification contracts shared by the
//! registry and by any observer consuming its change stream. It carries no
//! metrics backend or runtime dependencies so observers can depend on it alone.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `PromGuardError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod event;
pub mod labels;

/// Shared result type.
pub use error::{ErrorKind, PromGuardError, Result};
pub use event::{CountChange, GaugeChange, GaugeChangeKind};
pub use labels::{day_labels, day_labels_at, LabelSet, MetricKey};
