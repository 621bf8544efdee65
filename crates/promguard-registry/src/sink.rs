//! Outbound change-event sinks.
//!
//! A sink receives exactly one event per mutation, in the mutating thread,
//! after the backend has been updated. Whether that call blocks is up to the
//! sink: `ChannelSink` offers blocking, best-effort and deadline delivery.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task;

use promguard_core::error::{PromGuardError, Result};
use promguard_core::event::{CountChange, GaugeChange};

/// Observer capability for one event type.
pub trait EventSink<E>: Send + Sync {
    fn publish(&self, event: E) -> Result<()>;
}

impl<E, F> EventSink<E> for F
where
    F: Fn(E) -> Result<()> + Send + Sync,
{
    fn publish(&self, event: E) -> Result<()> {
        self(event)
    }
}

/// What a channel sink does when the channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Wait until the consumer makes room. A consumer that never drains
    /// stalls every mutating caller.
    Blocking,
    /// Drop the event and keep going.
    BestEffort,
    /// Wait up to the given duration, then fail with `PublishTimeout`.
    Deadline(Duration),
}

const MAX_BACKOFF: Duration = Duration::from_millis(2);

/// Where the publishing thread sits relative to a tokio runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Caller {
    /// No runtime: plain thread blocking is fine.
    Plain,
    /// Multi-thread runtime: blocking must go through `block_in_place`.
    Worker,
    /// Current-thread runtime: the consumer cannot run while we wait.
    CurrentThread,
}

fn caller() -> Caller {
    match Handle::try_current() {
        Err(_) => Caller::Plain,
        Ok(handle) => match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Caller::CurrentThread,
            _ => Caller::Worker,
        },
    }
}

/// Sink backed by a bounded tokio channel.
///
/// Safe to publish from plain threads and from async tasks. On a
/// multi-thread runtime, waiting delivery hands the worker off with
/// `block_in_place` so other tasks (including the consumer) keep running.
/// On a current-thread runtime nothing else can drain the channel while
/// the caller waits, so `Blocking` and `Deadline` fail with `WouldBlock`
/// when the channel is full instead of hanging.
pub struct ChannelSink<E> {
    name: &'static str,
    tx: mpsc::Sender<E>,
    delivery: Delivery,
    dropped: AtomicU64,
}

impl<E: Send> ChannelSink<E> {
    /// `name` identifies the sink in errors and logs (e.g. "counter").
    pub fn new(name: &'static str, tx: mpsc::Sender<E>, delivery: Delivery) -> Self {
        Self { name, tx, delivery, dropped: AtomicU64::new(0) }
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Events discarded by best-effort delivery so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send_blocking(&self, event: E) -> Result<()> {
        let sent = match caller() {
            Caller::Plain => self.tx.blocking_send(event),
            Caller::Worker => task::block_in_place(|| self.tx.blocking_send(event)),
            Caller::CurrentThread => return self.send_now(event),
        };
        sent.map_err(|_| PromGuardError::SinkClosed(self.name))
    }

    fn send_deadline(&self, event: E, limit: Duration) -> Result<()> {
        match caller() {
            Caller::Plain => self.send_within(event, limit),
            Caller::Worker => task::block_in_place(|| self.send_within(event, limit)),
            Caller::CurrentThread => self.send_now(event),
        }
    }

    fn send_now(&self, event: E) -> Result<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PromGuardError::WouldBlock(self.name)),
            Err(TrySendError::Closed(_)) => Err(PromGuardError::SinkClosed(self.name)),
        }
    }

    fn send_best_effort(&self, event: E) -> Result<()> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(sink = self.name, dropped, "sink full, change event dropped");
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(PromGuardError::SinkClosed(self.name)),
        }
    }

    fn send_within(&self, event: E, limit: Duration) -> Result<()> {
        let started = Instant::now();
        let mut pending = event;
        let mut backoff = Duration::from_micros(50);
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Closed(_)) => return Err(PromGuardError::SinkClosed(self.name)),
                Err(TrySendError::Full(ev)) => {
                    let waited = started.elapsed();
                    if waited >= limit {
                        return Err(PromGuardError::PublishTimeout {
                            sink: self.name,
                            waited_ms: waited.as_millis() as u64,
                        });
                    }
                    pending = ev;
                    std::thread::sleep(backoff.min(limit - waited));
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

impl<E: Send> EventSink<E> for ChannelSink<E> {
    fn publish(&self, event: E) -> Result<()> {
        match self.delivery() {
            Delivery::Blocking => self.send_blocking(event),
            Delivery::BestEffort => self.send_best_effort(event),
            Delivery::Deadline(limit) => self.send_deadline(event, limit),
        }
    }
}

/// Receiving ends of the counter and gauge change streams.
#[derive(Debug)]
pub struct ChangeStreams {
    pub counts: mpsc::Receiver<CountChange>,
    pub gauges: mpsc::Receiver<GaugeChange>,
}

/// Build a counter sink and a gauge sink, each over its own channel of
/// `capacity` slots (at least one).
pub fn channel_pair(
    capacity: usize,
    delivery: Delivery,
) -> (ChannelSink<CountChange>, ChannelSink<GaugeChange>, ChangeStreams) {
    let capacity = capacity.max(1);
    let (count_tx, counts) = mpsc::channel(capacity);
    let (gauge_tx, gauges) = mpsc::channel(capacity);
    (
        ChannelSink::new("counter", count_tx, delivery),
        ChannelSink::new("gauge", gauge_tx, delivery),
        ChangeStreams { counts, gauges },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use promguard_core::error::ErrorKind;
    use promguard_core::labels::LabelSet;

    fn change(n: f64) -> CountChange {
        CountChange { name: "c".into(), increment: n, labels: LabelSet::new() }
    }

    #[test]
    fn best_effort_drops_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let sink = ChannelSink::new("counter", tx, Delivery::BestEffort);
        sink.publish(change(1.0)).unwrap();
        sink.publish(change(2.0)).unwrap();
        assert_eq!(sink.dropped(), 1);
        assert_eq!(rx.try_recv().unwrap().increment, 1.0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn deadline_times_out_when_full() {
        let (tx, _rx) = mpsc::channel(1);
        let sink = ChannelSink::new("counter", tx, Delivery::Deadline(Duration::from_millis(10)));
        sink.publish(change(1.0)).unwrap();
        let err = sink.publish(change(1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PublishTimeout);
    }

    #[test]
    fn closed_receiver_is_an_error() {
        let modes = [
            Delivery::Blocking,
            Delivery::BestEffort,
            Delivery::Deadline(Duration::from_millis(5)),
        ];
        for delivery in modes {
            let (tx, rx) = mpsc::channel(4);
            drop(rx);
            let sink = ChannelSink::new("gauge", tx, delivery);
            let err = sink.publish(change(1.0)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::SinkClosed, "{delivery:?}");
        }
    }

    #[test]
    fn closure_is_a_sink() {
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |ev: CountChange| -> Result<()> {
            seen.lock().unwrap().push(ev.increment);
            Ok(())
        };
        sink.publish(change(3.0)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![3.0]);
    }

    #[test]
    fn caller_outside_runtime_is_plain() {
        assert_eq!(caller(), Caller::Plain);
    }

    #[tokio::test]
    async fn caller_on_current_thread_runtime() {
        assert_eq!(caller(), Caller::CurrentThread);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn caller_on_multi_thread_runtime() {
        assert_eq!(caller(), Caller::Worker);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (counts, gauges, mut streams) = channel_pair(0, Delivery::BestEffort);
        assert_eq!(counts.delivery(), Delivery::BestEffort);
        assert_eq!(gauges.delivery(), Delivery::BestEffort);
        counts.publish(change(1.0)).unwrap();
        assert!(streams.counts.try_recv().is_ok());
    }
}
