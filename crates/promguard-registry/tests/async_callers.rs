//! Mutations issued from async tasks, for every delivery mode and both
//! runtime flavors.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use tokio::sync::mpsc;

use promguard_core::error::ErrorKind;
use promguard_core::labels::LabelSet;
use promguard_registry::{config, CounterMetric, Delivery, MetricsRegistry};

fn registry_with(capacity: usize, delivery: Delivery) -> (MetricsRegistry, mpsc::Receiver<f64>) {
    let (tx, rx) = mpsc::channel(64);
    let (count_tx, mut counts) = mpsc::channel(capacity);
    let reg = MetricsRegistry::builder()
        .output_channels(Some(count_tx), None, delivery)
        .build();
    // A plain-thread consumer drains the sink while the async test is
    // parked in a blocking publish.
    std::thread::spawn(move || {
        while let Some(ev) = counts.blocking_recv() {
            if tx.blocking_send(ev.increment).is_err() {
                break;
            }
        }
    });
    (reg, rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn default_notify_config_works_on_multi_thread_runtime() {
    let yaml = "version: 1\nnotify: { enabled: true, capacity: 1 }\n";
    let cfg = config::load_from_str(yaml).unwrap();
    let (reg, streams) = MetricsRegistry::from_config(&cfg).unwrap();
    let mut streams = streams.expect("notify enabled");
    assert_eq!(cfg.notify.delivery(), Delivery::Blocking);

    let consumer = tokio::spawn(async move {
        let mut got = Vec::new();
        for _ in 0..3 {
            got.push(streams.counts.recv().await.unwrap());
        }
        got
    });

    // Capacity 1: the later publishes have to wait for the consumer task.
    let labels = LabelSet::from([("route", "/a")]);
    for _ in 0..3 {
        reg.inc_counter("requests_total", &labels).unwrap();
    }

    let got = tokio::time::timeout(Duration::from_secs(5), consumer).await.unwrap().unwrap();
    assert_eq!(got.len(), 3);
    assert!(got.iter().all(|e| e.increment == 1.0 && e.labels == labels));
    assert_eq!(reg.counter("requests_total", &labels).unwrap().get(), 3.0);
}

#[tokio::test]
async fn default_notify_config_works_on_current_thread_runtime() {
    let cfg = config::load_from_str("version: 1\nnotify: { enabled: true }\n").unwrap();
    let (reg, streams) = MetricsRegistry::from_config(&cfg).unwrap();
    let mut streams = streams.expect("notify enabled");

    reg.inc_counter("requests_total", &LabelSet::new()).unwrap();
    reg.set_gauge("queue_depth", 5.0).unwrap();

    assert_eq!(streams.counts.recv().await.unwrap().increment, 1.0);
    assert_eq!(streams.gauges.recv().await.unwrap().value, 5.0);
}

#[tokio::test]
async fn blocking_on_current_thread_reports_would_block_when_full() {
    let (count_tx, mut counts) = mpsc::channel(1);
    let reg = MetricsRegistry::builder()
        .output_channels(Some(count_tx), None, Delivery::Blocking)
        .build();
    let c = reg.counter("c_total", &LabelSet::new()).unwrap();

    c.inc().unwrap();
    let err = c.inc().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WouldBlock);
    assert_eq!(c.get(), 2.0);

    assert_eq!(counts.recv().await.unwrap().increment, 1.0);
    c.inc().unwrap();
    assert_eq!(counts.recv().await.unwrap().increment, 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_on_multi_thread_waits_for_plain_consumer() {
    let (reg, mut increments) = registry_with(1, Delivery::Blocking);
    let c = reg.counter("c_total", &LabelSet::new()).unwrap();
    for _ in 0..10 {
        c.inc().unwrap();
    }
    for _ in 0..10 {
        assert_eq!(increments.recv().await.unwrap(), 1.0);
    }
}

#[tokio::test]
async fn best_effort_on_current_thread_drops_when_full() {
    let (count_tx, mut counts) = mpsc::channel(1);
    let reg = MetricsRegistry::builder()
        .output_channels(Some(count_tx), None, Delivery::BestEffort)
        .build();
    let c = reg.counter("c_total", &LabelSet::new()).unwrap();

    c.inc().unwrap();
    c.add(2.0).unwrap();
    assert_eq!(c.get(), 3.0);
    assert_eq!(counts.recv().await.unwrap().increment, 1.0);
    assert!(counts.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn best_effort_on_multi_thread_never_fails() {
    let (count_tx, _counts) = mpsc::channel(1);
    let reg = MetricsRegistry::builder()
        .output_channels(Some(count_tx), None, Delivery::BestEffort)
        .build();
    for _ in 0..100 {
        reg.inc_counter("c_total", &LabelSet::new()).unwrap();
    }
    assert_eq!(reg.counter("c_total", &LabelSet::new()).unwrap().get(), 100.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_on_multi_thread_times_out_without_panicking() {
    let (count_tx, _counts) = mpsc::channel(1);
    let reg = MetricsRegistry::builder()
        .output_channels(Some(count_tx), None, Delivery::Deadline(Duration::from_millis(10)))
        .build();
    let c = reg.counter("c_total", &LabelSet::new()).unwrap();

    c.inc().unwrap();
    assert_eq!(c.inc().unwrap_err().kind(), ErrorKind::PublishTimeout);
    assert_eq!(c.get(), 2.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn deadline_on_multi_thread_succeeds_once_drained() {
    let (reg, mut increments) = registry_with(1, Delivery::Deadline(Duration::from_secs(5)));
    let c = reg.counter("c_total", &LabelSet::new()).unwrap();
    for _ in 0..5 {
        c.add(2.0).unwrap();
    }
    for _ in 0..5 {
        assert_eq!(increments.recv().await.unwrap(), 2.0);
    }
}

#[tokio::test]
async fn deadline_on_current_thread_reports_would_block_when_full() {
    let (count_tx, _counts) = mpsc::channel(1);
    let reg = MetricsRegistry::builder()
        .output_channels(Some(count_tx), None, Delivery::Deadline(Duration::from_secs(60)))
        .build();
    let c = reg.counter("c_total", &LabelSet::new()).unwrap();

    c.inc().unwrap();
    assert_eq!(c.inc().unwrap_err().kind(), ErrorKind::WouldBlock);
}
