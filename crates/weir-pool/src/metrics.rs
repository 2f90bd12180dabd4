//! Pool metrics: monotonic counters plus bounded rolling latency samples
//!
//! Counters are lock-free atomics; the wait-time and use-time buffers keep
//! the most recent observations (oldest evicted first) and are folded into
//! an immutable [`MetricsSnapshot`] on demand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Number of observations kept per rolling buffer
const ROLLING_WINDOW: usize = 1000;

/// Point-in-time view of pool activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Connections tracked by the pool (idle + borrowed)
    pub total_connections: usize,
    /// Connections currently lent out
    pub active_connections: usize,
    /// Connections sitting idle in the registry
    pub idle_connections: usize,
    /// Acquisition requests queued for a connection
    pub waiting_clients: usize,
    /// Physical connections opened over the pool's lifetime
    pub created_connections: u64,
    /// Physical connections closed over the pool's lifetime
    pub destroyed_connections: u64,
    /// Successful acquisitions over the pool's lifetime
    pub borrowed_connections: u64,
    /// Create/validate/query failures over the pool's lifetime
    pub connection_errors: u64,
    /// Mean time callers spent waiting to acquire, over the rolling window
    pub average_wait_time_ms: f64,
    /// Mean time connections spent borrowed, over the rolling window
    pub average_use_time_ms: f64,
    /// Borrows per connection created, as a percentage; 100 when nothing
    /// has been created yet
    pub pool_hit_rate: f64,
}

/// Rolling counters and latency samples backing [`MetricsSnapshot`]
#[derive(Debug, Default)]
pub(crate) struct MetricsCollector {
    created: AtomicU64,
    destroyed: AtomicU64,
    borrowed: AtomicU64,
    connection_errors: AtomicU64,
    wait_samples: Mutex<VecDeque<Duration>>,
    use_samples: Mutex<VecDeque<Duration>>,
}

impl MetricsCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A physical connection was opened
    pub(crate) fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    /// A physical connection was closed
    pub(crate) fn record_destroyed(&self) {
        self.destroyed.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller acquired a connection after waiting for `wait`
    pub(crate) fn record_borrow(&self, wait: Duration) {
        self.borrowed.fetch_add(1, Ordering::Relaxed);
        push_sample(&self.wait_samples, wait);
    }

    /// A borrowed connection was returned after `used` of use
    pub(crate) fn record_use(&self, used: Duration) {
        push_sample(&self.use_samples, used);
    }

    /// A create, validation, or query failure was observed
    pub(crate) fn record_connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn connection_errors(&self) -> u64 {
        self.connection_errors.load(Ordering::Relaxed)
    }

    /// Fold the counters and buffers into an immutable snapshot.
    ///
    /// The gauges (`total`/`idle`/`active`/`waiting`) come from the registry,
    /// which owns that state.
    pub(crate) fn snapshot(
        &self,
        total: usize,
        idle: usize,
        active: usize,
        waiting: usize,
    ) -> MetricsSnapshot {
        let created = self.created.load(Ordering::Relaxed);
        let borrowed = self.borrowed.load(Ordering::Relaxed);

        let pool_hit_rate = if created == 0 {
            100.0
        } else {
            borrowed as f64 / created as f64 * 100.0
        };

        MetricsSnapshot {
            total_connections: total,
            active_connections: active,
            idle_connections: idle,
            waiting_clients: waiting,
            created_connections: created,
            destroyed_connections: self.destroyed.load(Ordering::Relaxed),
            borrowed_connections: borrowed,
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            average_wait_time_ms: mean_ms(&self.wait_samples),
            average_use_time_ms: mean_ms(&self.use_samples),
            pool_hit_rate,
        }
    }
}

fn push_sample(buffer: &Mutex<VecDeque<Duration>>, sample: Duration) {
    let mut samples = buffer.lock();
    if samples.len() == ROLLING_WINDOW {
        samples.pop_front();
    }
    samples.push_back(sample);
}

fn mean_ms(buffer: &Mutex<VecDeque<Duration>>) -> f64 {
    let samples = buffer.lock();
    if samples.is_empty() {
        return 0.0;
    }
    let total_ms: f64 = samples.iter().map(|d| d.as_secs_f64() * 1000.0).sum();
    total_ms / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate_without_creates() {
        let collector = MetricsCollector::new();
        let snapshot = collector.snapshot(0, 0, 0, 0);
        assert_eq!(snapshot.pool_hit_rate, 100.0);
    }

    #[test]
    fn test_hit_rate_counts_reuse() {
        let collector = MetricsCollector::new();
        collector.record_created();
        for _ in 0..3 {
            collector.record_borrow(Duration::ZERO);
        }
        let snapshot = collector.snapshot(1, 1, 0, 0);
        assert_eq!(snapshot.borrowed_connections, 3);
        assert_eq!(snapshot.pool_hit_rate, 300.0);
    }

    #[test]
    fn test_rolling_window_evicts_oldest() {
        let collector = MetricsCollector::new();
        // 100 old samples at 1000ms, then a full window at 10ms
        for _ in 0..100 {
            collector.record_use(Duration::from_millis(1000));
        }
        for _ in 0..ROLLING_WINDOW {
            collector.record_use(Duration::from_millis(10));
        }
        let snapshot = collector.snapshot(0, 0, 0, 0);
        assert!(
            (snapshot.average_use_time_ms - 10.0).abs() < 0.001,
            "old samples should be evicted, got {}",
            snapshot.average_use_time_ms
        );
    }

    #[test]
    fn test_average_wait_time() {
        let collector = MetricsCollector::new();
        collector.record_borrow(Duration::from_millis(10));
        collector.record_borrow(Duration::from_millis(30));
        let snapshot = collector.snapshot(0, 0, 0, 0);
        assert!((snapshot.average_wait_time_ms - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_snapshot_serialization() {
        let collector = MetricsCollector::new();
        collector.record_created();
        collector.record_borrow(Duration::from_millis(5));
        let snapshot = collector.snapshot(1, 0, 1, 0);

        let json = serde_json::to_string(&snapshot).expect("serialize");
        let back: MetricsSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(snapshot, back);
    }
}
