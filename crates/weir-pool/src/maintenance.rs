//! Background pool maintenance
//!
//! A single task ticks every reap interval and reshapes the idle set:
//! validates idle connections, reaps those idle past the timeout while the
//! pool is above its minimum, and tops the pool back up toward the minimum.
//! The task is signalled and joined deterministically during shutdown, so
//! no pass can overlap teardown (or another pass).

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::events::{DestroyReason, PoolEvent};
use crate::pool::pool::PoolInner;
use crate::pool::PooledConnection;

pub(crate) fn spawn(
    inner: Arc<PoolInner>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = inner.config.reap_interval();
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => run_pass(&inner).await,
                _ = shutdown.recv() => {
                    tracing::debug!("maintenance task stopping");
                    break;
                }
            }
        }
    })
}

/// One maintenance pass over the idle set.
async fn run_pass(inner: &Arc<PoolInner>) {
    let config = &inner.config;
    let mut destroyed = 0usize;
    let mut created = 0usize;

    // Pull the idle set out of the registry. Acquires that race this pass
    // queue briefly; every survivor is offered back through the waiter
    // queue, so the queue head is served first.
    let idle: Vec<PooledConnection> = { inner.state.lock().idle.drain(..).collect() };

    let mut survivors: Vec<PooledConnection> = Vec::with_capacity(idle.len());
    if config.test_on_idle() {
        let probes = idle.into_iter().map(|mut entry| {
            let inner = Arc::clone(inner);
            async move {
                let alive = inner.validate_entry(&mut entry).await;
                (entry, alive)
            }
        });
        for (entry, alive) in futures::future::join_all(probes).await {
            if alive {
                survivors.push(entry);
            } else {
                inner
                    .destroy_entry(entry, DestroyReason::IdleValidation)
                    .await;
                destroyed += 1;
            }
        }
    } else {
        survivors = idle;
    }

    // Reap connections idle past the timeout, least recently used first,
    // never shrinking the pool below its minimum.
    let mut keep: Vec<PooledConnection> = Vec::with_capacity(survivors.len());
    for entry in survivors {
        let above_min = { inner.state.lock().total > config.min_size() };
        if above_min && entry.idle_for() > config.idle_timeout() {
            inner.destroy_entry(entry, DestroyReason::IdleExpired).await;
            destroyed += 1;
        } else {
            keep.push(entry);
        }
    }

    for entry in keep {
        inner.hand_back(entry);
    }

    // Top the idle set back up toward min, bounded by max. A connection
    // created here may go straight to a queued caller instead of idling.
    loop {
        let reserved = {
            let mut state = inner.state.lock();
            if state.idle.len() < config.min_size() && state.total < config.max_size() {
                state.total += 1;
                true
            } else {
                false
            }
        };
        if !reserved {
            break;
        }
        match inner.create_connection().await {
            Ok(entry) => {
                inner.hand_back(entry);
                created += 1;
            }
            Err(e) => {
                inner.state.lock().total -= 1;
                tracing::warn!(error = %e, "maintenance failed to create connection");
                break;
            }
        }
    }

    if destroyed > 0 || created > 0 {
        tracing::debug!(destroyed, created, "maintenance pass completed");
    }
    inner.emit(PoolEvent::MaintenanceCompleted { destroyed, created });
    inner.emit(PoolEvent::MetricsUpdated(inner.snapshot()));
}
