//! Connection pool implementation
//!
//! One mutex guards the registry (idle connections, the total count, and
//! the waiting queue), so "check available, mark borrowed" is atomic: two
//! concurrent callers can never claim the same idle connection. All
//! backend I/O (connect, probe, close) happens outside the lock, on
//! records that are neither idle nor borrowed at that moment.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;
use weir_core::{Backend, BackendConfig, Result, WeirError};

use super::config::PoolConfig;
use super::entry::{BackendMeta, PoolGuard, PooledConnection};
use crate::events::{DestroyReason, PoolEvent};
use crate::health::PoolHealth;
use crate::maintenance;
use crate::metrics::{MetricsCollector, MetricsSnapshot};

/// A queued acquisition request
///
/// Fulfillment and timeout-removal both happen under the registry lock, so
/// a waiter is never double-fulfilled.
pub(crate) struct Waiter {
    pub(crate) id: Uuid,
    pub(crate) enqueued_at: Instant,
    pub(crate) tx: oneshot::Sender<Result<PooledConnection>>,
}

/// Registry state: the only mutable state shared across tasks
pub(crate) struct PoolState {
    /// Idle-valid connections; front is the least recently returned
    pub(crate) idle: VecDeque<PooledConnection>,
    /// Connections the pool accounts for: idle + borrowed + slots reserved
    /// for an in-flight create or close
    pub(crate) total: usize,
    /// Queued acquisition requests, strictly FIFO
    pub(crate) waiting: VecDeque<Waiter>,
}

/// What `acquire` decided to do while holding the registry lock
enum Plan {
    Borrow(PooledConnection),
    Create,
    Wait(Uuid, oneshot::Receiver<Result<PooledConnection>>),
}

pub(crate) struct PoolInner {
    pub(crate) config: PoolConfig,
    backend: Arc<dyn Backend>,
    backend_config: BackendConfig,
    pub(crate) state: Mutex<PoolState>,
    pub(crate) metrics: MetricsCollector,
    events: broadcast::Sender<PoolEvent>,
    shutting_down: AtomicBool,
}

impl PoolInner {
    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Fire-and-forget lifecycle notification
    pub(crate) fn emit(&self, event: PoolEvent) {
        let _ = self.events.send(event);
    }

    /// Open a physical connection, bounded by the create timeout.
    ///
    /// The caller must have reserved a slot (`total += 1`) before calling
    /// and must give it back on failure; no partial registry entry is ever
    /// left behind.
    pub(crate) async fn create_connection(&self) -> Result<PooledConnection> {
        let connect = self.backend.connect(&self.backend_config);
        let handle = match tokio::time::timeout(self.config.create_timeout(), connect).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                self.metrics.record_connection_error();
                return Err(WeirError::ConnectionCreate(e.to_string()));
            }
            Err(_) => {
                self.metrics.record_connection_error();
                return Err(WeirError::ConnectionCreate(format!(
                    "connect timed out after {:?}",
                    self.config.create_timeout()
                )));
            }
        };

        let entry = PooledConnection::new(
            handle,
            BackendMeta {
                backend: self.backend.name().to_string(),
                kind: self.backend.kind(),
            },
        );
        self.metrics.record_created();
        tracing::debug!(connection_id = %entry.id, backend = self.backend.name(), "connection created");
        self.emit(PoolEvent::ConnectionCreated {
            id: entry.id,
            backend: self.backend.name().to_string(),
        });
        Ok(entry)
    }

    /// Close a connection and drop it from the registry accounting.
    pub(crate) async fn destroy_entry(&self, entry: PooledConnection, reason: DestroyReason) {
        match tokio::time::timeout(self.config.destroy_timeout(), entry.handle.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(connection_id = %entry.id, error = %e, "error closing connection");
            }
            Err(_) => {
                tracing::warn!(connection_id = %entry.id, "close timed out");
            }
        }
        self.state.lock().total -= 1;
        self.metrics.record_destroyed();
        tracing::debug!(connection_id = %entry.id, reason = reason.as_str(), "connection destroyed");
        self.emit(PoolEvent::ConnectionDestroyed {
            id: entry.id,
            reason,
        });
    }

    /// Synchronous bookkeeping for a connection dropped without closing
    /// (guard dropped during shutdown outside a runtime).
    pub(crate) fn forget_entry(&self, entry: PooledConnection) {
        self.state.lock().total -= 1;
        self.metrics.record_destroyed();
        self.emit(PoolEvent::ConnectionDestroyed {
            id: entry.id,
            reason: DestroyReason::Shutdown,
        });
    }

    /// Run the adapter's liveness probe, bounded by the validate timeout.
    ///
    /// A pass resets the record's error count; a failure marks it invalid.
    pub(crate) async fn validate_entry(&self, entry: &mut PooledConnection) -> bool {
        let alive = match tokio::time::timeout(
            self.config.validate_timeout(),
            entry.handle.validate(),
        )
        .await
        {
            Ok(alive) => alive,
            Err(_) => false,
        };

        if alive {
            entry.valid = true;
            entry.error_count = 0;
        } else {
            entry.valid = false;
            entry.error_count += 1;
            self.metrics.record_connection_error();
            tracing::debug!(connection_id = %entry.id, "validation failed");
            self.emit(PoolEvent::ValidationFailed { id: entry.id });
        }
        alive
    }

    /// Acquire a connection: idle hit, create below max, or queue.
    pub(crate) async fn acquire(
        self: &Arc<Self>,
        timeout_override: Option<Duration>,
    ) -> Result<PoolGuard> {
        if self.is_shutting_down() {
            return Err(WeirError::ShuttingDown);
        }
        let wait_start = Instant::now();

        loop {
            let plan = {
                let mut state = self.state.lock();
                if let Some(entry) = state.idle.pop_front() {
                    Plan::Borrow(entry)
                } else if state.total < self.config.max_size() {
                    // Reserve the slot before the connect I/O so concurrent
                    // callers cannot push the pool past max.
                    state.total += 1;
                    Plan::Create
                } else if state.waiting.len() >= self.config.max_waiting_clients() {
                    return Err(WeirError::PoolExhausted {
                        waiting: state.waiting.len(),
                        limit: self.config.max_waiting_clients(),
                    });
                } else {
                    let (tx, rx) = oneshot::channel();
                    let waiter = Waiter {
                        id: Uuid::new_v4(),
                        enqueued_at: Instant::now(),
                        tx,
                    };
                    let id = waiter.id;
                    state.waiting.push_back(waiter);
                    Plan::Wait(id, rx)
                }
            };

            match plan {
                Plan::Borrow(mut entry) => {
                    if self.config.test_on_borrow() && !self.validate_entry(&mut entry).await {
                        self.destroy_entry(entry, DestroyReason::BorrowValidation).await;
                        continue;
                    }
                    return Ok(self.lend(entry, wait_start));
                }
                Plan::Create => match self.create_connection().await {
                    Ok(entry) => return Ok(self.lend(entry, wait_start)),
                    Err(e) => {
                        self.state.lock().total -= 1;
                        return Err(e);
                    }
                },
                Plan::Wait(id, mut rx) => {
                    let deadline =
                        timeout_override.unwrap_or_else(|| self.config.acquire_timeout());
                    match tokio::time::timeout(deadline, &mut rx).await {
                        Ok(Ok(Ok(entry))) => return Ok(self.lend(entry, wait_start)),
                        Ok(Ok(Err(e))) => return Err(e),
                        // Sender dropped without fulfilling: pool teardown.
                        Ok(Err(_)) => return Err(WeirError::ShuttingDown),
                        Err(_) => {
                            let removed = {
                                let mut state = self.state.lock();
                                remove_waiter(&mut state, id)
                            };
                            if removed {
                                tracing::debug!(waited = ?deadline, "acquire timed out");
                                return Err(WeirError::AcquireTimeout(deadline));
                            }
                            // Fulfilled in the same instant the timer fired:
                            // the connection is already in the channel.
                            match rx.try_recv() {
                                Ok(Ok(entry)) => return Ok(self.lend(entry, wait_start)),
                                Ok(Err(e)) => return Err(e),
                                Err(_) => return Err(WeirError::AcquireTimeout(deadline)),
                            }
                        }
                    }
                }
            }
        }
    }

    fn lend(self: &Arc<Self>, mut entry: PooledConnection, wait_start: Instant) -> PoolGuard {
        entry.mark_borrowed();
        self.metrics.record_borrow(wait_start.elapsed());
        PoolGuard::new(entry, Arc::clone(self))
    }

    /// Return a connection to the registry: the oldest waiter gets it
    /// before it is ever counted idle.
    pub(crate) fn hand_back(&self, mut entry: PooledConnection) {
        // A handle the backend already closed is dropped, never re-lent.
        if entry.handle.is_closed() {
            self.state.lock().total -= 1;
            self.metrics.record_destroyed();
            self.emit(PoolEvent::ConnectionDestroyed {
                id: entry.id,
                reason: DestroyReason::Closed,
            });
            return;
        }

        let mut state = self.state.lock();
        while let Some(waiter) = state.waiting.pop_front() {
            entry.mark_borrowed();
            entry = match waiter.tx.send(Ok(entry)) {
                Ok(()) => return,
                // Receiver dropped before delivery (caller gave up);
                // reclaim the connection and offer it to the next waiter.
                Err(Ok(returned)) => returned,
                Err(Err(_)) => return,
            };
        }
        entry.in_use = false;
        state.idle.push_back(entry);
    }

    /// Full release path: return-validation policy, then hand back.
    pub(crate) async fn release(self: &Arc<Self>, mut entry: PooledConnection) {
        entry.in_use = false;
        entry.touch();

        if self.is_shutting_down() {
            self.destroy_entry(entry, DestroyReason::Shutdown).await;
            return;
        }

        if self.config.test_on_return() && !self.validate_entry(&mut entry).await {
            self.destroy_entry(entry, DestroyReason::ReturnValidation).await;
            self.replenish_for_waiters().await;
            return;
        }

        self.hand_back(entry);
    }

    /// Replace a destroyed connection when callers are queued and capacity
    /// allows, so a failed return cannot stall the queue head.
    async fn replenish_for_waiters(self: &Arc<Self>) {
        let reserved = {
            let mut state = self.state.lock();
            if !state.waiting.is_empty() && state.total < self.config.max_size() {
                state.total += 1;
                true
            } else {
                false
            }
        };
        if !reserved {
            return;
        }

        match self.create_connection().await {
            Ok(entry) => self.hand_back(entry),
            Err(e) => {
                self.state.lock().total -= 1;
                tracing::warn!(error = %e, "failed to replace a destroyed connection for waiting clients");
            }
        }
    }

    /// Registry gauges: (total, idle, active, waiting)
    pub(crate) fn gauges(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock();
        let idle = state.idle.len();
        (
            state.total,
            idle,
            state.total.saturating_sub(idle),
            state.waiting.len(),
        )
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        let (total, idle, active, waiting) = self.gauges();
        self.metrics.snapshot(total, idle, active, waiting)
    }
}

fn remove_waiter(state: &mut PoolState, id: Uuid) -> bool {
    if let Some(pos) = state.waiting.iter().position(|w| w.id == id) {
        state.waiting.remove(pos);
        true
    } else {
        false
    }
}

/// A pool of reusable backend connections
///
/// Connections are created up front to satisfy the configured minimum,
/// grown on demand up to the maximum, and reshaped by a background
/// maintenance task. Callers beyond capacity queue FIFO.
pub struct Pool {
    inner: Arc<PoolInner>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Pool {
    /// Create a pool, prefill it to `min_size`, and start maintenance.
    ///
    /// Fails if any of the initial connections cannot be opened; connections
    /// already opened are closed again before the error is returned.
    pub async fn initialize<B: Backend>(
        config: PoolConfig,
        backend: B,
        backend_config: BackendConfig,
    ) -> Result<Self> {
        let (events, _) = broadcast::channel(128);
        let inner = Arc::new(PoolInner {
            config,
            backend: Arc::new(backend),
            backend_config,
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                total: 0,
                waiting: VecDeque::new(),
            }),
            metrics: MetricsCollector::new(),
            events,
            shutting_down: AtomicBool::new(false),
        });

        for _ in 0..inner.config.min_size() {
            inner.state.lock().total += 1;
            match inner.create_connection().await {
                Ok(entry) => inner.state.lock().idle.push_back(entry),
                Err(e) => {
                    inner.state.lock().total -= 1;
                    let built: Vec<PooledConnection> =
                        { inner.state.lock().idle.drain(..).collect() };
                    for entry in built {
                        inner.destroy_entry(entry, DestroyReason::Shutdown).await;
                    }
                    return Err(e);
                }
            }
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let maintenance_task = if inner.config.maintenance_enabled() {
            Some(maintenance::spawn(
                Arc::clone(&inner),
                shutdown_tx.subscribe(),
            ))
        } else {
            None
        };

        tracing::info!(
            backend = inner.backend.name(),
            size = inner.config.min_size(),
            "pool initialized"
        );
        inner.emit(PoolEvent::Initialized {
            size: inner.config.min_size(),
        });

        Ok(Self {
            inner,
            maintenance: Mutex::new(maintenance_task),
            shutdown_tx,
        })
    }

    /// Borrow a connection, waiting up to the configured acquire timeout.
    pub async fn get(&self) -> Result<PoolGuard> {
        self.inner.acquire(None).await
    }

    /// Borrow a connection, waiting up to the given timeout instead of the
    /// configured one.
    pub async fn get_with_timeout(&self, timeout: Duration) -> Result<PoolGuard> {
        self.inner.acquire(Some(timeout)).await
    }

    /// Return a borrowed connection, applying the return-validation policy.
    pub async fn release(&self, guard: PoolGuard) {
        let Some(entry) = guard.take_entry() else {
            return;
        };
        if entry.in_use {
            self.inner.metrics.record_use(entry.last_used_at.elapsed());
        }
        self.inner.release(entry).await;
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.snapshot()
    }

    /// Classify pool health from the current metrics.
    pub fn health_check(&self) -> PoolHealth {
        PoolHealth::assess(&self.inner.snapshot(), self.inner.config.max_size())
    }

    /// Subscribe to lifecycle notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.inner.events.subscribe()
    }

    /// Get the pool configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    pub(crate) fn inner(&self) -> &Arc<PoolInner> {
        &self.inner
    }

    /// Shut the pool down: reject new and queued acquisitions, stop
    /// maintenance, and close every tracked connection. Borrowed
    /// connections are closed as they come back. Idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        if self.inner.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("pool shutting down");

        // Stop maintenance first so it cannot re-idle or create connections
        // while we drain.
        let _ = self.shutdown_tx.send(());
        let task = self.maintenance.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }

        // Reject every queued request deterministically.
        let waiters: Vec<Waiter> = { self.inner.state.lock().waiting.drain(..).collect() };
        for waiter in waiters {
            tracing::debug!(
                request_id = %waiter.id,
                waited = ?waiter.enqueued_at.elapsed(),
                "rejecting queued request"
            );
            let _ = waiter.tx.send(Err(WeirError::ShuttingDown));
        }

        let idle: Vec<PooledConnection> = { self.inner.state.lock().idle.drain(..).collect() };
        futures::future::join_all(
            idle.into_iter()
                .map(|entry| self.inner.destroy_entry(entry, DestroyReason::Shutdown)),
        )
        .await;

        self.inner.emit(PoolEvent::Shutdown);
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (total, idle, active, waiting) = self.inner.gauges();
        f.debug_struct("Pool")
            .field("total", &total)
            .field("idle", &idle)
            .field("active", &active)
            .field("waiting", &waiting)
            .finish()
    }
}
