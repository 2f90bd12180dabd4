//! Pooled connection records and the RAII borrow guard

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;
use weir_core::{BackendConnection, StoreKind};

use super::pool::PoolInner;
use crate::events::DestroyReason;

/// Which adapter a pooled connection belongs to
#[derive(Debug, Clone)]
pub struct BackendMeta {
    /// Adapter name (e.g. "postgres", "redis")
    pub backend: String,
    /// Store family
    pub kind: StoreKind,
}

/// A connection tracked by the pool registry
///
/// The physical handle is exclusively owned by the pool while the record is
/// idle and lent to exactly one borrower while it is in use. A record is
/// always in exactly one of: idle-valid, borrowed, or being-destroyed.
pub struct PooledConnection {
    pub(crate) id: Uuid,
    pub(crate) handle: Arc<dyn BackendConnection>,
    pub(crate) created_at: Instant,
    pub(crate) last_used_at: Instant,
    pub(crate) in_use: bool,
    pub(crate) valid: bool,
    pub(crate) error_count: u32,
    pub(crate) meta: BackendMeta,
}

impl PooledConnection {
    pub(crate) fn new(handle: Arc<dyn BackendConnection>, meta: BackendMeta) -> Self {
        let now = Instant::now();
        Self {
            id: Uuid::new_v4(),
            handle,
            created_at: now,
            last_used_at: now,
            in_use: false,
            valid: true,
            error_count: 0,
            meta,
        }
    }

    /// Refresh the last-used timestamp
    pub(crate) fn touch(&mut self) {
        self.last_used_at = Instant::now();
    }

    /// Transition to the borrowed state
    pub(crate) fn mark_borrowed(&mut self) {
        self.in_use = true;
        self.touch();
    }

    /// Connection identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Time since the connection was opened
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time since the connection was last borrowed or returned
    pub fn idle_for(&self) -> Duration {
        self.last_used_at.elapsed()
    }

    /// Whether the connection is currently lent out
    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// Whether the last liveness probe passed
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Failed uses and probes observed on this connection
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Adapter metadata
    pub fn meta(&self) -> &BackendMeta {
        &self.meta
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("backend", &self.meta.backend)
            .field("in_use", &self.in_use)
            .field("valid", &self.valid)
            .field("error_count", &self.error_count)
            .finish()
    }
}

/// A connection borrowed from the pool
///
/// Dereferences to the underlying [`BackendConnection`]. Prefer returning it
/// through [`Pool::release`](super::Pool::release), which applies the
/// return-validation policy; if the guard is simply dropped, the connection
/// is handed straight back to the registry (or destroyed, if the pool is
/// shutting down).
pub struct PoolGuard {
    pub(crate) entry: Option<PooledConnection>,
    pub(crate) inner: Arc<PoolInner>,
}

impl PoolGuard {
    pub(crate) fn new(entry: PooledConnection, inner: Arc<PoolInner>) -> Self {
        Self {
            entry: Some(entry),
            inner,
        }
    }

    /// Identifier of the borrowed connection
    pub fn id(&self) -> Uuid {
        self.record().id
    }

    /// Failed uses and probes observed on this connection
    pub fn error_count(&self) -> u32 {
        self.record().error_count
    }

    /// Get the underlying connection handle
    pub fn inner(&self) -> &Arc<dyn BackendConnection> {
        &self.record().handle
    }

    /// Record a failed use of this connection
    pub(crate) fn note_error(&mut self) {
        if let Some(entry) = self.entry.as_mut() {
            entry.error_count += 1;
        }
    }

    pub(crate) fn take_entry(mut self) -> Option<PooledConnection> {
        self.entry.take()
    }

    fn record(&self) -> &PooledConnection {
        self.entry.as_ref().expect("connection taken")
    }
}

impl Deref for PoolGuard {
    type Target = dyn BackendConnection;

    fn deref(&self) -> &Self::Target {
        self.record().handle.as_ref()
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        let Some(mut entry) = self.entry.take() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        if entry.in_use {
            inner.metrics.record_use(entry.last_used_at.elapsed());
            entry.touch();
        }
        if inner.is_shutting_down() {
            // Closing the handle is async; fall back to dropping it outright
            // when no runtime is available.
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let _ = handle.spawn(async move {
                        inner.destroy_entry(entry, DestroyReason::Shutdown).await;
                    });
                }
                Err(_) => inner.forget_entry(entry),
            }
        } else {
            inner.hand_back(entry);
        }
    }
}

impl std::fmt::Debug for PoolGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolGuard").field("entry", &self.entry).finish()
    }
}
