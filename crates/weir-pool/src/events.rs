//! Pool lifecycle notifications
//!
//! Events are delivered over a `tokio::sync::broadcast` channel obtained
//! from [`Pool::subscribe`](crate::Pool::subscribe). Delivery is
//! fire-and-forget: sends with no live receiver are discarded, and a lagging
//! receiver drops the oldest events rather than blocking the pool.

use uuid::Uuid;

use crate::metrics::MetricsSnapshot;

/// Why a pooled connection was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyReason {
    /// Liveness probe failed when the connection was about to be borrowed
    BorrowValidation,
    /// Liveness probe failed when the connection was returned
    ReturnValidation,
    /// Liveness probe failed during a maintenance sweep
    IdleValidation,
    /// The backend reported the handle closed when it was returned
    Closed,
    /// Sat idle past the configured idle timeout while the pool was above
    /// its minimum size
    IdleExpired,
    /// The pool is shutting down
    Shutdown,
}

impl DestroyReason {
    /// Stable label for logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DestroyReason::BorrowValidation => "borrow_validation",
            DestroyReason::ReturnValidation => "return_validation",
            DestroyReason::IdleValidation => "idle_validation",
            DestroyReason::Closed => "closed",
            DestroyReason::IdleExpired => "idle_expired",
            DestroyReason::Shutdown => "shutdown",
        }
    }
}

/// A pool lifecycle notification
#[derive(Debug, Clone)]
pub enum PoolEvent {
    /// The pool finished initializing with `size` connections
    Initialized { size: usize },
    /// A physical connection was opened
    ConnectionCreated { id: Uuid, backend: String },
    /// A physical connection was closed
    ConnectionDestroyed { id: Uuid, reason: DestroyReason },
    /// A liveness probe failed
    ValidationFailed { id: Uuid },
    /// A maintenance pass finished
    MaintenanceCompleted { destroyed: usize, created: usize },
    /// Fresh metrics, published after each maintenance pass
    MetricsUpdated(MetricsSnapshot),
    /// A query failed after exhausting its retries
    QueryFailed { attempts: u32, message: String },
    /// A transaction rollback itself failed; the original transaction error
    /// is still what the caller sees
    RollbackFailed { id: Uuid, message: String },
    /// The pool shut down
    Shutdown,
}
