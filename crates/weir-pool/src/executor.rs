//! Query execution and transactional wrapping
//!
//! Both are thin callers of the pool's acquire/release contract: borrow a
//! connection, run the backend call, and always give the connection back,
//! whatever happened in between. Failed queries are retried with
//! exponential backoff; transactions roll back on any failure.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use weir_core::{BackendConnection, QueryResult, Result, Value, WeirError};

use crate::events::PoolEvent;
use crate::pool::{Pool, PoolGuard};
use crate::retry::BackoffStrategy;

/// Options for a retried query
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Per-attempt acquire timeout override
    timeout: Option<Duration>,
    /// Additional attempts after the first failure
    retries: u32,
    /// Delay schedule between attempts
    backoff: BackoffStrategy,
}

impl ExecOptions {
    /// Default options: no timeout override, 3 retries, 100ms doubling
    /// backoff.
    pub fn new() -> Self {
        Self {
            timeout: None,
            retries: 3,
            backoff: BackoffStrategy::default(),
        }
    }

    /// Override the acquire timeout used for each attempt
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the number of additional attempts after the first failure
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the backoff schedule between attempts
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Get the acquire timeout override
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the retry budget
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Execute a query, retrying failures with exponential backoff.
    ///
    /// Each attempt borrows a connection and returns it before the next
    /// attempt. After the retry budget is exhausted the last error is
    /// raised, annotated with the attempt count. Acquisition errors
    /// (timeout, exhaustion, shutdown) surface immediately and are not
    /// retried.
    pub async fn execute_query(
        &self,
        query: &str,
        params: &[Value],
        opts: ExecOptions,
    ) -> Result<QueryResult> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let mut guard = match opts.timeout {
                Some(timeout) => self.get_with_timeout(timeout).await?,
                None => self.get().await?,
            };

            match guard.execute(query, params).await {
                Ok(result) => {
                    self.release(guard).await;
                    return Ok(result);
                }
                Err(e) => {
                    guard.note_error();
                    self.inner().metrics.record_connection_error();
                    self.release(guard).await;
                    tracing::debug!(attempt = attempts, error = %e, "query attempt failed");

                    if attempts > opts.retries {
                        let message = e.to_string();
                        self.inner().emit(PoolEvent::QueryFailed {
                            attempts,
                            message: message.clone(),
                        });
                        return Err(WeirError::Query { attempts, message });
                    }
                    tokio::time::sleep(opts.backoff.delay_for(attempts - 1)).await;
                }
            }
        }
    }

    /// Run `f` inside a transaction on a single borrowed connection.
    ///
    /// The callback receives the connection handle for the duration of the
    /// transaction and must not retain it. Commits when `f` succeeds. On an
    /// error from `f` or from the commit, a rollback is attempted; a
    /// rollback failure is reported as its own event but never replaces the
    /// original error. The connection is returned to the pool on every path.
    pub async fn with_transaction<T, F, Fut>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn BackendConnection>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut guard = self.get().await?;
        let result = run_transaction(self, &mut guard, f).await;
        self.release(guard).await;
        result
    }
}

async fn run_transaction<T, F, Fut>(pool: &Pool, guard: &mut PoolGuard, f: F) -> Result<T>
where
    F: FnOnce(Arc<dyn BackendConnection>) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if let Err(e) = guard.begin().await {
        guard.note_error();
        return Err(WeirError::Transaction {
            message: e.to_string(),
            rollback_error: None,
        });
    }

    match f(Arc::clone(guard.inner())).await {
        Ok(value) => match guard.commit().await {
            Ok(()) => Ok(value),
            Err(commit_err) => {
                let rollback_error = attempt_rollback(pool, guard).await;
                guard.note_error();
                Err(WeirError::Transaction {
                    message: commit_err.to_string(),
                    rollback_error,
                })
            }
        },
        Err(callback_err) => {
            let rollback_error = attempt_rollback(pool, guard).await;
            guard.note_error();
            Err(WeirError::Transaction {
                message: callback_err.to_string(),
                rollback_error,
            })
        }
    }
}

/// Attempt a rollback, reporting a failure alongside (never instead of)
/// the original transaction error.
async fn attempt_rollback(pool: &Pool, guard: &PoolGuard) -> Option<String> {
    match guard.rollback().await {
        Ok(()) => None,
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(connection_id = %guard.id(), error = %message, "rollback failed");
            pool.inner().emit(PoolEvent::RollbackFailed {
                id: guard.id(),
                message: message.clone(),
            });
            Some(message)
        }
    }
}
