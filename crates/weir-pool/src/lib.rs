//! Weir Pool - backend-agnostic connection pooling engine
//!
//! This crate manages the lifecycle of expensive store connections under
//! bounded concurrency: FIFO acquisition fairness, liveness validation,
//! idle reaping, retried execution, and transactional wrapping.
//!
//! # Example
//!
//! ```ignore
//! use weir_pool::{Pool, PoolConfig};
//!
//! let config = PoolConfig::new(2, 10)
//!     .with_acquire_timeout_ms(5000)
//!     .with_idle_timeout_ms(300_000);
//!
//! let pool = Pool::initialize(config, backend, backend_config).await?;
//! let conn = pool.get().await?;
//! let result = conn.execute("SELECT 1", &[]).await?;
//! pool.release(conn).await;
//! pool.shutdown().await;
//! ```

mod events;
mod executor;
mod health;
mod maintenance;
mod metrics;
pub mod pool;
mod retry;

pub use events::{DestroyReason, PoolEvent};
pub use executor::ExecOptions;
pub use health::{HealthStatus, PoolHealth};
pub use metrics::MetricsSnapshot;
pub use pool::{BackendMeta, Pool, PoolConfig, PoolGuard, PooledConnection};
pub use retry::BackoffStrategy;
