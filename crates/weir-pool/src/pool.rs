//! The connection pool: registry, waiting queue, and borrow guard
//!
//! This module holds the acquisition/release state machine. A single
//! registry lock makes "check available, mark borrowed" atomic; waiting
//! callers are queued as first-class records and served strictly FIFO.
//!
//! # Example
//!
//! ```ignore
//! use weir_pool::{Pool, PoolConfig};
//!
//! let config = PoolConfig::new(2, 10).with_max_waiting_clients(64);
//! let pool = Pool::initialize(config, backend, backend_config).await?;
//!
//! let conn = pool.get().await?;
//! // use the connection...
//! pool.release(conn).await;
//! ```

mod config;
mod entry;
pub(crate) mod pool;


pub use config::PoolConfig;
pub use entry::{BackendMeta, PoolGuard, PooledConnection};
pub use pool::Pool;
