//! Weir Core - Core abstractions for the weir connection pooling engine
//!
//! This crate provides the fundamental traits and types the pooling engine
//! is built on. It defines:
//!
//! - `Backend` - Trait for store adapter implementations
//! - `BackendConnection` - Trait for a single physical connection
//! - `BackendConfig` - Connection parameters handed to an adapter
//! - Common types like `Value` and `QueryResult`
//! - The `WeirError` taxonomy shared by every crate

mod backend;
mod error;
mod types;

pub use backend::*;
pub use error::*;
pub use types::*;
