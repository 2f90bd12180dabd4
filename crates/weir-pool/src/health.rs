//! Pool-level health classification
//!
//! Health is derived from a metrics snapshot: a pool is unhealthy when its
//! error count overwhelms its size, or when callers are queued while the
//! pool is already at capacity.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;

/// Health status of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy.
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

/// Result of a pool health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolHealth {
    /// The resulting status
    pub status: HealthStatus,
    /// Human-readable explanation when unhealthy
    pub details: Option<String>,
}

impl PoolHealth {
    /// Classify pool health from a metrics snapshot.
    ///
    /// Unhealthy when connection errors exceed half the pool size, or when
    /// callers are waiting while the pool is saturated at `max`.
    pub fn assess(snapshot: &MetricsSnapshot, max: usize) -> Self {
        if snapshot.connection_errors as f64 > 0.5 * snapshot.total_connections as f64 {
            return Self {
                status: HealthStatus::Unhealthy,
                details: Some(format!(
                    "connection errors ({}) exceed half of pool size ({})",
                    snapshot.connection_errors, snapshot.total_connections
                )),
            };
        }

        if snapshot.waiting_clients > 0 && snapshot.total_connections >= max {
            return Self {
                status: HealthStatus::Unhealthy,
                details: Some(format!(
                    "{} client(s) waiting with the pool at capacity ({}/{})",
                    snapshot.waiting_clients, snapshot.total_connections, max
                )),
            };
        }

        Self {
            status: HealthStatus::Healthy,
            details: None,
        }
    }
}
