//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a connection pool
///
/// Controls pool sizing, timeouts, queueing, validation policy, and the
/// maintenance cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Minimum number of connections to maintain in the pool
    min_size: usize,
    /// Maximum number of connections allowed in the pool
    max_size: usize,
    /// Timeout in milliseconds when acquiring a connection from the pool
    acquire_timeout_ms: u64,
    /// Timeout in milliseconds before an idle connection is reaped
    idle_timeout_ms: u64,
    /// Interval in milliseconds between maintenance passes (0 disables
    /// maintenance entirely)
    reap_interval_ms: u64,
    /// Timeout in milliseconds for opening a physical connection
    create_timeout_ms: u64,
    /// Timeout in milliseconds for closing a physical connection
    destroy_timeout_ms: u64,
    /// Timeout in milliseconds for a liveness probe
    validate_timeout_ms: u64,
    /// Maximum number of acquisition requests allowed to queue
    max_waiting_clients: usize,
    /// Validate a connection before lending it out
    test_on_borrow: bool,
    /// Validate a connection when it is returned
    test_on_return: bool,
    /// Validate idle connections during maintenance passes
    test_on_idle: bool,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// # Panics
    ///
    /// Panics if `min_size > max_size` or if `max_size` is 0.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        assert!(
            max_size > 0,
            "max_size must be greater than 0, got {}",
            max_size
        );
        assert!(
            min_size <= max_size,
            "min_size ({}) cannot exceed max_size ({})",
            min_size,
            max_size
        );

        Self {
            min_size,
            max_size,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: 600_000, // 10 minutes
            reap_interval_ms: 30_000,
            create_timeout_ms: 10_000,
            destroy_timeout_ms: 5_000,
            validate_timeout_ms: 5_000,
            max_waiting_clients: 32,
            test_on_borrow: true,
            test_on_return: false,
            test_on_idle: true,
        }
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the idle timeout in milliseconds
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = timeout_ms;
        self
    }

    /// Set the maintenance interval in milliseconds (0 disables maintenance)
    pub fn with_reap_interval_ms(mut self, interval_ms: u64) -> Self {
        self.reap_interval_ms = interval_ms;
        self
    }

    /// Set the connection create timeout in milliseconds
    pub fn with_create_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.create_timeout_ms = timeout_ms;
        self
    }

    /// Set the connection destroy timeout in milliseconds
    pub fn with_destroy_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.destroy_timeout_ms = timeout_ms;
        self
    }

    /// Set the liveness probe timeout in milliseconds
    pub fn with_validate_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.validate_timeout_ms = timeout_ms;
        self
    }

    /// Set the maximum number of queued acquisition requests
    pub fn with_max_waiting_clients(mut self, limit: usize) -> Self {
        self.max_waiting_clients = limit;
        self
    }

    /// Set whether connections are validated before being lent out
    pub fn with_test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    /// Set whether connections are validated on return
    pub fn with_test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = enabled;
        self
    }

    /// Set whether idle connections are validated during maintenance
    pub fn with_test_on_idle(mut self, enabled: bool) -> Self {
        self.test_on_idle = enabled;
        self
    }

    /// Get the minimum pool size
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the idle timeout as a Duration
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Get the maintenance interval as a Duration
    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms)
    }

    /// Check whether maintenance is enabled
    pub fn maintenance_enabled(&self) -> bool {
        self.reap_interval_ms > 0
    }

    /// Get the create timeout as a Duration
    pub fn create_timeout(&self) -> Duration {
        Duration::from_millis(self.create_timeout_ms)
    }

    /// Get the destroy timeout as a Duration
    pub fn destroy_timeout(&self) -> Duration {
        Duration::from_millis(self.destroy_timeout_ms)
    }

    /// Get the liveness probe timeout as a Duration
    pub fn validate_timeout(&self) -> Duration {
        Duration::from_millis(self.validate_timeout_ms)
    }

    /// Get the waiting-queue limit
    pub fn max_waiting_clients(&self) -> usize {
        self.max_waiting_clients
    }

    /// Whether connections are validated before being lent out
    pub fn test_on_borrow(&self) -> bool {
        self.test_on_borrow
    }

    /// Whether connections are validated on return
    pub fn test_on_return(&self) -> bool {
        self.test_on_return
    }

    /// Whether idle connections are validated during maintenance
    pub fn test_on_idle(&self) -> bool {
        self.test_on_idle
    }

    /// Load a configuration from a JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> weir_core::Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(weir_core::WeirError::Io)?;
        let config: Self =
            serde_json::from_str(&content).map_err(weir_core::WeirError::Serialization)?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> weir_core::Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(weir_core::WeirError::Io)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(weir_core::WeirError::Serialization)?;
        tokio::fs::write(path.as_ref(), content)
            .await
            .map_err(weir_core::WeirError::Io)?;
        Ok(())
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - min_size: 1, max_size: 10
    /// - acquire_timeout: 30 seconds
    /// - idle_timeout: 10 minutes, reap_interval: 30 seconds
    /// - create/destroy/validate timeouts: 10s / 5s / 5s
    /// - max_waiting_clients: 32
    /// - test_on_borrow and test_on_idle enabled, test_on_return disabled
    fn default() -> Self {
        Self::new(1, 10)
    }
}
