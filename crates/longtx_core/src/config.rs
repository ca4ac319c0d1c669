//! Registry configuration.

use std::time::Duration;

/// Configuration for the transaction registry and data channel.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// How long a transaction may stay idle before the reaper expires it.
    pub idle_timeout: Duration,

    /// Maximum number of concurrently active transactions.
    pub max_active_transactions: usize,

    /// Maximum payload size of a single write.
    pub max_write_bytes: usize,

    /// How many terminated ids are remembered for precise error reporting.
    pub max_tombstones: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(600),
            max_active_transactions: 10_000,
            max_write_bytes: 8 * 1024 * 1024, // 8 MB
            max_tombstones: 100_000,
        }
    }
}

impl CoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle timeout.
    #[must_use]
    pub const fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the maximum number of active transactions.
    #[must_use]
    pub const fn max_active_transactions(mut self, max: usize) -> Self {
        self.max_active_transactions = max;
        self
    }

    /// Sets the maximum write payload size.
    #[must_use]
    pub const fn max_write_bytes(mut self, size: usize) -> Self {
        self.max_write_bytes = size;
        self
    }

    /// Sets how many terminated ids are remembered.
    #[must_use]
    pub const fn max_tombstones(mut self, max: usize) -> Self {
        self.max_tombstones = max;
        self
    }
}
