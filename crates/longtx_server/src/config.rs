//! Server configuration.

use longtx_core::CoreConfig;
use std::time::Duration;

/// Configuration for the long transaction server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Transaction registry settings.
    pub core: CoreConfig,
    /// How often the reaper looks for idle transactions.
    pub reaper_interval: Duration,
    /// Maximum number of finished asynchronous operations kept for polling.
    pub max_retained_operations: usize,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(core: CoreConfig) -> Self {
        Self {
            core,
            reaper_interval: Duration::from_secs(10),
            max_retained_operations: 10_000,
        }
    }

    /// Sets the idle timeout of transactions.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.core.idle_timeout = timeout;
        self
    }

    /// Sets the reaper interval.
    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Sets how many finished asynchronous operations are retained.
    pub fn with_max_retained_operations(mut self, max: usize) -> Self {
        self.max_retained_operations = max;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}
