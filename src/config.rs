//! Configuration module for the portsweep scanner

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default number of probes allowed in flight at once
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Default per-probe connect timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Largest pool the scheduler's semaphore can hold
pub const MAX_CONCURRENCY: usize = Semaphore::MAX_PERMITS;

/// Main configuration structure for scanning operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of concurrent probes
    pub concurrency: usize,

    /// Timeout for each connection attempt in milliseconds
    pub timeout: u64,

    /// Optional deadline for the whole scan in milliseconds
    pub deadline: Option<u64>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT_MS,
            deadline: None,
        }
    }
}

impl ScanConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent probes
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-probe timeout
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the global scan deadline
    pub fn with_deadline(mut self, deadline: Option<u64>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Get the scan deadline as Duration, if one is set
    pub fn deadline_duration(&self) -> Option<Duration> {
        self.deadline.map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.concurrency == 0 {
            return Err(crate::ScanError::ConfigError(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(crate::ScanError::ConfigError(format!(
                "Concurrency must be at most {}, got {}",
                MAX_CONCURRENCY, self.concurrency
            )));
        }

        if self.timeout == 0 {
            return Err(crate::ScanError::ConfigError(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
