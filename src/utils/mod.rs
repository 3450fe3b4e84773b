//! Process-level helpers: logging setup and descriptor limits

use crate::scanner::{ScanStats, ScanTarget};
use std::net::IpAddr;

/// Logging utilities
pub struct Logger;

impl Logger {
    /// Initialize the process-wide logger; `RUST_LOG` overrides `level`
    pub fn init(level: log::LevelFilter) {
        env_logger::Builder::new()
            .filter_level(level)
            .parse_default_env()
            .format_timestamp_secs()
            .init();
    }

    /// Log scan completion
    pub fn log_scan_complete(target: &ScanTarget, address: IpAddr, stats: &ScanStats) {
        log::info!(
            "Scan of {} ({}) completed in {:.2}s - {} open, {} closed, {} filtered, {} error ({} cancelled) of {} ports",
            target.host(),
            address,
            stats.duration.as_secs_f64(),
            stats.open,
            stats.closed,
            stats.filtered,
            stats.errors,
            stats.cancelled,
            stats.total()
        );
    }
}

/// Raise the open-file limit if asked to, and return the soft limit in effect
#[cfg(unix)]
pub fn adjust_ulimit_size(ulimit: Option<u64>) -> Option<u64> {
    use rlimit::Resource;

    if let Some(limit) = ulimit {
        match Resource::NOFILE.set(limit, limit) {
            Ok(()) => log::info!("Raised open file limit to {}", limit),
            Err(e) => log::warn!("Failed to set open file limit to {}: {}", limit, e),
        }
    }

    match Resource::NOFILE.get() {
        Ok((soft, _)) => Some(soft),
        Err(e) => {
            log::warn!("Could not get file descriptor limit: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
pub fn adjust_ulimit_size(_ulimit: Option<u64>) -> Option<u64> {
    None
}

/// Warn when the worker pool could run the process out of descriptors
///
/// Returns true if the warning was emitted.
pub fn check_concurrency_against_limit(concurrency: usize, fd_limit: Option<u64>) -> bool {
    // stdio plus some slack for the runtime
    const RESERVED: u64 = 16;

    match fd_limit {
        Some(limit) if (concurrency as u64).saturating_add(RESERVED) > limit => {
            log::warn!(
                "Concurrency {} is close to the open file limit {}; some ports may report errors. Lower --concurrency or raise --ulimit",
                concurrency,
                limit
            );
            true
        }
        _ => false,
    }
}
