//! Error handling for the portsweep scanner
//!
//! Scan-level errors (bad range, unresolvable host, bad configuration) abort a
//! scan before any port is probed. Per-port errors never abort a scan: they are
//! folded into an `Error` [`PortResult`](crate::network::PortResult) for that
//! port only.

use thiserror::Error;

/// Display text of [`ScanError::Cancelled`] and detail of every cancelled port
pub const CANCELLED_DETAIL: &str = "scan cancelled";

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid port range {start}-{end}: start port must be between 1 and 65535, and less than or equal to end port")]
    InvalidRange { start: i64, end: i64 },

    #[error("Could not resolve hostname: {host}")]
    Resolution { host: String },

    #[error("Socket error on port {port}: {reason}")]
    Probe { port: u16, reason: String },

    #[error("{}", CANCELLED_DETAIL)]
    Cancelled,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ScanError {
    /// Whether this error aborts the whole scan rather than a single port
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ScanError::Probe { .. } | ScanError::Cancelled)
    }

    /// Text carried as the `detail` of an `Error` port result
    pub fn detail(&self) -> String {
        match self {
            ScanError::Probe { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type alias for scan operations
pub type ScanResult<T> = Result<T, ScanError>;
