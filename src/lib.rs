//! portsweep - TCP connect sweeps over a port range
//!
//! Resolves a host once, probes every port of an inclusive range through a
//! bounded pool of concurrent TCP connects, and hands the results back in
//! ascending port order, one per port, even when the scan is cancelled.

pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{ScanError, ScanResult};
pub use network::{PortResult, PortState};
pub use output::{OutputFormat, Reporter};
pub use scanner::{engine::ScanEngine, ScanHandle, ScanStats, ScanTarget};

pub type Result<T> = std::result::Result<T, ScanError>;
