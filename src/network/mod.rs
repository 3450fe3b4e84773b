//! Network module: target resolution, TCP connect probing and port results

pub mod resolver;
pub mod socket;

use crate::error::{ScanError, CANCELLED_DETAIL};
use serde::{Deserialize, Serialize};

/// Port state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    /// The target accepted the TCP handshake
    Open,
    /// The target actively refused the connection
    Closed,
    /// No answer within the timeout, or a non-refusal network error
    Filtered,
    /// Local failure unrelated to the remote port (resources, cancellation)
    Error,
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortState::Open => write!(f, "open"),
            PortState::Closed => write!(f, "closed"),
            PortState::Filtered => write!(f, "filtered"),
            PortState::Error => write!(f, "error"),
        }
    }
}

/// Outcome of probing a single port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    pub port: u16,
    pub status: PortState,
    /// Diagnostic text, only present when `status` is `Error`
    pub detail: Option<String>,
}

impl PortResult {
    pub fn open(port: u16) -> Self {
        Self::with_state(port, PortState::Open)
    }

    pub fn closed(port: u16) -> Self {
        Self::with_state(port, PortState::Closed)
    }

    pub fn filtered(port: u16) -> Self {
        Self::with_state(port, PortState::Filtered)
    }

    /// Build an `Error` result carrying the error's detail text
    pub fn failed(port: u16, error: &ScanError) -> Self {
        Self {
            port,
            status: PortState::Error,
            detail: Some(error.detail()),
        }
    }

    /// Result for a port that was skipped or aborted by cancellation
    pub fn cancelled(port: u16) -> Self {
        Self::failed(port, &ScanError::Cancelled)
    }

    fn with_state(port: u16, status: PortState) -> Self {
        debug_assert!(status != PortState::Error, "error results need a detail");
        Self {
            port,
            status,
            detail: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == PortState::Error
            && self.detail.as_deref() == Some(CANCELLED_DETAIL)
    }
}
