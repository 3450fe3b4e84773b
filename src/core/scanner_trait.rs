// Port prober trait
// The scheduler only talks to probers through this seam, so tests and
// benchmarks can swap the real TCP connect prober for a scripted one.

use crate::network::PortResult;
use async_trait::async_trait;
use std::net::IpAddr;

/// A single-port prober
///
/// Implementations must always produce a result for the port they were asked
/// about, never retry on their own, and release any socket before returning.
#[async_trait]
pub trait PortScanner: Send + Sync {
    /// Probe one port on an already resolved address
    async fn probe(&self, address: IpAddr, port: u16) -> PortResult;

    /// Get scanner name
    fn name(&self) -> &str;
}
