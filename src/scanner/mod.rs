//! Scanner module containing the scan scheduler and its data types

pub mod engine;

use crate::network::{PortResult, PortState};
use crate::ScanError;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

pub use engine::ScanEngine;

/// Host and inclusive port range to sweep
///
/// Only constructible through [`ScanTarget::new`], so a value of this type
/// always holds `1 <= start_port <= end_port <= 65535`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    host: String,
    start_port: u16,
    end_port: u16,
}

impl ScanTarget {
    /// Validate a raw range and build the target
    ///
    /// Takes wide integers so that user input such as `0`, `-1` or `70000`
    /// is reported as a range error rather than a parse error.
    pub fn new(host: impl Into<String>, start_port: i64, end_port: i64) -> crate::Result<Self> {
        if start_port < 1 || end_port > 65535 || start_port > end_port {
            return Err(ScanError::InvalidRange {
                start: start_port,
                end: end_port,
            });
        }

        Ok(Self {
            host: host.into(),
            start_port: start_port as u16,
            end_port: end_port as u16,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn start_port(&self) -> u16 {
        self.start_port
    }

    pub fn end_port(&self) -> u16 {
        self.end_port
    }

    pub fn ports(&self) -> RangeInclusive<u16> {
        self.start_port..=self.end_port
    }

    /// Number of ports in the range, which is also the number of results a scan yields
    pub fn port_count(&self) -> usize {
        usize::from(self.end_port - self.start_port) + 1
    }
}

/// Reorders out-of-order completions into ascending port order
///
/// One slot per port, indexed by offset from the first port. Results are
/// handed out only once every lower port has been handed out.
#[derive(Debug)]
pub struct OrderedBuffer {
    start_port: u16,
    slots: Vec<Option<PortResult>>,
    next: usize,
}

impl OrderedBuffer {
    pub fn new(target: &ScanTarget) -> Self {
        Self {
            start_port: target.start_port(),
            slots: vec![None; target.port_count()],
            next: 0,
        }
    }

    /// Store a result in its slot
    ///
    /// Returns `false` (and drops the result) if the port is outside the range
    /// or already has a result.
    pub fn insert(&mut self, result: PortResult) -> bool {
        let Some(index) = result.port.checked_sub(self.start_port).map(usize::from) else {
            return false;
        };
        if index < self.next {
            return false;
        }
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(result);
                true
            }
            _ => false,
        }
    }

    /// Take the next result in port order, if it has arrived
    pub fn pop_ready(&mut self) -> Option<PortResult> {
        let result = self.slots.get_mut(self.next)?.take()?;
        self.next += 1;
        Some(result)
    }

    /// Fill every still-empty slot with `make(port)`, returning how many were filled
    pub fn fill_missing(&mut self, make: impl Fn(u16) -> PortResult) -> usize {
        let mut filled = 0;
        for (offset, slot) in self.slots.iter_mut().enumerate().skip(self.next) {
            if slot.is_none() {
                let port = self.start_port + offset as u16;
                *slot = Some(make(port));
                filled += 1;
            }
        }
        filled
    }

    /// True once every port has been handed out
    pub fn is_drained(&self) -> bool {
        self.next == self.slots.len()
    }
}

/// Tally of a finished scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanStats {
    pub open: usize,
    pub closed: usize,
    pub filtered: usize,
    pub errors: usize,
    /// Subset of `errors` caused by cancellation
    pub cancelled: usize,
    /// Wall time spent reporting, from the first poll until the sequence ends
    pub duration: Duration,
}

impl ScanStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: &PortResult) {
        match result.status {
            PortState::Open => self.open += 1,
            PortState::Closed => self.closed += 1,
            PortState::Filtered => self.filtered += 1,
            PortState::Error => {
                self.errors += 1;
                if result.is_cancelled() {
                    self.cancelled += 1;
                }
            }
        }
    }

    /// Get the total number of ports reported
    pub fn total(&self) -> usize {
        self.open + self.closed + self.filtered + self.errors
    }

    /// Get scan rate in ports per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.total() as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// A running scan
///
/// Yields exactly one [`PortResult`] per port of the target, in ascending
/// port order, then `None`. Dropping the handle cancels the scan.
pub struct ScanHandle {
    target: ScanTarget,
    address: IpAddr,
    results: mpsc::UnboundedReceiver<PortResult>,
    cancel: CancellationToken,
    _cancel_on_drop: DropGuard,
}

impl ScanHandle {
    pub(crate) fn new(
        target: ScanTarget,
        address: IpAddr,
        results: mpsc::UnboundedReceiver<PortResult>,
        cancel: CancellationToken,
    ) -> Self {
        let guard = cancel.clone().drop_guard();
        Self {
            target,
            address,
            results,
            cancel,
            _cancel_on_drop: guard,
        }
    }

    pub fn target(&self) -> &ScanTarget {
        &self.target
    }

    /// Address the scan connects to
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Receive the next result in port order
    pub async fn recv(&mut self) -> Option<PortResult> {
        self.results.recv().await
    }

    /// Cancel the scan; every unfinished port reports `scan cancelled`
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this scan, for wiring to signals or other tasks
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Drain the scan into a vector
    pub async fn into_results(mut self) -> Vec<PortResult> {
        let mut results = Vec::with_capacity(self.target.port_count());
        while let Some(result) = self.recv().await {
            results.push(result);
        }
        results
    }
}

impl Stream for ScanHandle {
    type Item = PortResult;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().results.poll_recv(cx)
    }
}
