//! Main scanning engine implementation

use crate::config::ScanConfig;
use crate::core::PortScanner;
use crate::network::{resolver, socket::TcpConnectScanner, PortResult};
use crate::scanner::{OrderedBuffer, ScanHandle, ScanTarget};
use crate::ScanError;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Main scanning engine
pub struct ScanEngine {
    config: ScanConfig,
    scanner: Arc<dyn PortScanner>,
}

impl ScanEngine {
    /// Create a new scan engine probing with full TCP connects
    pub fn new(config: ScanConfig) -> crate::Result<Self> {
        let scanner = Arc::new(TcpConnectScanner::new(config.timeout_duration()));
        Self::with_scanner(config, scanner)
    }

    /// Create a scan engine around any prober
    pub fn with_scanner(config: ScanConfig, scanner: Arc<dyn PortScanner>) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self { config, scanner })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Resolve the target and start sweeping it
    ///
    /// Fails without producing any result if the host cannot be resolved.
    pub async fn start(&self, target: &ScanTarget) -> crate::Result<ScanHandle> {
        let address = resolver::resolve(target.host()).await?;

        Ok(self.start_resolved(target.clone(), address))
    }

    /// Start sweeping an already resolved address
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_resolved(&self, target: ScanTarget, address: IpAddr) -> ScanHandle {
        log::info!(
            "Scanning ports {} to {} on {} ({}) with {} workers using {}",
            target.start_port(),
            target.end_port(),
            target.host(),
            address,
            self.config.concurrency,
            self.scanner.name()
        );

        let cancel = CancellationToken::new();
        let (result_tx, result_rx) = mpsc::channel(self.config.concurrency);
        let (ordered_tx, ordered_rx) = mpsc::unbounded_channel();

        tokio::spawn(dispatch(
            target.clone(),
            address,
            self.scanner.clone(),
            self.config.concurrency,
            cancel.clone(),
            result_tx,
        ));
        tokio::spawn(collect(
            target.clone(),
            result_rx,
            ordered_tx,
            self.config.deadline_duration(),
            cancel.clone(),
        ));

        ScanHandle::new(target, address, ordered_rx, cancel)
    }

    /// Perform a whole scan and return the results in port order
    pub async fn scan(&self, target: &ScanTarget) -> crate::Result<Vec<PortResult>> {
        Ok(self.start(target).await?.into_results().await)
    }
}

/// Hand each port to a worker once a pool slot is free
///
/// After cancellation no more workers are spawned and every remaining port is
/// reported as cancelled straight away.
async fn dispatch(
    target: ScanTarget,
    address: IpAddr,
    scanner: Arc<dyn PortScanner>,
    concurrency: usize,
    cancel: CancellationToken,
    results: mpsc::Sender<PortResult>,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut workers = JoinSet::new();
    let mut ports = target.ports();

    for port in ports.by_ref() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            permit = semaphore.clone().acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            let _ = results.send(PortResult::cancelled(port)).await;
            break;
        };

        while let Some(finished) = workers.try_join_next() {
            log_worker_exit(finished);
        }

        let scanner = scanner.clone();
        let cancel = cancel.clone();
        let results = results.clone();

        workers.spawn(async move {
            let _permit = permit;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => PortResult::cancelled(port),
                result = scanner.probe(address, port) => result,
            };
            // The collector is gone only when the scan was abandoned
            let _ = results.send(result).await;
        });
    }

    for port in ports {
        if results.send(PortResult::cancelled(port)).await.is_err() {
            break;
        }
    }
    drop(results);

    while let Some(finished) = workers.join_next().await {
        log_worker_exit(finished);
    }
}

fn log_worker_exit(finished: Result<(), tokio::task::JoinError>) {
    if let Err(e) = finished {
        if e.is_panic() {
            log::error!("Probe task panicked: {}", e);
        }
    }
}

/// Single owner of the result arena
///
/// Receives completions in any order, forwards them in port order, enforces
/// the scan deadline and backfills any port whose worker never reported.
async fn collect(
    target: ScanTarget,
    mut results: mpsc::Receiver<PortResult>,
    ordered: mpsc::UnboundedSender<PortResult>,
    deadline: Option<Duration>,
    cancel: CancellationToken,
) {
    let mut buffer = OrderedBuffer::new(&target);

    let expiry = async move {
        match deadline {
            Some(deadline) => tokio::time::sleep(deadline).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(expiry);
    let mut expired = false;

    loop {
        tokio::select! {
            received = results.recv() => match received {
                Some(result) => {
                    let port = result.port;
                    if !buffer.insert(result) {
                        log::warn!("Discarding duplicate result for port {}", port);
                    }
                }
                None => break,
            },
            _ = &mut expiry, if !expired => {
                expired = true;
                if !cancel.is_cancelled() {
                    log::warn!("Scan deadline reached, cancelling remaining probes");
                    cancel.cancel();
                }
            }
        }

        if !forward_ready(&mut buffer, &ordered) {
            cancel.cancel();
            return;
        }
    }

    let missing = buffer.fill_missing(|port| {
        PortResult::failed(
            port,
            &ScanError::Probe {
                port,
                reason: "probe task aborted".to_string(),
            },
        )
    });
    if missing > 0 {
        log::error!("{} probe(s) ended without reporting a result", missing);
    }

    forward_ready(&mut buffer, &ordered);
}

/// Push the ready prefix downstream; false once nobody is listening
fn forward_ready(buffer: &mut OrderedBuffer, ordered: &mpsc::UnboundedSender<PortResult>) -> bool {
    while let Some(result) = buffer.pop_ready() {
        if ordered.send(result).is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::PortState;
    use async_trait::async_trait;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Answers open for even ports and closed for odd ones, tracking peak parallelism
    struct ParityScanner {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ParityScanner {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PortScanner for ParityScanner {
        async fn probe(&self, _address: IpAddr, port: u16) -> PortResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            // Later ports finish first
            tokio::time::sleep(Duration::from_millis(u64::from(30 - port % 30))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if port % 2 == 0 {
                PortResult::open(port)
            } else {
                PortResult::closed(port)
            }
        }

        fn name(&self) -> &str {
            "parity"
        }
    }

    /// Never answers
    struct BlackholeScanner;

    #[async_trait]
    impl PortScanner for BlackholeScanner {
        async fn probe(&self, _address: IpAddr, _port: u16) -> PortResult {
            std::future::pending().await
        }

        fn name(&self) -> &str {
            "blackhole"
        }
    }

    /// Panics on one port
    struct FaultyScanner {
        bad_port: u16,
    }

    #[async_trait]
    impl PortScanner for FaultyScanner {
        async fn probe(&self, _address: IpAddr, port: u16) -> PortResult {
            if port == self.bad_port {
                panic!("prober bug");
            }
            PortResult::filtered(port)
        }

        fn name(&self) -> &str {
            "faulty"
        }
    }

    #[tokio::test]
    async fn test_results_ordered_and_pool_bounded() {
        let scanner = Arc::new(ParityScanner::new());
        let engine =
            ScanEngine::with_scanner(ScanConfig::new().with_concurrency(4), scanner.clone()).unwrap();
        let target = ScanTarget::new("localhost", 1, 60).unwrap();

        let results = engine.start_resolved(target, LOCALHOST).into_results().await;

        assert_eq!(results.len(), 60);
        for (result, port) in results.iter().zip(1u16..) {
            assert_eq!(result.port, port);
            let expected = if port % 2 == 0 { PortState::Open } else { PortState::Closed };
            assert_eq!(result.status, expected);
        }
        assert!(scanner.peak.load(Ordering::SeqCst) <= 4);
    }

    #[tokio::test]
    async fn test_explicit_cancel_marks_every_port() {
        let engine =
            ScanEngine::with_scanner(ScanConfig::new().with_concurrency(3), Arc::new(BlackholeScanner))
                .unwrap();
        let target = ScanTarget::new("localhost", 100, 119).unwrap();

        let handle = engine.start_resolved(target, LOCALHOST);
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let results = tokio::time::timeout(Duration::from_secs(2), handle.into_results())
            .await
            .expect("cancelled scan must finish promptly");

        assert_eq!(results.len(), 20);
        assert!(results.iter().all(PortResult::is_cancelled));
        assert_eq!(results.first().map(|r| r.port), Some(100));
        assert_eq!(results.last().map(|r| r.port), Some(119));
    }

    #[tokio::test]
    async fn test_panicking_probe_still_yields_result() {
        let engine = ScanEngine::with_scanner(
            ScanConfig::new().with_concurrency(2),
            Arc::new(FaultyScanner { bad_port: 5 }),
        )
        .unwrap();
        let target = ScanTarget::new("localhost", 1, 8).unwrap();

        let results = engine.start_resolved(target, LOCALHOST).into_results().await;

        assert_eq!(results.len(), 8);
        assert_eq!(results[4].port, 5);
        assert_eq!(results[4].status, PortState::Error);
        assert_eq!(results[4].detail.as_deref(), Some("probe task aborted"));
        assert!(results
            .iter()
            .filter(|r| r.port != 5)
            .all(|r| r.status == PortState::Filtered));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ScanEngine::new(ScanConfig::new().with_concurrency(0));
        assert!(matches!(result, Err(ScanError::ConfigError(_))));

        // Too large for the semaphore; must fail here, not when the scan starts
        let result = ScanEngine::new(ScanConfig::new().with_concurrency(usize::MAX));
        assert!(matches!(result, Err(ScanError::ConfigError(_))));
    }
}
