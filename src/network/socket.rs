//! TCP connect prober

use crate::core::PortScanner;
use crate::network::PortResult;
use crate::ScanError;
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpSocket;

/// Full-handshake TCP connect prober
#[derive(Debug, Clone)]
pub struct TcpConnectScanner {
    timeout: Duration,
}

impl TcpConnectScanner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Turn a local socket failure into an `Error` result
    fn local_fault(&self, port: u16, err: io::Error) -> PortResult {
        let err = ScanError::Probe {
            port,
            reason: err.to_string(),
        };
        log::warn!("{}", err);
        PortResult::failed(port, &err)
    }
}

#[async_trait]
impl PortScanner for TcpConnectScanner {
    async fn probe(&self, address: IpAddr, port: u16) -> PortResult {
        let socket = match address {
            IpAddr::V4(_) => TcpSocket::new_v4(),
            IpAddr::V6(_) => TcpSocket::new_v6(),
        };
        let socket = match socket {
            Ok(socket) => socket,
            Err(e) => return self.local_fault(port, e),
        };

        let addr = SocketAddr::new(address, port);

        // Dropping the stream (or the pending connect on timeout) closes the socket
        match tokio::time::timeout(self.timeout, socket.connect(addr)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                PortResult::open(port)
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::ConnectionRefused => PortResult::closed(port),
            Ok(Err(e)) if is_local_fault(&e) => self.local_fault(port, e),
            Ok(Err(e)) => {
                log::debug!("Connect to {} failed: {}", addr, e);
                PortResult::filtered(port)
            }
            Err(_elapsed) => PortResult::filtered(port),
        }
    }

    fn name(&self) -> &str {
        "TCP Connect"
    }
}

/// Errors that say something about this machine rather than the remote port
fn is_local_fault(err: &io::Error) -> bool {
    #[cfg(unix)]
    {
        if let Some(code) = err.raw_os_error() {
            return matches!(
                code,
                libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM | libc::EADDRNOTAVAIL
            );
        }
    }

    err.kind() == io::ErrorKind::OutOfMemory
}
