//! Hostname resolution for scan targets

use crate::ScanError;
use std::net::{IpAddr, SocketAddr};

/// Resolve `host` to the single address a scan will connect to.
///
/// Literal IPs are used as-is. For names, the first IPv4 address in resolver
/// order wins; if the name only has IPv6 addresses the first of those is used.
pub async fn resolve(host: &str) -> crate::Result<IpAddr> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ScanError::Resolution {
            host: host.to_string(),
        });
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    // The port is irrelevant for name lookup
    let addrs: Vec<SocketAddr> = match tokio::net::lookup_host((host, 0)).await {
        Ok(addrs) => addrs.collect(),
        Err(e) => {
            log::debug!("Lookup of {} failed: {}", host, e);
            return Err(ScanError::Resolution {
                host: host.to_string(),
            });
        }
    };

    select_address(&addrs).ok_or_else(|| ScanError::Resolution {
        host: host.to_string(),
    })
}

fn select_address(addrs: &[SocketAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .map(SocketAddr::ip)
        .find(IpAddr::is_ipv4)
        .or_else(|| addrs.first().map(SocketAddr::ip))
}
