use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;
use tracing::debug;

use crate::DEFAULT_TIMEOUT_SEC;
use crate::error::SonarError;

/// Resolve a hostname to its first IPv4 address. Resolution happens once
/// per session; the address is reused for every packet.
pub fn resolve_host(host: &str) -> Result<Ipv4Addr, SonarError> {
    let addrs = match dns_lookup::lookup_host(host) {
        Ok(a) => a,
        Err(e) => {
            debug!("lookup of {} failed: {}", host, e);
            return Err(SonarError::ResolveHostFailed {
                host: host.to_string(),
            });
        }
    };
    for addr in addrs {
        if let IpAddr::V4(ipv4) = addr {
            debug!("resolved {} to {}", host, ipv4);
            return Ok(ipv4);
        }
    }
    Err(SonarError::ResolveHostFailed {
        host: host.to_string(),
    })
}

pub fn get_timeout(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(t) => t,
        None => Duration::new(DEFAULT_TIMEOUT_SEC, 0),
    }
}

/// Echo identifier, the low 16 bits of the process id.
pub fn process_identifier() -> u16 {
    (std::process::id() & 0xffff) as u16
}

/// Seconds since the Unix epoch, the value carried in the echo payload.
pub fn unix_timestamp() -> Result<f64, SonarError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_literal_address() {
        let addr = resolve_host("127.0.0.1").unwrap();
        assert_eq!(addr, Ipv4Addr::new(127, 0, 0, 1));
    }

    #[test]
    fn test_resolve_bad_hostname() {
        let ret = resolve_host("definitely not a hostname");
        assert!(matches!(ret, Err(SonarError::ResolveHostFailed { .. })));
    }

    #[test]
    fn test_get_timeout() {
        assert_eq!(get_timeout(None), Duration::from_secs(DEFAULT_TIMEOUT_SEC));
        assert_eq!(
            get_timeout(Some(Duration::from_millis(500))),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn test_unix_timestamp_is_recent() {
        // any clock after 2020 satisfies this
        assert!(unix_timestamp().unwrap() > 1_577_836_800.0);
    }
}
