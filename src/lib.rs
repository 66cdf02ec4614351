//! A minimal ICMP echo (ping) utility.
//!
//! `sonar` resolves a hostname, sends ICMP Echo Request packets over a raw
//! socket and waits for replies with a fixed timeout, then reports round
//! trip times and packet loss. Opening the raw socket requires elevated
//! privileges (root or `CAP_NET_RAW` on Linux).
//!
//! ```rust,no_run
//! use sonar::ping;
//!
//! let report = ping("example.com", 4, true, None).unwrap();
//! assert_eq!(report.sent, 4);
//! ```
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::Level;

pub mod checksum;
pub mod error;
pub mod packet;
pub mod ping;
pub mod transport;
pub mod utils;

pub use ping::ping;
pub use ping::ping_once;
pub use ping::ping_once_with;
pub use ping::ping_with;

use crate::error::SonarError;

pub const DEFAULT_TIMEOUT_SEC: u64 = 2;

/// Outcome of a single echo request attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PingOutcome {
    Reply { elapsed_ms: f64 },
    TimedOut,
}

impl PingOutcome {
    /// Classify an attempt from its elapsed wall-clock time. A reply that
    /// arrives at or after the timeout boundary counts as a timeout.
    pub fn classify(elapsed: Duration, timeout: Duration) -> PingOutcome {
        if elapsed < timeout {
            PingOutcome::Reply {
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            }
        } else {
            PingOutcome::TimedOut
        }
    }

    pub fn is_reply(&self) -> bool {
        match self {
            PingOutcome::Reply { .. } => true,
            PingOutcome::TimedOut => false,
        }
    }
}

impl fmt::Display for PingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PingOutcome::Reply { elapsed_ms } => {
                write!(f, "Ping successful: time={:.2}ms", elapsed_ms)
            }
            PingOutcome::TimedOut => write!(f, "Ping timed out"),
        }
    }
}

/// Final statistics of a ping session.
///
/// `min_rtt_ms` and `max_rtt_ms` keep their infinite sentinels when no
/// reply was received; `Display` suppresses the round trip summary in that
/// case so the sentinels never reach the console.
#[derive(Debug, Clone)]
pub struct PingReport {
    pub host: String,
    pub addr: Ipv4Addr,
    pub sent: usize,
    pub received: usize,
    pub lost: usize,
    pub loss_percent: f64,
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub avg_rtt_ms: f64,
}

impl PingReport {
    pub fn has_rtt_summary(&self) -> bool {
        self.received > 0
    }
}

impl fmt::Display for PingReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Ping statistics for {}:", self.host)?;
        writeln!(
            f,
            "    Packets: Sent = {}, Received = {}, Lost = {} ({:.2}% loss)",
            self.sent, self.received, self.lost, self.loss_percent
        )?;
        if self.has_rtt_summary() {
            writeln!(f, "Approximate round trip times in milliseconds:")?;
            writeln!(
                f,
                "    Minimum = {:.2}ms, Maximum = {:.2}ms, Average = {:.2}ms",
                self.min_rtt_ms, self.max_rtt_ms, self.avg_rtt_ms
            )?;
            writeln!(f)?;
        }
        write!(f, "IP: {}", self.addr)
    }
}

/// Log verbosity of the process-wide subscriber, written to stderr.
#[derive(Debug, Clone, Copy)]
pub enum SonarLogger {
    None,
    Warn,
    Info,
    Debug,
}

impl SonarLogger {
    pub fn init(self) -> Result<(), SonarError> {
        let level = match self {
            SonarLogger::None => return Ok(()),
            SonarLogger::Warn => Level::WARN,
            SonarLogger::Info => Level::INFO,
            SonarLogger::Debug => Level::DEBUG,
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines() {
        let ok = PingOutcome::Reply { elapsed_ms: 1.234 };
        assert_eq!(format!("{}", ok), "Ping successful: time=1.23ms");
        assert_eq!(format!("{}", PingOutcome::TimedOut), "Ping timed out");
    }

    #[test]
    fn test_report_all_lost_suppresses_rtt_summary() {
        let report = PingReport {
            host: "example.com".to_string(),
            addr: Ipv4Addr::new(93, 184, 216, 34),
            sent: 4,
            received: 0,
            lost: 4,
            loss_percent: 100.0,
            min_rtt_ms: f64::INFINITY,
            max_rtt_ms: f64::NEG_INFINITY,
            avg_rtt_ms: 0.0,
        };
        let rendered = format!("{}", report);
        assert_eq!(
            rendered,
            "Ping statistics for example.com:\n    \
             Packets: Sent = 4, Received = 0, Lost = 4 (100.00% loss)\n\
             IP: 93.184.216.34"
        );
    }

    #[test]
    fn test_report_with_replies_prints_rtt_summary() {
        let report = PingReport {
            host: "example.com".to_string(),
            addr: Ipv4Addr::new(93, 184, 216, 34),
            sent: 2,
            received: 2,
            lost: 0,
            loss_percent: 0.0,
            min_rtt_ms: 10.5,
            max_rtt_ms: 20.5,
            avg_rtt_ms: 15.5,
        };
        let rendered = format!("{}", report);
        assert!(rendered.contains("Sent = 2, Received = 2, Lost = 0 (0.00% loss)"));
        assert!(rendered.contains("Approximate round trip times in milliseconds:"));
        assert!(rendered.contains("Minimum = 10.50ms, Maximum = 20.50ms, Average = 15.50ms"));
        assert!(rendered.ends_with("IP: 93.184.216.34"));
    }
}
