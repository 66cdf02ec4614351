use std::net::Ipv4Addr;
use std::time::Duration;
use std::time::Instant;
use tracing::debug;
use tracing::warn;

use crate::PingOutcome;
use crate::PingReport;
use crate::error::SonarError;
use crate::packet;
use crate::packet::ECHO_SEQUENCE;
use crate::transport::IcmpTransport;
use crate::transport::RawIcmpTransport;
use crate::utils;

/// Mutable state of one ping run: the resolved target plus the counters the
/// loop accumulates. Created at session start, finalized into a
/// [`PingReport`], then discarded.
#[derive(Debug)]
pub struct PingSession {
    host: String,
    addr: Ipv4Addr,
    sent: usize,
    received: usize,
    lost: usize,
    total_rtt_ms: f64,
    min_rtt_ms: f64,
    max_rtt_ms: f64,
}

impl PingSession {
    pub fn new(host: &str, addr: Ipv4Addr) -> PingSession {
        PingSession {
            host: host.to_string(),
            addr,
            sent: 0,
            received: 0,
            lost: 0,
            total_rtt_ms: 0.0,
            min_rtt_ms: f64::INFINITY,
            max_rtt_ms: f64::NEG_INFINITY,
        }
    }

    pub fn record_sent(&mut self) {
        self.sent += 1;
    }

    pub fn record(&mut self, outcome: PingOutcome) {
        match outcome {
            PingOutcome::Reply { elapsed_ms } => {
                self.received += 1;
                self.total_rtt_ms += elapsed_ms;
                self.min_rtt_ms = self.min_rtt_ms.min(elapsed_ms);
                self.max_rtt_ms = self.max_rtt_ms.max(elapsed_ms);
            }
            PingOutcome::TimedOut => self.lost += 1,
        }
    }

    /// Average RTT divides the accumulated successful time by the number of
    /// requests sent, and loss percentage divides lost by sent; both are 0
    /// for an empty session rather than a division by zero.
    pub fn report(&self) -> PingReport {
        let (loss_percent, avg_rtt_ms) = if self.sent > 0 {
            (
                self.lost as f64 / self.sent as f64 * 100.0,
                self.total_rtt_ms / self.sent as f64,
            )
        } else {
            (0.0, 0.0)
        };
        PingReport {
            host: self.host.clone(),
            addr: self.addr,
            sent: self.sent,
            received: self.received,
            lost: self.lost,
            loss_percent,
            min_rtt_ms: self.min_rtt_ms,
            max_rtt_ms: self.max_rtt_ms,
            avg_rtt_ms,
        }
    }
}

fn run_attempt<T: IcmpTransport>(
    transport: &mut T,
    dst: Ipv4Addr,
    identifier: u16,
    timeout: Duration,
) -> Result<PingOutcome, SonarError> {
    let echo_request =
        packet::build_echo_request(identifier, ECHO_SEQUENCE, utils::unix_timestamp()?)?;
    let start = Instant::now();
    transport.send_echo(&echo_request, dst)?;
    let reply = transport.wait_reply(timeout)?;
    let elapsed = start.elapsed();
    match reply {
        Some(event) => {
            debug!(
                "reply event from {}: type {:?} code {:?}, {} bytes, echoed timestamp {:?}",
                event.addr, event.icmp_type, event.icmp_code, event.size, event.echoed_timestamp
            );
            Ok(PingOutcome::classify(elapsed, timeout))
        }
        None => Ok(PingOutcome::TimedOut),
    }
}

/// Run `num_requests` echo attempts against an already resolved address over
/// an already open transport, accumulating statistics. Per-attempt console
/// lines are printed as they happen when `print_result` is set.
pub fn run_session<T: IcmpTransport>(
    transport: &mut T,
    host: &str,
    addr: Ipv4Addr,
    num_requests: usize,
    timeout: Duration,
    print_result: bool,
) -> Result<PingReport, SonarError> {
    let identifier = utils::process_identifier();
    let mut session = PingSession::new(host, addr);
    for _ in 0..num_requests {
        session.record_sent();
        let outcome = run_attempt(transport, addr, identifier, timeout)?;
        if print_result {
            println!("{}", outcome);
        }
        session.record(outcome);
    }
    Ok(session.report())
}

/// Statistics mode: resolve the host, open a raw ICMP transport, send
/// `num_requests` echo requests, report counts and round trip statistics.
pub fn ping(
    host: &str,
    num_requests: usize,
    print_result: bool,
    timeout: Option<Duration>,
) -> Result<PingReport, SonarError> {
    ping_with(host, num_requests, print_result, timeout, RawIcmpTransport::open)
}

/// Statistics mode against an injected transport opener. Resolution happens
/// before the opener runs, so an unresolvable host never opens a socket or
/// sends a packet.
pub fn ping_with<T, F>(
    host: &str,
    num_requests: usize,
    print_result: bool,
    timeout: Option<Duration>,
    open_transport: F,
) -> Result<PingReport, SonarError>
where
    T: IcmpTransport,
    F: FnOnce() -> Result<T, SonarError>,
{
    let timeout = utils::get_timeout(timeout);
    let addr = utils::resolve_host(host)?;
    let mut transport = open_transport()?;
    let report = run_session(&mut transport, host, addr, num_requests, timeout, print_result)?;
    if print_result {
        println!();
        println!("{}", report);
    }
    Ok(report)
}

/// Single-ping mode: exactly one attempt, a pass/fail line and no
/// statistics aggregation.
pub fn ping_once(
    host: &str,
    print_result: bool,
    timeout: Option<Duration>,
) -> Result<PingOutcome, SonarError> {
    ping_once_with(host, print_result, timeout, RawIcmpTransport::open)
}

/// Single-ping mode against an injected transport opener.
pub fn ping_once_with<T, F>(
    host: &str,
    print_result: bool,
    timeout: Option<Duration>,
    open_transport: F,
) -> Result<PingOutcome, SonarError>
where
    T: IcmpTransport,
    F: FnOnce() -> Result<T, SonarError>,
{
    let timeout = utils::get_timeout(timeout);
    let addr = utils::resolve_host(host)?;
    let mut transport = open_transport()?;
    let identifier = utils::process_identifier();
    let outcome = run_attempt(&mut transport, addr, identifier, timeout)?;
    if !outcome.is_reply() {
        warn!("no reply from {} ({})", host, addr);
    }
    if print_result {
        println!("{}", outcome);
    }
    Ok(outcome)
}
