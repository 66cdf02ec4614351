use pnet::packet::Packet;
use pnet::packet::icmp::IcmpCode;
use pnet::packet::icmp::IcmpPacket;
use pnet::packet::icmp::IcmpType;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::transport::TransportChannelType::Layer4;
use pnet::transport::TransportProtocol::Ipv4;
use pnet::transport::TransportReceiver;
use pnet::transport::TransportSender;
use pnet::transport::icmp_packet_iter;
use pnet::transport::transport_channel;
use std::io;
use std::net::IpAddr;
use std::net::Ipv4Addr;
use std::panic::Location;
use std::time::Duration;
use tracing::debug;

use crate::error::SonarError;
use crate::packet;

pub const REPLY_BUFFER_SIZE: usize = 1024;

/// A readable ICMP event observed while waiting for a reply.
#[derive(Debug, Clone)]
pub struct ReplyEvent {
    pub addr: IpAddr,
    pub icmp_type: IcmpType,
    pub icmp_code: IcmpCode,
    pub size: usize,
    pub echoed_timestamp: Option<f64>,
}

/// Send/receive contract of the raw ICMP socket: fire an echo request at an
/// address, then block for at most `timeout` waiting for a readable event.
/// The session loop only depends on this trait, so it can run against an
/// in-memory implementation where raw-socket privileges are unavailable.
pub trait IcmpTransport {
    fn send_echo(&mut self, packet: &[u8], dst: Ipv4Addr) -> Result<usize, SonarError>;
    fn wait_reply(&mut self, timeout: Duration) -> Result<Option<ReplyEvent>, SonarError>;
}

/// Raw-socket transport over a Layer4 ICMP channel. The kernel prepends the
/// IPv4 header on send and strips it on receive. Dropping the value closes
/// the socket, on every exit path.
pub struct RawIcmpTransport {
    tx: TransportSender,
    rx: TransportReceiver,
}

impl RawIcmpTransport {
    /// Opens the raw socket. Requires root or `CAP_NET_RAW`; a denied open
    /// is reported as `RawSocketPermission`.
    pub fn open() -> Result<RawIcmpTransport, SonarError> {
        let protocol = Layer4(Ipv4(IpNextHeaderProtocols::Icmp));
        let (tx, rx) = match transport_channel(REPLY_BUFFER_SIZE, protocol) {
            Ok(pair) => pair,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(SonarError::RawSocketPermission { e: e.to_string() });
            }
            Err(e) => return Err(e.into()),
        };
        debug!("icmp transport channel open");
        Ok(RawIcmpTransport { tx, rx })
    }
}

impl IcmpTransport for RawIcmpTransport {
    fn send_echo(&mut self, packet: &[u8], dst: Ipv4Addr) -> Result<usize, SonarError> {
        let echo_request = match IcmpPacket::new(packet) {
            Some(p) => p,
            None => {
                return Err(SonarError::BuildPacketError {
                    location: format!("{}", Location::caller()),
                });
            }
        };
        let n = self.tx.send_to(echo_request, dst.into())?;
        debug!("sent {} byte echo request to {}", n, dst);
        Ok(n)
    }

    fn wait_reply(&mut self, timeout: Duration) -> Result<Option<ReplyEvent>, SonarError> {
        let mut reply_iter = icmp_packet_iter(&mut self.rx);
        match reply_iter.next_with_timeout(timeout) {
            Ok(Some((reply, addr))) => {
                let event = ReplyEvent {
                    addr,
                    icmp_type: reply.get_icmp_type(),
                    icmp_code: reply.get_icmp_code(),
                    size: reply.packet().len(),
                    echoed_timestamp: packet::reply_timestamp(reply.packet()),
                };
                Ok(Some(event))
            }
            Ok(None) => {
                debug!("no readable event within {:?}", timeout);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
