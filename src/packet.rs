use pnet::packet::Packet;
use pnet::packet::icmp::IcmpCode;
use pnet::packet::icmp::IcmpTypes;
use pnet::packet::icmp::MutableIcmpPacket;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use std::panic::Location;

use crate::checksum;
use crate::error::SonarError;

pub const ICMP_HEADER_SIZE: usize = 8;
pub const ECHO_PAYLOAD_SIZE: usize = 8;
pub const ECHO_PACKET_SIZE: usize = ICMP_HEADER_SIZE + ECHO_PAYLOAD_SIZE;

/// Every request carries sequence 1; attempts within a session are told
/// apart by their timestamp payload, not by sequence.
pub const ECHO_SEQUENCE: u16 = 1;

/// Build an ICMP Echo Request with an 8-byte timestamp payload (seconds
/// since the Unix epoch as f64, native byte order).
pub fn build_echo_request(
    identifier: u16,
    sequence: u16,
    timestamp: f64,
) -> Result<Vec<u8>, SonarError> {
    let mut buff = vec![0u8; ECHO_PACKET_SIZE];
    let mut echo_header = match MutableEchoRequestPacket::new(&mut buff) {
        Some(p) => p,
        None => {
            return Err(SonarError::BuildPacketError {
                location: format!("{}", Location::caller()),
            });
        }
    };
    echo_header.set_icmp_type(IcmpTypes::EchoRequest);
    echo_header.set_icmp_code(IcmpCode(0));
    echo_header.set_identifier(identifier);
    echo_header.set_sequence_number(sequence);
    echo_header.set_payload(&timestamp.to_ne_bytes());

    // checksum over header+payload while the checksum field is still zero
    let sum = checksum::checksum(&buff);
    let mut icmp_header = match MutableIcmpPacket::new(&mut buff) {
        Some(p) => p,
        None => {
            return Err(SonarError::BuildPacketError {
                location: format!("{}", Location::caller()),
            });
        }
    };
    icmp_header.set_checksum(sum);
    Ok(buff)
}

/// Extract the echoed timestamp payload from an ICMP echo reply. The round
/// trip measurement never depends on this value, it only feeds diagnostics.
pub fn reply_timestamp(icmp: &[u8]) -> Option<f64> {
    let reply = EchoReplyPacket::new(icmp)?;
    if reply.get_icmp_type() != IcmpTypes::EchoReply {
        return None;
    }
    let payload = reply.payload();
    let bytes: [u8; ECHO_PAYLOAD_SIZE] = payload.get(..ECHO_PAYLOAD_SIZE)?.try_into().ok()?;
    Some(f64::from_ne_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_request_header_fields() {
        let buff = build_echo_request(0x1234, ECHO_SEQUENCE, 0.0).unwrap();
        assert_eq!(buff.len(), ECHO_PACKET_SIZE);
        assert_eq!(buff[0], 8);
        assert_eq!(buff[1], 0);
        assert_eq!(&buff[4..6], &[0x12, 0x34]);
        assert_eq!(&buff[6..8], &[0x00, 0x01]);
    }

    #[test]
    fn test_echo_request_checksum_round_trip() {
        for identifier in [0u16, 1, 0x00ff, 0xab12, 0xffff] {
            for timestamp in [0.0f64, 1.5, 1700000000.123, f64::MAX] {
                let buff = build_echo_request(identifier, ECHO_SEQUENCE, timestamp).unwrap();
                assert!(
                    checksum::verify_checksum(&buff),
                    "identifier {identifier:#x} timestamp {timestamp}"
                );
            }
        }
    }

    #[test]
    fn test_echo_request_checksum_is_set() {
        let buff = build_echo_request(0x0001, ECHO_SEQUENCE, 42.0).unwrap();
        let stored = u16::from_be_bytes([buff[2], buff[3]]);
        let mut zeroed = buff.clone();
        zeroed[2] = 0;
        zeroed[3] = 0;
        assert_eq!(stored, checksum::checksum(&zeroed));
    }

    #[test]
    fn test_reply_timestamp_round_trip() {
        let timestamp = 1700000000.25f64;
        let mut reply = vec![0u8; ECHO_PACKET_SIZE];
        reply[8..].copy_from_slice(&timestamp.to_ne_bytes());
        assert_eq!(reply_timestamp(&reply), Some(timestamp));
    }

    #[test]
    fn test_reply_timestamp_rejects_echo_request() {
        let buff = build_echo_request(7, ECHO_SEQUENCE, 123.0).unwrap();
        assert_eq!(reply_timestamp(&buff), None);
    }

    #[test]
    fn test_reply_timestamp_rejects_short_packet() {
        let reply = vec![0u8; ICMP_HEADER_SIZE];
        assert_eq!(reply_timestamp(&reply), None);
    }
}
