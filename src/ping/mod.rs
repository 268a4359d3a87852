#[cfg(target_os = "linux")]
mod sockaddr;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::IcmpSocket;

use std::{fmt::Display, net::Ipv4Addr};

use crate::error::ParseError;

pub const ICMP_ECHO_REPLY: u8 = 0;
pub const ICMP_DESTINATION_UNREACHABLE: u8 = 3;
pub const ICMP_ECHO_REQUEST: u8 = 8;
pub const ICMP_ECHO_CODE: u8 = 0;

/// Size of the ICMP echo header: type, code, checksum, identifier, sequence.
pub const ICMP_HEADER_LENGTH: usize = 8;

const MIN_IPV4_HEADER_LENGTH: usize = 20;
const IPPROTO_ICMP: u8 = 1;

/// Transport used by the probe to exchange raw ICMP datagrams with one target.
pub trait IcmpApi {
    /// Send a serialized ICMP message to the target.
    fn send(&mut self, packet: &[u8]) -> Result<(), std::io::Error>;

    /// Wait at most `timeout` for the next datagram. A zero timeout checks
    /// once without blocking.
    ///
    /// # Errors
    ///
    /// This function will return an error if the underlying IO causes an
    /// unexpected error.
    fn recv(&mut self, timeout: std::time::Duration) -> Result<IcmpResult, std::io::Error>;
}

#[derive(Debug)]
pub enum IcmpResult {
    Datagram(Datagram),
    Timeout,
    Interrupted,
}

/// A raw IPv4 datagram as delivered by the socket, IP header included.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub addr: Ipv4Addr,
    pub data: Vec<u8>,
    pub time: std::time::Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmpType {
    EchoReply,
    EchoRequest,
    DestinationUnreachable(Result<DestinationUnreachable, u8>),
    Other(u8),
}

impl IcmpType {
    fn from_header(icmp_type: u8, code: u8) -> Self {
        match icmp_type {
            ICMP_ECHO_REPLY => IcmpType::EchoReply,
            ICMP_ECHO_REQUEST => IcmpType::EchoRequest,
            ICMP_DESTINATION_UNREACHABLE => IcmpType::DestinationUnreachable(DestinationUnreachable::try_from(code)),
            other => IcmpType::Other(other),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            IcmpType::EchoReply => ICMP_ECHO_REPLY,
            IcmpType::EchoRequest => ICMP_ECHO_REQUEST,
            IcmpType::DestinationUnreachable(_) => ICMP_DESTINATION_UNREACHABLE,
            IcmpType::Other(other) => *other,
        }
    }
}

#[repr(u8)]
#[derive(int_enum::IntEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationUnreachable {
    NetUnreachable = 0,
    HostUnreachable = 1,
    ProtocolUnreachable = 2,
    PortUnreachable = 3,
    FragmentationNeeded = 4,
    SourceRouteFailed = 5,
    DestinationNetworkUnknown = 6,
    DestinationHostUnknown = 7,
    SourceHostIsolated = 8,
    NetworkAdministrativelyProhibited = 9,
    HostAdministrativelyProhibited = 10,
    NetworkUnreachableForTos = 11,
    HostUnreachableForTos = 12,
    CommunicationAdministrativelyProhibited = 13,
    HostPrecedenceViolation = 14,
    PrecedenceCutoffInEffect = 15,
}

impl DestinationUnreachable {
    fn reason(&self) -> &'static str {
        use DestinationUnreachable::*;
        match self {
            NetUnreachable => "Network unreachable",
            HostUnreachable => "Host unreachable",
            ProtocolUnreachable => "Protocol unreachable",
            PortUnreachable => "Port unreachable",
            FragmentationNeeded => "Fragmentation needed",
            SourceRouteFailed => "Source route failed",
            DestinationNetworkUnknown => "Destination network unknown",
            DestinationHostUnknown => "Destination host unknown",
            SourceHostIsolated => "Source host isolated",
            NetworkAdministrativelyProhibited => "Network administratively prohibited",
            HostAdministrativelyProhibited => "Host administratively prohibited",
            NetworkUnreachableForTos => "Network unreachable for TOS",
            HostUnreachableForTos => "Host unreachable for TOS",
            CommunicationAdministrativelyProhibited => "Communication administratively prohibited",
            HostPrecedenceViolation => "Host precedence violation",
            PrecedenceCutoffInEffect => "Precedence cutoff in effect",
        }
    }
}

impl Display for DestinationUnreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

pub fn unreachable_to_string(unreach: &Result<DestinationUnreachable, u8>) -> String {
    match unreach {
        Ok(reason) => reason.to_string(),
        Err(code) => format!("Unknown code: {}", code),
    }
}

/// An ICMP message parsed out of a received IPv4 datagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    pub icmp_type: IcmpType,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    // TTL copied from the enclosing IP header
    pub ttl: u8,
    pub payload: Vec<u8>,
    pub addr: Ipv4Addr,
}

impl EchoReply {
    pub fn is_echo_reply(&self) -> bool {
        self.icmp_type == IcmpType::EchoReply
    }

    /// Recompute the ICMP checksum over the received message; a sound message
    /// sums to zero.
    pub fn checksum_valid(&self) -> bool {
        let mut message = Vec::with_capacity(ICMP_HEADER_LENGTH + self.payload.len());
        message.extend_from_slice(&[self.icmp_type.as_u8(), self.code]);
        message.extend_from_slice(&self.checksum.to_be_bytes());
        message.extend_from_slice(&self.identifier.to_be_bytes());
        message.extend_from_slice(&self.sequence.to_be_bytes());
        message.extend_from_slice(&self.payload);
        checksum(&message) == 0
    }
}

/// RFC 1071 internet checksum: ones-complement of the ones-complement sum of
/// the big-endian 16-bit words, an odd trailing byte padded with zero.
pub fn checksum(data: &[u8]) -> u16 {
    let mut words = data.chunks_exact(2);
    // u64 so no buffer that fits in memory overflows before folding
    let mut sum: u64 = 0;
    for word in words.by_ref() {
        sum += u16::from_be_bytes([word[0], word[1]]) as u64;
    }
    if let [last] = words.remainder() {
        sum += (*last as u64) << 8;
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

fn write_echo_header(packet: &mut [u8], checksum: u16, identifier: u16, sequence: u16) {
    packet[0] = ICMP_ECHO_REQUEST;
    packet[1] = ICMP_ECHO_CODE;
    packet[2..4].copy_from_slice(&checksum.to_be_bytes());
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());
}

/// Serialize an echo request with its checksum filled in.
pub fn build_echo_request(sequence: u16, identifier: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0u8; ICMP_HEADER_LENGTH + payload.len()];
    write_echo_header(&mut packet, 0, identifier, sequence);
    packet[ICMP_HEADER_LENGTH..].copy_from_slice(payload);
    let checksum = checksum(&packet);
    write_echo_header(&mut packet, checksum, identifier, sequence);
    packet
}

/// Parse a full IPv4 datagram carrying an ICMP message.
///
/// The IP header length is taken from the IHL nibble, so headers carrying
/// options are skipped correctly.
pub fn parse_echo_reply(raw: &[u8], addr: Ipv4Addr) -> Result<EchoReply, ParseError> {
    let first = *raw.first().ok_or(ParseError::Truncated {
        length: 0,
        required: MIN_IPV4_HEADER_LENGTH,
    })?;
    let ihl = first & 0x0F;
    let ip_header_length = ihl as usize * 4;
    if ip_header_length < MIN_IPV4_HEADER_LENGTH {
        return Err(ParseError::InvalidHeaderLength(ihl));
    }
    let required = ip_header_length + ICMP_HEADER_LENGTH;
    if raw.len() < required {
        return Err(ParseError::Truncated {
            length: raw.len(),
            required,
        });
    }
    let protocol = raw[9];
    if protocol != IPPROTO_ICMP {
        return Err(ParseError::NotIcmp(protocol));
    }

    let icmp = &raw[ip_header_length..];
    Ok(EchoReply {
        icmp_type: IcmpType::from_header(icmp[0], icmp[1]),
        code: icmp[1],
        checksum: u16::from_be_bytes([icmp[2], icmp[3]]),
        identifier: u16::from_be_bytes([icmp[4], icmp[5]]),
        sequence: u16::from_be_bytes([icmp[6], icmp[7]]),
        ttl: raw[8],
        payload: icmp[ICMP_HEADER_LENGTH..].to_vec(),
        addr,
    })
}
