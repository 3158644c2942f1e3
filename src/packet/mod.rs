pub mod checksum;
pub mod encoder;
pub mod icmp;
pub mod ttl;

pub use encoder::*;
pub use ttl::*;

use std::fmt;
use std::net::IpAddr;

pub const IPV4_MIN_MTU: usize = 576;
pub const IPV6_MIN_MTU: usize = 1280;
pub const IPV4_MIN_HEADER_LEN: usize = 20;
pub const IPV6_HEADER_LEN: usize = 40;
pub const ICMP_HEADER_LEN: usize = 8;

/// Hop limit written into datagrams this crate synthesizes.
pub const DEFAULT_TTL: u8 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    /// Lower bound on the path MTU every link of this family must carry.
    pub fn min_mtu(self) -> usize {
        match self {
            Family::V4 => IPV4_MIN_MTU,
            Family::V6 => IPV6_MIN_MTU,
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            Family::V4 => IPV4_MIN_HEADER_LEN,
            Family::V6 => IPV6_HEADER_LEN,
        }
    }

    pub fn icmp_protocol(self) -> IpProtocol {
        match self {
            Family::V4 => IpProtocol::Icmpv4,
            Family::V6 => IpProtocol::Icmpv6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "IPv4"),
            Family::V6 => write!(f, "IPv6"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProtocol {
    Icmpv4,
    Icmpv6,
    Other(u8),
}

impl IpProtocol {
    pub fn number(self) -> u8 {
        match self {
            IpProtocol::Icmpv4 => 1,
            IpProtocol::Icmpv6 => 58,
            IpProtocol::Other(n) => n,
        }
    }

    pub fn from_number(n: u8) -> Self {
        match n {
            1 => IpProtocol::Icmpv4,
            58 => IpProtocol::Icmpv6,
            n => IpProtocol::Other(n),
        }
    }
}

/// Header metadata of an IP datagram. Does not own any encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpHeader {
    pub source: IpAddr,
    pub destination: IpAddr,
    pub protocol: IpProtocol,
    pub ttl: u8,
}

impl IpHeader {
    /// Header for an ICMP datagram, protocol picked from the destination's family.
    pub fn new(source: IpAddr, destination: IpAddr, ttl: u8) -> Self {
        let protocol = Family::of(&destination).icmp_protocol();
        Self {
            source,
            destination,
            protocol,
            ttl,
        }
    }

    /// Family shared by both addresses and the protocol.
    pub fn family(&self) -> Result<Family, EncodeError> {
        let family = Family::of(&self.destination);
        if Family::of(&self.source) != family {
            return Err(EncodeError::FamilyMismatch {
                source: self.source,
                destination: self.destination,
            });
        }
        if self.protocol != family.icmp_protocol() {
            return Err(EncodeError::UnsupportedProtocol(self.protocol.number()));
        }
        Ok(family)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IcmpBody {
    Echo {
        identifier: u16,
        sequence: u16,
        data: Vec<u8>,
    },
    /// Quoted bytes of the datagram that ran out of hops.
    TimeExceeded { data: Vec<u8> },
    /// Any other message, carried verbatim: the four bytes after the
    /// checksum and the rest of the message.
    Opaque { rest_of_header: [u8; 4], data: Vec<u8> },
}

impl IcmpBody {
    pub fn kind(&self) -> &'static str {
        match self {
            IcmpBody::Echo { .. } => "echo",
            IcmpBody::TimeExceeded { .. } => "time-exceeded",
            IcmpBody::Opaque { .. } => "opaque",
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            IcmpBody::Echo { data, .. } => data,
            IcmpBody::TimeExceeded { data } => data,
            IcmpBody::Opaque { data, .. } => data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub icmp_type: u8,
    pub code: u8,
    pub body: IcmpBody,
}

impl IcmpMessage {
    pub fn echo_request(family: Family, identifier: u16, sequence: u16, data: Vec<u8>) -> Self {
        Self {
            icmp_type: icmp::echo_request_type(family),
            code: 0,
            body: IcmpBody::Echo {
                identifier,
                sequence,
                data,
            },
        }
    }

    pub fn echo_reply(family: Family, identifier: u16, sequence: u16, data: Vec<u8>) -> Self {
        Self {
            icmp_type: icmp::echo_reply_type(family),
            code: 0,
            body: IcmpBody::Echo {
                identifier,
                sequence,
                data,
            },
        }
    }

    pub fn ttl_exceeded(family: Family, quoted: Vec<u8>) -> Self {
        Self {
            icmp_type: icmp::time_exceeded_type(family),
            code: icmp::CODE_TTL_EXCEEDED_IN_TRANSIT,
            body: IcmpBody::TimeExceeded { data: quoted },
        }
    }
}

/// An IP header plus the ICMP message it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub header: IpHeader,
    pub message: IcmpMessage,
}

impl Datagram {
    pub fn new(header: IpHeader, message: IcmpMessage) -> Self {
        Self { header, message }
    }
}

/// Complete serialized datagram: IP header, ICMP header, ICMP body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub protocol: IpProtocol,
    pub data: Vec<u8>,
}

impl RawPacket {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes following the minimum-length IP header of this packet's family.
    pub fn icmp_bytes(&self) -> &[u8] {
        let header_len = match self.protocol {
            IpProtocol::Icmpv6 => IPV6_HEADER_LEN,
            _ => IPV4_MIN_HEADER_LEN,
        };
        self.data.get(header_len..).unwrap_or(&[])
    }
}
