use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::checksum::{icmpv6_checksum, internet_checksum};
use super::icmp;
use super::{
    Datagram, Family, ICMP_HEADER_LEN, IPV4_MIN_HEADER_LEN, IPV6_HEADER_LEN, IcmpBody, IcmpMessage,
    IpHeader, IpProtocol, RawPacket,
};
use crate::config::Config;

const MAX_LENGTH_FIELD: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    UnsupportedProtocol(u8),
    FamilyMismatch {
        source: IpAddr,
        destination: IpAddr,
    },
    UnsupportedBodyVariant {
        icmp_type: u8,
        body: &'static str,
    },
    PayloadTooLarge(usize),
    ChecksumComputationFailed,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::UnsupportedProtocol(n) => write!(f, "unsupported protocol {}", n),
            EncodeError::FamilyMismatch {
                source,
                destination,
            } => write!(
                f,
                "source {} and destination {} belong to different address families",
                source, destination
            ),
            EncodeError::UnsupportedBodyVariant { icmp_type, body } => {
                write!(f, "{} body cannot be sent as ICMP type {}", body, icmp_type)
            }
            EncodeError::PayloadTooLarge(len) => {
                write!(f, "datagram of {} bytes does not fit a 16 bit length field", len)
            }
            EncodeError::ChecksumComputationFailed => write!(f, "ICMP checksum self-check failed"),
        }
    }
}

impl std::error::Error for EncodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    TruncatedHeader { needed: usize, got: usize },
    TruncatedBody { needed: usize, got: usize },
    UnknownType(u8),
    UnknownVersion(u8),
    UnsupportedProtocol(u8),
    BadChecksum { expected: u16, found: u16 },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::TruncatedHeader { needed, got } => {
                write!(f, "header truncated: need {} bytes, got {}", needed, got)
            }
            DecodeError::TruncatedBody { needed, got } => {
                write!(f, "body truncated: need {} bytes, got {}", needed, got)
            }
            DecodeError::UnknownType(t) => write!(f, "unknown ICMP type {}", t),
            DecodeError::UnknownVersion(v) => write!(f, "unknown IP version {}", v),
            DecodeError::UnsupportedProtocol(n) => write!(f, "unsupported protocol {}", n),
            DecodeError::BadChecksum { expected, found } => write!(
                f,
                "checksum mismatch: expected 0x{:04x}, found 0x{:04x}",
                expected, found
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Stateless IP+ICMP serializer. Holds only its configuration, so one
/// instance can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: Config,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serialize `datagram` into IP header, ICMP header and ICMP body bytes.
    pub fn encode(&self, datagram: &Datagram) -> Result<RawPacket, EncodeError> {
        let header = &datagram.header;
        let family = header.family()?;
        check_body(family, &datagram.message)?;

        let header_len = family.header_len();
        let icmp_len = ICMP_HEADER_LEN + datagram.message.body.data().len();
        let total_len = header_len + icmp_len;
        let length_field = match family {
            Family::V4 => total_len,
            Family::V6 => icmp_len,
        };
        if length_field > MAX_LENGTH_FIELD {
            return Err(EncodeError::PayloadTooLarge(total_len));
        }

        let mut buf = vec![0u8; total_len];
        match family {
            Family::V4 => write_ipv4_header(&mut buf[..header_len], header, total_len),
            Family::V6 => write_ipv6_header(&mut buf[..header_len], header, icmp_len),
        }
        let message = &mut buf[header_len..];
        write_icmp(message, &datagram.message);

        let cksum = icmp_checksum(family, header, message);
        BigEndian::write_u16(&mut message[2..4], cksum);
        if icmp_checksum(family, header, message) != 0 {
            return Err(EncodeError::ChecksumComputationFailed);
        }

        log::debug!(
            "Encoded {} ICMP type {} code {}: {} bytes ({} header + {} ICMP)",
            family,
            datagram.message.icmp_type,
            datagram.message.code,
            total_len,
            header_len,
            icmp_len
        );

        Ok(RawPacket {
            protocol: header.protocol,
            data: buf,
        })
    }

    /// Parse a packet previously produced by [`Encoder::encode`] or captured
    /// off the wire.
    pub fn decode(&self, raw: &RawPacket) -> Result<Datagram, DecodeError> {
        let datagram = self.decode_bytes(&raw.data)?;
        if datagram.header.protocol != raw.protocol {
            return Err(DecodeError::UnsupportedProtocol(raw.protocol.number()));
        }
        Ok(datagram)
    }

    pub fn decode_bytes(&self, data: &[u8]) -> Result<Datagram, DecodeError> {
        let first = *data
            .first()
            .ok_or(DecodeError::TruncatedHeader { needed: 1, got: 0 })?;
        let (header, message) = match first >> 4 {
            4 => self.read_ipv4(data)?,
            6 => read_ipv6(data)?,
            v => return Err(DecodeError::UnknownVersion(v)),
        };
        let family = Family::of(&header.destination);

        if message.len() < ICMP_HEADER_LEN {
            return Err(DecodeError::TruncatedHeader {
                needed: ICMP_HEADER_LEN,
                got: message.len(),
            });
        }

        if self.config.verify_checksum {
            let found = BigEndian::read_u16(&message[2..4]);
            let mut zeroed = message.to_vec();
            zeroed[2..4].copy_from_slice(&[0, 0]);
            let expected = icmp_checksum(family, &header, &zeroed);
            if expected != found {
                return Err(DecodeError::BadChecksum { expected, found });
            }
        }

        let message = self.read_icmp(family, message)?;
        log::trace!(
            "Decoded {} datagram {} -> {} carrying {} body",
            family,
            header.source,
            header.destination,
            message.body.kind()
        );
        Ok(Datagram { header, message })
    }

    fn read_ipv4<'a>(&self, data: &'a [u8]) -> Result<(IpHeader, &'a [u8]), DecodeError> {
        if data.len() < IPV4_MIN_HEADER_LEN {
            return Err(DecodeError::TruncatedHeader {
                needed: IPV4_MIN_HEADER_LEN,
                got: data.len(),
            });
        }
        let ihl = ((data[0] & 0x0F) as usize) * 4;
        if ihl < IPV4_MIN_HEADER_LEN || data.len() < ihl {
            return Err(DecodeError::TruncatedHeader {
                needed: ihl.max(IPV4_MIN_HEADER_LEN),
                got: data.len().min(ihl),
            });
        }
        if self.config.verify_checksum && internet_checksum(&data[..ihl]) != 0 {
            let found = BigEndian::read_u16(&data[10..12]);
            let mut zeroed = data[..ihl].to_vec();
            zeroed[10..12].copy_from_slice(&[0, 0]);
            return Err(DecodeError::BadChecksum {
                expected: internet_checksum(&zeroed),
                found,
            });
        }
        let protocol = data[9];
        if protocol != IpProtocol::Icmpv4.number() {
            return Err(DecodeError::UnsupportedProtocol(protocol));
        }

        let total_len = BigEndian::read_u16(&data[2..4]) as usize;
        if total_len < ihl {
            return Err(DecodeError::TruncatedHeader {
                needed: ihl,
                got: total_len,
            });
        }
        if data.len() < total_len {
            return Err(DecodeError::TruncatedBody {
                needed: total_len,
                got: data.len(),
            });
        }

        let header = IpHeader {
            source: IpAddr::V4(ipv4_at(&data[12..16])),
            destination: IpAddr::V4(ipv4_at(&data[16..20])),
            protocol: IpProtocol::Icmpv4,
            ttl: data[8],
        };
        // Anything past the total length is link layer padding.
        Ok((header, &data[ihl..total_len]))
    }

    fn read_icmp(&self, family: Family, message: &[u8]) -> Result<IcmpMessage, DecodeError> {
        let icmp_type = message[0];
        let code = message[1];
        let data = message[ICMP_HEADER_LEN..].to_vec();

        let body = if icmp::is_echo(family, icmp_type) {
            IcmpBody::Echo {
                identifier: BigEndian::read_u16(&message[4..6]),
                sequence: BigEndian::read_u16(&message[6..8]),
                data,
            }
        } else if icmp::is_time_exceeded(family, icmp_type) {
            IcmpBody::TimeExceeded { data }
        } else if self.config.strict_types {
            return Err(DecodeError::UnknownType(icmp_type));
        } else {
            let mut rest_of_header = [0u8; 4];
            rest_of_header.copy_from_slice(&message[4..8]);
            IcmpBody::Opaque {
                rest_of_header,
                data,
            }
        };

        Ok(IcmpMessage {
            icmp_type,
            code,
            body,
        })
    }
}

fn check_body(family: Family, message: &IcmpMessage) -> Result<(), EncodeError> {
    let t = message.icmp_type;
    let consistent = match message.body {
        IcmpBody::Echo { .. } => icmp::is_echo(family, t),
        IcmpBody::TimeExceeded { .. } => icmp::is_time_exceeded(family, t),
        // Known types would decode into their own variant.
        IcmpBody::Opaque { .. } => !icmp::is_echo(family, t) && !icmp::is_time_exceeded(family, t),
    };
    if consistent {
        Ok(())
    } else {
        Err(EncodeError::UnsupportedBodyVariant {
            icmp_type: t,
            body: message.body.kind(),
        })
    }
}

fn write_ipv4_header(buf: &mut [u8], header: &IpHeader, total_len: usize) {
    buf[0] = 0x45;
    BigEndian::write_u16(&mut buf[2..4], total_len as u16);
    buf[8] = header.ttl;
    buf[9] = header.protocol.number();
    if let (IpAddr::V4(src), IpAddr::V4(dst)) = (header.source, header.destination) {
        buf[12..16].copy_from_slice(&src.octets());
        buf[16..20].copy_from_slice(&dst.octets());
    }
    let cksum = internet_checksum(buf);
    BigEndian::write_u16(&mut buf[10..12], cksum);
}

fn write_ipv6_header(buf: &mut [u8], header: &IpHeader, payload_len: usize) {
    buf[0] = 0x60;
    BigEndian::write_u16(&mut buf[4..6], payload_len as u16);
    buf[6] = header.protocol.number();
    buf[7] = header.ttl;
    if let (IpAddr::V6(src), IpAddr::V6(dst)) = (header.source, header.destination) {
        buf[8..24].copy_from_slice(&src.octets());
        buf[24..40].copy_from_slice(&dst.octets());
    }
}

fn write_icmp(buf: &mut [u8], message: &IcmpMessage) {
    buf[0] = message.icmp_type;
    buf[1] = message.code;
    match &message.body {
        IcmpBody::Echo {
            identifier,
            sequence,
            ..
        } => {
            BigEndian::write_u16(&mut buf[4..6], *identifier);
            BigEndian::write_u16(&mut buf[6..8], *sequence);
        }
        // Unused word stays zero.
        IcmpBody::TimeExceeded { .. } => {}
        IcmpBody::Opaque { rest_of_header, .. } => buf[4..8].copy_from_slice(rest_of_header),
    }
    buf[ICMP_HEADER_LEN..].copy_from_slice(message.body.data());
}

fn icmp_checksum(family: Family, header: &IpHeader, message: &[u8]) -> u16 {
    match family {
        Family::V4 => internet_checksum(message),
        Family::V6 => icmpv6_checksum(&header.source, &header.destination, message),
    }
}

fn read_ipv6(data: &[u8]) -> Result<(IpHeader, &[u8]), DecodeError> {
    if data.len() < IPV6_HEADER_LEN {
        return Err(DecodeError::TruncatedHeader {
            needed: IPV6_HEADER_LEN,
            got: data.len(),
        });
    }
    let next_header = data[6];
    if next_header != IpProtocol::Icmpv6.number() {
        return Err(DecodeError::UnsupportedProtocol(next_header));
    }
    let end = IPV6_HEADER_LEN + BigEndian::read_u16(&data[4..6]) as usize;
    if data.len() < end {
        return Err(DecodeError::TruncatedBody {
            needed: end,
            got: data.len(),
        });
    }

    let header = IpHeader {
        source: IpAddr::V6(ipv6_at(&data[8..24])),
        destination: IpAddr::V6(ipv6_at(&data[24..40])),
        protocol: IpProtocol::Icmpv6,
        ttl: data[7],
    };
    Ok((header, &data[IPV6_HEADER_LEN..end]))
}

fn ipv4_at(bytes: &[u8]) -> Ipv4Addr {
    Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3])
}

fn ipv6_at(bytes: &[u8]) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(bytes);
    Ipv6Addr::from(octets)
}
