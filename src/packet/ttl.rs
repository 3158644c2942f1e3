use std::net::IpAddr;

use super::{Datagram, Family, IcmpMessage, IpHeader, RawPacket};
use crate::config::{Config, ConfigError};

/// Build the ICMP Time Exceeded datagram a router at `router` sends back to
/// the source of `original`, whose encoded bytes are `original_raw`.
///
/// The whole original datagram is quoted unless it is larger than the minimum
/// MTU of its family, in which case it is cut so that the reply is exactly
/// the minimum MTU. An original that fits is quoted in full even when the
/// reply then exceeds the minimum MTU.
pub fn build_ttl_exceeded(original: &IpHeader, original_raw: &RawPacket, router: IpAddr) -> Datagram {
    let family = Family::of(&original.destination);
    let max_quote = family.min_mtu() - family.header_len() - super::ICMP_HEADER_LEN;
    assemble(original, original_raw, router, family, family.min_mtu(), max_quote, super::DEFAULT_TTL)
}

/// Same as [`build_ttl_exceeded`] with the MTU floors and TTL taken from `config`.
pub fn build_ttl_exceeded_with(
    config: &Config,
    original: &IpHeader,
    original_raw: &RawPacket,
    router: IpAddr,
) -> Result<Datagram, ConfigError> {
    if config.default_ttl == 0 {
        return Err(ConfigError::ZeroTtl);
    }
    let family = Family::of(&original.destination);
    let max_quote = config.max_quote_len(family)?;
    Ok(assemble(
        original,
        original_raw,
        router,
        family,
        config.min_mtu(family),
        max_quote,
        config.default_ttl,
    ))
}

fn assemble(
    original: &IpHeader,
    original_raw: &RawPacket,
    router: IpAddr,
    family: Family,
    min_mtu: usize,
    max_quote: usize,
    ttl: u8,
) -> Datagram {
    let quoted = if original_raw.data.len() > min_mtu {
        log::debug!(
            "Quoting {} of {} bytes, original exceeds {} minimum MTU {}",
            max_quote,
            original_raw.data.len(),
            family,
            min_mtu
        );
        original_raw.data[..max_quote].to_vec()
    } else {
        original_raw.data.clone()
    };

    let header = IpHeader {
        source: router,
        destination: original.source,
        protocol: original.protocol,
        ttl,
    };
    Datagram::new(header, IcmpMessage::ttl_exceeded(family, quoted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{
        DEFAULT_TTL, Encoder, ICMP_HEADER_LEN, IPV4_MIN_HEADER_LEN, IPV4_MIN_MTU, IPV6_HEADER_LEN,
        IPV6_MIN_MTU, IcmpBody, icmp,
    };

    fn ipv4_original() -> IpHeader {
        IpHeader::new("192.168.1.1".parse().unwrap(), "10.0.0.1".parse().unwrap(), 0)
    }

    fn ipv6_original() -> IpHeader {
        IpHeader::new(
            "fd51:2391:523:f4ee::1".parse().unwrap(),
            "fd51:2391:697:f4ee::2".parse().unwrap(),
            0,
        )
    }

    fn quoted(datagram: &Datagram) -> &[u8] {
        match &datagram.message.body {
            IcmpBody::TimeExceeded { data } => data,
            other => panic!("expected time exceeded body, got {:?}", other),
        }
    }

    /// Encode `message` from `original`, reply from `router`, and check the
    /// reply against the quoting rules.
    fn assert_ttl_exceeded(original: IpHeader, message: IcmpMessage, router: IpAddr) {
        let encoder = Encoder::new();
        let family = Family::of(&original.destination);
        let (min_mtu, header_len) = match family {
            Family::V4 => (IPV4_MIN_MTU, IPV4_MIN_HEADER_LEN),
            Family::V6 => (IPV6_MIN_MTU, IPV6_HEADER_LEN),
        };

        let raw = encoder.encode(&Datagram::new(original.clone(), message)).unwrap();
        let reply = build_ttl_exceeded(&original, &raw, router);

        assert_eq!(reply.header.source, router);
        assert_eq!(reply.header.destination, original.source);
        assert_eq!(reply.header.protocol, original.protocol);
        assert_eq!(reply.header.ttl, DEFAULT_TTL);
        assert_eq!(reply.message.icmp_type, icmp::time_exceeded_type(family));
        assert_eq!(reply.message.code, icmp::CODE_TTL_EXCEEDED_IN_TRANSIT);

        let truncated = raw.len() > min_mtu;
        if truncated {
            assert_eq!(quoted(&reply), &raw.data[..min_mtu - header_len - ICMP_HEADER_LEN]);
        } else {
            assert_eq!(quoted(&reply), raw.data.as_slice());
        }

        let reply_raw = encoder.encode(&reply).unwrap();
        if truncated {
            assert_eq!(reply_raw.len(), min_mtu);
        } else {
            assert_eq!(reply_raw.len(), header_len + ICMP_HEADER_LEN + raw.len());
            assert_eq!(&reply_raw.data[header_len + ICMP_HEADER_LEN..], raw.data.as_slice());
        }
        assert_eq!(encoder.decode(&reply_raw).unwrap(), reply);
    }

    #[test]
    fn test_ipv4_small_payload() {
        let message = IcmpMessage::echo_request(Family::V4, 25821, 58129, b"test ttl=0".to_vec());
        assert_ttl_exceeded(ipv4_original(), message, "172.16.0.3".parse().unwrap());
    }

    #[test]
    fn test_ipv4_oversized_payload() {
        let message = IcmpMessage::echo_request(Family::V4, 3487, 19183, vec![0; IPV4_MIN_MTU]);
        assert_ttl_exceeded(ipv4_original(), message, "172.16.0.3".parse().unwrap());
    }

    #[test]
    fn test_ipv6_small_payload() {
        let message = IcmpMessage::echo_request(Family::V6, 25821, 58129, b"test ttl=0".to_vec());
        assert_ttl_exceeded(ipv6_original(), message, "fd51:2391:697:f4ee::3".parse().unwrap());
    }

    #[test]
    fn test_ipv6_oversized_payload() {
        let message = IcmpMessage::echo_request(Family::V6, 1497, 39284, vec![0; IPV6_MIN_MTU]);
        assert_ttl_exceeded(ipv6_original(), message, "fd51:2391:697:f4ee::3".parse().unwrap());
    }

    #[test]
    fn test_truncation_threshold() {
        let router: IpAddr = "172.16.0.3".parse().unwrap();
        let original = ipv4_original();

        // Exactly at the minimum MTU: quoted whole, reply overshoots the MTU.
        let at_mtu = RawPacket {
            protocol: original.protocol,
            data: vec![0x45; IPV4_MIN_MTU],
        };
        let reply = build_ttl_exceeded(&original, &at_mtu, router);
        assert_eq!(quoted(&reply).len(), IPV4_MIN_MTU);
        let reply_raw = Encoder::new().encode(&reply).unwrap();
        assert_eq!(reply_raw.len(), IPV4_MIN_MTU + IPV4_MIN_HEADER_LEN + ICMP_HEADER_LEN);

        let over = RawPacket {
            protocol: original.protocol,
            data: vec![0x45; IPV4_MIN_MTU + 1],
        };
        let reply = build_ttl_exceeded(&original, &over, router);
        assert_eq!(quoted(&reply).len(), 548);
    }

    #[test]
    fn test_configured_limits() {
        let config = Config {
            default_ttl: 255,
            ipv4_min_mtu: 68,
            ..Config::default()
        };
        let original = ipv4_original();
        let raw = Encoder::new()
            .encode(&Datagram::new(
                original.clone(),
                IcmpMessage::echo_request(Family::V4, 1, 1, vec![0x61; 64]),
            ))
            .unwrap();

        let reply =
            build_ttl_exceeded_with(&config, &original, &raw, "172.16.0.3".parse().unwrap()).unwrap();
        assert_eq!(reply.header.ttl, 255);
        assert_eq!(quoted(&reply).len(), 68 - IPV4_MIN_HEADER_LEN - ICMP_HEADER_LEN);
        assert_eq!(Encoder::with_config(config).encode(&reply).unwrap().len(), 68);
    }

    #[test]
    fn test_configured_limits_rejected() {
        let original = ipv6_original();
        let raw = RawPacket {
            protocol: original.protocol,
            data: vec![0; 100],
        };
        let router: IpAddr = "fd51:2391:697:f4ee::3".parse().unwrap();

        let config = Config {
            ipv6_min_mtu: 40,
            ..Config::default()
        };
        assert!(matches!(
            build_ttl_exceeded_with(&config, &original, &raw, router),
            Err(ConfigError::MtuTooSmall { .. })
        ));

        let config = Config {
            default_ttl: 0,
            ..Config::default()
        };
        assert_eq!(
            build_ttl_exceeded_with(&config, &original, &raw, router),
            Err(ConfigError::ZeroTtl)
        );
    }
}
