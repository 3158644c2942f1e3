use byteorder::{BigEndian, ByteOrder};
use std::net::IpAddr;

/// Sum of big endian 16 bit words, odd trailing byte padded with zero.
/// Carries are not folded.
pub fn sum_words(data: &[u8]) -> u32 {
    let mut sum: u32 = 0;
    let mut chunks = data.chunks_exact(2);
    for word in &mut chunks {
        sum += BigEndian::read_u16(word) as u32;
    }
    if let [last] = chunks.remainder() {
        sum += (*last as u32) << 8;
    }
    sum
}

/// Fold carries and take the ones' complement.
pub fn finish(mut sum: u32) -> u16 {
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !sum as u16
}

/// RFC 1071 Internet checksum.
pub fn internet_checksum(data: &[u8]) -> u16 {
    finish(sum_words(data))
}

/// ICMPv6 pseudo-header sum: source, destination, upper-layer length and
/// next header (RFC 4443 section 2.3).
pub fn pseudo_header_sum(source: &IpAddr, destination: &IpAddr, length: u32, next_header: u8) -> u32 {
    let mut sum = 0u32;
    for addr in [source, destination] {
        sum += match addr {
            IpAddr::V4(a) => sum_words(&a.octets()),
            IpAddr::V6(a) => sum_words(&a.octets()),
        };
    }
    sum += length >> 16;
    sum += length & 0xFFFF;
    sum += next_header as u32;
    sum
}

/// Checksum of an ICMPv6 message, `message` having its checksum field zeroed.
pub fn icmpv6_checksum(source: &IpAddr, destination: &IpAddr, message: &[u8]) -> u16 {
    let pseudo = pseudo_header_sum(source, destination, message.len() as u32, 58);
    finish(pseudo + sum_words(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_calculation() {
        // RFC 1071 section 3 example
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(sum_words(&data), 0x2_ddf0);
        assert_eq!(internet_checksum(&data), !0xddf2u16);
    }

    #[test]
    fn test_odd_length() {
        assert_eq!(sum_words(&[0xab]), 0xab00);
        assert_eq!(internet_checksum(&[0xab]), !0xab00u16);
    }

    #[test]
    fn test_checksum_verifies_to_zero() {
        let mut data = vec![8, 0, 0, 0, 0x12, 0x34, 0x00, 0x01, 0x61, 0x61, 0x61];
        let cksum = internet_checksum(&data);
        data[2..4].copy_from_slice(&cksum.to_be_bytes());
        assert_eq!(internet_checksum(&data), 0);
    }

    #[test]
    fn test_icmpv6_checksum_verifies_to_zero() {
        let src: IpAddr = "fd51:2391:523:f4ee::1".parse().unwrap();
        let dst: IpAddr = "fd51:2391:697:f4ee::2".parse().unwrap();
        let mut message = vec![128, 0, 0, 0, 0x64, 0xdd, 0xe3, 0x11, b't', b'e', b's', b't'];
        let cksum = icmpv6_checksum(&src, &dst, &message);
        message[2..4].copy_from_slice(&cksum.to_be_bytes());
        assert_eq!(icmpv6_checksum(&src, &dst, &message), 0);
    }
}
