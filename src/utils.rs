use std::fmt::Write;
use std::process;

use crate::packet::{Datagram, Family, IcmpBody, icmp};

/// Generate a random identifier for ICMP echo packets
pub fn generate_identifier() -> u16 {
    use rand::Rng;
    rand::thread_rng().gen_range(1..=65535)
}

/// Print error message and exit with error code
pub fn exit_with_error(message: &str, code: i32) -> ! {
    eprintln!("ruttl: {}", message);
    process::exit(code);
}

/// Validate command line parameters
pub fn validate_params(size: Option<u32>, ttl: Option<u32>, reply_ttl: Option<u32>) -> anyhow::Result<()> {
    if let Some(size) = size {
        if size > 65500 {
            return Err(anyhow::anyhow!("Payload size too large, maximum is 65500 bytes"));
        }
    }

    if let Some(ttl) = ttl {
        if ttl > 255 {
            return Err(anyhow::anyhow!("TTL must be in range 0-255"));
        }
    }

    if let Some(ttl) = reply_ttl {
        if ttl == 0 || ttl > 255 {
            return Err(anyhow::anyhow!("Reply TTL must be in range 1-255"));
        }
    }

    Ok(())
}

/// Offset-prefixed hex dump, 16 bytes per line.
pub fn format_hex(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3 + data.len() / 16 * 8);
    for (line, chunk) in data.chunks(16).enumerate() {
        let _ = write!(out, "{:04x} ", line * 16);
        for byte in chunk {
            let _ = write!(out, " {:02x}", byte);
        }
        out.push('\n');
    }
    out
}

/// Parse hex text; whitespace, `:` and a leading `0x` are ignored.
pub fn parse_hex(text: &str) -> anyhow::Result<Vec<u8>> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':')
        .collect();

    if digits.len() % 2 != 0 {
        return Err(anyhow::anyhow!("Hex input has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn hex_value(digit: u8) -> anyhow::Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => Err(anyhow::anyhow!("Invalid hex digit '{}'", digit as char)),
    }
}

/// One line summary of a datagram.
pub fn describe(datagram: &Datagram) -> String {
    let header = &datagram.header;
    let message = &datagram.message;
    let family = Family::of(&header.destination);
    let mut out = format!(
        "{} {} -> {} TTL={} {} (type {}, code {})",
        family,
        header.source,
        header.destination,
        header.ttl,
        icmp::type_name(family, message.icmp_type),
        message.icmp_type,
        message.code
    );
    let _ = match &message.body {
        IcmpBody::Echo {
            identifier,
            sequence,
            data,
        } => write!(out, " id={} seq={} bytes={}", identifier, sequence, data.len()),
        IcmpBody::TimeExceeded { data } => write!(out, " quoted={}", data.len()),
        IcmpBody::Opaque { data, .. } => write!(out, " bytes={}", data.len()),
    };
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{IcmpMessage, IpHeader};

    #[test]
    fn test_identifier_generation() {
        let id = generate_identifier();
        assert!(id >= 1);
    }

    #[test]
    fn test_parameter_validation() {
        assert!(validate_params(Some(32), Some(0), Some(64)).is_ok());
        assert!(validate_params(Some(70000), None, None).is_err());
        assert!(validate_params(None, Some(256), None).is_err());
        assert!(validate_params(None, None, Some(0)).is_err());
        assert!(validate_params(None, None, Some(256)).is_err());
    }

    #[test]
    fn test_hex_formatting() {
        let data: Vec<u8> = (0u8..18).collect();
        let dump = format_hex(&data);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0000  00 01 02"));
        assert_eq!(lines[1], "0010  10 11");
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(parse_hex("0x45 00:1C ff").unwrap(), vec![0x45, 0x00, 0x1c, 0xff]);
        assert!(parse_hex("450").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_describe() {
        let datagram = Datagram::new(
            IpHeader::new("10.0.0.1".parse().unwrap(), "10.0.0.2".parse().unwrap(), 64),
            IcmpMessage::echo_request(Family::V4, 7, 1, vec![0x61; 32]),
        );
        assert_eq!(
            describe(&datagram),
            "IPv4 10.0.0.1 -> 10.0.0.2 TTL=64 Echo Request (type 8, code 0) id=7 seq=1 bytes=32"
        );
    }
}
