use crate::packet::{DEFAULT_TTL, Family, ICMP_HEADER_LEN, IPV4_MIN_MTU, IPV6_MIN_MTU};
use std::fmt;

/// Tunables shared by the encoder and the TTL Exceeded constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TTL / hop limit of synthesized datagrams.
    pub default_ttl: u8,
    pub ipv4_min_mtu: usize,
    pub ipv6_min_mtu: usize,
    /// Reject unknown ICMP types on decode instead of keeping them opaque.
    pub strict_types: bool,
    pub verify_checksum: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            ipv4_min_mtu: IPV4_MIN_MTU,
            ipv6_min_mtu: IPV6_MIN_MTU,
            strict_types: false,
            verify_checksum: true,
        }
    }
}

impl Config {
    pub fn min_mtu(&self, family: Family) -> usize {
        match family {
            Family::V4 => self.ipv4_min_mtu,
            Family::V6 => self.ipv6_min_mtu,
        }
    }

    /// Largest quotation that keeps a TTL Exceeded reply within the minimum MTU.
    pub fn max_quote_len(&self, family: Family) -> Result<usize, ConfigError> {
        let mtu = self.min_mtu(family);
        let floor = family.header_len() + ICMP_HEADER_LEN;
        mtu.checked_sub(floor)
            .ok_or(ConfigError::MtuTooSmall { family, mtu, floor })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ttl == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        for family in [Family::V4, Family::V6] {
            self.max_quote_len(family)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroTtl,
    MtuTooSmall {
        family: Family,
        mtu: usize,
        floor: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTtl => write!(f, "default TTL must be at least 1"),
            ConfigError::MtuTooSmall { family, mtu, floor } => write!(
                f,
                "{} minimum MTU {} is below the {} byte header floor",
                family, mtu, floor
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
