use dns_lookup::lookup_host;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::packet::Family;

/// Which address family a lookup may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// IPv4 first, IPv6 if that is all there is.
    Any,
    Only(Family),
}

impl Preference {
    pub fn from_flags(force_ipv4: bool, force_ipv6: bool) -> anyhow::Result<Self> {
        match (force_ipv4, force_ipv6) {
            (true, true) => Err(anyhow::anyhow!("Cannot force both IPv4 and IPv6")),
            (true, false) => Ok(Preference::Only(Family::V4)),
            (false, true) => Ok(Preference::Only(Family::V6)),
            (false, false) => Ok(Preference::Any),
        }
    }

    fn accepts(self, addr: &IpAddr) -> bool {
        match self {
            Preference::Any => true,
            Preference::Only(family) => Family::of(addr) == family,
        }
    }
}

/// Choose the address to use out of a lookup result.
pub fn pick_address(addresses: &[IpAddr], preference: Preference) -> Option<IpAddr> {
    let mut accepted = addresses.iter().filter(|addr| preference.accepts(addr));
    match preference {
        Preference::Any => addresses
            .iter()
            .find(|addr| addr.is_ipv4())
            .or_else(|| accepted.next())
            .copied(),
        Preference::Only(_) => accepted.next().copied(),
    }
}

/// Resolve a literal address or hostname honouring `preference`.
pub async fn resolve(host: &str, preference: Preference) -> anyhow::Result<IpAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        if !preference.accepts(&ip) {
            return Err(anyhow::anyhow!(
                "{} address {} does not match the requested family",
                Family::of(&ip),
                ip
            ));
        }
        return Ok(ip);
    }

    let addresses = tokio::task::spawn_blocking({
        let host = host.to_string();
        move || lookup_host(&host)
    })
    .await??;
    log::debug!("Resolved {} to {:?}", host, addresses);

    if addresses.is_empty() {
        return Err(anyhow::anyhow!("No addresses found for hostname: {}", host));
    }

    pick_address(&addresses, preference).ok_or_else(|| match preference {
        Preference::Only(family) => {
            anyhow::anyhow!("No {} addresses found for hostname: {}", family, host)
        }
        Preference::Any => anyhow::anyhow!("No suitable address found"),
    })
}

/// Resolve an optional peer address that must share `family`; absent peers
/// become the unspecified address.
pub async fn resolve_peer(host: Option<&str>, family: Family) -> anyhow::Result<IpAddr> {
    match host {
        Some(host) => resolve(host, Preference::Only(family)).await,
        None => Ok(unspecified(family)),
    }
}

pub fn unspecified(family: Family) -> IpAddr {
    match family {
        Family::V4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        Family::V6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
    }
}
