use clap::{Arg, ArgAction, ArgMatches, Command};

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct TtlArgs {
    pub destination: Option<String>,
    pub source: Option<String>,
    pub router: Option<String>,
    pub size: Option<u32>,
    pub identifier: Option<u16>,
    pub sequence: u16,
    pub ttl: Option<u32>,
    pub reply_ttl: Option<u32>,
    pub ipv4_min_mtu: Option<u32>,
    pub ipv6_min_mtu: Option<u32>,
    pub strict: bool,
    pub no_verify: bool,
    pub decode: Option<String>,
    pub force_ipv4: bool,
    pub force_ipv6: bool,
}

impl Default for TtlArgs {
    fn default() -> Self {
        Self {
            destination: None,
            source: None,
            router: None,
            size: Some(32),
            identifier: None,
            sequence: 1,
            ttl: Some(0),
            reply_ttl: None,
            ipv4_min_mtu: None,
            ipv6_min_mtu: None,
            strict: false,
            no_verify: false,
            decode: None,
            force_ipv4: false,
            force_ipv6: false,
        }
    }
}

impl TtlArgs {
    /// Codec configuration with any command line overrides applied.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(ttl) = self.reply_ttl {
            config.default_ttl = ttl as u8;
        }
        if let Some(mtu) = self.ipv4_min_mtu {
            config.ipv4_min_mtu = mtu as usize;
        }
        if let Some(mtu) = self.ipv6_min_mtu {
            config.ipv6_min_mtu = mtu as usize;
        }
        config.strict_types = self.strict;
        config.verify_checksum = !self.no_verify;
        config
    }
}

pub fn build_cli() -> Command {
    Command::new("ruttl")
        .version("0.1.0")
        .about("Builds ICMP echo datagrams and the TTL Exceeded reply a router would send")
        .arg(
            Arg::new("destination")
                .help("Destination hostname or IP address of the original datagram")
                .required_unless_present("decode")
                .index(1)
        )
        .arg(
            Arg::new("source")
                .short('S')
                .help("Source address of the original datagram")
                .value_name("srcaddr")
        )
        .arg(
            Arg::new("router")
                .short('R')
                .long("router")
                .help("Address of the router reporting the expired TTL")
                .value_name("router")
        )
        .arg(
            Arg::new("size")
                .short('l')
                .help("Echo payload size")
                .value_name("size")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("identifier")
                .long("id")
                .help("Echo identifier (random when omitted)")
                .value_name("id")
                .value_parser(clap::value_parser!(u16))
        )
        .arg(
            Arg::new("sequence")
                .long("seq")
                .help("Echo sequence number")
                .value_name("seq")
                .value_parser(clap::value_parser!(u16))
        )
        .arg(
            Arg::new("ttl")
                .short('i')
                .help("TTL of the original datagram")
                .value_name("TTL")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("reply_ttl")
                .long("reply-ttl")
                .help("TTL of the synthesized Time Exceeded datagram")
                .value_name("TTL")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("ipv4_min_mtu")
                .long("ipv4-min-mtu")
                .help("Minimum IPv4 MTU used to bound the quotation")
                .value_name("bytes")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("ipv6_min_mtu")
                .long("ipv6-min-mtu")
                .help("Minimum IPv6 MTU used to bound the quotation")
                .value_name("bytes")
                .value_parser(clap::value_parser!(u32))
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Reject unknown ICMP types when decoding")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("no_verify")
                .long("no-verify")
                .help("Skip checksum verification when decoding")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("decode")
                .short('d')
                .long("decode")
                .help("Decode a captured datagram given as hex instead of building one")
                .value_name("hex")
        )
        .arg(
            Arg::new("force_ipv4")
                .short('4')
                .help("Force using IPv4")
                .action(ArgAction::SetTrue)
        )
        .arg(
            Arg::new("force_ipv6")
                .short('6')
                .help("Force using IPv6")
                .action(ArgAction::SetTrue)
        )
}

pub fn parse_args() -> anyhow::Result<TtlArgs> {
    args_from_matches(&build_cli().get_matches())
}

pub fn parse_args_from<I, T>(argv: I) -> anyhow::Result<TtlArgs>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(argv)?;
    args_from_matches(&matches)
}

fn args_from_matches(matches: &ArgMatches) -> anyhow::Result<TtlArgs> {
    let mut args = TtlArgs::default();

    args.destination = matches.get_one::<String>("destination").cloned();
    args.source = matches.get_one::<String>("source").cloned();
    args.router = matches.get_one::<String>("router").cloned();
    args.decode = matches.get_one::<String>("decode").cloned();
    args.identifier = matches.get_one::<u16>("identifier").copied();
    args.reply_ttl = matches.get_one::<u32>("reply_ttl").copied();
    args.ipv4_min_mtu = matches.get_one::<u32>("ipv4_min_mtu").copied();
    args.ipv6_min_mtu = matches.get_one::<u32>("ipv6_min_mtu").copied();
    args.strict = matches.get_flag("strict");
    args.no_verify = matches.get_flag("no_verify");
    args.force_ipv4 = matches.get_flag("force_ipv4");
    args.force_ipv6 = matches.get_flag("force_ipv6");

    if let Some(size) = matches.get_one::<u32>("size") {
        args.size = Some(*size);
    }

    if let Some(ttl) = matches.get_one::<u32>("ttl") {
        args.ttl = Some(*ttl);
    }

    if let Some(sequence) = matches.get_one::<u16>("sequence") {
        args.sequence = *sequence;
    }

    if args.force_ipv4 && args.force_ipv6 {
        return Err(anyhow::anyhow!("Cannot force both IPv4 and IPv6"));
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = parse_args_from(["ruttl", "10.0.0.1"]).unwrap();
        assert_eq!(args.destination.as_deref(), Some("10.0.0.1"));
        assert_eq!(args.size, Some(32));
        assert_eq!(args.ttl, Some(0));
        assert_eq!(args.config(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let args = parse_args_from([
            "ruttl", "-6", "fd00::2", "-S", "fd00::1", "-R", "fd00::3", "-l", "1400", "--id",
            "7", "--reply-ttl", "128", "--ipv6-min-mtu", "1500", "--strict",
        ])
        .unwrap();
        assert!(args.force_ipv6);
        assert_eq!(args.router.as_deref(), Some("fd00::3"));
        assert_eq!(args.identifier, Some(7));

        let config = args.config();
        assert_eq!(config.default_ttl, 128);
        assert_eq!(config.ipv6_min_mtu, 1500);
        assert_eq!(config.ipv4_min_mtu, 576);
        assert!(config.strict_types);
        assert!(config.verify_checksum);
    }

    #[test]
    fn test_decode_mode_needs_no_destination() {
        let args = parse_args_from(["ruttl", "--decode", "4500", "--no-verify"]).unwrap();
        assert!(args.destination.is_none());
        assert_eq!(args.decode.as_deref(), Some("4500"));
        assert!(!args.config().verify_checksum);

        assert!(parse_args_from(["ruttl"]).is_err());
        assert!(parse_args_from(["ruttl", "-4", "-6", "10.0.0.1"]).is_err());
    }
}
