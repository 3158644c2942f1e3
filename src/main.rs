use anyhow::Context;
use ruttl::dns::{self, Preference};
use ruttl::packet::{Datagram, Encoder, Family, IcmpMessage, IpHeader, build_ttl_exceeded_with};
use ruttl::{cli, utils};

#[tokio::main]
async fn main() {
    // Enable debug logging if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        env_logger::init();
    }

    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            utils::exit_with_error(&format!("Invalid arguments: {}", e), 1);
        }
    };

    if let Err(e) = utils::validate_params(args.size, args.ttl, args.reply_ttl) {
        utils::exit_with_error(&e.to_string(), 1);
    }

    if let Err(e) = run(args).await {
        utils::exit_with_error(&format!("{:#}", e), 1);
    }
}

async fn run(args: cli::TtlArgs) -> anyhow::Result<()> {
    let config = args.config();
    config.validate()?;
    let encoder = Encoder::with_config(config.clone());

    if let Some(hex) = &args.decode {
        let bytes = utils::parse_hex(hex)?;
        let datagram = encoder
            .decode_bytes(&bytes)
            .context("Cannot decode datagram")?;
        println!("{}", utils::describe(&datagram));
        return Ok(());
    }

    let target = args
        .destination
        .as_deref()
        .context("Destination is required")?;
    let preference = Preference::from_flags(args.force_ipv4, args.force_ipv6)?;
    let destination = dns::resolve(target, preference)
        .await
        .with_context(|| format!("Cannot resolve destination '{}'", target))?;
    let family = Family::of(&destination);
    let source = dns::resolve_peer(args.source.as_deref(), family)
        .await
        .context("Cannot resolve source")?;
    let router = dns::resolve_peer(args.router.as_deref(), family)
        .await
        .context("Cannot resolve router")?;

    let identifier = args.identifier.unwrap_or_else(utils::generate_identifier);
    let payload = vec![0x61; args.size.unwrap_or(32) as usize];
    let original = Datagram::new(
        IpHeader::new(source, destination, args.ttl.unwrap_or(0) as u8),
        IcmpMessage::echo_request(family, identifier, args.sequence, payload),
    );

    let raw = encoder.encode(&original).context("Cannot encode original datagram")?;
    println!("Original: {}", utils::describe(&original));
    println!("{} bytes", raw.len());
    print!("{}", utils::format_hex(&raw.data));

    let reply = build_ttl_exceeded_with(&config, &original.header, &raw, router)?;
    let reply_raw = encoder.encode(&reply).context("Cannot encode TTL Exceeded datagram")?;
    if reply_raw.len() > config.min_mtu(family) {
        log::warn!(
            "TTL Exceeded reply is {} bytes, above the {} minimum MTU of {}",
            reply_raw.len(),
            family,
            config.min_mtu(family)
        );
    }
    println!();
    println!("TTL Exceeded: {}", utils::describe(&reply));
    println!("{} bytes", reply_raw.len());
    print!("{}", utils::format_hex(&reply_raw.data));

    Ok(())
}
