//! Synthesis and serialization of ICMP/IP datagrams, including the
//! TTL Exceeded reply a router emits when a datagram runs out of hops.

pub mod cli;
pub mod config;
pub mod dns;
pub mod packet;
pub mod utils;

pub use config::{Config, ConfigError};
pub use packet::{
    Datagram, DecodeError, EncodeError, Encoder, Family, IcmpBody, IcmpMessage, IpHeader,
    IpProtocol, RawPacket, build_ttl_exceeded, build_ttl_exceeded_with,
};
