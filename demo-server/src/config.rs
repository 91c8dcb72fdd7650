use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Parser;

/// Command line and environment settings for the demo server.
#[derive(Debug, Clone, Parser)]
#[command(name = "demo-server", version, about = "Division and user echo service")]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Dump every received request and sent reply to stderr.
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Largest request body, in bytes, a handler will read.
    #[arg(long, env = "BODY_LIMIT", default_value_t = courier_core::receive::DEFAULT_BODY_LIMIT)]
    pub body_limit: usize,
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
