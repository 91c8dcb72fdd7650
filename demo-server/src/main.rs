use clap::Parser;
use courier_core::{DumpSink, Receiver, Replier};
use demo_server::{AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::parse();
    let state = AppState::new(
        Receiver::new(config.debug, DumpSink::stderr()).with_body_limit(config.body_limit),
        Replier::new(config.debug, DumpSink::stderr()),
    );

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, debug = config.debug, "listening");
    demo_server::run(listener, state).await?;
    Ok(())
}
