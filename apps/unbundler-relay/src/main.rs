mod config;
mod relay;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::{error, info};
use unbundler_node::config::ServerConfig;
use unbundler_node::pattern::PatternError;
use unbundler_node::runtime::pump_once;
use unbundler_node::server::Server;
use unbundler_node::ticker::spawn_ticker;
use unbundler_transport::adapter::TransportAdapter;
use unbundler_transport::udp::{UdpAdapter, UdpAdapterConfig, UdpAdapterError};

use crate::config::RelayConfig;
use crate::relay::{relay_handler, RelayClient, RelayError};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default)
    Run,
    /// Print the resolved configuration and exit
    CheckConfig,
}

#[derive(Debug, Error)]
enum StartupError {
    #[error("signal handler registration failed: {0}")]
    Signal(#[source] io::Error),
    #[error(transparent)]
    Listen(#[from] UdpAdapterError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error("invalid relay pattern: {0}")]
    Pattern(#[from] PatternError),
    #[error("ticker thread failed to start: {0}")]
    Ticker(#[source] io::Error),
}

fn main() {
    let filter = std::env::var("UNBUNDLER_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let config = match RelayConfig::new(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => {
            error!("config load failed: {err}");
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::CheckConfig) => println!("{config:#?}"),
        Some(Commands::Run) | None => {
            if let Err(err) = run(config) {
                error!("{err}");
                std::process::exit(1);
            }
        }
    }
}

fn run(config: RelayConfig) -> Result<(), StartupError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    flag::register(SIGTERM, Arc::clone(&shutdown)).map_err(StartupError::Signal)?;
    flag::register(SIGINT, Arc::clone(&shutdown)).map_err(StartupError::Signal)?;

    let mut adapter = UdpAdapter::bind(&UdpAdapterConfig {
        bind: config.listen_addr.clone(),
        recv_timeout: config.recv_timeout,
        max_datagram_size: config.max_datagram_size,
    })?;
    let client = Arc::new(RelayClient::connect(&config.target_addr)?);

    let server = Arc::new(Server::new(ServerConfig::with_tick_interval(
        config.tick_interval,
    )));
    server.add_pattern_str(&config.relay_pattern, relay_handler(Arc::clone(&client)))?;

    info!(
        listen = %config.listen_addr,
        target = %client.target(),
        pattern = %config.relay_pattern,
        "relay started"
    );

    let ticker =
        spawn_ticker(Arc::clone(&server), config.tick_interval).map_err(StartupError::Ticker)?;

    while !shutdown.load(Ordering::Relaxed) {
        // Decode failures are counted and logged by the server.
        let _ = pump_once(&server, &mut adapter);
    }

    info!("shutdown requested");
    ticker.stop();

    let stats = server.stats();
    let health = adapter.health_snapshot();
    info!(
        datagrams = stats.datagrams,
        decode_errors = stats.decode_errors,
        dispatched = stats.messages_dispatched,
        handler_failures = stats.handler_failures,
        scheduled = stats.bundles_scheduled,
        released = stats.bundles_released,
        pending = server.queue().len(),
        recv_errors = health.inbound_errors,
        "relay stopped"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["unbundler-relay"]).expect("bare invocation");
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());

        let cli = Cli::try_parse_from(["unbundler-relay", "run"]).expect("run");
        assert!(matches!(cli.command, Some(Commands::Run)));

        let cli = Cli::try_parse_from(["unbundler-relay", "-c", "relay.toml", "check-config"])
            .expect("check-config");
        assert!(matches!(cli.command, Some(Commands::CheckConfig)));
        assert_eq!(cli.config, Some(PathBuf::from("relay.toml")));

        assert!(Cli::try_parse_from(["unbundler-relay", "bogus"]).is_err());
    }
}
