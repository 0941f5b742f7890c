//! MQTT to HTTP bridge - main entry point
//!
//! Loads configuration, wires the forwarder into the session manager, and
//! pumps messages until a termination signal arrives. The session loop
//! itself never returns; only a signal or a fatal configuration error ends
//! the process.

use clap::Parser;
use mqtt_http_bridge::config::BridgeConfig;
use mqtt_http_bridge::error::BridgeResult;
use mqtt_http_bridge::forwarder::Forwarder;
use mqtt_http_bridge::logging::init_default_logging;
use mqtt_http_bridge::session::SessionManager;
use std::process;
use tokio::signal;
use tracing::{error, info, warn};

/// MQTT to HTTP bridge
#[derive(Parser)]
#[command(name = "mqtt-http-bridge")]
#[command(about = "Subscribes to an MQTT topic pattern and forwards JSON payloads to an HTTP endpoint")]
#[command(version)]
struct Cli {
    /// Broker connection string, scheme://host[:port]
    #[arg(long, env = "MQTT_BROKER", default_value = "tcp://mosquitto:1883")]
    broker: String,

    /// Topic pattern to subscribe to, passed to the broker verbatim
    #[arg(
        long,
        env = "MQTT_SUB_TOPIC",
        default_value = "application/+/device/+/event/up"
    )]
    topic: String,

    /// Where decoded events get POSTed; omit to log without forwarding
    #[arg(long, env = "FORWARD_URL")]
    forward_url: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    if let Err(e) = run_bridge(cli).await {
        error!(target: "bridge", "{e}");
        process::exit(1);
    }

    info!(target: "bridge", "Bridge shutdown complete");
}

async fn run_bridge(cli: Cli) -> BridgeResult<()> {
    let config = BridgeConfig::from_parts(&cli.broker, &cli.topic, cli.forward_url.as_deref())?;

    match &config.target {
        Some(url) => info!(target: "bridge", "Forwarding decoded events to {url}"),
        None => warn!(
            target: "bridge",
            "No forward URL configured; events will be logged but not forwarded"
        ),
    }

    let forwarder = Forwarder::new(config.target.clone());
    let mut session = SessionManager::new(&config, forwarder);

    let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = session.run() => {
            // run() loops forever; reaching this arm means the future was
            // somehow completed, which the select treats as shutdown.
        }
        _ = sigint.recv() => {
            info!(target: "bridge", "Received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            info!(target: "bridge", "Received SIGTERM, shutting down");
        }
    }

    Ok(())
}
