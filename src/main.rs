// foxhunt - CLI entry point
// Runs a leader or tracker station over a LoRa HAT on a serial port

use clap::Parser;
use foxhunt::bandits::ContactEngine;
use foxhunt::link::{BaseStation, LoraHatDevice, NodeKind, StationConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum Role {
    Leader,
    Tracker,
}

impl From<Role> for NodeKind {
    fn from(role: Role) -> Self {
        match role {
            Role::Leader => NodeKind::Leader,
            Role::Tracker => NodeKind::Tracker,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "foxhunt", version, about = "Wireless IDS tracker link node")]
struct Args {
    /// Serial port the LoRa HAT is attached to
    #[arg(long, default_value = "/dev/ttyAMA0")]
    serial_port: String,

    /// Node identity announced on the link
    #[arg(long)]
    node_id: String,

    /// Role of this node
    #[arg(long, value_enum, default_value_t = Role::Tracker)]
    role: Role,

    /// Pre-shared tracker link key
    #[arg(long)]
    link_key: String,

    /// Log filter (tracing env-filter syntax)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter =
        EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let engine = ContactEngine::new();
    engine.seed_built_in();
    info!("Loaded [{}] bandit definitions.", engine.bandits().len());

    let device = Arc::new(LoraHatDevice::on_port(&args.serial_port, &args.link_key)?);
    let config = StationConfig::new(&args.node_id, args.role.into());
    let station = BaseStation::new(config, device)?;

    station.on_heartbeat(|heartbeat, rssi| {
        info!(
            "Peer [{}] ({}, v{}) alive at RSSI [{}].",
            heartbeat.source, heartbeat.node_kind, heartbeat.version, rssi
        );
    });

    station.on_contact_report(|report, rssi| {
        info!(
            "Node [{}] reports contact with bandit [{}]: {} dBm over {} frames (link RSSI [{}]).",
            report.source, report.bandit_id, report.signal_dbm, report.frame_count, rssi
        );
    });

    station.on_command(|command, _rssi| {
        info!(
            "Received command [{}] with [{}] arguments.",
            command.name,
            command.arguments.len()
        );
    });

    station.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down.");
    station.stop();

    Ok(())
}
