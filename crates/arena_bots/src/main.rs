//! # arena_bots — load-test driver
//!
//! Spawns a number of scripted bot sessions that handshake, register as
//! `Bot_<n>` Wizards, and stream random-direction input at the fixed tick
//! rate until the run duration elapses or Ctrl-C is pressed.
//!
//! The endpoint and database come from `ARENA_URL` / `ARENA_DATABASE`, or the
//! compiled-in defaults.

mod driver;
mod policy;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use arena_client::ClientConfig;
use arena_net::{LoopbackService, NatsConnection, NatsTransport};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use driver::{BotDriver, DriverConfig};

#[derive(Parser)]
#[command(name = "arena_bots", about = "Load-test the arena service with scripted bots")]
struct Args {
    /// Number of concurrent bot sessions
    #[arg(default_value_t = 10)]
    count: usize,

    /// Run duration in seconds
    #[arg(default_value_t = 10)]
    duration_secs: u64,

    /// Run against an in-process service instead of NATS
    #[arg(long)]
    loopback: bool,

    /// Seed for the bot policies (random if omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("arena_bots=info".parse()?))
        .init();

    let args = Args::parse();
    let client = ClientConfig::from_env();
    let config = DriverConfig {
        count: args.count,
        duration: Duration::from_secs(args.duration_secs),
        seed: args.seed.unwrap_or_else(rand::random),
        client: client.clone(),
    };
    info!(
        count = config.count,
        duration_secs = args.duration_secs,
        seed = config.seed,
        "arena bots starting"
    );

    let report = if args.loopback {
        let service = Arc::new(LoopbackService::new(client.database.clone()));
        BotDriver::new(config, service).run(ctrl_c()).await
    } else {
        info!(url = %client.url, database = %client.database, "targeting arena service");
        let conn = NatsConnection::connect_to(&client.url).await?;
        let transport = Arc::new(NatsTransport::new(conn, client.database.clone()));
        BotDriver::new(config, transport).run(ctrl_c()).await
    };

    println!(
        "{}/{} bots completed successfully",
        report.successes(),
        report.outcomes.len()
    );
    Ok(())
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}
