use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use network_agents::config::NetworkConfig;
use network_agents::hub::HttpHub;
use network_agents::orchestrator::Orchestrator;
use orchestration::registry::{AgentId, AgentRegistry};
use orchestration::routing::RoutingTable;

#[derive(Parser)]
#[command(name = "network-agents", version, about = "Agent network orchestrator")]
struct Cli {
    /// Path to a TOML config file; env defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dispatch raw event payloads (JSONL) through the network.
    Run {
        /// File of payloads, one JSON object per line; stdin when omitted.
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Integration name recorded as the event source.
        #[arg(short, long, default_value = "webhook")]
        source: String,

        /// Directory for .network-telemetry.jsonl; telemetry off when omitted.
        #[arg(long)]
        telemetry_dir: Option<PathBuf>,
    },
    /// Show the routing decision for one or more event types.
    Route { event_types: Vec<String> },
    /// List the agent personas and the domains they own.
    Agents,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => NetworkConfig::from_file(path)?,
        None => NetworkConfig::default(),
    };

    match cli.command {
        Command::Run {
            input,
            source,
            telemetry_dir,
        } => run(config, input, &source, telemetry_dir).await,
        Command::Route { event_types } => {
            print_routes(&event_types);
            Ok(())
        }
        Command::Agents => {
            print_agents();
            Ok(())
        }
    }
}

async fn run(
    config: NetworkConfig,
    input: Option<PathBuf>,
    source: &str,
    telemetry_dir: Option<PathBuf>,
) -> Result<()> {
    let hub = Arc::new(HttpHub::new(
        &config.hub.url,
        config.hub.token.clone(),
        Duration::from_secs(config.hub.timeout_secs),
    )?);
    info!(hub = %config.hub.url, source, "Network orchestrator starting");

    let mut orchestrator = Orchestrator::new(config, hub);
    if let Some(dir) = telemetry_dir {
        orchestrator = orchestrator.with_telemetry_root(dir);
    }

    let reader: Box<dyn BufRead> = match &input {
        Some(path) => Box::new(std::io::BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open input {}", path.display()))?,
        )),
        None => Box::new(std::io::BufReader::new(std::io::stdin())),
    };

    let mut dispatched = 0usize;
    let mut duplicates = 0usize;
    let mut failures = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let raw: serde_json::Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                warn!("Skipping unparseable line: {err}");
                failures += 1;
                continue;
            }
        };
        match orchestrator.dispatch(source, &raw).await {
            Ok(outcome) if outcome.is_duplicate() => duplicates += 1,
            Ok(_) => dispatched += 1,
            Err(err) => {
                warn!("Dispatch failed: {err}");
                failures += 1;
            }
        }
    }

    info!(dispatched, duplicates, failures, "Run complete");
    Ok(())
}

fn print_routes(event_types: &[String]) {
    let table = RoutingTable::default_table();
    for event_type in event_types {
        let decision = table.classify(event_type);
        let secondaries: Vec<String> = decision
            .secondaries
            .iter()
            .map(|a| a.to_string())
            .collect();
        println!(
            "{event_type}: primary={} secondaries=[{}] ({})",
            decision.primary,
            secondaries.join(", "),
            decision.rationale,
        );
    }
}

fn print_agents() {
    let registry = AgentRegistry::new();
    for &agent in AgentId::all() {
        if let Some(entry) = registry.get(agent) {
            println!(
                "{:<8} {:<14} {:<12} {}",
                agent.to_string(),
                entry.persona,
                entry.domain,
                entry.capabilities.specialty,
            );
        }
    }
}
