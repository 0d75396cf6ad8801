//! Read-only operator CLI for the Living Codex registry.
//!
//! This binary never mutates the durable tier - every subcommand opens the
//! registry, hydrates it, reports, and exits.

use clap::{Parser, Subcommand};
use codex_core::{Config, IceStorageType, NodeRegistry, Phase, META_TYPE_TYPE_ID};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "codex-admin",
    version,
    about = "Read-only inspection CLI for the Living Codex registry"
)]
struct Cli {
    /// Path or connection string for the durable (Ice) backend.
    #[arg(long, global = true, default_value = "codex_ice.db3")]
    ice_connection_string: String,

    /// Durable backend flavor.
    #[arg(long, global = true, value_enum, default_value_t = IceStorageTypeArg::Sqlite)]
    ice_storage_type: IceStorageTypeArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum IceStorageTypeArg {
    Sqlite,
    Postgresql,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print aggregate node/edge counts by phase and writer queue depth.
    Stats,
    /// Check tier alignment and type invariance over the current durable
    /// snapshot; reports violations without mutating anything.
    Verify,
    /// Run the hydrator against the given durable backend and report timing.
    HydrateCheck,
    /// Print the aggregate health rollup (writer queue, backend
    /// availability, writer failures).
    Health,
}

fn build_config(cli: &Cli) -> Config {
    Config {
        ice_storage_type: match cli.ice_storage_type {
            IceStorageTypeArg::Sqlite => IceStorageType::Sqlite,
            IceStorageTypeArg::Postgresql => IceStorageType::Postgresql,
        },
        ice_connection_string: cli.ice_connection_string.clone(),
        ..Config::default()
    }
}

async fn run() -> codex_core::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);

    match cli.command {
        Command::Stats => cmd_stats(config).await,
        Command::Verify => cmd_verify(config).await,
        Command::HydrateCheck => cmd_hydrate_check(config).await,
        Command::Health => cmd_health(config).await,
    }
}

async fn cmd_health(config: Config) -> codex_core::Result<()> {
    let (registry, _watcher) = NodeRegistry::initialize(config).await?;
    let health = registry.health_check().await;
    println!("── Living Codex registry health ──");
    println!("  overall: {:?}", health.status);
    for check in &health.checks {
        println!("  - {check:?}");
    }
    if !health.is_healthy() {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_stats(config: Config) -> codex_core::Result<()> {
    let (registry, _watcher) = NodeRegistry::initialize(config).await?;
    let stats = registry.stats();

    println!("── Living Codex registry stats ──");
    println!("  nodes total ..... {}", stats.node_count);
    println!("  edges total ..... {}", stats.edge_count);
    for phase in [Phase::Ice, Phase::Water, Phase::Gas] {
        println!(
            "  nodes[{:<5}] ... {}",
            phase.as_str(),
            stats.nodes_by_phase.get(&phase).copied().unwrap_or(0)
        );
    }
    for phase in [Phase::Ice, Phase::Water, Phase::Gas] {
        println!(
            "  edges[{:<5}] ... {}",
            phase.as_str(),
            stats.edges_by_phase.get(&phase).copied().unwrap_or(0)
        );
    }
    println!("  writer queue depth ... {}", stats.writer_queue_depth);
    println!("  last write completed ... {}", format_timestamp(stats.last_write_completed));
    Ok(())
}

/// Renders a `stats().lastUpdated` timestamp as RFC 3339, the wire format
/// this crate's HTTP-facing consumers expect from a JSON timestamp field.
fn format_timestamp(t: Option<std::time::SystemTime>) -> String {
    match t {
        Some(t) => time::OffsetDateTime::from(t)
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "(unformattable timestamp)".to_string()),
        None => "(none yet)".to_string(),
    }
}

/// Checks that every `typeId` has a `codex.meta/type` meta-node and that
/// every edge's `derivedState` matches its endpoints' current phases, over
/// the in-memory snapshot after hydration. Prints each violation found;
/// exits non-zero if any exist.
async fn cmd_verify(config: Config) -> codex_core::Result<()> {
    let (registry, _watcher) = NodeRegistry::initialize(config).await?;
    let mut violations = Vec::new();

    for node in registry.all_nodes() {
        if node.type_id == META_TYPE_TYPE_ID {
            continue;
        }
        if registry.try_get_node(&node.type_id).is_none() {
            violations.push(format!(
                "node '{}' has typeId '{}' with no codex.meta/type meta-node",
                node.id, node.type_id
            ));
        }
    }

    for edge in registry.all_edges() {
        let from = registry.try_get_node(&edge.from_id);
        let to = registry.try_get_node(&edge.to_id);
        let expected = codex_core::derive_edge_phase(from.map(|n| n.state), to.map(|n| n.state));
        if edge.derived_state != expected {
            violations.push(format!(
                "edge '{}--{}-->{}' derivedState {:?} does not match recomputed {:?}",
                edge.from_id, edge.role, edge.to_id, edge.derived_state, expected
            ));
        }
    }

    if violations.is_empty() {
        println!("✓ no violations found ({} nodes, {} edges checked)", registry.all_nodes().len(), registry.all_edges().len());
    } else {
        println!("✗ found {} violation(s):", violations.len());
        for v in &violations {
            println!("  - {v}");
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_hydrate_check(config: Config) -> codex_core::Result<()> {
    let started = std::time::Instant::now();
    let (registry, _watcher) = NodeRegistry::initialize(config).await?;
    let elapsed = started.elapsed();
    let stats = registry.stats();
    println!("hydration completed in {elapsed:?}");
    println!("  nodes loaded ... {}", stats.node_count);
    println!("  edges loaded ... {}", stats.edge_count);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
