#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that settles a hamlet scenario turn by turn.

mod save_file;

use std::{fs, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use hamlet_simulation::{EndTurnOutcome, Simulation, SimulationConfig};
use hamlet_system_employment::employment_rate;
use hamlet_world::query;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::save_file::SaveFile;

const DEFAULT_LOG_FILTER: &str = "hamlet=info";

/// Runs a turn-based hamlet scenario and prints a summary of every turn.
#[derive(Debug, Parser)]
#[command(name = "hamlet", version)]
struct Cli {
    /// TOML scenario; the built-in catalogue on an empty map when omitted.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Number of turns to settle.
    #[arg(long, default_value_t = 5)]
    turns: u32,
    /// Overrides the scenario seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Writes the final state to this JSON file.
    #[arg(long)]
    export: Option<PathBuf>,
    /// Resumes from a JSON save instead of the scenario placements.
    #[arg(long)]
    import: Option<PathBuf>,
}

/// Entry point for the hamlet command-line interface.
fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(&Cli::parse())
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.scenario {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let mut simulation = match &cli.import {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read save {}", path.display()))?;
            let saved = SaveFile::decode(&content)
                .with_context(|| format!("failed to decode save {}", path.display()))?;
            let (simulation, _) = Simulation::restore(&config, &saved.into_snapshot())?;
            simulation
        }
        None => Simulation::new(&config)?,
    };
    info!(turn = simulation.turn(), seed = config.seed, "simulation ready");

    for _ in 0..cli.turns {
        match simulation.request_end_turn() {
            EndTurnOutcome::Advanced { finished, .. } => {
                println!("{}", summary(finished, &simulation));
            }
            EndTurnOutcome::Refused { turn, blockers } => {
                bail!("turn {turn} is held open by {} blocker(s)", blockers.len())
            }
        }
        let events = simulation.drain_events();
        debug!(events = events.len(), "turn settled");
    }

    if let Some(path) = &cli.export {
        let encoded = SaveFile::new(simulation.export()).encode()?;
        fs::write(path, encoded)
            .with_context(|| format!("failed to write save {}", path.display()))?;
        info!(path = %path.display(), "state exported");
    }
    Ok(())
}

fn summary(turn: u32, simulation: &Simulation) -> String {
    let world = simulation.world();
    let treasury = query::treasury(world);
    let buildings = query::buildings(world);
    let population: u32 = buildings
        .iter()
        .filter_map(|building| query::housing(world, building.id))
        .map(|housing| housing.population)
        .sum();
    format!(
        "turn {turn} stage={:?} gold={} happiness={} buildings={} population={population} employment={:.0}%",
        simulation.stage(),
        treasury.gold,
        treasury.happiness,
        buildings.len(),
        employment_rate(world) * 100.0,
    )
}
