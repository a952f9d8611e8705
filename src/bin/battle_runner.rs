//! Headless Battle Runner
//!
//! Runs a scripted battle without the network loop: both lines advance on
//! each other and fight until one side is gone or time runs out. Prints a
//! JSON (or text) summary.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frontline::battle::{
    BattleOutcome, BattleState, CommandIssuer, MatchPhase, MovementCommandMode,
};
use frontline::core::error::{FrontlineError, Result};
use frontline::core::{SimulationConfig, Team, Vec2};
use frontline::server::{line_deployment, load_terrain};

/// Headless Battle Runner - scripted line-vs-line battles
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Run a scripted battle and print the outcome")]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// ASCII terrain map matching the configured grid
    #[arg(long)]
    map: Option<PathBuf>,

    /// Line units per side
    #[arg(long, default_value_t = 6)]
    units: u32,

    /// Simulated seconds before the battle is decided on counts
    #[arg(long, default_value_t = 300.0)]
    max_seconds: f32,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

/// JSON output structure
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BattleResult {
    outcome: BattleOutcome,
    ticks: u64,
    seconds: f32,
    a_casualties: u32,
    b_casualties: u32,
    influence_revision: u64,
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frontline=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let seed = args.seed.unwrap_or_else(rand::random);

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    config.max_battle_seconds = Some(args.max_seconds);
    config.validate()?;
    let dt = config.tick_seconds();

    let mut state = BattleState::new(config);
    if let Some(path) = &args.map {
        state.replace_terrain(Box::new(load_terrain(path)?))?;
    }

    let deployment = line_deployment(&state.grid, args.units, seed);
    state.reset_battle(&deployment);
    state.start_battle()?;

    // Every unit marches straight at the far side of the map
    let width = state.grid.map_width();
    let orders: Vec<_> = state
        .units
        .iter()
        .map(|u| {
            let x = match u.team {
                Team::A => width * 0.9,
                Team::B => width * 0.1,
            };
            (u.id, u.team, Vec2::new(x, u.position.y))
        })
        .collect();
    for (unit_id, team, target) in orders {
        state.issue_path(
            &CommandIssuer::player(team),
            unit_id,
            &[target],
            MovementCommandMode::default(),
        )?;
    }

    while state.phase == MatchPhase::Battle {
        state.run_tick(dt);
    }

    // The time limit guarantees the loop above ends with an outcome
    let Some(outcome) = state.outcome else {
        return Err(FrontlineError::InvalidConfig(
            "battle ended without an outcome".into(),
        ));
    };
    info!(tick = state.tick, winner = ?outcome.winner, "battle finished");

    let result = BattleResult {
        outcome,
        ticks: state.tick,
        seconds: state.elapsed_seconds(),
        a_casualties: state.units.dead_count(Team::A),
        b_casualties: state.units.dead_count(Team::B),
        influence_revision: state.field().revision(),
        seed,
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let winner = match outcome.winner {
            Some(team) => format!("team {:?}", team),
            None => "nobody (draw)".to_string(),
        };
        println!("=== BATTLE RESULT ===");
        println!("Winner: {} ({:?})", winner, outcome.reason);
        println!("Duration: {} ticks ({:.1}s)", result.ticks, result.seconds);
        println!(
            "Survivors: A {} / B {}",
            outcome.a_units, outcome.b_units
        );
        println!(
            "Casualties: A {} / B {}",
            result.a_casualties, result.b_casualties
        );
        println!("Seed: {}", seed);
    }

    Ok(())
}
