//! Frontline - headless match server
//!
//! Runs one match on a fixed tick. Reads JSON lines from stdin and writes
//! server messages to stdout as JSON lines; logs go to stderr.
//!
//! Stdin lines are either client commands wrapped with their session:
//!   {"session": 1, "message": {"type": "issue-path", "unitId": 0, "path": [{"x": 400, "y": 300}]}}
//! or console controls issued by the host console session:
//!   {"control": "join", "session": 1, "name": "bob", "team": "B"}
//!   {"control": "start"}

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use frontline::battle::{BattleState, GridSpec};
use frontline::core::error::Result;
use frontline::core::{SimulationConfig, Team};
use frontline::server::{line_deployment, MatchMessage, MatchRuntime, SessionId};

/// Session used for console controls; it joins first and hosts the match
const CONSOLE: SessionId = SessionId(0);

#[derive(Parser, Debug)]
#[command(name = "frontline")]
#[command(about = "Authoritative two-team battle server over stdin/stdout")]
struct Args {
    /// TOML config file; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// ASCII terrain map matching the configured grid
    #[arg(long)]
    map: Option<PathBuf>,

    /// Line units per side in the opening deployment
    #[arg(long, default_value_t = 8)]
    units: u32,

    /// Seed for deployment jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Start the battle without waiting for a start control
    #[arg(long)]
    autostart: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConsoleLine {
    Client {
        session: SessionId,
        message: serde_json::Value,
    },
    Control(Control),
}

#[derive(Deserialize)]
#[serde(tag = "control", rename_all = "kebab-case")]
enum Control {
    Join {
        session: SessionId,
        name: String,
        #[serde(default)]
        team: Option<Team>,
    },
    Leave {
        session: SessionId,
    },
    Start,
    Conclude,
    Redeploy {
        #[serde(default)]
        seed: Option<u64>,
    },
    LoadMap {
        path: PathBuf,
    },
}

impl ConsoleLine {
    fn into_message(self, grid: &GridSpec, units: u32, seed: u64) -> MatchMessage {
        match self {
            ConsoleLine::Client { session, message } => MatchMessage::RawCommand {
                session,
                text: message.to_string(),
            },
            ConsoleLine::Control(control) => match control {
                Control::Join { session, name, team } => MatchMessage::Join { session, name, team },
                Control::Leave { session } => MatchMessage::Leave { session },
                Control::Start => MatchMessage::Start { session: CONSOLE },
                Control::Conclude => MatchMessage::Conclude { session: CONSOLE },
                Control::Redeploy { seed: new_seed } => MatchMessage::Deploy {
                    session: CONSOLE,
                    units: line_deployment(grid, units, new_seed.unwrap_or(seed)),
                },
                Control::LoadMap { path } => MatchMessage::LoadMap {
                    session: CONSOLE,
                    path,
                },
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for logging; stdout carries match output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frontline=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);
    let grid = GridSpec::from_config(&config);

    let (handle, task) = MatchRuntime::spawn(BattleState::new(config), 256);
    info!(match_id = %handle.id, seed, "frontline starting");

    // Forward every server message to stdout
    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(message) => match serde_json::to_string(&message) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(error = %e, "could not encode message"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "stdout fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    handle
        .send(MatchMessage::Join {
            session: CONSOLE,
            name: "console".into(),
            team: Some(Team::A),
        })
        .await?;
    if let Some(path) = args.map.clone() {
        handle
            .send(MatchMessage::LoadMap {
                session: CONSOLE,
                path,
            })
            .await?;
    }
    handle
        .send(MatchMessage::Deploy {
            session: CONSOLE,
            units: line_deployment(&grid, args.units, seed),
        })
        .await?;
    if args.autostart {
        handle.send(MatchMessage::Start { session: CONSOLE }).await?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ConsoleLine>(line) {
            Ok(console) => {
                handle
                    .send(console.into_message(&grid, args.units, seed))
                    .await?
            }
            Err(e) => warn!(error = %e, "unreadable console line"),
        }
    }

    handle.send(MatchMessage::Shutdown).await?;
    match task.await {
        Ok(state) => info!(tick = state.tick, outcome = ?state.outcome, "frontline stopped"),
        Err(e) => error!(error = %e, "match task failed"),
    }
    printer.abort();

    Ok(())
}
