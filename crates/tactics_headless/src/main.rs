//! Headless grid tactics runner.
//!
//! Runs the game without graphics, controlled via JSON on stdin/stdout.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode with the built-in scenario
//! cargo run -p tactics_headless
//!
//! # Faster ticks, a snapshot after every tick
//! cargo run -p tactics_headless -- run --tick-ms 250 --auto-state
//!
//! # Run ticks back to back, ignoring the pause
//! cargo run -p tactics_headless -- simulate --ticks 500 --seed 3
//!
//! # Validate a scenario file
//! cargo run -p tactics_headless -- validate --scenario scenarios/defend_the_base.ron
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON order batches and commands, one per line
//! Output (stdout): JSON messages, one per line
//! Logs (stderr): Debug information

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tactics_core::rng::SeededRoll;
use tactics_headless::{
    runner::{run_session, spawn_stdin_reader, RunnerConfig},
    scenario::{Scenario, ScenarioError},
    session::Session,
    transport::LineTransport,
};

#[derive(Parser)]
#[command(name = "tactics_headless")]
#[command(about = "Headless grid tactics runner driven by JSON lines")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an interactive game over stdin/stdout
    Run {
        /// Scenario file to load (built-in map if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed for the movement gate (overrides the scenario)
        #[arg(long)]
        seed: Option<u64>,

        /// Milliseconds between ticks (overrides the scenario)
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Output state after every tick
        #[arg(long)]
        auto_state: bool,
    },

    /// Run ticks back to back without waiting for orders
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "100")]
        ticks: u64,

        /// Scenario file to load (built-in map if omitted)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Seed for the movement gate (overrides the scenario)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Check that a scenario file loads and builds
    Validate {
        /// Scenario file to check
        #[arg(short, long)]
        scenario: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            tick_ms,
            auto_state,
        }) => {
            cmd_run(scenario, seed, tick_ms, auto_state);
        }
        Some(Commands::Simulate {
            ticks,
            scenario,
            seed,
        }) => {
            cmd_simulate(ticks, scenario, seed);
        }
        Some(Commands::Validate { scenario }) => {
            cmd_validate(scenario);
        }
        None => {
            // Default: interactive mode
            cmd_run(None, None, None, false);
        }
    }
}

fn load_scenario(path: Option<PathBuf>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => Scenario::load(path),
        None => Scenario::builtin(),
    }
}

fn load_or_exit(path: Option<PathBuf>) -> Scenario {
    match load_scenario(path) {
        Ok(scenario) => scenario,
        Err(e) => {
            tracing::error!("Failed to load scenario: {}", e);
            std::process::exit(1);
        }
    }
}

/// Build a session from a scenario, with an optional seed override.
fn build_session(scenario: &Scenario, seed: Option<u64>) -> Result<Session<SeededRoll>, ScenarioError> {
    let sim = scenario.build_simulation()?;
    let seed = seed.unwrap_or(scenario.session.seed);
    tracing::info!(seed, "Seeding movement gate");
    Ok(Session::new(sim, SeededRoll::new(seed)).with_waves(scenario.waves()?))
}

/// Play an interactive game
fn cmd_run(scenario: Option<PathBuf>, seed: Option<u64>, tick_ms: Option<u64>, auto_state: bool) {
    tracing::info!("Starting interactive session");

    let scenario = load_or_exit(scenario);
    let session = match build_session(&scenario, seed) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Invalid scenario: {}", e);
            std::process::exit(1);
        }
    };

    let config = RunnerConfig {
        tick_interval: tick_ms.map_or_else(|| scenario.session.tick_interval(), Duration::from_millis),
        auto_state,
        retry: scenario.session.retry_policy(),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    let summary = runtime.block_on(async {
        let inbound = spawn_stdin_reader();
        let mut transport = LineTransport::stdout();
        run_session(session, &mut transport, inbound, &config).await
    });

    tracing::info!(
        ticks = summary.ticks,
        dropped = summary.dropped,
        hash = summary.state_hash,
        "Session ended"
    );
    if let Some(over) = summary.game_over {
        tracing::info!("Survived {} ticks: {}", over.survival_ticks, over.reason);
    }
}

/// Run ticks back to back and print the narrative
fn cmd_simulate(ticks: u64, scenario: Option<PathBuf>, seed: Option<u64>) {
    let scenario = load_or_exit(scenario);
    let mut session = match build_session(&scenario, seed) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!("Invalid scenario: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(scenario = %scenario.name, ticks, "Simulating");

    for _ in 0..ticks {
        let Some(report) = session.force_step() else {
            break;
        };
        for message in report.messages() {
            println!("[tick {:>4}] {}", report.tick, message);
        }
    }

    let sim = session.simulation();
    println!();
    println!("=== Simulation Complete ===");
    println!("Ticks: {}", sim.get_tick());
    println!("Units left: {}", sim.units().len());
    match session.game_over() {
        Some(over) => println!("Result: defeat after {} ticks ({})", over.survival_ticks, over.reason),
        None => println!("Result: still holding"),
    }
    println!("State hash: {:016x}", sim.state_hash());
}

/// Validate a scenario file
fn cmd_validate(path: PathBuf) {
    let scenario = load_or_exit(Some(path));
    match scenario.validate() {
        Ok(()) => {
            println!("Scenario '{}' is valid", scenario.name);
            println!("  {}", scenario.description);
            println!("  Units: {}", scenario.units.len());
            println!(
                "  Waves: {}",
                scenario
                    .session
                    .waves
                    .as_ref()
                    .map_or_else(|| "none".to_string(), |w| format!("every {} ticks at {}", w.every_ticks, w.spawn))
            );
        }
        Err(e) => {
            tracing::error!("Invalid scenario: {}", e);
            std::process::exit(1);
        }
    }
}
