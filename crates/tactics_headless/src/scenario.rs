//! Scenario loading and configuration.
//!
//! A scenario is a RON file holding the board, the starting units, optional
//! rule overrides and the session settings (tick rate, seed, delivery
//! retries, enemy waves). Tiles are written in algebraic notation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tactics_core::error::GameError;
use tactics_core::grid::{Coord, TerrainGrid, BOARD_SIZE};
use tactics_core::rules::Rules;
use tactics_core::simulation::Simulation;
use tactics_core::units::{Faction, UnitSpawn, MAX_HEALTH};
use thiserror::Error;

use crate::transport::RetryPolicy;

/// Built-in scenario source.
const DEFEND_THE_BASE: &str = include_str!("../scenarios/defend_the_base.ron");

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Board is not 12×12.
    #[error("Board must be 12x12, got {width}x{height}")]
    BoardSize {
        /// Columns found.
        width: u32,
        /// Rows found.
        height: u32,
    },
    /// Waves must have a positive period.
    #[error("Wave period must be at least one tick")]
    WavePeriod,
    /// The board or a unit was rejected by the simulation.
    #[error("Invalid scenario: {0}")]
    Game(#[from] GameError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Terrain symbol rows, row 0 first.
    pub terrain: Vec<String>,
    /// Starting units.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Rule overrides.
    #[serde(default)]
    pub rules: Rules,
    /// Runner settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// A starting unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Two-letter name.
    pub name: String,
    /// Side.
    pub faction: Faction,
    /// Starting tile, e.g. `"B1"`.
    pub tile: String,
    /// Target tile; defaults to the starting tile.
    #[serde(default)]
    pub target: Option<String>,
    /// Movement profile.
    #[serde(default = "default_true")]
    pub move_safely: bool,
    /// Starting health.
    #[serde(default = "default_health")]
    pub health: u32,
    /// Starting ammunition.
    #[serde(default = "default_ammo")]
    pub ammo: u32,
}

/// Session timing, seeding and delivery settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Milliseconds between ticks.
    pub tick_interval_ms: u64,
    /// Seed for the movement gate.
    pub seed: u64,
    /// Delivery attempts before a message is dropped.
    pub retry_attempts: u32,
    /// Milliseconds between delivery attempts.
    pub retry_interval_ms: u64,
    /// Periodic enemy landings.
    pub waves: Option<WaveConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            seed: 0,
            retry_attempts: 120,
            retry_interval_ms: 1000,
            waves: None,
        }
    }
}

impl SessionConfig {
    /// Time between ticks.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Delivery retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_interval_ms),
        )
    }
}

/// Periodic enemy landings, as written in the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveConfig {
    /// Ticks between landings.
    pub every_ticks: u64,
    /// Landing tile.
    pub spawn: String,
    /// Tile the landed enemies head for.
    pub target: String,
    /// Health of landed enemies.
    #[serde(default = "default_health")]
    pub health: u32,
    /// Movement profile of landed enemies.
    #[serde(default = "default_true")]
    pub move_safely: bool,
}

/// Resolved wave settings used by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waves {
    /// Ticks between landings. A zero period never lands.
    pub every_ticks: u64,
    /// Landing cell.
    pub spawn: Coord,
    /// Cell the landed enemies head for.
    pub target: Coord,
    /// Health of landed enemies.
    pub health: u32,
    /// Movement profile of landed enemies.
    pub move_safely: bool,
}

impl WaveConfig {
    /// Parse tiles and check the period.
    pub fn resolve(&self) -> Result<Waves, ScenarioError> {
        if self.every_ticks == 0 {
            return Err(ScenarioError::WavePeriod);
        }
        Ok(Waves {
            every_ticks: self.every_ticks,
            spawn: Coord::parse_algebraic(&self.spawn)?,
            target: Coord::parse_algebraic(&self.target)?,
            health: self.health,
            move_safely: self.move_safely,
        })
    }
}

fn default_true() -> bool {
    true
}

fn default_health() -> u32 {
    MAX_HEALTH
}

fn default_ammo() -> u32 {
    100
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// The defend-the-base scenario shipped with the runner.
    pub fn builtin() -> Result<Self, ScenarioError> {
        Self::from_ron_str(DEFEND_THE_BASE)
    }

    /// Build the board, enforcing the 12×12 size.
    pub fn grid(&self) -> Result<TerrainGrid, ScenarioError> {
        let grid = TerrainGrid::from_ascii(&self.terrain)?;
        if grid.width() != BOARD_SIZE || grid.height() != BOARD_SIZE {
            return Err(ScenarioError::BoardSize {
                width: grid.width(),
                height: grid.height(),
            });
        }
        Ok(grid)
    }

    /// Resolved wave settings, if any.
    pub fn waves(&self) -> Result<Option<Waves>, ScenarioError> {
        self.session.waves.as_ref().map(WaveConfig::resolve).transpose()
    }

    /// Create the simulation with every starting unit placed.
    pub fn build_simulation(&self) -> Result<Simulation, ScenarioError> {
        self.rules.validate()?;
        let mut sim = Simulation::new(self.grid()?, self.rules.clone());

        for placement in &self.units {
            let position = Coord::parse_algebraic(&placement.tile)?;
            let mut spawn = UnitSpawn::new(placement.faction, placement.name.clone(), position)
                .with_move_safely(placement.move_safely)
                .with_health(placement.health);
            spawn.ammo = placement.ammo;
            if let Some(target) = &placement.target {
                spawn = spawn.with_target(Coord::parse_algebraic(target)?);
            }
            sim.spawn_unit(spawn)?;
        }

        tracing::info!(
            scenario = %self.name,
            units = sim.units().len(),
            "Scenario loaded"
        );
        Ok(sim)
    }

    /// Check everything `build_simulation` and the session would reject.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.build_simulation()?;
        self.waves()?;
        Ok(())
    }
}
