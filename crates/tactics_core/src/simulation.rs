//! Core simulation loop.
//!
//! One call to [`Simulation::tick`] advances every unit once. The tick is
//! double-buffered: combat is evaluated against the pre-tick registry
//! (`current`), while moves, damage and deaths are written into a copy
//! (`next`) that replaces `current` when the tick finishes. Pathfinding and
//! the occupancy veto read `next`, so a unit processed earlier claims its
//! destination before later units plan.
//!
//! # Per-unit steps
//!
//! 1. Read the terrain under the unit
//! 2. Check engagement against `current`
//! 3. Engaged units lose health and move less often
//! 4. Hill and forest halve the chance to move
//! 5. Hill, forest and base cut the damage taken
//! 6. Units whose loss reaches their health are removed
//! 7. Survivors take the damage
//! 8. Units not at their target roll to move and take one step
//!
//! Units are processed in ascending id order; on a contested cell the lower
//! id wins.
//!
//! # Example
//!
//! ```
//! use tactics_core::grid::{Coord, TerrainGrid, TerrainKind};
//! use tactics_core::rng::SeededRoll;
//! use tactics_core::rules::Rules;
//! use tactics_core::simulation::Simulation;
//! use tactics_core::units::{Faction, UnitSpawn};
//!
//! let grid = TerrainGrid::filled(12, 12, TerrainKind::Ground);
//! let mut sim = Simulation::new(grid, Rules::default());
//! sim.spawn_unit(
//!     UnitSpawn::new(Faction::Friendly, "AB", Coord::new(0, 0)).with_target(Coord::new(3, 0)),
//! )
//! .unwrap();
//!
//! let mut roll = SeededRoll::new(1);
//! let report = sim.tick(&mut roll);
//! assert_eq!(report.tick, 1);
//! assert_eq!(sim.units().by_name("AB").unwrap().position, Coord::new(1, 0));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::combat;
use crate::error::{GameError, Result};
use crate::grid::{Coord, TerrainGrid};
use crate::math::Fixed;
use crate::orders::{apply_orders, OrderBatch, OrderOutcome};
use crate::pathfinding;
use crate::rng::MoveRoll;
use crate::rules::Rules;
use crate::units::{is_valid_name, Faction, Unit, UnitId, UnitRegistry, UnitSpawn, MAX_HEALTH};

/// Human-readable state change produced during a tick.
///
/// Only friendly units generate narrative events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeEvent {
    /// A friendly unit became engaged this tick.
    Engaged {
        /// Display name.
        name: String,
    },
    /// A friendly unit died.
    Died {
        /// Display name.
        name: String,
    },
    /// A friendly unit took more damage than it has health left.
    CriticallyInjured {
        /// Display name.
        name: String,
    },
    /// A friendly unit stepped onto its target.
    ReachedTarget {
        /// Display name.
        name: String,
    },
    /// A friendly unit was destroyed by an enemy spawning on its cell.
    Overrun {
        /// Display name.
        name: String,
    },
}

impl NarrativeEvent {
    /// Name of the unit the event is about.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        match self {
            Self::Engaged { name }
            | Self::Died { name }
            | Self::CriticallyInjured { name }
            | Self::ReachedTarget { name }
            | Self::Overrun { name } => name,
        }
    }
}

impl fmt::Display for NarrativeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Engaged { name } => write!(f, "{name} has engaged the enemy!"),
            Self::Died { name } => write!(f, "{name} just died!"),
            Self::CriticallyInjured { name } => {
                write!(f, "{name} is critically injured and may die next turn.")
            }
            Self::ReachedTarget { name } => write!(f, "{name} has reached its target!"),
            Self::Overrun { name } => write!(f, "{name} was overrun by an enemy landing!"),
        }
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick number after this step.
    pub tick: u64,
    /// Events in the order they happened.
    pub events: Vec<NarrativeEvent>,
}

impl TickReport {
    /// A silent tick produced no events and needs no synchronization.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        self.events.is_empty()
    }

    /// Events rendered as text.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }
}

/// Why the game was lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefeatReason {
    /// No friendly unit is left on the board.
    NoFriendliesLeft,
    /// An enemy unit stands on a base tile.
    BaseOverrun {
        /// Name of the enemy on the base.
        by: String,
        /// The base tile.
        at: Coord,
    },
}

impl fmt::Display for DefeatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFriendliesLeft => f.write_str("all friendly units lost"),
            Self::BaseOverrun { by, at } => {
                write!(f, "base at {} overrun by {by}", at.to_algebraic())
            }
        }
    }
}

/// Current game outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Still playing.
    InProgress,
    /// Lost.
    Defeat(DefeatReason),
}

/// Result of landing a unit with [`Simulation::land_unit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landing {
    /// Id of the new unit.
    pub id: UnitId,
    /// Event for a friendly unit destroyed by the landing.
    pub overrun: Option<NarrativeEvent>,
}

/// The core game simulation.
///
/// Owns the terrain, the rules and the unit registry. Randomness is not
/// owned: every tick takes a [`MoveRoll`] from the caller.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Completed ticks.
    tick: u64,
    /// Terrain, fixed for the lifetime of the simulation.
    grid: TerrainGrid,
    /// Tunable constants.
    rules: Rules,
    /// Registry visible between ticks.
    units: UnitRegistry,
}

impl Simulation {
    /// Create a simulation with no units.
    #[must_use]
    pub fn new(grid: TerrainGrid, rules: Rules) -> Self {
        Self {
            tick: 0,
            grid,
            rules,
            units: UnitRegistry::new(),
        }
    }

    /// Number of completed ticks.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// The terrain grid.
    #[must_use]
    pub const fn grid(&self) -> &TerrainGrid {
        &self.grid
    }

    /// The active rules.
    #[must_use]
    pub const fn rules(&self) -> &Rules {
        &self.rules
    }

    /// The unit registry as of the last completed tick.
    #[must_use]
    pub const fn units(&self) -> &UnitRegistry {
        &self.units
    }

    /// Add a unit to the board.
    ///
    /// # Errors
    ///
    /// Fails if the name is not two uppercase letters or already taken, if
    /// the position is outside the grid, on water, or occupied, or if the
    /// target is outside the grid.
    pub fn spawn_unit(&mut self, spawn: UnitSpawn) -> Result<UnitId> {
        self.validate_spawn(&spawn)?;
        if self.units.is_occupied(spawn.position) {
            return Err(GameError::Occupied(spawn.position));
        }
        self.insert_spawn(spawn)
    }

    /// Add a unit, destroying an opposing unit on the landing cell.
    ///
    /// # Errors
    ///
    /// Same as [`spawn_unit`](Self::spawn_unit), except that a cell held by
    /// the opposing faction is cleared instead of rejected. A cell held by
    /// the same faction is still rejected.
    pub fn land_unit(&mut self, spawn: UnitSpawn) -> Result<Landing> {
        self.validate_spawn(&spawn)?;

        let mut overrun = None;
        if let Some(occupant) = self.units.occupant(spawn.position) {
            if occupant.faction == spawn.faction {
                return Err(GameError::Occupied(spawn.position));
            }
            let occupant_id = occupant.id;
            if let Some(victim) = self.units.remove(occupant_id) {
                tracing::info!(unit = %victim.name, at = %spawn.position, "Unit overrun by landing");
                if victim.is_friendly() {
                    overrun = Some(NarrativeEvent::Overrun { name: victim.name });
                }
            }
        }

        let id = self.insert_spawn(spawn)?;
        Ok(Landing { id, overrun })
    }

    fn validate_spawn(&self, spawn: &UnitSpawn) -> Result<()> {
        if !is_valid_name(&spawn.name) {
            return Err(GameError::InvalidName(spawn.name.clone()));
        }
        if self.units.name_in_use(&spawn.name) {
            return Err(GameError::DuplicateName(spawn.name.clone()));
        }
        if !self.grid.in_bounds(spawn.position) {
            return Err(GameError::OutOfBounds(spawn.position));
        }
        if !self.grid.is_passable(spawn.position) {
            return Err(GameError::Impassable(spawn.position));
        }
        if let Some(target) = spawn.target {
            if !self.grid.in_bounds(target) {
                return Err(GameError::OutOfBounds(target));
            }
        }
        Ok(())
    }

    fn insert_spawn(&mut self, spawn: UnitSpawn) -> Result<UnitId> {
        let id = self.units.allocate_id();
        let unit = Unit {
            id,
            faction: spawn.faction,
            name: spawn.name,
            position: spawn.position,
            target: spawn.target.unwrap_or(spawn.position),
            move_safely: spawn.move_safely,
            health: Fixed::from_num(spawn.health.clamp(1, MAX_HEALTH)),
            is_fighting: false,
            ammo: spawn.ammo,
        };
        tracing::debug!(id, name = %unit.name, faction = %unit.faction, at = %unit.position, "Unit spawned");
        self.units.insert(unit)?;
        Ok(id)
    }

    /// Remove a unit from the board.
    ///
    /// # Errors
    ///
    /// Returns `GameError::InvalidUnitId` if no such unit exists.
    pub fn despawn_unit(&mut self, id: UnitId) -> Result<Unit> {
        self.units.remove(id).ok_or(GameError::InvalidUnitId(id))
    }

    /// Apply an order batch to the registry visible to the next tick.
    pub fn apply_orders(&mut self, batch: &OrderBatch) -> OrderOutcome {
        apply_orders(&mut self.units, batch)
    }

    /// Advance the simulation by one tick.
    ///
    /// Never fails: units that cannot move stay where they are.
    pub fn tick<R: MoveRoll + ?Sized>(&mut self, roll: &mut R) -> TickReport {
        let current = &self.units;
        let mut next = current.clone();
        let mut events = Vec::new();

        for unit in current.iter() {
            self.step_unit(unit, current, &mut next, roll, &mut events);
        }

        self.units = next;
        self.tick += 1;

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        TickReport {
            tick: self.tick,
            events,
        }
    }

    /// Process one unit: combat, health, movement gate, path query, commit.
    fn step_unit<R: MoveRoll + ?Sized>(
        &self,
        unit: &Unit,
        current: &UnitRegistry,
        next: &mut UnitRegistry,
        roll: &mut R,
        events: &mut Vec<NarrativeEvent>,
    ) {
        let friendly = unit.is_friendly();
        let terrain = self.grid.terrain(unit.position).unwrap_or_default();
        let engaged = combat::is_engaged(current, unit);

        if friendly && engaged && !unit.is_fighting {
            events.push(NarrativeEvent::Engaged {
                name: unit.name.clone(),
            });
        }

        let attrition = combat::assess(&self.rules, terrain, engaged);

        if attrition.health_loss >= unit.health || unit.health <= Fixed::ZERO {
            next.remove(unit.id);
            tracing::debug!(unit = %unit.name, at = %unit.position, "Unit died");
            if friendly {
                events.push(NarrativeEvent::Died {
                    name: unit.name.clone(),
                });
            }
            return;
        }

        let mut updated = unit.clone();
        if engaged {
            updated.is_fighting = true;
        }
        updated.health -= attrition.health_loss;

        if friendly && attrition.health_loss > updated.health {
            events.push(NarrativeEvent::CriticallyInjured {
                name: unit.name.clone(),
            });
        }

        if !updated.at_target() {
            let sample = roll.roll();
            if sample < attrition.move_chance {
                let step = pathfinding::next_step(&self.grid, &self.rules, next, &updated);
                if !next.is_occupied(step) {
                    updated.position = step;
                    if friendly && step == updated.target {
                        events.push(NarrativeEvent::ReachedTarget {
                            name: unit.name.clone(),
                        });
                    }
                } else {
                    tracing::trace!(unit = %unit.name, blocked = %step, "Move vetoed");
                }
            }
        }

        if let Some(slot) = next.get_mut(unit.id) {
            *slot = updated;
        }
    }

    /// Whether the game is still on.
    ///
    /// The game is lost when no friendly unit remains or an enemy stands on a
    /// base tile.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        if self.units.of_faction(Faction::Friendly).next().is_none() {
            return Outcome::Defeat(DefeatReason::NoFriendliesLeft);
        }
        for base in self.grid.base_tiles() {
            if let Some(enemy) = self
                .units
                .occupant(base)
                .filter(|u| u.faction == Faction::Enemy)
            {
                return Outcome::Defeat(DefeatReason::BaseOverrun {
                    by: enemy.name.clone(),
                    at: base,
                });
            }
        }
        Outcome::InProgress
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.units.len().hash(&mut hasher);

        for unit in self.units.iter() {
            unit.id.hash(&mut hasher);
            unit.faction.hash(&mut hasher);
            unit.name.hash(&mut hasher);
            unit.position.hash(&mut hasher);
            unit.target.hash(&mut hasher);
            unit.move_safely.hash(&mut hasher);
            unit.health.to_bits().hash(&mut hasher);
            unit.is_fighting.hash(&mut hasher);
            unit.ammo.hash(&mut hasher);
        }

        hasher.finish()
    }
}
