//! # Tactics Core
//!
//! Deterministic simulation core for a 12×12 grid tactics game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (samples come from an injected [`rng::MoveRoll`])
//! - No floating-point math (uses fixed-point)
//!
//! The headless runner drives it on a timer; tests drive it tick by tick.
//!
//! ## Crate Structure
//!
//! - [`grid`] - Coordinates, terrain and algebraic notation
//! - [`units`] - Units and the id-keyed, name-indexed registry
//! - [`pathfinding`] - A* next-step planner
//! - [`combat`] - Adjacency engagement and terrain attrition
//! - [`orders`] - Translating external order batches
//! - [`simulation`] - Double-buffered tick engine
//! - [`briefing`] - Situation report for the decision-maker
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod briefing;
pub mod combat;
pub mod error;
pub mod grid;
pub mod math;
pub mod orders;
pub mod pathfinding;
pub mod rng;
pub mod rules;
pub mod simulation;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::briefing::{Briefing, EnemyInfo, FriendInfo};
    pub use crate::error::{GameError, Result};
    pub use crate::grid::{Coord, TerrainGrid, TerrainKind, BOARD_SIZE};
    pub use crate::math::Fixed;
    pub use crate::orders::{Order, OrderBatch, OrderOutcome, OrderRejection};
    pub use crate::rng::{MoveRoll, ScriptedRoll, SeededRoll};
    pub use crate::rules::Rules;
    pub use crate::simulation::{
        DefeatReason, Landing, NarrativeEvent, Outcome, Simulation, TickReport,
    };
    pub use crate::units::{Faction, Unit, UnitId, UnitRegistry, UnitSpawn, MAX_HEALTH};
}
