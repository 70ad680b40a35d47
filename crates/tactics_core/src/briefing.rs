//! Situation report for the external decision-maker.
//!
//! Everything is expressed the way a human commander reads the board:
//! algebraic tiles, terrain names and whole-number health.

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, TerrainGrid};
use crate::math::ceil_u32;
use crate::simulation::Simulation;
use crate::units::{Faction, Unit};

/// What the decision-maker knows about one of its own units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendInfo {
    /// Display name.
    pub name: String,
    /// Current tile, e.g. `"B1"`.
    pub current_tile: String,
    /// Target tile.
    pub target_tile: String,
    /// Terrain under the unit.
    pub current_terrain: String,
    /// Terrain on the target tile.
    pub target_terrain: String,
    /// Health rounded up.
    pub health: u32,
    /// `"Safe"` or `"Fast"`.
    pub movement_style: String,
}

/// What the decision-maker knows about an enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyInfo {
    /// Current tile.
    pub current_tile: String,
    /// Terrain under the enemy.
    pub current_terrain: String,
    /// Health rounded up.
    pub health: u32,
}

/// Full situation report, units in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    /// Friendly units.
    pub friends: Vec<FriendInfo>,
    /// Enemy units.
    pub enemies: Vec<EnemyInfo>,
}

impl Briefing {
    /// Build a report from the current simulation state.
    #[must_use]
    pub fn from_simulation(sim: &Simulation) -> Self {
        let grid = sim.grid();
        let units = sim.units();
        Self {
            friends: units
                .of_faction(Faction::Friendly)
                .map(|unit| friend_info(grid, unit))
                .collect(),
            enemies: units
                .of_faction(Faction::Enemy)
                .map(|unit| EnemyInfo {
                    current_tile: unit.position.to_algebraic(),
                    current_terrain: terrain_name(grid, unit.position),
                    health: ceil_u32(unit.health),
                })
                .collect(),
        }
    }
}

fn friend_info(grid: &TerrainGrid, unit: &Unit) -> FriendInfo {
    FriendInfo {
        name: unit.name.clone(),
        current_tile: unit.position.to_algebraic(),
        target_tile: unit.target.to_algebraic(),
        current_terrain: terrain_name(grid, unit.position),
        target_terrain: terrain_name(grid, unit.target),
        health: ceil_u32(unit.health),
        movement_style: if unit.move_safely { "Safe" } else { "Fast" }.to_string(),
    }
}

fn terrain_name(grid: &TerrainGrid, at: Coord) -> String {
    grid.terrain(at).unwrap_or_default().as_str().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;
    use crate::units::UnitSpawn;

    #[test]
    fn test_briefing_lists_both_sides() {
        let grid = TerrainGrid::from_ascii(&["B.F", "..H", "~.."]).unwrap();
        let mut sim = Simulation::new(grid, Rules::default());
        sim.spawn_unit(
            UnitSpawn::new(Faction::Friendly, "AB", Coord::new(0, 0))
                .with_target(Coord::new(2, 0))
                .with_move_safely(false),
        )
        .unwrap();
        sim.spawn_unit(UnitSpawn::new(Faction::Enemy, "XX", Coord::new(2, 1)).with_health(55))
            .unwrap();

        let briefing = Briefing::from_simulation(&sim);
        assert_eq!(
            briefing.friends,
            vec![FriendInfo {
                name: "AB".into(),
                current_tile: "A1".into(),
                target_tile: "C1".into(),
                current_terrain: "base".into(),
                target_terrain: "forest".into(),
                health: 100,
                movement_style: "Fast".into(),
            }]
        );
        assert_eq!(
            briefing.enemies,
            vec![EnemyInfo {
                current_tile: "C2".into(),
                current_terrain: "hill".into(),
                health: 55,
            }]
        );
    }
}
