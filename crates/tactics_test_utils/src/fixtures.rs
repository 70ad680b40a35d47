//! Test fixtures and helpers.
//!
//! Pre-built boards and unit configurations for consistent testing.

use tactics_core::grid::{Coord, TerrainGrid, TerrainKind, BOARD_SIZE};
use tactics_core::rules::Rules;
use tactics_core::simulation::Simulation;
use tactics_core::units::{Faction, UnitSpawn};

/// The defend-the-base map, row 0 first.
pub const STANDARD_MAP: [&str; 12] = [
    "B...FFF..~~.",
    "..H.FFF..~~~",
    ".~~..F....~~",
    ".~~~...H....",
    "..~~....FFF.",
    "....H...FFF.",
    ".FF...~~....",
    ".FFF..~~~.H.",
    "..FF...~....",
    "....~~...FF.",
    ".H..~~~..FFF",
    ".....~....F.",
];

/// A 12×12 all-ground board.
#[must_use]
pub fn open_grid() -> TerrainGrid {
    TerrainGrid::filled(BOARD_SIZE, BOARD_SIZE, TerrainKind::Ground)
}

/// The defend-the-base board.
///
/// # Panics
///
/// Never in practice: the layout is a constant.
#[must_use]
pub fn standard_grid() -> TerrainGrid {
    grid_from_ascii(&STANDARD_MAP)
}

/// Build a board from ASCII rows, panicking on bad input.
///
/// # Panics
///
/// Panics if the rows are ragged or contain unknown symbols.
#[must_use]
pub fn grid_from_ascii(rows: &[&str]) -> TerrainGrid {
    TerrainGrid::from_ascii(rows).expect("fixture layout must be valid")
}

/// Friendly unit holding its position.
#[must_use]
pub fn friendly(name: &str, x: u32, y: u32) -> UnitSpawn {
    UnitSpawn::new(Faction::Friendly, name, Coord::new(x, y))
}

/// Enemy unit heading for `target`.
#[must_use]
pub fn enemy(name: &str, x: u32, y: u32, target: Coord) -> UnitSpawn {
    UnitSpawn::new(Faction::Enemy, name, Coord::new(x, y)).with_target(target)
}

/// Simulation on `grid` with default rules and the given units.
///
/// # Panics
///
/// Panics if any spawn is rejected.
#[must_use]
pub fn simulation_with(grid: TerrainGrid, spawns: impl IntoIterator<Item = UnitSpawn>) -> Simulation {
    let mut sim = Simulation::new(grid, Rules::default());
    for spawn in spawns {
        let name = spawn.name.clone();
        if let Err(err) = sim.spawn_unit(spawn) {
            panic!("fixture spawn {name} rejected: {err}");
        }
    }
    sim
}

/// The opening position of the defend-the-base game: friendly `AB` next to
/// the base, one enemy in the far corner heading for it.
#[must_use]
pub fn standard_opening() -> Simulation {
    simulation_with(
        standard_grid(),
        [
            friendly("AB", 1, 0),
            enemy("XA", 11, 11, Coord::new(0, 0)),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_grid_shape() {
        let grid = standard_grid();
        assert_eq!(grid.width(), BOARD_SIZE);
        assert_eq!(grid.height(), BOARD_SIZE);
        assert_eq!(grid.base_tiles().collect::<Vec<_>>(), vec![Coord::new(0, 0)]);
        assert_eq!(grid.terrain(Coord::new(9, 0)), Some(TerrainKind::Water));
    }

    #[test]
    fn test_standard_opening_units() {
        let sim = standard_opening();
        assert_eq!(sim.units().len(), 2);
        assert!(sim.units().by_name("AB").is_some());
    }
}
