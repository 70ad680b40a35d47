//! Congestion-aware A* over the terrain grid.
//!
//! Each tick a unit asks for a single next step toward its target. The
//! search runs over 4-connected moves with a Manhattan heuristic. Edge costs
//! depend on the terrain being entered, the unit's movement profile, and the
//! other units on the board:
//!
//! - Water is impassable
//! - Hill and forest are cheap for units moving safely and expensive for
//!   units moving fast
//! - Cells next to an opposing unit cost ten times more
//! - Cells held by a unit of the same faction cost a thousand times more,
//!   which steers around friends without forbidding the cell outright
//!
//! Because the safe-terrain cost sits below the heuristic's per-step cost,
//! the heuristic is not admissible for safe units and routes may bend toward
//! cover instead of being shortest.
//!
//! All costs are fixed-point, so results are identical across platforms.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::combat::threatened;
use crate::grid::{Coord, TerrainGrid};
use crate::math::Fixed;
use crate::rules::Rules;
use crate::units::{Unit, UnitRegistry};

/// Result of a single planning query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOutcome {
    /// The unit already stands on its target.
    AtTarget,
    /// First step of the best path found.
    Step(Coord),
    /// The open set ran dry without reaching the target.
    NoPath,
    /// The predecessor chain was longer than the grid has cells.
    ReconstructionOverrun,
}

impl PathOutcome {
    /// The position to occupy this tick, given the unit's current one.
    #[must_use]
    pub const fn next_position(self, current: Coord) -> Coord {
        match self {
            Self::Step(next) => next,
            Self::AtTarget | Self::NoPath | Self::ReconstructionOverrun => current,
        }
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    at: Coord,
    /// f_score = g_score + heuristic.
    f_score: Fixed,
    /// Order in which the cell was first discovered; lower wins ties.
    discovered: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both comparisons for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.discovered.cmp(&self.discovered),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[inline]
fn manhattan_heuristic(from: Coord, to: Coord) -> Fixed {
    Fixed::from_num(from.manhattan(to))
}

/// Cost for `unit` to enter `at`, or `None` if the cell cannot be entered.
#[must_use]
pub fn step_cost(
    grid: &TerrainGrid,
    rules: &Rules,
    registry: &UnitRegistry,
    unit: &Unit,
    at: Coord,
) -> Option<Fixed> {
    let mut cost = rules.terrain_cost(grid.terrain(at)?, unit.move_safely)?;

    if threatened(registry, at, unit.faction) {
        let multiplier = Fixed::saturating_from_num(rules.enemy_adjacent_multiplier);
        cost = cost.saturating_mul(multiplier);
    }
    let held_by_friend = registry
        .of_faction(unit.faction)
        .any(|other| other.id != unit.id && other.position == at);
    if held_by_friend {
        let multiplier = Fixed::saturating_from_num(rules.friendly_occupied_multiplier);
        cost = cost.saturating_mul(multiplier);
    }

    Some(cost)
}

/// Plan the next step for `unit` toward its target.
///
/// `registry` is the view of other units used for congestion costs; the
/// unit itself may or may not be present in it.
#[must_use]
pub fn plan(grid: &TerrainGrid, rules: &Rules, registry: &UnitRegistry, unit: &Unit) -> PathOutcome {
    let start = unit.position;
    let goal = unit.target;

    if start == goal {
        return PathOutcome::AtTarget;
    }

    let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
    let mut closed: HashSet<Coord> = HashSet::new();
    let mut came_from: HashMap<Coord, Coord> = HashMap::new();
    let mut g_score: HashMap<Coord, Fixed> = HashMap::new();
    let mut discovered: HashMap<Coord, u64> = HashMap::new();
    let mut next_seq: u64 = 0;

    g_score.insert(start, Fixed::ZERO);
    discovered.insert(start, next_seq);
    open_set.push(AStarNode {
        at: start,
        f_score: manhattan_heuristic(start, goal),
        discovered: next_seq,
    });

    while let Some(current) = open_set.pop() {
        if !closed.insert(current.at) {
            // Stale entry superseded by a cheaper push.
            continue;
        }

        if current.at == goal {
            return first_step(&came_from, start, goal, grid.cell_count());
        }

        let current_g = g_score.get(&current.at).copied().unwrap_or(Fixed::MAX);

        for neighbor in current.at.orthogonal_neighbors() {
            if closed.contains(&neighbor) {
                continue;
            }
            let Some(cost) = step_cost(grid, rules, registry, unit, neighbor) else {
                continue;
            };

            let tentative_g = current_g.saturating_add(cost);
            let neighbor_g = g_score.get(&neighbor).copied().unwrap_or(Fixed::MAX);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.at);
                g_score.insert(neighbor, tentative_g);

                let seq = *discovered.entry(neighbor).or_insert_with(|| {
                    next_seq += 1;
                    next_seq
                });
                open_set.push(AStarNode {
                    at: neighbor,
                    f_score: tentative_g.saturating_add(manhattan_heuristic(neighbor, goal)),
                    discovered: seq,
                });
            }
        }
    }

    tracing::debug!(unit = %unit.name, from = %start, to = %goal, "No path found");
    PathOutcome::NoPath
}

/// Convenience wrapper returning the position to occupy this tick.
#[must_use]
pub fn next_step(
    grid: &TerrainGrid,
    rules: &Rules,
    registry: &UnitRegistry,
    unit: &Unit,
) -> Coord {
    plan(grid, rules, registry, unit).next_position(unit.position)
}

/// Walk the predecessor chain back from `goal` and return the step after `start`.
///
/// The walk is bounded by `max_steps` to guard against a corrupted chain.
fn first_step(
    came_from: &HashMap<Coord, Coord>,
    start: Coord,
    goal: Coord,
    max_steps: usize,
) -> PathOutcome {
    let mut node = goal;
    let mut steps = 0usize;

    while let Some(&prev) = came_from.get(&node) {
        if prev == start {
            return PathOutcome::Step(node);
        }
        node = prev;
        steps += 1;
        if steps > max_steps {
            tracing::warn!(
                max_steps,
                "Path reconstruction exceeded bound, holding position"
            );
            return PathOutcome::ReconstructionOverrun;
        }
    }

    // Chain broke before reaching the start.
    PathOutcome::NoPath
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TerrainKind;
    use crate::units::{Faction, MAX_HEALTH};

    fn unit(id: u32, name: &str, faction: Faction, at: Coord, target: Coord) -> Unit {
        Unit {
            id,
            faction,
            name: name.to_string(),
            position: at,
            target,
            move_safely: false,
            health: Fixed::from_num(MAX_HEALTH),
            is_fighting: false,
            ammo: 100,
        }
    }

    fn open_grid() -> TerrainGrid {
        TerrainGrid::filled(12, 12, TerrainKind::Ground)
    }

    #[test]
    fn test_at_target() {
        let grid = open_grid();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(3, 3), Coord::new(3, 3));
        let outcome = plan(&grid, &Rules::default(), &UnitRegistry::new(), &u);
        assert_eq!(outcome, PathOutcome::AtTarget);
        assert_eq!(outcome.next_position(u.position), Coord::new(3, 3));
    }

    #[test]
    fn test_simple_step_reduces_distance() {
        let grid = open_grid();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(5, 5));
        let step = next_step(&grid, &Rules::default(), &UnitRegistry::new(), &u);
        assert_eq!(step.manhattan(u.position), 1);
        assert_eq!(step.manhattan(u.target), 9);
    }

    #[test]
    fn test_path_around_water() {
        // Wall of water at x = 2 with a gap at y = 4.
        let grid = TerrainGrid::from_ascii(&[
            "..~..", //
            "..~..",
            "..~..",
            "..~..",
            ".....",
        ])
        .unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(1, 0), Coord::new(3, 0));
        let step = next_step(&grid, &Rules::default(), &UnitRegistry::new(), &u);
        // Only way round is through the gap, so the first step goes north.
        assert_eq!(step, Coord::new(1, 1));
    }

    #[test]
    fn test_no_path_holds_position() {
        let grid = TerrainGrid::from_ascii(&["..~..", "..~..", "..~.."]).unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 1), Coord::new(4, 1));
        let outcome = plan(&grid, &Rules::default(), &UnitRegistry::new(), &u);
        assert_eq!(outcome, PathOutcome::NoPath);
        assert_eq!(outcome.next_position(u.position), u.position);
    }

    #[test]
    fn test_water_target_is_unreachable() {
        let grid = TerrainGrid::from_ascii(&["...", ".~.", "..."]).unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(1, 1));
        assert_eq!(
            plan(&grid, &Rules::default(), &UnitRegistry::new(), &u),
            PathOutcome::NoPath
        );
    }

    #[test]
    fn test_safe_units_prefer_forest() {
        // Two equally long routes from (0,1) to (4,1): straight through a forest
        // row, or around it. Safe units take the forest, fast units avoid it.
        let grid = TerrainGrid::from_ascii(&[
            ".....", //
            ".FFF.",
            ".....",
        ])
        .unwrap();
        let rules = Rules::default();
        let mut safe = unit(1, "AB", Faction::Friendly, Coord::new(0, 1), Coord::new(4, 1));
        safe.move_safely = true;
        assert_eq!(
            next_step(&grid, &rules, &UnitRegistry::new(), &safe),
            Coord::new(1, 1)
        );

        let fast = unit(1, "AB", Faction::Friendly, Coord::new(0, 1), Coord::new(4, 1));
        let step = next_step(&grid, &rules, &UnitRegistry::new(), &fast);
        assert_ne!(step, Coord::new(1, 1));
    }

    #[test]
    fn test_friendly_occupied_cell_is_avoided() {
        let grid = open_grid();
        let mut registry = UnitRegistry::new();
        // Friend blocks the straight line east.
        registry
            .insert(unit(2, "CD", Faction::Friendly, Coord::new(1, 0), Coord::new(1, 0)))
            .unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(4, 0));
        let step = next_step(&grid, &Rules::default(), &registry, &u);
        assert_eq!(step, Coord::new(0, 1));
    }

    #[test]
    fn test_friendly_occupied_cell_used_when_only_option() {
        // Corridor one cell wide: the friend's cell is the only way through.
        let grid = TerrainGrid::from_ascii(&["....."]).unwrap();
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(2, "CD", Faction::Friendly, Coord::new(2, 0), Coord::new(2, 0)))
            .unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(4, 0));
        let step = next_step(&grid, &Rules::default(), &registry, &u);
        assert_eq!(step, Coord::new(1, 0));
    }

    #[test]
    fn test_enemy_zone_raises_cost() {
        let grid = open_grid();
        let rules = Rules::default();
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(2, "XX", Faction::Enemy, Coord::new(6, 6), Coord::new(6, 6)))
            .unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(11, 11));

        assert_eq!(
            step_cost(&grid, &rules, &registry, &u, Coord::new(5, 5)),
            Some(Fixed::from_num(10))
        );
        assert_eq!(
            step_cost(&grid, &rules, &registry, &u, Coord::new(4, 4)),
            Some(Fixed::ONE)
        );
    }

    #[test]
    fn test_oversized_multipliers_saturate() {
        let grid = open_grid();
        let rules = Rules {
            enemy_adjacent_multiplier: 3_000_000_000,
            friendly_occupied_multiplier: u32::MAX,
            ..Rules::default()
        };
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(2, "XX", Faction::Enemy, Coord::new(3, 1), Coord::new(3, 1)))
            .unwrap();
        registry
            .insert(unit(3, "CD", Faction::Friendly, Coord::new(2, 2), Coord::new(2, 2)))
            .unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(5, 0));

        assert_eq!(
            step_cost(&grid, &rules, &registry, &u, Coord::new(2, 2)),
            Some(Fixed::MAX)
        );
        // A detour around the threatened block is still found.
        assert!(matches!(
            plan(&grid, &rules, &registry, &u),
            PathOutcome::Step(_)
        ));
    }

    #[test]
    fn test_own_cell_not_counted_as_friend() {
        let grid = open_grid();
        let rules = Rules::default();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(2, 2), Coord::new(5, 5));
        let mut registry = UnitRegistry::new();
        registry.insert(u.clone()).unwrap();
        assert_eq!(
            step_cost(&grid, &rules, &registry, &u, Coord::new(2, 2)),
            Some(Fixed::ONE)
        );
    }

    #[test]
    fn test_reconstruction_bound() {
        // A cycle in the predecessor map never reaches the start.
        let mut came_from = HashMap::new();
        came_from.insert(Coord::new(1, 0), Coord::new(2, 0));
        came_from.insert(Coord::new(2, 0), Coord::new(1, 0));
        let outcome = first_step(&came_from, Coord::new(0, 0), Coord::new(1, 0), 4);
        assert_eq!(outcome, PathOutcome::ReconstructionOverrun);
    }

    #[test]
    fn test_determinism() {
        let grid = TerrainGrid::from_ascii(&[
            "............",
            "...~~~......",
            "...~.~..FF..",
            "...~.~..FF..",
            "......H.....",
        ])
        .unwrap();
        let u = unit(1, "AB", Faction::Friendly, Coord::new(0, 0), Coord::new(11, 4));
        let rules = Rules::default();
        let registry = UnitRegistry::new();

        let first = plan(&grid, &rules, &registry, &u);
        for _ in 0..5 {
            assert_eq!(plan(&grid, &rules, &registry, &u), first);
        }
    }
}
