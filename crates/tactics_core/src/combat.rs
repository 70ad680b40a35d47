//! Adjacency-based engagement and attrition.
//!
//! Combat has no targeting or cooldowns: a unit is engaged whenever an
//! opposing unit stands in any of the eight surrounding cells, and engaged
//! units lose a flat amount of health each tick. Terrain then modifies both
//! the chance to move and the damage taken:
//!
//! - Engaged units move with reduced probability
//! - Hill and forest halve the chance to move again
//! - Hill, forest and base act as cover and cut the damage taken

use crate::grid::{Coord, TerrainKind};
use crate::math::{percent_of, Fixed};
use crate::rules::Rules;
use crate::units::{Faction, Unit, UnitRegistry};

/// Opposing units within Chebyshev distance 1 of `at`.
///
/// The cell itself counts as adjacent.
pub fn adjacent_enemies<'a>(
    registry: &'a UnitRegistry,
    at: Coord,
    faction: Faction,
) -> impl Iterator<Item = &'a Unit> + 'a {
    let opponent = faction.opponent();
    registry
        .of_faction(opponent)
        .filter(move |other| other.position.chebyshev(at) <= 1)
}

/// Whether any opposing unit is adjacent to `at` (diagonals included).
#[must_use]
pub fn threatened(registry: &UnitRegistry, at: Coord, faction: Faction) -> bool {
    adjacent_enemies(registry, at, faction).next().is_some()
}

/// Whether `unit` is engaged, evaluated against `snapshot`.
#[must_use]
pub fn is_engaged(snapshot: &UnitRegistry, unit: &Unit) -> bool {
    threatened(snapshot, unit.position, unit.faction)
}

/// Outcome of one tick's combat and terrain assessment for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attrition {
    /// Whether the unit is engaged this tick.
    pub engaged: bool,
    /// Probability in `[0, 1]` that the unit may move this tick.
    pub move_chance: Fixed,
    /// Health lost this tick.
    pub health_loss: Fixed,
}

/// Apply the engagement penalty and terrain modifiers.
///
/// Order matters: the flat engagement damage is added first and the cover
/// reduction is applied to the total afterwards.
#[must_use]
pub fn assess(rules: &Rules, terrain: TerrainKind, engaged: bool) -> Attrition {
    let mut move_chance = Fixed::ONE;
    let mut health_loss = Fixed::ZERO;

    if engaged {
        move_chance = percent_of(move_chance, rules.engaged_move_percent);
        health_loss =
            health_loss.saturating_add(Fixed::saturating_from_num(rules.engagement_damage));
    }
    if terrain.is_rough() {
        move_chance = percent_of(move_chance, rules.rough_move_percent);
    }
    if terrain.gives_cover() {
        health_loss = percent_of(health_loss, rules.cover_damage_percent);
    }

    Attrition {
        engaged,
        move_chance,
        health_loss,
    }
}
