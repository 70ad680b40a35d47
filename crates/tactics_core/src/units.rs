//! Units and the unit registry.
//!
//! Units are keyed internally by a stable [`UnitId`]. The external protocol
//! addresses units by their two-letter display name, so the registry keeps a
//! name -> id index that is updated on every insert and remove.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::Coord;
use crate::math::{fixed_serde, Fixed};

/// Unique identifier for units.
pub type UnitId = u32;

/// Maximum (and default starting) unit health.
pub const MAX_HEALTH: u32 = 100;

/// Which side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Faction {
    /// Controlled by the external decision-maker.
    Friendly,
    /// Hostile units heading for the base.
    Enemy,
}

impl Faction {
    /// The opposing faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Friendly => Self::Enemy,
            Self::Enemy => Self::Friendly,
        }
    }

    /// Lowercase name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Friendly => "friendly",
            Self::Enemy => "enemy",
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single grid-bound unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Stable unique key.
    pub id: UnitId,
    /// Side this unit fights for.
    pub faction: Faction,
    /// Unique two-letter display label.
    pub name: String,
    /// Current cell.
    pub position: Coord,
    /// Destination cell.
    pub target: Coord,
    /// Selects the terrain-cost profile used by pathfinding.
    pub move_safely: bool,
    /// Remaining health, in (0, 100] while registered.
    #[serde(with = "fixed_serde")]
    pub health: Fixed,
    /// Set the first time the unit is engaged and never cleared.
    pub is_fighting: bool,
    /// Carried ammunition. Not consumed by the simulation.
    pub ammo: u32,
}

impl Unit {
    /// Whether the unit stands on its target cell.
    #[must_use]
    pub fn at_target(&self) -> bool {
        self.position == self.target
    }

    /// Whether this unit belongs to the friendly faction.
    #[must_use]
    pub fn is_friendly(&self) -> bool {
        self.faction == Faction::Friendly
    }
}

/// Parameters for spawning a new unit.
#[derive(Debug, Clone)]
pub struct UnitSpawn {
    /// Side the unit fights for.
    pub faction: Faction,
    /// Two uppercase letters, unique across the registry.
    pub name: String,
    /// Starting cell.
    pub position: Coord,
    /// Initial destination. Defaults to holding position.
    pub target: Option<Coord>,
    /// Terrain-cost profile.
    pub move_safely: bool,
    /// Starting health, clamped to `1..=100`.
    pub health: u32,
    /// Carried ammunition.
    pub ammo: u32,
}

impl UnitSpawn {
    /// Spawn parameters for a full-health unit holding its position.
    #[must_use]
    pub fn new(faction: Faction, name: impl Into<String>, position: Coord) -> Self {
        Self {
            faction,
            name: name.into(),
            position,
            target: None,
            move_safely: true,
            health: MAX_HEALTH,
            ammo: 100,
        }
    }

    /// Set the initial destination.
    #[must_use]
    pub fn with_target(mut self, target: Coord) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the terrain-cost profile.
    #[must_use]
    pub fn with_move_safely(mut self, move_safely: bool) -> Self {
        self.move_safely = move_safely;
        self
    }

    /// Set the starting health.
    #[must_use]
    pub fn with_health(mut self, health: u32) -> Self {
        self.health = health;
        self
    }
}

/// Whether `name` is a valid display label: exactly two ASCII uppercase letters.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    name.len() == 2 && name.bytes().all(|b| b.is_ascii_uppercase())
}

/// Storage for all units, keyed by id.
///
/// Iteration is in ascending id order, which is also the tick processing
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitRegistry {
    /// Map of unit ID to unit data.
    units: BTreeMap<UnitId, Unit>,
    /// Display name to unit ID.
    names: HashMap<String, UnitId>,
    /// Next unit ID to assign.
    next_id: UnitId,
}

impl UnitRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            names: HashMap::new(),
            next_id: 1,
        }
    }

    /// Allocate the next unused id.
    pub fn allocate_id(&mut self) -> UnitId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Insert or replace a unit, keeping the name index in sync.
    ///
    /// Fails if another unit already uses the same name.
    pub fn insert(&mut self, unit: Unit) -> Result<()> {
        if let Some(&owner) = self.names.get(&unit.name) {
            if owner != unit.id {
                return Err(GameError::DuplicateName(unit.name));
            }
        }
        if let Some(previous) = self.units.get(&unit.id) {
            if previous.name != unit.name {
                self.names.remove(&previous.name);
            }
        }
        self.next_id = self.next_id.max(unit.id + 1);
        self.names.insert(unit.name.clone(), unit.id);
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        self.names.remove(&unit.name);
        Some(unit)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    ///
    /// Callers must not change `name` through this reference; use
    /// [`insert`](Self::insert) for that.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Resolve a display name to a unit ID.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<UnitId> {
        self.names.get(name).copied()
    }

    /// Get a unit by display name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Unit> {
        self.id_by_name(name).and_then(|id| self.units.get(&id))
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Unit IDs in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Iterate units in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units of one faction, in ascending id order.
    pub fn of_faction(&self, faction: Faction) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(move |u| u.faction == faction)
    }

    /// The unit standing on a cell, if any.
    #[must_use]
    pub fn occupant(&self, at: Coord) -> Option<&Unit> {
        self.units.values().find(|u| u.position == at)
    }

    /// Whether any unit stands on a cell.
    #[must_use]
    pub fn is_occupied(&self, at: Coord) -> bool {
        self.occupant(at).is_some()
    }

    /// Whether a unit of `faction` stands on a cell.
    #[must_use]
    pub fn is_occupied_by(&self, at: Coord, faction: Faction) -> bool {
        self.units
            .values()
            .any(|u| u.faction == faction && u.position == at)
    }

    /// Whether a display name is taken.
    #[must_use]
    pub fn name_in_use(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// First free two-letter name in `AA`, `AB`, ... `ZZ` order.
    #[must_use]
    pub fn next_free_name(&self) -> Option<String> {
        (b'A'..=b'Z')
            .flat_map(|a| (b'A'..=b'Z').map(move |b| [a, b]))
            .map(|pair| String::from_utf8_lossy(&pair).into_owned())
            .find(|name| !self.name_in_use(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: UnitId, name: &str, faction: Faction, at: Coord) -> Unit {
        Unit {
            id,
            faction,
            name: name.to_string(),
            position: at,
            target: at,
            move_safely: true,
            health: Fixed::from_num(MAX_HEALTH),
            is_fighting: false,
            ammo: 100,
        }
    }

    #[test]
    fn test_insert_and_lookup_by_name() {
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(1, "AB", Faction::Friendly, Coord::new(1, 0)))
            .unwrap();

        assert_eq!(registry.id_by_name("AB"), Some(1));
        assert_eq!(registry.by_name("AB").unwrap().position, Coord::new(1, 0));
        assert!(registry.by_name("ZZ").is_none());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(1, "AB", Faction::Friendly, Coord::new(0, 0)))
            .unwrap();
        let err = registry
            .insert(unit(2, "AB", Faction::Enemy, Coord::new(5, 5)))
            .unwrap_err();
        assert_eq!(err, GameError::DuplicateName("AB".into()));

        // Replacing the same id under the same name is fine.
        registry
            .insert(unit(1, "AB", Faction::Friendly, Coord::new(2, 0)))
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_clears_name_index() {
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(1, "AB", Faction::Friendly, Coord::new(0, 0)))
            .unwrap();
        assert!(registry.remove(1).is_some());
        assert!(!registry.name_in_use("AB"));
        assert!(registry.remove(1).is_none());
    }

    #[test]
    fn test_rename_updates_index() {
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(1, "AB", Faction::Friendly, Coord::new(0, 0)))
            .unwrap();
        registry
            .insert(unit(1, "CD", Faction::Friendly, Coord::new(0, 0)))
            .unwrap();
        assert!(!registry.name_in_use("AB"));
        assert_eq!(registry.id_by_name("CD"), Some(1));
    }

    #[test]
    fn test_allocate_id_skips_inserted() {
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(7, "AB", Faction::Friendly, Coord::new(0, 0)))
            .unwrap();
        assert_eq!(registry.allocate_id(), 8);
        assert_eq!(registry.allocate_id(), 9);
    }

    #[test]
    fn test_occupancy_queries() {
        let mut registry = UnitRegistry::new();
        registry
            .insert(unit(1, "AB", Faction::Friendly, Coord::new(3, 3)))
            .unwrap();
        assert!(registry.is_occupied(Coord::new(3, 3)));
        assert!(registry.is_occupied_by(Coord::new(3, 3), Faction::Friendly));
        assert!(!registry.is_occupied_by(Coord::new(3, 3), Faction::Enemy));
        assert!(!registry.is_occupied(Coord::new(3, 4)));
    }

    #[test]
    fn test_next_free_name() {
        let mut registry = UnitRegistry::new();
        assert_eq!(registry.next_free_name().as_deref(), Some("AA"));
        registry
            .insert(unit(1, "AA", Faction::Enemy, Coord::new(0, 0)))
            .unwrap();
        assert_eq!(registry.next_free_name().as_deref(), Some("AB"));
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("AB"));
        assert!(!is_valid_name("A"));
        assert!(!is_valid_name("ab"));
        assert!(!is_valid_name("ABC"));
        assert!(!is_valid_name("A1"));
    }
}
