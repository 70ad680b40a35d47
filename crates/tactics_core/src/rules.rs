//! Tunable simulation constants.
//!
//! Fractions are stored as integer percentages and applied with
//! [`percent_of`], so every derived value is fixed-point and deterministic.
//!
//! # Example RON
//!
//! ```ron
//! Rules(
//!     engagement_damage: 40,
//!     engaged_move_percent: 75,
//!     rough_move_percent: 50,
//!     cover_damage_percent: 10,
//!     safe_rough_cost_percent: 10,
//!     fast_rough_cost_percent: 200,
//!     enemy_adjacent_multiplier: 10,
//!     friendly_occupied_multiplier: 1000,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::grid::TerrainKind;
use crate::math::{percent_of, Fixed};
use crate::units::MAX_HEALTH;

/// Upper bound on the cost of entering a single cell, in whole units.
///
/// A full 12×12 route at this cost still fits in [`Fixed`].
pub const MAX_STEP_COST: u64 = 1_000_000;

/// Upper bound on the rough-terrain cost percentages.
pub const MAX_COST_PERCENT: u32 = 10_000;

/// Combat, movement and path-cost constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    /// Flat health loss per tick while engaged.
    pub engagement_damage: u32,
    /// Move chance multiplier while engaged.
    pub engaged_move_percent: u32,
    /// Move chance multiplier when leaving hill or forest.
    pub rough_move_percent: u32,
    /// Damage multiplier on hill, forest and base.
    pub cover_damage_percent: u32,
    /// Cost of entering hill/forest for units moving safely.
    ///
    /// Below the base cost, so safe routes bend toward cover.
    pub safe_rough_cost_percent: u32,
    /// Cost of entering hill/forest for units moving fast.
    pub fast_rough_cost_percent: u32,
    /// Cost multiplier for cells next to an opposing unit.
    pub enemy_adjacent_multiplier: u32,
    /// Cost multiplier for cells held by a unit of the same faction.
    pub friendly_occupied_multiplier: u32,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            engagement_damage: 40,
            engaged_move_percent: 75,
            rough_move_percent: 50,
            cover_damage_percent: 10,
            safe_rough_cost_percent: 10,
            fast_rough_cost_percent: 200,
            enemy_adjacent_multiplier: 10,
            friendly_occupied_multiplier: 1000,
        }
    }
}

impl Rules {
    /// Load rules from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            source_name: "rules".into(),
            message: e.to_string(),
        })
    }

    /// Check every value against its supported range.
    ///
    /// Chances and the cover modifier are percentages of at most 100,
    /// damage is at most a full health bar, and the worst single-cell path
    /// cost stays within [`MAX_STEP_COST`].
    pub fn validate(&self) -> Result<()> {
        let percents = [
            ("engaged_move_percent", self.engaged_move_percent),
            ("rough_move_percent", self.rough_move_percent),
            ("cover_damage_percent", self.cover_damage_percent),
        ];
        for (field, value) in percents {
            if value > 100 {
                return Err(GameError::InvalidRules(format!(
                    "{field} must be at most 100, got {value}"
                )));
            }
        }
        if self.engagement_damage > MAX_HEALTH {
            return Err(GameError::InvalidRules(format!(
                "engagement_damage must be at most {MAX_HEALTH}, got {}",
                self.engagement_damage
            )));
        }
        let costs = [
            ("safe_rough_cost_percent", self.safe_rough_cost_percent),
            ("fast_rough_cost_percent", self.fast_rough_cost_percent),
        ];
        for (field, value) in costs {
            if value > MAX_COST_PERCENT {
                return Err(GameError::InvalidRules(format!(
                    "{field} must be at most {MAX_COST_PERCENT}, got {value}"
                )));
            }
        }

        let rough = self
            .safe_rough_cost_percent
            .max(self.fast_rough_cost_percent)
            .div_ceil(100)
            .max(1);
        let worst = u64::from(rough)
            * u64::from(self.enemy_adjacent_multiplier)
            * u64::from(self.friendly_occupied_multiplier);
        if worst > MAX_STEP_COST {
            return Err(GameError::InvalidRules(format!(
                "worst step cost {worst} exceeds {MAX_STEP_COST}; lower the path multipliers"
            )));
        }
        Ok(())
    }

    /// Base cost of entering a cell of this terrain, `None` for water.
    #[must_use]
    pub fn terrain_cost(&self, terrain: TerrainKind, move_safely: bool) -> Option<Fixed> {
        if !terrain.is_passable() {
            return None;
        }
        if terrain.is_rough() {
            let percent = if move_safely {
                self.safe_rough_cost_percent
            } else {
                self.fast_rough_cost_percent
            };
            return Some(percent_of(Fixed::ONE, percent));
        }
        Some(Fixed::ONE)
    }
}
