//! Fixed-point math utilities for deterministic simulation.
//!
//! Path costs, move chances and health all use fixed-point arithmetic so a
//! seeded run produces bit-identical results on every platform.

use fixed::types::I32F32;

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Scale `value` by `percent` / 100.
///
/// Multiplies before dividing so that whole-number results (for example
/// 40 damage at 10%) stay exact. Saturates instead of overflowing.
#[inline]
#[must_use]
pub fn percent_of(value: Fixed, percent: u32) -> Fixed {
    value.saturating_mul(Fixed::saturating_from_num(percent)) / Fixed::from_num(100)
}

/// Round a non-negative fixed-point value up to the next integer.
///
/// Used when reporting health to the outside world: a unit with 0.4 health
/// left is still alive and must not read as 0.
#[must_use]
pub fn ceil_u32(value: Fixed) -> u32 {
    if value <= Fixed::ZERO {
        return 0;
    }
    value.ceil().to_num::<u32>()
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}
