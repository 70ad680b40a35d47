//! Order batches from the external decision-maker.
//!
//! Orders address units by display name and give targets in algebraic
//! notation. Translation never fails as a whole: each malformed order is
//! skipped and reported, and the rest of the batch still applies.
//!
//! # Wire format
//!
//! ```json
//! { "orders": [ { "unit": {"id": {"name": "AB"}},
//!                 "target": {"row": "C", "column": 4},
//!                 "method": {"method": "safe"} } ] }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Coord;
use crate::units::UnitRegistry;

/// A batch of orders, applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBatch {
    /// Well-formed orders in the order they were issued.
    pub orders: Vec<Order>,
    /// Entries that could not be decoded, by position in the received batch.
    ///
    /// Sorted by position. Well-formed orders fill the remaining positions.
    #[serde(skip)]
    pub malformed: Vec<(usize, String)>,
}

impl OrderBatch {
    /// A batch of well-formed orders.
    #[must_use]
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders,
            malformed: Vec::new(),
        }
    }

    /// Number of entries as received, malformed ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len() + self.malformed.len()
    }

    /// Whether the batch carried no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single order: move a named unit to a target square with a given method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Addressed unit.
    pub unit: UnitRef,
    /// Destination square.
    pub target: Square,
    /// Movement profile.
    pub method: MovementMethod,
}

/// Unit reference wrapper, `{"id": {"name": "AB"}}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRef {
    /// Identifying part of the reference.
    pub id: UnitName,
}

/// Display name of a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitName {
    /// Two capital letters.
    pub name: String,
}

/// Algebraic square: `row` is the file letter A-L, `column` the rank 1-12.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    /// File letter, A-L.
    pub row: String,
    /// Rank number, 1-12.
    pub column: i64,
}

/// Movement method wrapper, `{"method": "safe"}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementMethod {
    /// Either `"safe"` or `"fast"`.
    pub method: String,
}

impl Order {
    /// Build an order from plain values.
    #[must_use]
    pub fn new(name: &str, file: &str, rank: i64, method: &str) -> Self {
        Self {
            unit: UnitRef {
                id: UnitName {
                    name: name.to_string(),
                },
            },
            target: Square {
                row: file.to_string(),
                column: rank,
            },
            method: MovementMethod {
                method: method.to_string(),
            },
        }
    }

    /// Name of the addressed unit.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit.id.name
    }
}

/// Why an order was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderRejection {
    /// Target square outside A-L / 1-12.
    InvalidCoordinate {
        /// Unit the order addressed.
        unit: String,
        /// Square as received.
        square: String,
    },
    /// No unit with this name exists.
    UnknownUnit(String),
    /// Method other than `safe` or `fast`.
    UnknownMethod {
        /// Unit the order addressed.
        unit: String,
        /// Method as received.
        method: String,
    },
    /// The entry did not have the order shape.
    Malformed(String),
}

impl fmt::Display for OrderRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCoordinate { unit, square } => {
                write!(f, "order for {unit}: invalid target square {square}")
            }
            Self::UnknownUnit(name) => write!(f, "order for unknown unit {name}"),
            Self::UnknownMethod { unit, method } => {
                write!(f, "order for {unit}: unknown movement method {method:?}")
            }
            Self::Malformed(reason) => write!(f, "malformed order: {reason}"),
        }
    }
}

/// Summary of applying a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderOutcome {
    /// Number of orders that changed a unit.
    pub applied: usize,
    /// Skipped orders with their index in the batch.
    pub rejected: Vec<(usize, OrderRejection)>,
}

/// Parse a movement method: `Some(true)` for safe, `Some(false)` for fast.
#[must_use]
pub fn parse_method(method: &str) -> Option<bool> {
    match method {
        "safe" => Some(true),
        "fast" => Some(false),
        _ => None,
    }
}

/// Apply a batch to the registry.
///
/// Only `target` and `move_safely` are touched. Orders apply in sequence, so
/// the last order for a given name wins. Rejection indices are positions in
/// the batch as received.
pub fn apply_orders(registry: &mut UnitRegistry, batch: &OrderBatch) -> OrderOutcome {
    let mut outcome = OrderOutcome::default();
    let mut orders = batch.orders.iter();
    let mut malformed = batch.malformed.iter().peekable();

    for index in 0..batch.len() {
        if let Some((_, reason)) = malformed.next_if(|(at, _)| *at == index) {
            let rejection = OrderRejection::Malformed(reason.clone());
            tracing::warn!(index, %rejection, "Skipping order");
            outcome.rejected.push((index, rejection));
            continue;
        }
        let Some(order) = orders.next() else {
            continue;
        };
        match apply_order(registry, order) {
            Ok(()) => outcome.applied += 1,
            Err(rejection) => {
                tracing::warn!(index, %rejection, "Skipping order");
                outcome.rejected.push((index, rejection));
            }
        }
    }

    outcome
}

fn apply_order(registry: &mut UnitRegistry, order: &Order) -> Result<(), OrderRejection> {
    let name = order.unit_name();

    let target = Coord::from_algebraic(&order.target.row, order.target.column).map_err(|_| {
        OrderRejection::InvalidCoordinate {
            unit: name.to_string(),
            square: format!("{}{}", order.target.row, order.target.column),
        }
    })?;

    let move_safely =
        parse_method(&order.method.method).ok_or_else(|| OrderRejection::UnknownMethod {
            unit: name.to_string(),
            method: order.method.method.clone(),
        })?;

    let unit = registry
        .id_by_name(name)
        .and_then(|id| registry.get_mut(id))
        .ok_or_else(|| OrderRejection::UnknownUnit(name.to_string()))?;

    unit.target = target;
    unit.move_safely = move_safely;
    tracing::debug!(unit = %name, target = %target.to_algebraic(), move_safely, "Order applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Fixed;
    use crate::units::{Faction, Unit, MAX_HEALTH};

    fn registry_with(names: &[&str]) -> UnitRegistry {
        let mut registry = UnitRegistry::new();
        for (i, name) in names.iter().enumerate() {
            let at = Coord::new(i as u32, 0);
            registry
                .insert(Unit {
                    id: i as u32 + 1,
                    faction: Faction::Friendly,
                    name: (*name).to_string(),
                    position: at,
                    target: at,
                    move_safely: true,
                    health: Fixed::from_num(MAX_HEALTH),
                    is_fighting: false,
                    ammo: 100,
                })
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_apply_sets_target_and_mode() {
        let mut registry = registry_with(&["AB", "CD"]);
        let batch = OrderBatch::new(vec![Order::new("AB", "C", 4, "fast")]);
        let outcome = apply_orders(&mut registry, &batch);

        assert_eq!(outcome.applied, 1);
        assert!(outcome.rejected.is_empty());
        let unit = registry.by_name("AB").unwrap();
        assert_eq!(unit.target, Coord::new(2, 3));
        assert!(!unit.move_safely);
        // Other attributes untouched.
        assert_eq!(unit.position, Coord::new(0, 0));
        assert_eq!(unit.health, Fixed::from_num(MAX_HEALTH));
        // Other units untouched.
        assert_eq!(registry.by_name("CD").unwrap().target, Coord::new(1, 0));
    }

    #[test]
    fn test_last_order_wins() {
        let mut registry = registry_with(&["AB"]);
        let batch = OrderBatch::new(vec![
            Order::new("AB", "C", 4, "fast"),
            Order::new("AB", "L", 12, "safe"),
        ]);
        apply_orders(&mut registry, &batch);
        let unit = registry.by_name("AB").unwrap();
        assert_eq!(unit.target, Coord::new(11, 11));
        assert!(unit.move_safely);
    }

    #[test]
    fn test_bad_orders_do_not_abort_batch() {
        let mut registry = registry_with(&["AB", "CD"]);
        let batch = OrderBatch::new(vec![
            Order::new("AB", "M", 1, "safe"),
            Order::new("ZZ", "B", 2, "safe"),
            Order::new("AB", "A", 13, "safe"),
            Order::new("CD", "B", 2, "sneaky"),
            Order::new("CD", "E", 5, "fast"),
        ]);
        let outcome = apply_orders(&mut registry, &batch);

        assert_eq!(outcome.applied, 1);
        let indices: Vec<_> = outcome.rejected.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(
            outcome.rejected[1].1,
            OrderRejection::UnknownUnit("ZZ".into())
        );
        assert_eq!(registry.by_name("AB").unwrap().target, Coord::new(0, 0));
        assert_eq!(registry.by_name("CD").unwrap().target, Coord::new(4, 4));
    }

    #[test]
    fn test_malformed_entry_keeps_its_position() {
        let mut registry = registry_with(&["AB", "CD"]);
        let batch = OrderBatch {
            orders: vec![Order::new("CD", "E", 5, "fast")],
            malformed: vec![(0, "invalid type: string \"4\", expected i64".into())],
        };
        assert_eq!(batch.len(), 2);

        let outcome = apply_orders(&mut registry, &batch);

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].0, 0);
        assert!(matches!(outcome.rejected[0].1, OrderRejection::Malformed(_)));
        assert_eq!(registry.by_name("AB").unwrap().target, Coord::new(0, 0));
        assert_eq!(registry.by_name("CD").unwrap().target, Coord::new(4, 4));
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(parse_method("safe"), Some(true));
        assert_eq!(parse_method("fast"), Some(false));
        assert_eq!(parse_method("Safe"), None);
    }
}
