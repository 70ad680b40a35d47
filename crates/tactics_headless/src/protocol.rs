//! JSON-lines protocol between the runner and the external decision-maker.
//!
//! **Input (stdin):** order batches and control commands
//! **Output (stdout):** snapshots, briefings and lifecycle messages
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! <- {"type":"game_state","tick":7,"units":[...],"messages":["AB has engaged the enemy!"]}
//! -> {"orders":[{"unit":{"id":{"name":"AB"}},"target":{"row":"C","column":4},"method":{"method":"safe"}}]}
//! -> {"command":"brief"}
//! <- {"type":"briefing","friends":[...],"enemies":[...]}
//! <- {"type":"game_over","reason":"all friendly units lost","survival_ticks":212}
//! ```

use serde::{Deserialize, Serialize};
use tactics_core::briefing::Briefing;
use tactics_core::math::ceil_u32;
use tactics_core::orders::{Order, OrderBatch};
use tactics_core::simulation::Simulation;
use tactics_core::units::Unit;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input (decision-maker -> runner)
// ============================================================================

/// A parsed input line.
///
/// Order entries are decoded one at a time: an entry with the wrong shape is
/// recorded in [`OrderBatch::malformed`] and the rest of the batch survives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawInbound")]
pub enum Inbound {
    /// New orders. Also lifts the pause.
    Orders(OrderBatch),
    /// Out-of-band request.
    Control(Control),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInbound {
    Orders(RawBatch),
    Control(Control),
}

/// Order batch with entries left undecoded.
#[derive(Deserialize)]
struct RawBatch {
    orders: Vec<serde_json::Value>,
}

impl RawBatch {
    fn decode(self) -> OrderBatch {
        let mut batch = OrderBatch::default();
        for (index, entry) in self.orders.into_iter().enumerate() {
            match serde_json::from_value::<Order>(entry) {
                Ok(order) => batch.orders.push(order),
                Err(err) => {
                    tracing::debug!(index, %err, "Order entry did not decode");
                    batch.malformed.push((index, err.to_string()));
                }
            }
        }
        batch
    }
}

impl From<RawInbound> for Inbound {
    fn from(raw: RawInbound) -> Self {
        match raw {
            RawInbound::Orders(batch) => Self::Orders(batch.decode()),
            RawInbound::Control(control) => Self::Control(control),
        }
    }
}

/// Control commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Control {
    /// Send a snapshot now.
    State,
    /// Send a briefing now.
    Brief,
    /// End the session.
    Quit,
}

impl Inbound {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.trim())
    }
}

// ============================================================================
// Output (runner -> decision-maker)
// ============================================================================

/// Messages sent by the runner, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Runner is ready.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
    },
    /// Full unit snapshot with the events that triggered it.
    GameState {
        /// Current tick.
        tick: u64,
        /// All units in id order.
        units: Vec<UnitState>,
        /// Event texts since the last snapshot.
        messages: Vec<String>,
    },
    /// Decision-layer situation report.
    Briefing(Briefing),
    /// The game has been lost.
    GameOver {
        /// Human-readable cause.
        reason: String,
        /// Ticks survived.
        survival_ticks: u64,
    },
    /// An input line could not be handled.
    Error {
        /// What went wrong.
        message: String,
    },
}

/// One unit as seen by the decision-maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitState {
    /// Stable id.
    pub id: u32,
    /// `"friendly"` or `"enemy"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Two-letter name.
    pub name: String,
    /// Current cell.
    pub location: Position,
    /// Target cell.
    pub target: Position,
    /// Health rounded up.
    pub health: u32,
    /// Carried ammunition.
    pub ammo: u32,
    /// Movement profile.
    pub move_safely: bool,
    /// Has been engaged at some point.
    pub is_fighting: bool,
}

/// Grid position on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl From<&Unit> for UnitState {
    fn from(unit: &Unit) -> Self {
        Self {
            id: unit.id,
            kind: unit.faction.as_str().to_string(),
            name: unit.name.clone(),
            location: Position {
                x: unit.position.x,
                y: unit.position.y,
            },
            target: Position {
                x: unit.target.x,
                y: unit.target.y,
            },
            health: ceil_u32(unit.health),
            ammo: unit.ammo,
            move_safely: unit.move_safely,
            is_fighting: unit.is_fighting,
        }
    }
}

impl Outbound {
    /// Create a ready message.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
        }
    }

    /// Snapshot of `sim` carrying `messages`.
    pub fn game_state(sim: &Simulation, messages: Vec<String>) -> Self {
        Self::GameState {
            tick: sim.get_tick(),
            units: sim.units().iter().map(UnitState::from).collect(),
            messages,
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to a JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}
