//! One game between the runner and the decision-maker.
//!
//! The session owns the simulation and everything around a tick that is not
//! rules: buffered orders, the pause flag, enemy waves and the end of the
//! game.
//!
//! - Orders received between ticks are buffered and applied at the start of
//!   the next tick, never to a tick in progress.
//! - Any tick that produces events pauses the session until the next order
//!   batch arrives.
//! - Enemy waves land before the tick on every multiple of the wave period.
//! - Once the game is lost the session stops ticking.

use tactics_core::briefing::Briefing;
use tactics_core::orders::OrderBatch;
use tactics_core::rng::MoveRoll;
use tactics_core::simulation::{NarrativeEvent, Outcome, Simulation, TickReport};
use tactics_core::units::{Faction, UnitSpawn};

use crate::protocol::Outbound;
use crate::scenario::Waves;

/// How a finished game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOver {
    /// Human-readable cause.
    pub reason: String,
    /// Ticks survived.
    pub survival_ticks: u64,
}

impl GameOver {
    /// The protocol message for this ending.
    pub fn to_outbound(&self) -> Outbound {
        Outbound::GameOver {
            reason: self.reason.clone(),
            survival_ticks: self.survival_ticks,
        }
    }
}

/// Result of asking the session to advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    /// Waiting for orders.
    Paused,
    /// The game already ended.
    Finished,
    /// A tick ran.
    Ticked(TickReport),
}

/// A running game.
pub struct Session<R: MoveRoll> {
    sim: Simulation,
    roll: R,
    waves: Option<Waves>,
    pending: Vec<OrderBatch>,
    paused: bool,
    over: Option<GameOver>,
}

impl<R: MoveRoll> Session<R> {
    /// Start a session. It begins unpaused.
    pub fn new(sim: Simulation, roll: R) -> Self {
        Self {
            sim,
            roll,
            waves: None,
            pending: Vec::new(),
            paused: false,
            over: None,
        }
    }

    /// Enable periodic enemy landings.
    #[must_use]
    pub fn with_waves(mut self, waves: Option<Waves>) -> Self {
        self.waves = waves;
        self
    }

    /// The simulation as of the last tick.
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether the session waits for orders.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// How the game ended, if it has.
    pub fn game_over(&self) -> Option<&GameOver> {
        self.over.as_ref()
    }

    /// Number of batches waiting for the next tick.
    pub fn pending_batches(&self) -> usize {
        self.pending.len()
    }

    /// Buffer a batch for the next tick and lift the pause.
    pub fn receive_orders(&mut self, batch: OrderBatch) {
        tracing::debug!(orders = batch.len(), "Orders buffered");
        self.pending.push(batch);
        if self.paused {
            tracing::info!(tick = self.sim.get_tick(), "Resuming");
        }
        self.paused = false;
    }

    /// Run one tick unless paused or finished.
    pub fn step(&mut self) -> StepResult {
        if self.over.is_some() {
            return StepResult::Finished;
        }
        if self.paused {
            return StepResult::Paused;
        }
        StepResult::Ticked(self.advance())
    }

    /// Run one tick regardless of the pause. Does nothing once finished.
    pub fn force_step(&mut self) -> Option<TickReport> {
        if self.over.is_some() {
            return None;
        }
        Some(self.advance())
    }

    fn advance(&mut self) -> TickReport {
        for batch in self.pending.drain(..) {
            let outcome = self.sim.apply_orders(&batch);
            tracing::debug!(
                applied = outcome.applied,
                rejected = outcome.rejected.len(),
                "Orders applied"
            );
        }

        let mut events = self.land_wave();
        let mut report = self.sim.tick(&mut self.roll);
        events.append(&mut report.events);
        report.events = events;

        if !report.is_silent() {
            tracing::info!(tick = report.tick, events = report.events.len(), "Pausing for orders");
            self.paused = true;
        }

        if let Outcome::Defeat(reason) = self.sim.outcome() {
            let over = GameOver {
                reason: reason.to_string(),
                survival_ticks: self.sim.get_tick(),
            };
            tracing::info!(reason = %over.reason, survival_ticks = over.survival_ticks, "Game over");
            self.over = Some(over);
        }

        report
    }

    fn land_wave(&mut self) -> Vec<NarrativeEvent> {
        let Some(waves) = self.waves else {
            return Vec::new();
        };
        let tick = self.sim.get_tick();
        if tick == 0 || tick.checked_rem(waves.every_ticks) != Some(0) {
            return Vec::new();
        }
        if self.sim.units().is_occupied_by(waves.spawn, Faction::Enemy) {
            tracing::debug!(tick, at = %waves.spawn, "Landing zone held, wave skipped");
            return Vec::new();
        }
        let Some(name) = self.sim.units().next_free_name() else {
            tracing::debug!(tick, "No free unit names, wave skipped");
            return Vec::new();
        };

        let spawn = UnitSpawn::new(Faction::Enemy, name, waves.spawn)
            .with_target(waves.target)
            .with_health(waves.health)
            .with_move_safely(waves.move_safely);
        match self.sim.land_unit(spawn) {
            Ok(landing) => {
                tracing::info!(tick, id = landing.id, "Enemy wave landed");
                landing.overrun.into_iter().collect()
            }
            Err(err) => {
                tracing::warn!(tick, %err, "Enemy wave rejected");
                Vec::new()
            }
        }
    }

    /// Snapshot message carrying `messages`.
    pub fn snapshot(&self, messages: Vec<String>) -> Outbound {
        Outbound::game_state(&self.sim, messages)
    }

    /// Briefing message.
    pub fn briefing(&self) -> Outbound {
        Outbound::Briefing(Briefing::from_simulation(&self.sim))
    }
}
