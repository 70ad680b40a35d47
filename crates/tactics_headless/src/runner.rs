//! Timer-driven game loop.
//!
//! A single-threaded tokio loop multiplexes two sources: an interval that
//! drives ticks, and a channel of input lines fed by a stdin reader task.
//! Ticks are synchronous calls without await points, so a tick always runs
//! to completion before the next input line is looked at.

use std::time::Duration;

use tactics_core::rng::MoveRoll;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::protocol::{Control, Inbound, Outbound};
use crate::session::{GameOver, Session, StepResult};
use crate::transport::{send_with_retry, RetryPolicy, Transport};

/// Input lines buffered between the reader task and the loop.
const INPUT_BUFFER: usize = 64;

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Send a snapshot after every tick, not only after eventful ones.
    pub auto_state: bool,
    /// Delivery retries.
    pub retry: RetryPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            auto_state: false,
            retry: RetryPolicy::default(),
        }
    }
}

/// What a finished run looked like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks simulated.
    pub ticks: u64,
    /// Set if the game was lost.
    pub game_over: Option<GameOver>,
    /// Messages dropped because the transport never became ready.
    pub dropped: usize,
    /// Final state hash.
    pub state_hash: u64,
}

enum Flow {
    Continue,
    Quit,
}

/// Forward stdin lines into a channel from a background task.
///
/// The channel closes when stdin reaches end of file.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(%err, "Failed to read stdin");
                    break;
                }
            }
        }
    });
    rx
}

struct Runner<'a, T: Transport + ?Sized> {
    transport: &'a mut T,
    config: &'a RunnerConfig,
    dropped: usize,
}

impl<T: Transport + ?Sized> Runner<'_, T> {
    async fn deliver(&mut self, message: &Outbound) {
        if let Err(err) = send_with_retry(&mut *self.transport, &self.config.retry, message).await {
            tracing::warn!(%err, "Message dropped");
            self.dropped += 1;
        }
    }

    async fn handle_line<R: MoveRoll>(&mut self, session: &mut Session<R>, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        match Inbound::from_json(line) {
            Ok(Inbound::Orders(batch)) => {
                session.receive_orders(batch);
                Flow::Continue
            }
            Ok(Inbound::Control(Control::State)) => {
                self.deliver(&session.snapshot(Vec::new())).await;
                Flow::Continue
            }
            Ok(Inbound::Control(Control::Brief)) => {
                self.deliver(&session.briefing()).await;
                Flow::Continue
            }
            Ok(Inbound::Control(Control::Quit)) => {
                tracing::info!("Quit requested");
                Flow::Quit
            }
            Err(err) => {
                tracing::warn!(%err, "Unreadable input line");
                self.deliver(&Outbound::error(format!("Invalid input: {err}")))
                    .await;
                Flow::Continue
            }
        }
    }
}

/// Drive `session` until the game ends, `quit` arrives or input closes.
pub async fn run_session<R, T>(
    mut session: Session<R>,
    transport: &mut T,
    mut inbound: mpsc::Receiver<String>,
    config: &RunnerConfig,
) -> RunSummary
where
    R: MoveRoll,
    T: Transport + ?Sized,
{
    let mut runner = Runner {
        transport,
        config,
        dropped: 0,
    };
    runner
        .deliver(&Outbound::ready(session.simulation().get_tick()))
        .await;

    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately.
    ticker.tick().await;

    tracing::info!(interval_ms = config.tick_interval.as_millis() as u64, "Session started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match session.step() {
                    StepResult::Paused => {}
                    StepResult::Finished => break,
                    StepResult::Ticked(report) => {
                        if !report.is_silent() || config.auto_state {
                            runner.deliver(&session.snapshot(report.messages())).await;
                        }
                        if let Some(over) = session.game_over() {
                            let message = over.to_outbound();
                            runner.deliver(&message).await;
                            break;
                        }
                    }
                }
            }
            line = inbound.recv() => {
                let Some(line) = line else {
                    tracing::info!("Input closed");
                    break;
                };
                if let Flow::Quit = runner.handle_line(&mut session, &line).await {
                    break;
                }
            }
        }
    }

    let sim = session.simulation();
    RunSummary {
        ticks: sim.get_tick(),
        game_over: session.game_over().cloned(),
        dropped: runner.dropped,
        state_hash: sim.state_hash(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests::MemoryTransport;
    use tactics_core::grid::{Coord, TerrainGrid, TerrainKind};
    use tactics_core::math::Fixed;
    use tactics_core::rng::ScriptedRoll;
    use tactics_core::rules::Rules;
    use tactics_core::simulation::Simulation;
    use tactics_core::units::{Faction, UnitSpawn};

    fn session(spawns: Vec<UnitSpawn>) -> Session<ScriptedRoll> {
        let mut grid = TerrainGrid::filled(12, 12, TerrainKind::Ground);
        grid.set_terrain(Coord::new(0, 0), TerrainKind::Base);
        let mut sim = Simulation::new(grid, Rules::default());
        for spawn in spawns {
            sim.spawn_unit(spawn).unwrap();
        }
        Session::new(sim, ScriptedRoll::always(Fixed::ZERO))
    }

    fn config() -> RunnerConfig {
        RunnerConfig {
            tick_interval: Duration::from_millis(1000),
            auto_state: false,
            retry: RetryPolicy::new(3, Duration::from_millis(10)),
        }
    }

    fn types(transport: &MemoryTransport) -> Vec<String> {
        transport
            .decoded()
            .iter()
            .map(|v| v["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_game_over() {
        let session = session(vec![
            UnitSpawn::new(Faction::Friendly, "AB", Coord::new(11, 0)),
            UnitSpawn::new(Faction::Enemy, "XX", Coord::new(2, 0)).with_target(Coord::new(0, 0)),
        ]);
        let mut transport = MemoryTransport::ready();
        let (_tx, rx) = mpsc::channel(4);
        let start = tokio::time::Instant::now();

        let summary = run_session(session, &mut transport, rx, &config()).await;

        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.game_over.unwrap().survival_ticks, 2);
        assert_eq!(summary.dropped, 0);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(types(&transport), vec!["ready", "game_over"]);
        assert_eq!(transport.decoded()[1]["survival_ticks"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pauses_until_orders_arrive() {
        let session = session(vec![
            UnitSpawn::new(Faction::Friendly, "AB", Coord::new(5, 5)),
            UnitSpawn::new(Faction::Enemy, "XX", Coord::new(5, 6)),
        ]);
        let mut transport = MemoryTransport::ready();
        let (tx, rx) = mpsc::channel(4);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(4500)).await;
            tx.send(r#"{"orders":[]}"#.to_string()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(1000)).await;
            tx.send(r#"{"command":"quit"}"#.to_string()).await.unwrap();
        });

        let summary = run_session(session, &mut transport, rx, &config()).await;

        // Tick 1 at 1s pauses; orders at 4.5s allow tick 2 at 5s; quit at 5.5s.
        assert_eq!(summary.ticks, 2);
        assert!(summary.game_over.is_none());
        assert_eq!(types(&transport), vec!["ready", "game_state", "game_state"]);
        let first = &transport.decoded()[1];
        assert_eq!(first["tick"], 1);
        assert_eq!(first["messages"][0], "AB has engaged the enemy!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_commands_and_bad_input() {
        let session = session(vec![UnitSpawn::new(Faction::Friendly, "AB", Coord::new(5, 5))]);
        let mut transport = MemoryTransport::ready();
        let (tx, rx) = mpsc::channel(8);
        for line in [
            r#"{"command":"state"}"#,
            "",
            "garbage",
            r#"{"command":"brief"}"#,
            r#"{"command":"quit"}"#,
        ] {
            tx.send(line.to_string()).await.unwrap();
        }

        let summary = run_session(session, &mut transport, rx, &config()).await;

        assert_eq!(summary.ticks, 0);
        assert_eq!(
            types(&transport),
            vec!["ready", "game_state", "error", "briefing"]
        );
        assert_eq!(transport.decoded()[3]["friends"][0]["name"], "AB");
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_state_and_closed_input() {
        let session = session(vec![UnitSpawn::new(Faction::Friendly, "AB", Coord::new(5, 5))]);
        let mut transport = MemoryTransport::ready();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            drop(tx);
        });

        let config = RunnerConfig {
            auto_state: true,
            ..config()
        };
        let summary = run_session(session, &mut transport, rx, &config).await;

        assert_eq!(summary.ticks, 3);
        assert_eq!(
            types(&transport),
            vec!["ready", "game_state", "game_state", "game_state"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_transport_drops_messages() {
        let session = session(vec![UnitSpawn::new(Faction::Friendly, "AB", Coord::new(5, 5))]);
        let mut transport = MemoryTransport {
            ready_after: u32::MAX,
            ..MemoryTransport::default()
        };
        let (tx, rx) = mpsc::channel(4);
        tx.send(r#"{"command":"quit"}"#.to_string()).await.unwrap();

        let summary = run_session(session, &mut transport, rx, &config()).await;

        // Only the ready message was attempted.
        assert_eq!(summary.dropped, 1);
        assert!(transport.lines.is_empty());
    }
}
