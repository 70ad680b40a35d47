//! Headless runner for the grid tactics game.
//!
//! Drives the simulation on a timer and talks to an external
//! decision-maker over JSON lines:
//!
//! - **stdin**: order batches and control commands
//! - **stdout**: snapshots, briefings and lifecycle messages (JSON)
//! - **stderr**: logs (human-readable)
//!
//! See [`protocol`] for the message formats and [`session`] for the pause
//! and order-buffering rules.
//!
//! # Example
//!
//! ```bash
//! # Play the built-in scenario
//! cargo run -p tactics_headless -- run
//!
//! # Run 200 ticks back to back and print what happened
//! cargo run -p tactics_headless -- simulate --ticks 200 --seed 7
//!
//! # Check a scenario file
//! cargo run -p tactics_headless -- validate --scenario my_map.ron
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod transport;

pub use protocol::{Control, Inbound, Outbound};
pub use runner::{run_session, RunSummary, RunnerConfig};
pub use scenario::{Scenario, ScenarioError};
pub use session::{GameOver, Session, StepResult};
pub use transport::{LineTransport, RetryPolicy, Transport, TransportError};
