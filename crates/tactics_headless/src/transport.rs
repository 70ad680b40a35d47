//! Outbound delivery with bounded retries.
//!
//! The decision-maker may not be listening yet when the runner wants to talk.
//! A [`Transport`] reports readiness; [`send_with_retry`] polls it at a fixed
//! interval and gives up after a bounded number of attempts, dropping the
//! message.

use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;

use crate::protocol::Outbound;

/// Error type for outbound delivery.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The transport never became ready.
    #[error("Transport unavailable after {attempts} attempts")]
    Unavailable {
        /// Attempts made.
        attempts: u32,
    },
    /// Writing failed.
    #[error("Failed to write message: {0}")]
    Io(#[from] io::Error),
}

/// A sink for protocol lines.
pub trait Transport {
    /// Whether a send would be accepted now.
    fn is_ready(&mut self) -> bool;

    /// Deliver one line (including its newline).
    fn send(&mut self, line: &str) -> Result<(), TransportError>;
}

/// Writes lines to any [`Write`], flushing after each.
#[derive(Debug)]
pub struct LineTransport<W: Write> {
    writer: W,
}

impl<W: Write> LineTransport<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl LineTransport<io::Stdout> {
    /// Transport on the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Transport for LineTransport<W> {
    fn is_ready(&mut self) -> bool {
        true
    }

    fn send(&mut self, line: &str) -> Result<(), TransportError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// How long to keep trying before dropping a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Readiness checks before giving up.
    pub attempts: u32,
    /// Pause between checks.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a policy. At least one attempt is always made.
    #[must_use]
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(120, Duration::from_secs(1))
    }
}

/// Send `message`, waiting for the transport to become ready.
///
/// Returns [`TransportError::Unavailable`] once the attempts are spent; the
/// message is then dropped.
pub async fn send_with_retry<T: Transport + ?Sized>(
    transport: &mut T,
    policy: &RetryPolicy,
    message: &Outbound,
) -> Result<(), TransportError> {
    let line = message.to_json_line();

    for attempt in 1..=policy.attempts {
        if transport.is_ready() {
            return transport.send(&line);
        }
        tracing::debug!(attempt, "Transport not ready");
        if attempt < policy.attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    tracing::warn!(attempts = policy.attempts, "Dropping message, transport unavailable");
    Err(TransportError::Unavailable {
        attempts: policy.attempts,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records lines; becomes ready after a number of polls.
    #[derive(Debug, Default)]
    pub(crate) struct MemoryTransport {
        pub(crate) lines: Vec<String>,
        pub(crate) ready_after: u32,
        pub(crate) polls: u32,
    }

    impl MemoryTransport {
        pub(crate) fn ready() -> Self {
            Self::default()
        }

        pub(crate) fn decoded(&self) -> Vec<serde_json::Value> {
            self.lines
                .iter()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    impl Transport for MemoryTransport {
        fn is_ready(&mut self) -> bool {
            self.polls += 1;
            self.polls > self.ready_after
        }

        fn send(&mut self, line: &str) -> Result<(), TransportError> {
            self.lines.push(line.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_line_transport_writes_lines() {
        let mut transport = LineTransport::new(Vec::new());
        transport.send("{\"a\":1}\n").unwrap();
        transport.send("{\"b\":2}\n").unwrap();
        assert_eq!(transport.into_inner(), b"{\"a\":1}\n{\"b\":2}\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_ready() {
        let mut transport = MemoryTransport {
            ready_after: 3,
            ..MemoryTransport::default()
        };
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));
        let start = tokio::time::Instant::now();

        send_with_retry(&mut transport, &policy, &Outbound::ready(0))
            .await
            .unwrap();

        assert_eq!(transport.polls, 4);
        assert_eq!(transport.lines.len(), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_at_attempt_bound() {
        let mut transport = MemoryTransport {
            ready_after: u32::MAX,
            ..MemoryTransport::default()
        };
        let policy = RetryPolicy::new(4, Duration::from_millis(250));

        let err = send_with_retry(&mut transport, &policy, &Outbound::ready(0))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Unavailable { attempts: 4 }));
        assert_eq!(transport.polls, 4);
        assert!(transport.lines.is_empty());
    }

    #[test]
    fn test_policy_makes_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts, 1);
    }
}
