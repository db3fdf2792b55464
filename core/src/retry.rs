//! Retry policy for transport failures.

use crate::error::TransportError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Bounded retry policy used by `Endpoint`.
///
/// Attempts are retried back to back; the transport's own timeout is the
/// only pacing. Attempt counts live in the dispatching call, never in the
/// policy or the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Decide whether another attempt should follow failed attempt number
    /// `attempt` (1-based).
    pub fn should_retry(&self, err: &TransportError, attempt: u32) -> bool {
        attempt < self.max_attempts && err.is_retryable()
    }
}
