// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Bounded retry with exponential backoff.

use std::time::{Duration, Instant};

use crate::config::RetryPolicy;
use crate::error::LedgerError;

/// Runs `op` until it succeeds, fails permanently, runs out of attempts, or
/// the deadline (`now + timeout`) passes.
///
/// `op` receives the time left before the deadline so it can bound its own
/// request. Only `LedgerError::Unavailable` is retried; once attempts are
/// exhausted it surfaces as `LedgerError::Connection`.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    timeout: Duration,
    what: &str,
    mut op: impl FnMut(Duration) -> Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    let deadline = Instant::now() + timeout;
    let mut attempt: u32 = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(LedgerError::Connection {
                attempts: attempt,
                reason: format!("{}: deadline exceeded", what),
            });
        }

        attempt += 1;
        match op(remaining) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                if attempt >= policy.max_attempts {
                    return Err(LedgerError::Connection {
                        attempts: attempt,
                        reason: format!("{}: {}", what, err),
                    });
                }

                let delay = policy.backoff(attempt);
                if Instant::now() + delay >= deadline {
                    return Err(LedgerError::Connection {
                        attempts: attempt,
                        reason: format!("{}: {} (deadline exceeded before retry)", what, err),
                    });
                }

                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    err,
                    delay
                );
                metrics::increment_counter!("ledgerscope_transport_retries_total");
                std::thread::sleep(delay);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
        }
    }

    #[test]
    fn test_recovers_after_transient_failures() {
        let mut calls = 0;
        let result = with_retry(&fast_policy(), Duration::from_secs(5), "open", |_| {
            calls += 1;
            if calls < 3 {
                Err(LedgerError::Unavailable("connection refused".into()))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&fast_policy(), Duration::from_secs(5), "open", |_| {
            calls += 1;
            Err(LedgerError::Unavailable("connection refused".into()))
        });
        assert_eq!(calls, 3);
        match result {
            Err(LedgerError::Connection { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected connection error, got {:?}", other),
        }
    }

    #[test]
    fn test_protocol_errors_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&fast_policy(), Duration::from_secs(5), "fetch", |_| {
            calls += 1;
            Err(LedgerError::Protocol("truncated body".into()))
        });
        assert_eq!(calls, 1);
        assert_eq!(result, Err(LedgerError::Protocol("truncated body".into())));
    }

    #[test]
    fn test_deadline_stops_retries() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(50),
        };
        let mut calls = 0;
        let result: Result<(), _> = with_retry(&policy, Duration::from_millis(20), "fetch", |_| {
            calls += 1;
            Err(LedgerError::Unavailable("timed out".into()))
        });
        assert_eq!(calls, 1);
        assert!(matches!(result, Err(LedgerError::Connection { attempts: 1, .. })));
    }
}
