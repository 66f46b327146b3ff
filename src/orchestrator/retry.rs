//! Bounded retry with a recovery action between attempts.
//!
//! The per-security procedure is wrapped in this policy: a timeout from
//! any session operation triggers the recovery action (a page reload) and
//! a rerun of the whole procedure, up to the attempt budget. The policy
//! knows nothing about browsers — it is exercised in tests with scripted
//! operations.

use crate::session::SessionError;
use async_trait::async_trait;
use thiserror::Error;

/// An operation the retry policy can rerun after recovery.
#[async_trait]
pub trait RetryableOp: Send {
    type Output;

    /// One full attempt of the wrapped procedure.
    async fn attempt(&mut self) -> Result<Self::Output, SessionError>;

    /// Recovery between attempts (page reload).
    async fn recover(&mut self) -> Result<(), SessionError>;
}

/// Why the policy gave up.
#[derive(Debug, Error)]
pub enum RetryError {
    /// Every attempt timed out; `attempts` were made in total.
    #[error("gave up after {attempts} attempts, all timed out")]
    Exhausted { attempts: u32 },
    /// A non-timeout failure, surfaced immediately without retry.
    #[error(transparent)]
    Fatal(SessionError),
}

/// Runs an operation up to `max_attempts` times, recovering between
/// attempts on timeout. Only timeouts are retried; anything else is fatal
/// for the operation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn run<O: RetryableOp>(&self, op: &mut O) -> Result<O::Output, RetryError> {
        let mut attempts = 0;
        while attempts < self.max_attempts {
            match op.attempt().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_timeout() => {
                    attempts += 1;
                    tracing::warn!(
                        "attempt {attempts}/{} timed out ({e}), recovering",
                        self.max_attempts
                    );
                    op.recover().await.map_err(RetryError::Fatal)?;
                }
                Err(e) => return Err(RetryError::Fatal(e)),
            }
        }
        Err(RetryError::Exhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        results: VecDeque<Result<u32, SessionError>>,
        attempts: u32,
        recoveries: u32,
    }

    impl Scripted {
        fn new(results: Vec<Result<u32, SessionError>>) -> Self {
            Self {
                results: results.into(),
                attempts: 0,
                recoveries: 0,
            }
        }
    }

    #[async_trait]
    impl RetryableOp for Scripted {
        type Output = u32;

        async fn attempt(&mut self) -> Result<u32, SessionError> {
            self.attempts += 1;
            self.results
                .pop_front()
                .unwrap_or(Err(SessionError::Timeout { op: "scripted" }))
        }

        async fn recover(&mut self) -> Result<(), SessionError> {
            self.recoveries += 1;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_success_first_try_never_recovers() {
        let mut op = Scripted::new(vec![Ok(7)]);
        let got = RetryPolicy::new(2).run(&mut op).await.unwrap();
        assert_eq!(got, 7);
        assert_eq!(op.attempts, 1);
        assert_eq!(op.recoveries, 0);
    }

    #[tokio::test]
    async fn test_one_timeout_then_success_is_transparent() {
        let mut op = Scripted::new(vec![
            Err(SessionError::Timeout { op: "search" }),
            Ok(7),
        ]);
        let got = RetryPolicy::new(2).run(&mut op).await.unwrap();
        assert_eq!(got, 7);
        assert_eq!(op.attempts, 2);
        assert_eq!(op.recoveries, 1);
    }

    #[tokio::test]
    async fn test_all_timeouts_exhausts_after_budget() {
        let mut op = Scripted::new(vec![]);
        let err = RetryPolicy::new(2).run(&mut op).await.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 2 }));
        assert_eq!(op.attempts, 2);
        assert_eq!(op.recoveries, 2);
    }

    #[tokio::test]
    async fn test_driver_error_is_fatal_without_retry() {
        let mut op = Scripted::new(vec![Err(SessionError::Driver {
            op: "search",
            message: "page crashed".into(),
        })]);
        let err = RetryPolicy::new(2).run(&mut op).await.unwrap_err();
        assert!(matches!(err, RetryError::Fatal(_)));
        assert_eq!(op.attempts, 1);
        assert_eq!(op.recoveries, 0);
    }
}
