//! Page-settle wait with bounded reload recovery.
//!
//! Used only inside result resolution: wait for the page to settle; on
//! timeout reload and wait again; once the reload budget is spent, report
//! "not settled" instead of an error, so the caller can treat the page as
//! an empty result list and let the jurisdiction fallback loop continue.
//! The policy knows nothing about browsers and is exercised in tests with
//! scripted operations.

use super::SessionError;
use async_trait::async_trait;

/// One settle-wait/reload pair the recovery loop can drive.
#[async_trait]
pub trait SettleOp: Send {
    /// One bounded wait. `Ok(true)` means the page settled, `Ok(false)`
    /// means the wait timed out.
    async fn wait(&mut self) -> Result<bool, SessionError>;

    /// Full page reload between waits.
    async fn reload(&mut self) -> Result<(), SessionError>;
}

/// Wait for the page to settle, reloading between timed-out waits up to
/// `max_reloads` times. A spent budget yields `Ok(false)`, never a
/// timeout error; driver failures pass through.
pub async fn settle_with_reloads<O: SettleOp>(
    op: &mut O,
    max_reloads: u32,
) -> Result<bool, SessionError> {
    for attempt in 0..=max_reloads {
        if op.wait().await? {
            return Ok(true);
        }
        if attempt < max_reloads {
            tracing::debug!("settle wait timed out, reloading (attempt {})", attempt + 1);
            op.reload().await?;
        }
    }
    tracing::warn!("page never settled after {max_reloads} reloads");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Scripted {
        waits: VecDeque<Result<bool, SessionError>>,
        wait_calls: u32,
        reloads: u32,
        reload_result: Option<SessionError>,
    }

    impl Scripted {
        fn new(waits: Vec<Result<bool, SessionError>>) -> Self {
            Self {
                waits: waits.into(),
                wait_calls: 0,
                reloads: 0,
                reload_result: None,
            }
        }
    }

    #[async_trait]
    impl SettleOp for Scripted {
        async fn wait(&mut self) -> Result<bool, SessionError> {
            self.wait_calls += 1;
            self.waits.pop_front().unwrap_or(Ok(false))
        }

        async fn reload(&mut self) -> Result<(), SessionError> {
            self.reloads += 1;
            match self.reload_result.take() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_immediate_settle_never_reloads() {
        let mut op = Scripted::new(vec![Ok(true)]);
        assert!(settle_with_reloads(&mut op, 2).await.unwrap());
        assert_eq!(op.wait_calls, 1);
        assert_eq!(op.reloads, 0);
    }

    #[tokio::test]
    async fn test_timeout_then_settle_reloads_once() {
        let mut op = Scripted::new(vec![Ok(false), Ok(true)]);
        assert!(settle_with_reloads(&mut op, 2).await.unwrap());
        assert_eq!(op.wait_calls, 2);
        assert_eq!(op.reloads, 1);
    }

    #[tokio::test]
    async fn test_all_timeouts_degrade_to_not_settled() {
        // Budget of 2 reloads: three waits, two reloads, then a clean
        // false — no timeout error surfaces.
        let mut op = Scripted::new(vec![]);
        let settled = settle_with_reloads(&mut op, 2).await.unwrap();
        assert!(!settled);
        assert_eq!(op.wait_calls, 3);
        assert_eq!(op.reloads, 2);
    }

    #[tokio::test]
    async fn test_zero_budget_waits_once() {
        let mut op = Scripted::new(vec![]);
        let settled = settle_with_reloads(&mut op, 0).await.unwrap();
        assert!(!settled);
        assert_eq!(op.wait_calls, 1);
        assert_eq!(op.reloads, 0);
    }

    #[tokio::test]
    async fn test_wait_error_passes_through() {
        let mut op = Scripted::new(vec![Err(SessionError::Driver {
            op: "resolve_result_link",
            message: "page crashed".into(),
        })]);
        let err = settle_with_reloads(&mut op, 2).await.unwrap_err();
        assert!(matches!(err, SessionError::Driver { .. }));
        assert_eq!(op.reloads, 0);
    }

    #[tokio::test]
    async fn test_reload_error_passes_through() {
        let mut op = Scripted::new(vec![Ok(false)]);
        op.reload_result = Some(SessionError::Driver {
            op: "reload",
            message: "connection lost".into(),
        });
        let err = settle_with_reloads(&mut op, 2).await.unwrap_err();
        assert!(matches!(err, SessionError::Driver { op: "reload", .. }));
        assert_eq!(op.wait_calls, 1);
    }
}
