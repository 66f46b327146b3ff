//! Site session abstraction.
//!
//! Defines the `SitePort` trait that the orchestrator drives, abstracting
//! over the browser engine (currently Chromium via chromiumoxide). One
//! port wraps one already-open page; every operation is awaited and either
//! succeeds or fails within a bounded time.

pub mod chromium;
pub mod locators;
pub mod settle;

use crate::model::JurisdictionProfile;
use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a site session operation.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A bounded wait for page or element readiness expired. Recoverable:
    /// the orchestrator reloads the page and reruns the security.
    #[error("timed out waiting for {op}")]
    Timeout { op: &'static str },

    /// The browser driver itself failed (CDP error, page crash). Not
    /// recoverable by a reload; the security is abandoned.
    #[error("browser driver error during {op}: {message}")]
    Driver { op: &'static str, message: String },
}

impl SessionError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SessionError::Timeout { .. })
    }
}

/// What the result list showed after a search.
///
/// `NoResult` and `AccessDenied` are normal control flow — they drive the
/// fallback-jurisdiction loop and are never errors on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultProbe {
    /// A downloadable document with its href.
    Document(String),
    /// No result row, or the row's empty marker was set.
    NoResult,
    /// The row exists but is flagged unavailable to this investor profile.
    AccessDenied,
}

/// One live session against the gated fund site.
///
/// The adapter performs no retries of its own for selection, consent,
/// terms, or search — retry policy belongs to the orchestrator. The one
/// exception is the network-idle wait inside [`resolve_result_link`],
/// which reloads and re-waits a bounded number of times because that
/// instability is a property of page loading, not of the business flow.
///
/// [`resolve_result_link`]: SitePort::resolve_result_link
#[async_trait]
pub trait SitePort: Send {
    /// Navigate to the entry page and block until it reports loaded.
    async fn open(&mut self, base_url: &str) -> Result<(), SessionError>;

    /// Dismiss the cookie banner if it shows up within the short wait.
    /// The banner is optional; its absence is a no-op, never an error.
    async fn dismiss_consent_if_present(&mut self) -> Result<(), SessionError>;

    /// Open the jurisdiction picker, choose the profile's country, then
    /// its investor type. Idempotent: re-selecting the same profile lands
    /// in the same end state without error.
    async fn select_jurisdiction(
        &mut self,
        profile: &JurisdictionProfile,
    ) -> Result<(), SessionError>;

    /// Toggle the terms-of-service acknowledgment and confirm. Required
    /// after every jurisdiction change — changing jurisdiction invalidates
    /// any earlier acceptance.
    async fn accept_terms(&mut self) -> Result<(), SessionError>;

    /// Enter the ISIN in the search control and submit.
    async fn search(&mut self, isin: &str) -> Result<(), SessionError>;

    /// Wait for the results page to settle, then inspect the result list.
    async fn resolve_result_link(&mut self) -> Result<ResultProbe, SessionError>;

    /// Full page reload, used by the orchestrator's timeout recovery.
    async fn reload(&mut self) -> Result<(), SessionError>;

    /// Release the session and its browser resources.
    async fn close(self: Box<Self>) -> Result<(), SessionError>;
}
