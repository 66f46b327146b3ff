//! Acquisition orchestrator.
//!
//! Drives one site session through the jurisdiction/search/result protocol
//! for an ordered list of securities. Jurisdiction state is reused across
//! consecutive securities so an unchanged country never pays a second
//! profile-selection round trip; a timeout anywhere in a security's
//! procedure reloads the page and reruns that security from the top, up to
//! the retry budget. One security's failure never aborts the batch.

pub mod retry;

use crate::config::FetchConfig;
use crate::model::{AcquisitionOutcome, JurisdictionProfile, RunSummary, Security};
use crate::runlog::EventLog;
use crate::session::{ResultProbe, SessionError, SitePort};
use crate::sink::DocumentSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use self::retry::{RetryError, RetryPolicy, RetryableOp};

/// Orchestrates the whole batch over one exclusive site session.
pub struct Orchestrator {
    port: Box<dyn SitePort>,
    sink: Box<dyn DocumentSink>,
    log: Box<dyn EventLog>,
    cfg: FetchConfig,
    /// The jurisdiction profile currently live on the site session.
    applied: Option<JurisdictionProfile>,
    processed: usize,
}

impl Orchestrator {
    pub fn new(
        port: Box<dyn SitePort>,
        sink: Box<dyn DocumentSink>,
        log: Box<dyn EventLog>,
        cfg: FetchConfig,
    ) -> Self {
        Self {
            port,
            sink,
            log,
            cfg,
            applied: None,
            processed: 0,
        }
    }

    /// Process every security strictly in input order, then release the
    /// session. The session is closed on the error path too; only failure
    /// to open it at all is batch-fatal.
    pub async fn run(mut self, securities: &[Security]) -> Result<RunSummary> {
        let opened = self.open_session().await;

        let outcome = match opened {
            Ok(()) => Ok(self.run_batch(securities).await),
            Err(e) => Err(e),
        };

        if let Err(e) = self.port.close().await {
            tracing::warn!("session close failed: {e}");
        }

        outcome
    }

    async fn open_session(&mut self) -> Result<()> {
        self.port
            .open(&self.cfg.base_url)
            .await
            .with_context(|| format!("failed to open site session at {}", self.cfg.base_url))?;
        self.port
            .dismiss_consent_if_present()
            .await
            .context("failed handling the consent banner")?;
        Ok(())
    }

    async fn run_batch(&mut self, securities: &[Security]) -> RunSummary {
        let mut summary = RunSummary::default();

        for security in securities {
            self.processed += 1;
            println!(
                "{}/{} - {} - {}",
                self.processed,
                securities.len(),
                security.isin,
                security.name
            );

            match self.process_security(security).await {
                SecurityResult::Stored => summary.stored += 1,
                SecurityResult::Exhausted => summary.exhausted += 1,
                SecurityResult::Abandoned => summary.abandoned += 1,
            }
        }

        summary
    }

    async fn process_security(&mut self, security: &Security) -> SecurityResult {
        let candidates = self.cfg.jurisdiction.candidate_sequence(&security.isin);
        let policy = RetryPolicy::new(self.cfg.max_retries);

        let mut op = AcquisitionAttempt {
            port: self.port.as_mut(),
            applied: &mut self.applied,
            candidates: &candidates,
            isin: &security.isin,
            stop_on_access_denied: self.cfg.stop_on_access_denied,
        };

        match policy.run(&mut op).await {
            Ok(AcquisitionOutcome::Resolved(link)) => {
                tracing::info!("resolved link for {}: {}", security.isin, link);
                match self.sink.deliver(&link, security).await {
                    Ok(filename) => {
                        println!("Saved '{filename}' for {}.", security.isin);
                        SecurityResult::Stored
                    }
                    Err(e) => {
                        // The link resolved, so other jurisdictions are not
                        // retried; the security counts as exhausted for
                        // this run.
                        self.log.log(&format!(
                            "Delivery failed for ISIN {}: {e}",
                            security.isin
                        ));
                        SecurityResult::Exhausted
                    }
                }
            }
            Ok(AcquisitionOutcome::Exhausted) => {
                self.log.log(&format!(
                    "No PDF found after trying all fallback countries for ISIN {}, skipping...",
                    security.isin
                ));
                SecurityResult::Exhausted
            }
            Err(RetryError::Exhausted { attempts }) => {
                self.log.log(&format!(
                    "Max retries ({attempts}) reached for ISIN {}.",
                    security.isin
                ));
                SecurityResult::Abandoned
            }
            Err(RetryError::Fatal(e)) => {
                self.log.log(&format!(
                    "Session failure for ISIN {}: {e}",
                    security.isin
                ));
                SecurityResult::Abandoned
            }
        }
    }
}

enum SecurityResult {
    Stored,
    Exhausted,
    Abandoned,
}

/// One full pass over the candidate jurisdictions for one security —
/// the unit the retry policy reruns after a reload.
struct AcquisitionAttempt<'a> {
    port: &'a mut dyn SitePort,
    applied: &'a mut Option<JurisdictionProfile>,
    candidates: &'a [String],
    isin: &'a str,
    stop_on_access_denied: bool,
}

#[async_trait]
impl RetryableOp for AcquisitionAttempt<'_> {
    type Output = AcquisitionOutcome;

    async fn attempt(&mut self) -> Result<AcquisitionOutcome, SessionError> {
        for code in self.candidates {
            // Selecting a jurisdiction invalidates the prior terms
            // acceptance, so select and accept always travel together —
            // and both are skipped when the profile is already live.
            let already_applied = self
                .applied
                .as_ref()
                .is_some_and(|p| p.country_code == *code);

            if !already_applied {
                let profile = JurisdictionProfile::professional(code.clone());
                self.port.select_jurisdiction(&profile).await?;
                self.port.accept_terms().await?;
                *self.applied = Some(profile);
            }

            self.port.search(self.isin).await?;

            match self.port.resolve_result_link().await? {
                ResultProbe::Document(url) => {
                    return Ok(AcquisitionOutcome::Resolved(url));
                }
                ResultProbe::NoResult => {
                    tracing::debug!("no document for {} under {}", self.isin, code);
                }
                ResultProbe::AccessDenied => {
                    tracing::debug!(
                        "document for {} restricted under {} profile",
                        self.isin,
                        code
                    );
                    if self.stop_on_access_denied {
                        return Ok(AcquisitionOutcome::Exhausted);
                    }
                }
            }
        }

        Ok(AcquisitionOutcome::Exhausted)
    }

    async fn recover(&mut self) -> Result<(), SessionError> {
        self.port.reload().await
    }
}
