//! Core data types for a factsheet acquisition run.

use serde::{Deserialize, Serialize};

/// One security to fetch a factsheet for.
///
/// Constructed once from the sources file and read-only afterwards. The
/// first two characters of `isin` encode an ISO 3166-1 alpha-2 country
/// code, which is the primary jurisdiction signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    /// ISIN per ISO 6166 (12 characters).
    pub isin: String,
    /// Display name of the fund.
    pub name: String,
    /// Opaque handle the document store attributes the file to.
    /// Defaults to the ISIN when the sources file omits it.
    #[serde(default)]
    pub record_ref: Option<String>,
}

impl Security {
    pub fn new(isin: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            isin: isin.into(),
            name: name.into(),
            record_ref: None,
        }
    }

    /// The handle persisted as source attribution.
    pub fn record_ref(&self) -> &str {
        self.record_ref.as_deref().unwrap_or(&self.isin)
    }
}

/// Investor category the site gates content by.
///
/// The site offers retail and professional; this tool always selects
/// professional, but the profile keeps the axis explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvestorType {
    Professional,
}

/// The jurisdiction selection mirrored onto the live site session.
///
/// Owned exclusively by the orchestrator; the live page's visible profile
/// equals the last-applied profile except while a selection is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JurisdictionProfile {
    pub country_code: String,
    pub investor_type: InvestorType,
}

impl JurisdictionProfile {
    pub fn professional(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            investor_type: InvestorType::Professional,
        }
    }
}

/// Terminal outcome of processing one security.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// A downloadable document link was found under some jurisdiction.
    Resolved(String),
    /// No document under the primary or any fallback jurisdiction.
    Exhausted,
}

/// Batch totals returned by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Securities whose document was resolved and stored.
    pub stored: usize,
    /// Securities with no document under any candidate jurisdiction.
    pub exhausted: usize,
    /// Securities abandoned after the retry budget or a hard failure.
    pub abandoned: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.stored + self.exhausted + self.abandoned
    }
}
