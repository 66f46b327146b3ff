//! Jurisdiction candidate derivation.
//!
//! The ISIN's two-letter prefix picks the primary investor-country
//! profile. Prefixes the site does not offer are substituted with a
//! configured default before any site interaction. After the primary
//! fails, a fixed fallback sequence is tried in order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Country codes the site's jurisdiction picker actually offers.
///
/// Selecting anything outside this set is never attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedCountrySet(BTreeSet<String>);

impl SupportedCountrySet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }
}

impl Default for SupportedCountrySet {
    fn default() -> Self {
        Self::new([
            "CH", "DE", "GB", "AT", "BE", "CY", "CZ", "DK", "FI", "FR", "GR", "HK", "HU", "IS",
            "IE", "IT", "LI", "LU", "MT", "NL", "NO", "PT", "SG", "ES", "SE",
        ])
    }
}

/// Static jurisdiction rules: supported set, default substitute, fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionRules {
    #[serde(default)]
    pub supported: SupportedCountrySet,
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_fallbacks")]
    pub fallback_sequence: Vec<String>,
}

fn default_country() -> String {
    "GB".to_string()
}

fn default_fallbacks() -> Vec<String> {
    vec!["GB".into(), "LU".into(), "DE".into(), "CH".into()]
}

impl Default for JurisdictionRules {
    fn default() -> Self {
        Self {
            supported: SupportedCountrySet::default(),
            default_country: default_country(),
            fallback_sequence: default_fallbacks(),
        }
    }
}

impl JurisdictionRules {
    /// The first candidate for an ISIN: its prefix if the site offers it,
    /// the configured default otherwise.
    pub fn primary_code(&self, isin: &str) -> String {
        let prefix: String = isin.chars().take(2).collect();
        if self.supported.contains(&prefix) {
            prefix
        } else {
            self.default_country.clone()
        }
    }

    /// Full candidate order for an ISIN: primary, then the fallback
    /// sequence verbatim. Duplicates are kept — a repeated code costs one
    /// redundant search but no profile reselect, since the orchestrator
    /// skips selection when the code already matches the applied profile.
    pub fn candidate_sequence(&self, isin: &str) -> Vec<String> {
        let mut seq = Vec::with_capacity(1 + self.fallback_sequence.len());
        seq.push(self.primary_code(isin));
        seq.extend(self.fallback_sequence.iter().cloned());
        seq
    }
}
