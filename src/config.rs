//! Runtime configuration.
//!
//! Loaded from an optional JSON file; every field has a default so a bare
//! `factfetch fetch --sources funds.json --base-url https://...` works.

use crate::jurisdiction::JurisdictionRules;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Full configuration for one fetch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Entry URL of the gated fund site.
    pub base_url: String,
    /// Jurisdiction rules: supported set, default substitute, fallbacks.
    pub jurisdiction: JurisdictionRules,
    /// Attempts per security before it is abandoned (reload between them).
    pub max_retries: u32,
    /// Bound on the network-idle wait inside result resolution.
    pub network_idle_timeout_ms: u64,
    /// Bound on element-appearance waits (consent banner, pickers, search).
    pub short_wait_timeout_ms: u64,
    /// Bound on one PDF download request.
    pub download_timeout_ms: u64,
    /// Reload attempts inside the network-idle wait before degrading to
    /// "no result".
    pub idle_reload_attempts: u32,
    /// When true, a result row flagged "not available to this investor"
    /// ends the candidate loop instead of trying further jurisdictions.
    pub stop_on_access_denied: bool,
    /// Directory downloaded PDFs are written to.
    pub download_dir: PathBuf,
    /// SQLite database holding document records.
    pub db_path: PathBuf,
    /// Append-only run log.
    pub log_path: PathBuf,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            jurisdiction: JurisdictionRules::default(),
            max_retries: 2,
            network_idle_timeout_ms: 10_000,
            short_wait_timeout_ms: 5_000,
            download_timeout_ms: 30_000,
            idle_reload_attempts: 2,
            stop_on_access_denied: false,
            download_dir: PathBuf::from("."),
            db_path: PathBuf::from("factsheets.db"),
            log_path: PathBuf::from("factfetch.log"),
        }
    }
}

impl FetchConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = FetchConfig::default();
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.idle_reload_attempts, 2);
        assert_eq!(cfg.download_timeout_ms, 30_000);
        assert!(!cfg.stop_on_access_denied);
        assert_eq!(cfg.jurisdiction.default_country, "GB");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: FetchConfig = serde_json::from_str(
            r#"{"base_url": "https://funds.example", "max_retries": 3}"#,
        )
        .unwrap();
        assert_eq!(parsed.base_url, "https://funds.example");
        assert_eq!(parsed.max_retries, 3);
        assert_eq!(parsed.network_idle_timeout_ms, 10_000);
        assert_eq!(parsed.download_timeout_ms, 30_000);
        assert_eq!(
            parsed.jurisdiction.fallback_sequence,
            ["GB", "LU", "DE", "CH"]
        );
    }
}
