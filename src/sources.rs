//! Sources file loading.
//!
//! The input is a JSON array of securities:
//! `[{"isin": "IE00B4L5Y983", "name": "...", "record_ref": "..."}]`
//! where `record_ref` is optional.

use crate::model::Security;
use anyhow::{bail, Context, Result};
use std::path::Path;

/// Load the ordered security list from a JSON file.
///
/// Order is preserved — the orchestrator processes securities strictly in
/// input order.
pub fn load_securities(path: &Path) -> Result<Vec<Security>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read sources: {}", path.display()))?;
    let securities: Vec<Security> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid sources file: {}", path.display()))?;

    for s in &securities {
        if s.isin.len() != 12 {
            bail!("malformed ISIN in sources file: {:?}", s.isin);
        }
    }

    Ok(securities)
}
