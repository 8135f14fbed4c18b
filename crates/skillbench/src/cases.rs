//! JSON Lines case loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use skillbench_core::suite::Case;

/// Loads cases from a JSON Lines file, one record per non-blank line.
pub fn load(path: &Path) -> Result<Vec<Case>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read cases from {}", path.display()))?;

    let mut cases = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let case: Case = serde_json::from_str(line).with_context(|| {
            format!("parse case at {}:{}", path.display(), index + 1)
        })?;
        cases.push(case);
    }
    Ok(cases)
}
