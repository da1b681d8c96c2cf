//! Reading decision collections and analysis settings from disk.

use std::fs;
use std::path::Path;

use anyhow::Context;
use casechain_core::{AnalysisConfig, DecisionRecord, records_from_json};

/// Load settings from an optional TOML file. No path means defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: AnalysisConfig =
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

pub fn load_records(path: &Path) -> anyhow::Result<Vec<DecisionRecord>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading decisions {}", path.display()))?;
    records_from_json(&text).with_context(|| format!("parsing decisions {}", path.display()))
}
