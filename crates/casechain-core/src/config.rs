//! Tunable lengths for key derivation and report truncation.

use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::normalize::{CORE_KEY_LEN, PREFIX_LEN};

const DEFAULT_TOP_N: usize = 10;

/// Analysis parameters shared by the linker, validator, and reporters.
///
/// Every field has a default, so a partial TOML table such as
/// `top_n = 20` is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Leading digits that identify a case across instances.
    pub core_key_len: usize,
    /// Leading digits tallied in the prefix frequency tables.
    pub prefix_len: usize,
    /// Rows kept by "top-N" views.
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            core_key_len: CORE_KEY_LEN,
            prefix_len: PREFIX_LEN,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.core_key_len == 0 {
            return Err(CoreError::Config("core_key_len must be positive".into()));
        }
        if self.prefix_len == 0 {
            return Err(CoreError::Config("prefix_len must be positive".into()));
        }
        if self.prefix_len > self.core_key_len {
            return Err(CoreError::Config(format!(
                "prefix_len ({}) exceeds core_key_len ({})",
                self.prefix_len, self.core_key_len
            )));
        }
        Ok(())
    }
}
