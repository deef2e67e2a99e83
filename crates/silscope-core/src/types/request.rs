use serde::{Deserialize, Serialize};

use super::CompileOptions;
use crate::error::ValidationError;

/// A request to run every compilation stage over one piece of source text.
///
/// On the wire the options are flattened next to `source`:
/// `{"source": "...", "demangle": false, "optimize": true, ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    /// Untrusted source text. Only ever written to a scratch file.
    pub source: String,

    #[serde(flatten)]
    pub options: CompileOptions,
}

impl CompileRequest {
    pub fn new(source: impl Into<String>, options: CompileOptions) -> Self {
        Self {
            source: source.into(),
            options,
        }
    }

    /// Check the request against the boundary invariants.
    ///
    /// `max_source_bytes` is the configured size ceiling for `source`.
    pub fn validate(&self, max_source_bytes: usize) -> Result<(), ValidationError> {
        if self.source.trim().is_empty() {
            return Err(ValidationError::EmptySource);
        }
        if self.source.len() > max_source_bytes {
            return Err(ValidationError::SourceTooLarge {
                size: self.source.len(),
                limit: max_source_bytes,
            });
        }
        Ok(())
    }
}
