//! Request-level errors.
//!
//! Only validation failures live here: they are the one error class that
//! rejects a request before any stage runs. Per-stage failures are never
//! errors at this level, they are folded into [`crate::StageResult`] values.

use thiserror::Error;

/// Reasons a compile request is rejected before any resource is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The source text is empty or whitespace only.
    #[error("Source is required")]
    EmptySource,

    /// The source text exceeds the configured size ceiling.
    #[error("Source is {size} bytes, the limit is {limit} bytes")]
    SourceTooLarge {
        /// Size of the submitted source in bytes.
        size: usize,
        /// Configured maximum in bytes.
        limit: usize,
    },
}
