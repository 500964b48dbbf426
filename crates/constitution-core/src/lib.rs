//! # constitution-core
//!
//! Deterministic data model for the constitutional self-critique pipeline.
//!
//! This crate holds everything about a pipeline run that does not involve a
//! language model:
//! - Principles and the validated, ordered [`PrincipleSet`]
//! - The per-run [`PipelineState`]
//! - The critique/revision fold accumulator [`RevisionFold`]
//! - Strict decoding of the canonical [`StructuredResult`]
//!
//! ## Key Guarantees
//!
//! 1. **No LLM calls**: model interaction lives in `constitution-runtime`
//! 2. **One entry per principle**: the fold records exactly one
//!    critique/revision pair per principle, in order
//! 3. **Immutable principles**: a `PrincipleSet` is validated once and never
//!    mutated afterwards
//!
//! ## Example
//!
//! ```rust,ignore
//! use constitution_core::{decode_structured, PrincipleSet};
//!
//! let principles = PrincipleSet::from_yaml_file("principles.yaml")?;
//! let parsed = decode_structured(r#"{"answer": "4"}"#)?;
//! assert_eq!(parsed.answer, "4");
//! ```

pub mod format;
pub mod principles;
pub mod types;

pub use format::{
    decode_structured, decode_structured_value, DecodeError, FormatOutcome, DEFAULT_ANSWER, FALLBACK_EXPLANATION,
};
pub use principles::{library, Principle, PrincipleError, PrincipleSet};
pub use types::{Critique, CritiqueRevision, PipelineState, RevisionFold, StructuredResult};

use thiserror::Error;

/// Errors from the deterministic core.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Principle error: {0}")]
    Principle(#[from] PrincipleError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_is_valid() {
        let set = PrincipleSet::default_set();
        assert!(!set.is_empty());
    }

    #[test]
    fn test_core_error_wraps_principle_error() {
        let err: CoreError = PrincipleSet::from_yaml("principles: [").unwrap_err().into();
        assert!(err.to_string().starts_with("Principle error"));
    }
}
