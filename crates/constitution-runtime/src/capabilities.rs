//! The three model capabilities the pipeline depends on.

use async_trait::async_trait;
use constitution_core::{Critique, StructuredResult};
use thiserror::Error;

use crate::providers::ProviderError;

/// Errors from a capability call.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Malformed structured output: {0}")]
    Malformed(String),

    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

/// What the pipeline needs from a language model.
///
/// Every method takes a fully built prompt. Implementations must not keep
/// per-run state: one instance serves concurrent pipeline runs.
#[async_trait]
pub trait ModelCapabilities: Send + Sync {
    /// Free-text completion.
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError>;

    /// Structured critique: `{critique_needed, critique}`.
    async fn critique(&self, prompt: &str) -> Result<Critique, CapabilityError>;

    /// Structured extraction of `{answer, explanation, page_number}`.
    async fn coerce(&self, prompt: &str) -> Result<StructuredResult, CapabilityError>;

    /// Name for logs.
    fn name(&self) -> &str;
}
