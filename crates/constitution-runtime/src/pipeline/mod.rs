//! The constitutional pipeline: generate, critique-and-revise, format.
//!
//! A [`Pipeline`] holds only immutable data (the model capabilities and the
//! principles) and builds a fresh [`PipelineState`] for every call, so one
//! instance can serve concurrent runs.
//!
//! ```ignore
//! let pipeline = Pipeline::builder()
//!     .model(model)
//!     .principles(PrincipleSet::default_set())
//!     .build()?;
//!
//! let result = pipeline.run("What is 2+2?").await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use constitution_core::{FormatOutcome, PipelineState, PrincipleSet, StructuredResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Instrument;

use crate::capabilities::{CapabilityError, ModelCapabilities};

mod format;
mod generate;
mod revise;

pub use format::format_response;
pub use generate::generate_response;
pub use revise::critique_and_revise;

/// Errors that abort a pipeline run.
///
/// Formatting never fails; it degrades to the safe default instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Generation failed: {0}")]
    Generation(#[source] CapabilityError),

    #[error("Critique failed for principle '{principle}': {source}")]
    Critique {
        principle: String,
        source: CapabilityError,
    },

    #[error("Revision failed for principle '{principle}': {source}")]
    Revision {
        principle: String,
        source: CapabilityError,
    },

    #[error("Pipeline not configured: {0}")]
    NotConfigured(String),
}

impl PipelineError {
    /// The principle being applied when the run failed, if any.
    pub fn principle(&self) -> Option<&str> {
        match self {
            PipelineError::Critique { principle, .. } | PipelineError::Revision { principle, .. } => {
                Some(principle)
            }
            _ => None,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Final state; `final_response` is always set
    pub state: PipelineState,

    /// How the formatter produced the result
    pub format: FormatOutcome,

    pub completed_at: DateTime<Utc>,
}

impl PipelineRun {
    pub fn result(&self) -> StructuredResult {
        self.format.result()
    }

    pub fn into_result(self) -> StructuredResult {
        self.format.into_result()
    }
}

/// Runs the fixed generate → critique-and-revise → format sequence.
#[derive(Clone)]
pub struct Pipeline {
    model: Arc<dyn ModelCapabilities>,
    principles: PrincipleSet,
}

impl Pipeline {
    pub fn new(model: Arc<dyn ModelCapabilities>, principles: PrincipleSet) -> Self {
        Self { model, principles }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn principles(&self) -> &PrincipleSet {
        &self.principles
    }

    /// Answer `query` and return only the structured result.
    pub async fn run(&self, query: &str) -> Result<StructuredResult, PipelineError> {
        Ok(self.invoke(query).await?.into_result())
    }

    /// Answer `query` and return the full run.
    pub async fn invoke(&self, query: &str) -> Result<PipelineRun, PipelineError> {
        let span = tracing::info_span!(
            "pipeline",
            model = self.model.name(),
            principles = self.principles.len()
        );

        self.invoke_inner(query).instrument(span).await
    }

    async fn invoke_inner(&self, query: &str) -> Result<PipelineRun, PipelineError> {
        let model = self.model.as_ref();
        let state = PipelineState::new(query, self.principles.clone());

        let initial = generate_response(model, &state.query)
            .instrument(tracing::info_span!("generate_response"))
            .await?;
        let state = state.with_initial_response(initial);

        let fold = critique_and_revise(model, &state.query, &state.initial_response, &self.principles)
            .instrument(tracing::info_span!("critique_and_revise"))
            .await?;
        let state = state.with_revisions(fold);

        let format = format_response(model, &state.response)
            .instrument(tracing::info_span!("format_response"))
            .await;
        let state = state.with_final_response(format.result());

        tracing::info!(
            outcome = format.label(),
            revisions = state.revision_count(),
            "Pipeline finished"
        );

        Ok(PipelineRun {
            state,
            format,
            completed_at: Utc::now(),
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("model", &self.model.name())
            .field("principles", &self.principles.names())
            .finish()
    }
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    model: Option<Arc<dyn ModelCapabilities>>,
    principles: PrincipleSet,
}

impl PipelineBuilder {
    /// A builder with no model and the default principles.
    pub fn new() -> Self {
        Self {
            model: None,
            principles: PrincipleSet::default_set(),
        }
    }

    /// Set the model capabilities.
    pub fn model(mut self, model: Arc<dyn ModelCapabilities>) -> Self {
        self.model = Some(model);
        self
    }

    /// Replace the principles.
    pub fn principles(mut self, principles: PrincipleSet) -> Self {
        self.principles = principles;
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        let model = self
            .model
            .ok_or_else(|| PipelineError::NotConfigured("No model set".to_string()))?;

        Ok(Pipeline::new(model, self.principles))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use constitution_core::Critique;

    struct Unreachable;

    #[async_trait]
    impl ModelCapabilities for Unreachable {
        async fn generate(&self, _prompt: &str) -> Result<String, CapabilityError> {
            Err(CapabilityError::Unavailable("offline".to_string()))
        }

        async fn critique(&self, _prompt: &str) -> Result<Critique, CapabilityError> {
            Err(CapabilityError::Unavailable("offline".to_string()))
        }

        async fn coerce(&self, _prompt: &str) -> Result<StructuredResult, CapabilityError> {
            Err(CapabilityError::Unavailable("offline".to_string()))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    #[test]
    fn test_builder_requires_model() {
        let result = Pipeline::builder().build();
        assert!(matches!(result, Err(PipelineError::NotConfigured(_))));
    }

    #[test]
    fn test_builder_defaults_to_default_principles() {
        let pipeline = Pipeline::builder()
            .model(Arc::new(Unreachable))
            .build()
            .unwrap();
        assert_eq!(pipeline.principles(), &PrincipleSet::default_set());
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let pipeline = Pipeline::new(Arc::new(Unreachable), PrincipleSet::empty());

        let err = pipeline.run("hello").await.unwrap_err();
        assert!(matches!(err, PipelineError::Generation(_)));
        assert_eq!(err.principle(), None);
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn test_error_names_principle() {
        let err = PipelineError::Revision {
            principle: "honesty".to_string(),
            source: CapabilityError::Malformed("bad".to_string()),
        };
        assert_eq!(err.principle(), Some("honesty"));
        assert_eq!(
            err.to_string(),
            "Revision failed for principle 'honesty': Malformed structured output: bad"
        );
    }
}
