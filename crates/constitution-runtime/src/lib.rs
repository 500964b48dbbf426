//! # constitution-runtime
//!
//! LLM-backed runtime for the constitutional self-critique pipeline.
//!
//! A query is answered by a model, the answer is critiqued (and revised when
//! needed) against each principle in order, and the final text is coerced
//! into a `{answer, explanation, page_number}` record.
//!
//! ## Layers
//!
//! - [`providers`]: HTTP chat-completion clients (OpenAI, Anthropic), each
//!   behind its cargo feature, created through a [`ProviderRegistry`]
//! - [`ModelCapabilities`]: the generate / critique / coerce interface the
//!   pipeline depends on; [`ProviderModel`] implements it over a provider
//! - [`Pipeline`]: the fixed generate → critique-and-revise → format sequence
//!
//! The data model (principles, state, the fold accumulator, strict decoding)
//! lives in `constitution-core` and never calls a model.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use constitution_runtime::{Pipeline, ProviderRegistry, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_file("constitution.yaml")?.apply_env_overrides();
//! let registry = ProviderRegistry::with_defaults();
//! let model = Arc::new(config.provider_model(&registry)?);
//!
//! let pipeline = Pipeline::builder()
//!     .model(model.clone())
//!     .principles(config.principle_set()?)
//!     .build()?;
//!
//! let result = pipeline.run("What is 2+2?").await?;
//! println!("{} (calls: {})", result.answer, model.usage().llm_calls);
//! ```

pub mod capabilities;
pub mod config;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod structured;
pub mod usage;

pub use capabilities::{CapabilityError, ModelCapabilities};
pub use config::{ConfigError, RuntimeConfig, MODEL_ENV, PROVIDER_ENV};
pub use model::ProviderModel;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineError, PipelineRun};
pub use providers::{
    ApiCredential, ChatMessage, CompletionConfig, CompletionResponse, LlmProvider,
    ProviderError, ProviderFactory, ProviderRegistry, TokenUsage,
};
pub use usage::{LlmUsage, UsageMeter};

pub use constitution_core::{
    Critique, CritiqueRevision, FormatOutcome, PipelineState, Principle, PrincipleSet,
    StructuredResult,
};
