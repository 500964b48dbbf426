//! Model capabilities backed by a chat-completion provider.

use std::sync::Arc;

use async_trait::async_trait;
use constitution_core::{decode_structured_value, Critique, StructuredResult};
use serde_json::{Map, Value as JsonValue};

use crate::capabilities::{CapabilityError, ModelCapabilities};
use crate::prompts::{COERCE_SYSTEM_PROMPT, CRITIQUE_SYSTEM_PROMPT};
use crate::providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ResponseSchema,
};
use crate::structured::{parse_reply, response_schema};
use crate::usage::{LlmUsage, UsageMeter};

/// [`ModelCapabilities`] over a single [`LlmProvider`].
///
/// `generate` sends the prompt as a lone user message with the base config.
/// `critique` and `coerce` add a system prompt and a response schema and run
/// at temperature 0. Every call is recorded in the usage meter.
pub struct ProviderModel {
    provider: Arc<dyn LlmProvider>,
    config: CompletionConfig,
    critique_schema: ResponseSchema,
    result_schema: ResponseSchema,
    usage: UsageMeter,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LlmProvider>, config: CompletionConfig) -> Self {
        Self {
            provider,
            config,
            critique_schema: response_schema::<Critique>("critique"),
            result_schema: response_schema::<StructuredResult>("structured_result"),
            usage: UsageMeter::new(),
        }
    }

    /// The base completion config.
    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    /// Usage accumulated across all calls so far.
    pub fn usage(&self) -> LlmUsage {
        self.usage.snapshot()
    }

    pub fn reset_usage(&self) {
        self.usage.reset();
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, CapabilityError> {
        let response = self.provider.complete(messages, config).await?;
        self.usage.record(&response.usage, &response.model);

        tracing::debug!(
            provider = self.provider.name(),
            model = %response.model,
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            stop_reason = ?response.stop_reason,
            "Completion finished"
        );

        Ok(response)
    }

    async fn complete_structured(
        &self,
        system_prompt: &str,
        prompt: &str,
        schema: &ResponseSchema,
    ) -> Result<String, CapabilityError> {
        let config = self.config.structured(schema.clone());
        let messages = vec![
            ChatMessage::system(system_prompt.trim()),
            ChatMessage::user(prompt),
        ];
        Ok(self.complete(messages, &config).await?.content)
    }
}

#[async_trait]
impl ModelCapabilities for ProviderModel {
    async fn generate(&self, prompt: &str) -> Result<String, CapabilityError> {
        let response = self
            .complete(vec![ChatMessage::user(prompt)], &self.config)
            .await?;
        Ok(response.content)
    }

    async fn critique(&self, prompt: &str) -> Result<Critique, CapabilityError> {
        let reply = self
            .complete_structured(CRITIQUE_SYSTEM_PROMPT, prompt, &self.critique_schema)
            .await?;
        parse_reply(&reply)
    }

    async fn coerce(&self, prompt: &str) -> Result<StructuredResult, CapabilityError> {
        let reply = self
            .complete_structured(COERCE_SYSTEM_PROMPT, prompt, &self.result_schema)
            .await?;
        // Models often return numbers or null for page_number
        let map: Map<String, JsonValue> = parse_reply(&reply)?;
        decode_structured_value(JsonValue::Object(map))
            .map_err(|e| CapabilityError::Malformed(e.to_string()))
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}
