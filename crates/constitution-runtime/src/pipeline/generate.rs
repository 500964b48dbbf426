use crate::capabilities::ModelCapabilities;

use super::PipelineError;

/// Send the raw query to the model and return its answer as-is.
pub async fn generate_response(
    model: &dyn ModelCapabilities,
    query: &str,
) -> Result<String, PipelineError> {
    let response = model
        .generate(query)
        .await
        .map_err(PipelineError::Generation)?;

    tracing::debug!(chars = response.chars().count(), "Generated initial response");
    Ok(response)
}
