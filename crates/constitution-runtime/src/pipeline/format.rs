//! Output formatting: strict decode, then coercion, then the safe default.

use constitution_core::{decode_structured, FormatOutcome};

use crate::capabilities::ModelCapabilities;
use crate::prompts::format_prompt;

/// Turn the final response into a structured result. Never fails.
pub async fn format_response(model: &dyn ModelCapabilities, response: &str) -> FormatOutcome {
    match decode_structured(response) {
        Ok(result) => return FormatOutcome::Parsed { result },
        Err(e) => tracing::debug!(error = %e, "Response is not a JSON object, coercing"),
    }

    match model.coerce(&format_prompt(response)).await {
        Ok(result) => FormatOutcome::Coerced { result },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to format response, using fallback");
            FormatOutcome::Fallback {
                error: e.to_string(),
            }
        }
    }
}
