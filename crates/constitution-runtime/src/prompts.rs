//! Prompts for the critique, revision and formatting steps.
//!
//! Generation sends the raw query with no template. The other steps build a
//! user prompt from the functions below; the structured steps also send a
//! short system prompt that fixes the reply shape.

/// System prompt for the structured critique capability.
pub const CRITIQUE_SYSTEM_PROMPT: &str = r#"
You review a response against one critique request.

Reply with JSON only:
{
  "critique_needed": true | false,
  "critique": "string"
}

Set "critique_needed" to false when the response already satisfies the
critique request, and say so briefly in "critique".
"#;

/// System prompt for the structured coercion capability.
pub const COERCE_SYSTEM_PROMPT: &str = r#"
You convert free text into a fixed JSON record. Do not answer the question
yourself; only extract what the text says.

Reply with JSON only:
{
  "answer": "string",
  "explanation": "string",
  "page_number": "string"
}

Use "N/A" for the answer if the text contains none, and an empty string for
the page number if none is mentioned.
"#;

/// Prompt asking whether `response` needs a critique under `critique_request`.
pub fn critique_prompt(query: &str, response: &str, critique_request: &str) -> String {
    format!(
        "Critique this response according to the critique request. \
         If no critique is needed, specify that.\n\n\
         Query: {query}\n\n\
         Response: {response}\n\n\
         Critique request: {critique_request}"
    )
}

/// Prompt asking for a revised response.
pub fn revision_prompt(
    query: &str,
    response: &str,
    critique_request: &str,
    critique: &str,
    revision_request: &str,
) -> String {
    format!(
        "Revise this response according to the critique and revision request.\n\n\
         Query: {query}\n\n\
         Response: {response}\n\n\
         Critique request: {critique_request}\n\n\
         Critique: {critique}\n\n\
         If the critique does not identify anything worth changing, ignore the \
         revision request and return 'No revisions needed'. If the critique \
         does identify something worth changing, revise the response based on \
         the revision request.\n\n\
         Revision Request: {revision_request}"
    )
}

/// Prompt asking to extract the structured fields from free text.
pub fn format_prompt(text: &str) -> String {
    format!(
        "Extract the answer, a short explanation, and the supporting page number \
         from the text below.\n\n\
         Text:\n{text}"
    )
}
