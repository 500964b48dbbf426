//! Core types for a pipeline run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::format::{DEFAULT_ANSWER, FALLBACK_EXPLANATION};
use crate::principles::PrincipleSet;

/// The canonical structured answer produced at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StructuredResult {
    /// The direct answer to the query.
    #[serde(default = "default_answer")]
    pub answer: String,

    /// A short explanation of how the answer was reached.
    #[serde(default)]
    pub explanation: String,

    /// The page number supporting the answer, or an empty string if none.
    #[serde(default)]
    pub page_number: String,
}

fn default_answer() -> String {
    DEFAULT_ANSWER.to_string()
}

impl StructuredResult {
    pub fn new(
        answer: impl Into<String>,
        explanation: impl Into<String>,
        page_number: impl Into<String>,
    ) -> Self {
        Self {
            answer: answer.into(),
            explanation: explanation.into(),
            page_number: page_number.into(),
        }
    }

    /// The safe default returned when formatting fails entirely.
    pub fn fallback() -> Self {
        Self::new(DEFAULT_ANSWER, FALLBACK_EXPLANATION, "")
    }

    /// Whether this is the safe default record.
    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}

/// Structured critique of a response against one principle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Critique {
    /// Whether or not a critique is needed.
    pub critique_needed: bool,

    /// If needed, the critique.
    #[serde(rename = "critique", default)]
    pub critique_text: String,
}

impl Critique {
    pub fn needed(text: impl Into<String>) -> Self {
        Self {
            critique_needed: true,
            critique_text: text.into(),
        }
    }

    pub fn not_needed(text: impl Into<String>) -> Self {
        Self {
            critique_needed: false,
            critique_text: text.into(),
        }
    }
}

/// One recorded step of the critique-revise loop.
///
/// `revision` is the empty string when the principle did not lead to a
/// revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CritiqueRevision {
    pub critique: String,
    pub revision: String,
}

impl CritiqueRevision {
    /// Whether this step replaced the working response.
    pub fn is_revised(&self) -> bool {
        !self.revision.is_empty()
    }
}

/// Accumulator for the fold over principles.
///
/// Carries the working response and the pairs recorded so far. Each call to
/// [`keep`](Self::keep) or [`revise`](Self::revise) records exactly one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionFold {
    response: String,
    entries: Vec<CritiqueRevision>,
}

impl RevisionFold {
    /// Start a fold from the initial response.
    pub fn new(initial_response: impl Into<String>) -> Self {
        Self {
            response: initial_response.into(),
            entries: Vec::new(),
        }
    }

    /// Start a fold with room for `principles` entries.
    pub fn with_capacity(initial_response: impl Into<String>, principles: usize) -> Self {
        Self {
            response: initial_response.into(),
            entries: Vec::with_capacity(principles),
        }
    }

    /// Record a critique that needed no revision. The response is unchanged.
    pub fn keep(mut self, critique: impl Into<String>) -> Self {
        self.entries.push(CritiqueRevision {
            critique: critique.into(),
            revision: String::new(),
        });
        self
    }

    /// Record a revision. The revision text becomes the working response.
    pub fn revise(mut self, critique: impl Into<String>, revision: impl Into<String>) -> Self {
        let revision = revision.into();
        self.entries.push(CritiqueRevision {
            critique: critique.into(),
            revision: revision.clone(),
        });
        self.response = revision;
        self
    }

    /// The current working response.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Pairs recorded so far.
    pub fn entries(&self) -> &[CritiqueRevision] {
        &self.entries
    }

    pub fn into_parts(self) -> (String, Vec<CritiqueRevision>) {
        (self.response, self.entries)
    }
}

/// State of one pipeline invocation.
///
/// Built fresh per run. Each step owns one transition:
/// [`with_initial_response`](Self::with_initial_response) for generation,
/// [`with_revisions`](Self::with_revisions) for critique-and-revise,
/// [`with_final_response`](Self::with_final_response) for formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    pub query: String,
    pub principles: PrincipleSet,
    pub initial_response: String,
    pub response: String,
    pub critiques_and_revisions: Vec<CritiqueRevision>,
    pub final_response: Option<StructuredResult>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>, principles: PrincipleSet) -> Self {
        Self {
            query: query.into(),
            principles,
            initial_response: String::new(),
            response: String::new(),
            critiques_and_revisions: Vec::new(),
            final_response: None,
        }
    }

    /// Record the generated answer as both the initial and working response.
    pub fn with_initial_response(mut self, response: impl Into<String>) -> Self {
        let response = response.into();
        self.initial_response = response.clone();
        self.response = response;
        self
    }

    /// Record the outcome of the critique-revise fold.
    pub fn with_revisions(mut self, fold: RevisionFold) -> Self {
        let (response, entries) = fold.into_parts();
        self.response = response;
        self.critiques_and_revisions = entries;
        self
    }

    /// Record the formatted result.
    pub fn with_final_response(mut self, result: StructuredResult) -> Self {
        self.final_response = Some(result);
        self
    }

    /// Number of principles that led to a revision.
    pub fn revision_count(&self) -> usize {
        self.critiques_and_revisions
            .iter()
            .filter(|entry| entry.is_revised())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fold_keep_leaves_response() {
        let fold = RevisionFold::new("initial").keep("looks fine");
        assert_eq!(fold.response(), "initial");
        assert_eq!(fold.entries()[0].revision, "");
        assert!(!fold.entries()[0].is_revised());
    }

    #[test]
    fn test_fold_revise_replaces_response() {
        let fold = RevisionFold::new("initial")
            .revise("too blunt", "softer")
            .keep("fine now");
        assert_eq!(fold.response(), "softer");
        assert_eq!(fold.entries().len(), 2);
        assert_eq!(fold.entries()[0].revision, "softer");
    }

    #[test]
    fn test_state_transitions() {
        let state = PipelineState::new("2+2=?", PrincipleSet::empty())
            .with_initial_response("4")
            .with_revisions(RevisionFold::new("4"))
            .with_final_response(StructuredResult::new("4", "", ""));

        assert_eq!(state.initial_response, "4");
        assert_eq!(state.response, "4");
        assert!(state.critiques_and_revisions.is_empty());
        assert_eq!(state.final_response.unwrap().answer, "4");
    }

    #[test]
    fn test_state_deserialize_rejects_invalid_principles() {
        let json = serde_json::json!({
            "query": "q",
            "principles": {"principles": [
                {"name": "Bad Name", "critique_request": "c", "revision_request": "r"}
            ]},
            "initial_response": "",
            "response": "",
            "critiques_and_revisions": [],
            "final_response": null
        });
        assert!(serde_json::from_value::<PipelineState>(json).is_err());
    }

    #[test]
    fn test_critique_wire_key() {
        let critique: Critique =
            serde_json::from_str(r#"{"critique_needed": true, "critique": "Too vague."}"#).unwrap();
        assert_eq!(critique, Critique::needed("Too vague."));

        let json = serde_json::to_value(Critique::not_needed("ok")).unwrap();
        assert_eq!(json["critique"], "ok");
    }

    #[test]
    fn test_structured_result_missing_fields_take_defaults() {
        let result: StructuredResult = serde_json::from_str("{}").unwrap();
        assert_eq!(result, StructuredResult::new("N/A", "", ""));
    }

    #[test]
    fn test_fallback_record() {
        let fallback = StructuredResult::fallback();
        assert_eq!(fallback.answer, "N/A");
        assert_eq!(fallback.explanation, "Failed to format response");
        assert_eq!(fallback.page_number, "");
        assert!(fallback.is_fallback());
    }

    proptest! {
        #[test]
        fn prop_fold_records_one_entry_per_step(
            initial in ".*",
            steps in proptest::collection::vec((any::<bool>(), ".*", ".+"), 0..12),
        ) {
            let mut fold = RevisionFold::with_capacity(initial.clone(), steps.len());
            let mut expected = initial.clone();

            for (needed, critique, revision) in &steps {
                let before = fold.response().to_string();
                fold = if *needed {
                    fold.revise(critique.clone(), revision.clone())
                } else {
                    fold.keep(critique.clone())
                };

                if *needed {
                    prop_assert_eq!(fold.response(), revision.as_str());
                    expected = revision.clone();
                } else {
                    prop_assert_eq!(fold.response(), before.as_str());
                    prop_assert_eq!(fold.entries().last().unwrap().revision.as_str(), "");
                }
            }

            prop_assert_eq!(fold.entries().len(), steps.len());
            prop_assert_eq!(fold.response(), expected.as_str());
        }
    }
}
