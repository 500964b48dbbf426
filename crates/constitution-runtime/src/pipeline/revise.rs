//! The critique-and-revise fold.
//!
//! Principles are applied strictly in order. Each critique sees the response
//! left by the previous principle, which may already be a revision.

use constitution_core::{Principle, PrincipleSet, RevisionFold};
use futures::stream::{self, TryStreamExt};
use tracing::Instrument;

use crate::capabilities::ModelCapabilities;
use crate::prompts::{critique_prompt, revision_prompt};

use super::PipelineError;

/// Fold every principle over `initial_response`.
///
/// The returned fold holds one entry per principle. The first failing
/// capability call aborts the fold.
pub async fn critique_and_revise(
    model: &dyn ModelCapabilities,
    query: &str,
    initial_response: &str,
    principles: &PrincipleSet,
) -> Result<RevisionFold, PipelineError> {
    let init = RevisionFold::with_capacity(initial_response, principles.len());

    stream::iter(principles.iter().map(Ok::<_, PipelineError>))
        .try_fold(init, |fold, principle| async move {
            apply_principle(model, query, principle, fold)
                .instrument(tracing::debug_span!("principle", name = %principle.name))
                .await
        })
        .await
}

async fn apply_principle(
    model: &dyn ModelCapabilities,
    query: &str,
    principle: &Principle,
    fold: RevisionFold,
) -> Result<RevisionFold, PipelineError> {
    let prompt = critique_prompt(query, fold.response(), &principle.critique_request);
    let critique = model
        .critique(&prompt)
        .await
        .map_err(|source| PipelineError::Critique {
            principle: principle.name.clone(),
            source,
        })?;

    tracing::info!(
        principle = %principle.name,
        critique_needed = critique.critique_needed,
        "Critiqued response"
    );

    if !critique.critique_needed {
        return Ok(fold.keep(critique.critique_text));
    }

    let prompt = revision_prompt(
        query,
        fold.response(),
        &principle.critique_request,
        &critique.critique_text,
        &principle.revision_request,
    );
    let revision = model
        .generate(&prompt)
        .await
        .map_err(|source| PipelineError::Revision {
            principle: principle.name.clone(),
            source,
        })?;

    Ok(fold.revise(critique.critique_text, revision))
}
