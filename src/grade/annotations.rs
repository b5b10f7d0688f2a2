#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;
use schemars::JsonSchema;
use serde::Deserialize;

use super::results::Annotation;
use crate::{
    error::{GradingError, Stage},
    llm::{LlmBackend, StructuredRequest, generate},
    prompts::{AssignmentContext, Prompts, annotations_prompt},
};

/// What the model must answer for inline annotations.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AnnotationsAnswer {
    /// Annotations on specific spans of the submission
    pub annotations: Vec<Annotation>,
}

/// Asks the model to quote and comment on specific spans of a submission.
///
/// No bound is placed on how many annotations come back; none is fine.
#[derive(Debug, Clone, Copy, Builder)]
pub struct AnnotationGenerator<'a> {
    /// Assignment title and goal.
    context:    AssignmentContext<'a>,
    /// The student's text.
    submission: &'a str,
}

impl AnnotationGenerator<'_> {
    /// Builds the structured request sent to the model.
    pub fn request(&self, prompts: &Prompts) -> StructuredRequest {
        StructuredRequest::for_type::<AnnotationsAnswer>(
            "annotations",
            prompts.annotation_system(),
            annotations_prompt(self.context, self.submission),
        )
    }

    /// Runs the generator.
    pub async fn run(
        self,
        llm: &dyn LlmBackend,
        prompts: &Prompts,
    ) -> Result<Vec<Annotation>, GradingError> {
        let answer: AnnotationsAnswer =
            generate(llm, Stage::Annotations, self.request(prompts)).await?;
        tracing::debug!("Received {} annotations", answer.annotations.len());
        Ok(answer.annotations)
    }
}
