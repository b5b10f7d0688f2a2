#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::{
    error::{GradingError, Stage},
    llm::{LlmBackend, StructuredRequest, generate},
    prompts::{AssignmentContext, Prompts, overall_prompt},
};

/// What the model must answer for holistic feedback.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverallFeedbackAnswer {
    /// Overall feedback on the submission, highlighting strengths and areas
    /// for improvement
    pub overall_feedback: String,
}

/// Produces one narrative summary of a submission.
#[derive(Debug, Clone, Copy, Builder)]
pub struct OverallFeedbackGenerator<'a> {
    /// Assignment title and goal.
    context:    AssignmentContext<'a>,
    /// The student's text.
    submission: &'a str,
}

impl OverallFeedbackGenerator<'_> {
    /// Builds the structured request sent to the model.
    pub fn request(&self, prompts: &Prompts) -> StructuredRequest {
        StructuredRequest::for_type::<OverallFeedbackAnswer>(
            "overall_feedback",
            prompts.grading_system(),
            overall_prompt(self.context, self.submission),
        )
    }

    /// Runs the generator.
    pub async fn run(self, llm: &dyn LlmBackend, prompts: &Prompts) -> Result<String, GradingError> {
        let answer: OverallFeedbackAnswer =
            generate(llm, Stage::OverallFeedback, self.request(prompts)).await?;
        Ok(answer.overall_feedback)
    }
}
