#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;
use schemars::JsonSchema;
use serde::Deserialize;

use super::results::CriterionFeedback;
use crate::{
    error::{GradingError, Stage},
    llm::{LlmBackend, StructuredRequest, generate},
    prompts::{AssignmentContext, Prompts, criterion_prompt},
    rubric::{Level, RubricCriterion},
};

/// What the model must answer for one criterion.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CriterionJudgment {
    /// Points awarded for this criterion
    pub points:   f64,
    /// Detailed feedback for this criterion
    pub feedback: String,
    /// The level achieved for this criterion
    pub level:    Level,
}

/// Scores a submission against a single rubric criterion with one LLM call.
#[derive(Debug, Clone, Copy, Builder)]
pub struct CriterionGrader<'a> {
    /// Assignment title and goal.
    context:    AssignmentContext<'a>,
    /// The rubric row to score against.
    criterion:  &'a RubricCriterion,
    /// The student's text.
    submission: &'a str,
}

impl CriterionGrader<'_> {
    /// Returns the criterion being scored.
    pub fn criterion(&self) -> &RubricCriterion {
        self.criterion
    }

    /// Builds the structured request sent to the model.
    pub fn request(&self, prompts: &Prompts) -> StructuredRequest {
        StructuredRequest::for_type::<CriterionJudgment>(
            "criterion_judgment",
            prompts.criterion_system(),
            criterion_prompt(self.context, self.criterion, self.submission),
        )
    }

    /// Runs the grader.
    ///
    /// Points outside `0..=criterion.points` fail the call. Within that range
    /// they are stored as given, whatever level the model picked.
    pub async fn run(
        self,
        llm: &dyn LlmBackend,
        prompts: &Prompts,
    ) -> Result<CriterionFeedback, GradingError> {
        let stage = Stage::Criterion(self.criterion.criteria.clone());
        let judgment: CriterionJudgment =
            generate(llm, stage.clone(), self.request(prompts)).await?;

        let max = self.criterion.points;
        if !(0.0..=f64::from(max)).contains(&judgment.points) {
            tracing::warn!("{stage} awarded {} of {max} points", judgment.points);
            return Err(GradingError::PointsOutOfRange {
                stage,
                points: judgment.points,
                max,
            });
        }

        tracing::debug!(
            "Criterion `{}`: {} ({}/{})",
            self.criterion.criteria,
            judgment.level,
            judgment.points,
            self.criterion.points
        );

        Ok(CriterionFeedback::builder()
            .criteria(self.criterion.criteria.clone())
            .points(judgment.points)
            .feedback(judgment.feedback)
            .level(judgment.level)
            .build())
    }
}
