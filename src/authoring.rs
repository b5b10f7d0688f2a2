#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Helpers teachers use while writing an assignment: examples, instructions
//! with a rubric, learning goals, and the prompts that steer the tutor and
//! grader. Each is a single structured LLM call.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{GradingError, Stage},
    llm::{LlmBackend, StructuredRequest, generate},
    prompts::{
        AssignmentContext, Prompts, examples_prompt, grader_prompt_prompt, instructions_prompt,
        learning_goals_prompt, tutor_prompt_prompt,
    },
    rubric::{AssignmentExamples, RubricCriterion},
};

/// Generated student instructions with a matching rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InstructionsAndRubric {
    /// Detailed instructions for the assignment, including steps and guidance
    pub instructions: String,
    /// Rubric criteria; point values should sum to 20
    pub rubric:       Vec<RubricCriterion>,
}

/// Answer shape for learning goals.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct LearningGoalsAnswer {
    /// Specific learning goals for the assignment
    learning_goals: Vec<String>,
}

/// Answer shape for the tutor system prompt.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct SystemPromptAnswer {
    /// System prompt that defines the AI tutor's role and behavior
    system_prompt: String,
}

/// Answer shape for the grader prompt.
#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct GraderPromptAnswer {
    /// AI grader prompt that defines success criteria, evaluation aspects,
    /// and rubrics
    grader_prompt: String,
}

/// Generates two strong and two weak examples, each with an explanation.
pub async fn generate_examples(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    context: AssignmentContext<'_>,
) -> Result<AssignmentExamples, GradingError> {
    let request = StructuredRequest::for_type::<AssignmentExamples>(
        "assignment_examples",
        prompts.examples_system(),
        examples_prompt(context),
    );
    generate(llm, Stage::Authoring("examples"), request).await
}

/// Generates student instructions and a rubric informed by `examples`.
///
/// The prompt asks for 4-5 criteria totalling 20 points; neither is enforced.
pub async fn generate_detailed_instructions(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    context: AssignmentContext<'_>,
    examples: &AssignmentExamples,
) -> Result<InstructionsAndRubric, GradingError> {
    let request = StructuredRequest::for_type::<InstructionsAndRubric>(
        "instructions_and_rubric",
        prompts.instructions_system(),
        instructions_prompt(context, examples),
    );
    let generated: InstructionsAndRubric =
        generate(llm, Stage::Authoring("instructions"), request).await?;
    tracing::info!("Generated a rubric with {} criteria", generated.rubric.len());
    Ok(generated)
}

/// Generates 3-4 learning goals.
pub async fn generate_learning_goals(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    context: AssignmentContext<'_>,
) -> Result<Vec<String>, GradingError> {
    let request = StructuredRequest::for_type::<LearningGoalsAnswer>(
        "learning_goals",
        prompts.learning_goals_system(),
        learning_goals_prompt(context),
    );
    let answer: LearningGoalsAnswer =
        generate(llm, Stage::Authoring("learning goals"), request).await?;
    Ok(answer.learning_goals)
}

/// Generates a system prompt for a tutor dedicated to this assignment.
pub async fn generate_system_prompt(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    context: AssignmentContext<'_>,
) -> Result<String, GradingError> {
    let request = StructuredRequest::for_type::<SystemPromptAnswer>(
        "tutor_system_prompt",
        prompts.tutor_prompt_system(),
        tutor_prompt_prompt(context),
    );
    let answer: SystemPromptAnswer =
        generate(llm, Stage::Authoring("tutor prompt"), request).await?;
    Ok(answer.system_prompt)
}

/// Generates a grader prompt describing success criteria for this assignment.
pub async fn generate_grader_prompt(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    context: AssignmentContext<'_>,
) -> Result<String, GradingError> {
    let request = StructuredRequest::for_type::<GraderPromptAnswer>(
        "grader_prompt",
        prompts.grader_prompt_system(),
        grader_prompt_prompt(context),
    );
    let answer: GraderPromptAnswer =
        generate(llm, Stage::Authoring("grader prompt"), request).await?;
    Ok(answer.grader_prompt)
}
