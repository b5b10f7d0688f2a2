#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use crate::rubric::{AssignmentExamples, Level, RubricCriterion};

/// System prompts embedded in the binary.
#[derive(Clone, Debug)]
pub struct Prompts {
    /// Shared persona for every grading call.
    grading_system:        String,
    /// Persona for per-criterion scoring (grading persona + rubric focus).
    criterion_system:      String,
    /// Persona for inline annotation extraction.
    annotation_system:     String,
    /// Persona for the student-facing tutor chat.
    tutor_system:          String,
    /// Persona for instruction + rubric authoring.
    instructions_system:   String,
    /// Persona for example authoring.
    examples_system:       String,
    /// Persona for learning-goal authoring.
    learning_goals_system: String,
    /// Persona for tutor system-prompt authoring.
    tutor_prompt_system:   String,
    /// Persona for grader-prompt authoring.
    grader_prompt_system:  String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self::load()
    }
}

impl Prompts {
    /// Load prompt templates embedded in the binary.
    pub fn load() -> Self {
        let grading_system = include_str!("prompts/grading_system.md").trim().to_string();
        let criterion_system = format!(
            "{} {}",
            grading_system,
            include_str!("prompts/criterion_system.md").trim()
        );

        Self {
            criterion_system,
            grading_system,
            annotation_system: include_str!("prompts/annotation_system.md").trim().into(),
            tutor_system: include_str!("prompts/tutor_system.md").trim().into(),
            instructions_system: include_str!("prompts/instructions_system.md").trim().into(),
            examples_system: include_str!("prompts/examples_system.md").trim().into(),
            learning_goals_system: include_str!("prompts/learning_goals_system.md")
                .trim()
                .into(),
            tutor_prompt_system: include_str!("prompts/tutor_prompt_system.md").trim().into(),
            grader_prompt_system: include_str!("prompts/grader_prompt_system.md").trim().into(),
        }
    }

    /// Returns the system prompt for holistic feedback.
    pub fn grading_system(&self) -> &str {
        &self.grading_system
    }

    /// Returns the system prompt for per-criterion scoring.
    pub fn criterion_system(&self) -> &str {
        &self.criterion_system
    }

    /// Returns the system prompt for annotation extraction.
    pub fn annotation_system(&self) -> &str {
        &self.annotation_system
    }

    /// Returns the tutor persona.
    pub fn tutor_system(&self) -> &str {
        &self.tutor_system
    }

    /// Returns the system prompt for instruction + rubric authoring.
    pub fn instructions_system(&self) -> &str {
        &self.instructions_system
    }

    /// Returns the system prompt for example authoring.
    pub fn examples_system(&self) -> &str {
        &self.examples_system
    }

    /// Returns the system prompt for learning-goal authoring.
    pub fn learning_goals_system(&self) -> &str {
        &self.learning_goals_system
    }

    /// Returns the system prompt for tutor system-prompt authoring.
    pub fn tutor_prompt_system(&self) -> &str {
        &self.tutor_prompt_system
    }

    /// Returns the system prompt for grader-prompt authoring.
    pub fn grader_prompt_system(&self) -> &str {
        &self.grader_prompt_system
    }
}

/// The parts of an assignment every generator quotes back to the model.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentContext<'a> {
    /// Assignment title.
    pub title: &'a str,
    /// Assignment goal.
    pub goal:  &'a str,
}

/// Formats a fraction as a whole percentage.
fn percent(level: Level) -> u32 {
    (level.suggested_fraction() * 100.0).round() as u32
}

/// User prompt scoring `submission` against one criterion. All three band
/// descriptors are quoted so the model grades against this rubric's wording.
pub fn criterion_prompt(
    ctx: AssignmentContext<'_>,
    criterion: &RubricCriterion,
    submission: &str,
) -> String {
    format!(
        include_str!("prompts/criterion.md"),
        title = ctx.title,
        goal = ctx.goal,
        criteria = criterion.criteria,
        points = criterion.points,
        excellent = criterion.excellent,
        good = criterion.good,
        needs_improvement = criterion.needs_improvement,
        submission = submission,
        excellent_pct = percent(Level::Excellent),
        good_pct = percent(Level::Good),
        needs_improvement_pct = percent(Level::NeedsImprovement),
    )
}

/// User prompt for holistic feedback.
pub fn overall_prompt(ctx: AssignmentContext<'_>, submission: &str) -> String {
    format!(
        include_str!("prompts/overall.md"),
        title = ctx.title,
        goal = ctx.goal,
        submission = submission,
    )
}

/// User prompt for annotation extraction.
pub fn annotations_prompt(ctx: AssignmentContext<'_>, submission: &str) -> String {
    format!(
        include_str!("prompts/annotations.md"),
        title = ctx.title,
        goal = ctx.goal,
        submission = submission,
    )
}

/// User prompt for instruction + rubric authoring.
pub fn instructions_prompt(ctx: AssignmentContext<'_>, examples: &AssignmentExamples) -> String {
    format!(
        include_str!("prompts/instructions.md"),
        title = ctx.title,
        goal = ctx.goal,
        strong1 = examples.strong1.example,
        strong1_why = examples.strong1.explanation,
        strong2 = examples.strong2.example,
        strong2_why = examples.strong2.explanation,
        weak1 = examples.weak1.example,
        weak1_why = examples.weak1.explanation,
        weak2 = examples.weak2.example,
        weak2_why = examples.weak2.explanation,
    )
}

/// User prompt for example authoring.
pub fn examples_prompt(ctx: AssignmentContext<'_>) -> String {
    format!(include_str!("prompts/examples.md"), title = ctx.title, goal = ctx.goal)
}

/// User prompt for learning-goal authoring.
pub fn learning_goals_prompt(ctx: AssignmentContext<'_>) -> String {
    format!(include_str!("prompts/learning_goals.md"), title = ctx.title, goal = ctx.goal)
}

/// User prompt for tutor system-prompt authoring.
pub fn tutor_prompt_prompt(ctx: AssignmentContext<'_>) -> String {
    format!(include_str!("prompts/tutor_prompt.md"), title = ctx.title, goal = ctx.goal)
}

/// User prompt for grader-prompt authoring.
pub fn grader_prompt_prompt(ctx: AssignmentContext<'_>) -> String {
    format!(include_str!("prompts/grader_prompt.md"), title = ctx.title, goal = ctx.goal)
}
