#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::Instrument;
use uuid::Uuid;

use super::{
    annotations::AnnotationGenerator, criterion::CriterionGrader,
    overall::OverallFeedbackGenerator, results::GradingResult,
};
use crate::{
    error::GradingError,
    llm::LlmBackend,
    prompts::{AssignmentContext, Prompts},
    rubric::Assignment,
    store::AssignmentStore,
};

/// Grades submissions against the rubric of a stored assignment.
///
/// Holds handles to its collaborators rather than reaching for globals, so
/// tests can hand it fakes.
#[derive(Clone)]
pub struct Grader {
    /// Where assignments and rubrics are looked up.
    store:   Arc<dyn AssignmentStore>,
    /// Model used for every generation call.
    llm:     Arc<dyn LlmBackend>,
    /// Prompt templates.
    prompts: Arc<Prompts>,
}

impl Grader {
    /// Creates a grader with the embedded prompt templates.
    pub fn new(store: Arc<dyn AssignmentStore>, llm: Arc<dyn LlmBackend>) -> Self {
        Self {
            store,
            llm,
            prompts: Arc::new(Prompts::load()),
        }
    }

    /// Uses `prompts` instead of the embedded templates.
    pub fn with_prompts(mut self, prompts: Arc<Prompts>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Returns the assignment store.
    pub fn store(&self) -> &dyn AssignmentStore {
        self.store.as_ref()
    }

    /// Returns the LLM backend.
    pub fn llm(&self) -> &dyn LlmBackend {
        self.llm.as_ref()
    }

    /// Looks up the assignment `assignment_id`.
    pub async fn assignment(&self, assignment_id: &str) -> Result<Assignment, GradingError> {
        resolve_assignment(self.store.as_ref(), assignment_id).await
    }

    /// Grades `submission` against an assignment already looked up.
    pub async fn grade_assignment(
        &self,
        assignment: &Assignment,
        submission: &str,
    ) -> Result<GradingResult, GradingError> {
        grade_assignment(self.llm.as_ref(), &self.prompts, assignment, submission).await
    }

    /// Grades `submission` for the assignment `assignment_id`.
    pub async fn grade_submission(
        &self,
        assignment_id: &str,
        submission: &str,
    ) -> Result<GradingResult, GradingError> {
        grade_submission(
            self.store.as_ref(),
            self.llm.as_ref(),
            &self.prompts,
            assignment_id,
            submission,
        )
        .await
    }
}

/// Fetches `assignment_id` from `store`, failing when it does not exist.
pub async fn resolve_assignment(
    store: &dyn AssignmentStore,
    assignment_id: &str,
) -> Result<Assignment, GradingError> {
    store
        .get_assignment(assignment_id)
        .await?
        .ok_or_else(|| GradingError::AssignmentNotFound(assignment_id.to_owned()))
}

/// Checks that `assignment` has a rubric and that every row is worth points.
fn check_rubric(assignment: &Assignment) -> Result<(), GradingError> {
    if assignment.rubric.is_empty() {
        return Err(GradingError::MissingRubric(assignment.id.clone()));
    }
    if let Some(row) = assignment.rubric.iter().find(|row| row.points == 0) {
        return Err(GradingError::InvalidRubric {
            assignment: assignment.id.clone(),
            criterion:  row.criteria.clone(),
        });
    }
    Ok(())
}

/// Grades `submission` for the assignment `assignment_id`.
///
/// The rubric is resolved first; a missing assignment, an empty rubric or a
/// row worth no points fails before any LLM call. Then one call per
/// criterion, one for overall feedback and one for annotations are all issued
/// at once and awaited together. The first failure fails the whole request
/// and abandons the calls still in flight; no partial result is ever
/// returned. Nothing is spawned, so dropping the returned future cancels
/// everything.
pub async fn grade_submission(
    store: &dyn AssignmentStore,
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    assignment_id: &str,
    submission: &str,
) -> Result<GradingResult, GradingError> {
    let assignment = resolve_assignment(store, assignment_id).await?;
    grade_assignment(llm, prompts, &assignment, submission).await
}

/// Grades `submission` against `assignment`, as [`grade_submission`] does
/// once the assignment is resolved.
pub async fn grade_assignment(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    assignment: &Assignment,
    submission: &str,
) -> Result<GradingResult, GradingError> {
    let span = tracing::info_span!(
        "grade_submission",
        request_id = %Uuid::new_v4(),
        assignment_id = %assignment.id
    );

    grade_rubric(llm, prompts, assignment, submission)
        .instrument(span)
        .await
}

/// Body of [`grade_assignment`], run inside its request span.
async fn grade_rubric(
    llm: &dyn LlmBackend,
    prompts: &Prompts,
    assignment: &Assignment,
    submission: &str,
) -> Result<GradingResult, GradingError> {
    check_rubric(assignment)?;

    tracing::info!(
        "Grading `{}` against {} criteria",
        assignment.title,
        assignment.rubric.len()
    );

    let context = AssignmentContext {
        title: &assignment.title,
        goal:  &assignment.goal,
    };

    let criteria = try_join_all(assignment.rubric.iter().enumerate().map(
        move |(index, criterion)| async move {
            let feedback = CriterionGrader::builder()
                .context(context)
                .criterion(criterion)
                .submission(submission)
                .build()
                .run(llm, prompts)
                .await?;
            Ok::<_, GradingError>((index, feedback))
        },
    ));

    let overall = OverallFeedbackGenerator::builder()
        .context(context)
        .submission(submission)
        .build()
        .run(llm, prompts);

    let annotations = AnnotationGenerator::builder()
        .context(context)
        .submission(submission)
        .build()
        .run(llm, prompts);

    let (mut criteria, overall_feedback, annotations) =
        futures::try_join!(criteria, overall, annotations)?;

    criteria.sort_by_key(|(index, _)| *index);
    let criteria_feedback = criteria.into_iter().map(|(_, feedback)| feedback).collect();

    let result = GradingResult {
        overall_feedback,
        criteria_feedback,
        annotations,
    };
    tracing::info!(
        "Graded `{}`: {:.2} points, {} annotations",
        assignment.title,
        result.total_points(),
        result.annotations.len()
    );
    Ok(result)
}
