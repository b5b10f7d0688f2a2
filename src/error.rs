#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

/// Which LLM call of the pipeline a failure came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    /// Scoring one rubric criterion, by name.
    Criterion(String),
    /// Holistic narrative feedback.
    OverallFeedback,
    /// Inline annotation extraction.
    Annotations,
    /// One of the assignment authoring helpers, by name.
    Authoring(&'static str),
    /// Tutor chat reply.
    Tutor,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Criterion(name) => write!(f, "criterion `{name}`"),
            Stage::OverallFeedback => f.write_str("overall feedback"),
            Stage::Annotations => f.write_str("annotations"),
            Stage::Authoring(what) => write!(f, "authoring ({what})"),
            Stage::Tutor => f.write_str("tutor reply"),
        }
    }
}

/// Errors raised by an [`crate::llm::LlmBackend`].
#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    /// The request could not be built or the API call failed.
    #[error("LLM request failed: {0}")]
    Api(String),
    /// The backend answered without any message content.
    #[error("LLM returned no content")]
    EmptyResponse,
    /// The backend answered with content that is not JSON.
    #[error("LLM returned non-JSON content: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<async_openai::error::OpenAIError> for LlmError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        LlmError::Api(err.to_string())
    }
}

/// Errors raised by an [`crate::store::AssignmentStore`].
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The backing service could not be reached or rejected the request.
    #[error("Assignment store request failed: {0}")]
    Request(String),
    /// The backing service returned a document that is not an assignment.
    #[error("Assignment store returned a malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Reading a local assignments file failed.
    #[error("Could not read assignments file: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can make a grading request fail.
///
/// Precondition failures are raised before any LLM call is made. Generation
/// and decode failures both mean the model did not produce a usable answer
/// and fail the whole request.
#[derive(thiserror::Error, Debug)]
pub enum GradingError {
    /// No assignment exists with this id.
    #[error("Assignment not found with id {0}")]
    AssignmentNotFound(String),
    /// The assignment exists but has no rubric rows.
    #[error("Assignment {0} has no rubric")]
    MissingRubric(String),
    /// A rubric row is worth no points.
    #[error("Assignment {assignment} has criterion `{criterion}` worth no points")]
    InvalidRubric {
        /// The assignment holding the row.
        assignment: String,
        /// Name of the offending criterion.
        criterion:  String,
    },
    /// The assignment store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An LLM call failed.
    #[error("Generating {stage} failed: {source}")]
    Generation {
        /// The call that failed.
        stage:  Stage,
        /// Underlying backend error.
        source: LlmError,
    },
    /// An LLM call returned a value that does not match the requested schema.
    #[error("Generated {stage} did not match the expected shape: {source}")]
    Decode {
        /// The call whose answer could not be decoded.
        stage:  Stage,
        /// Underlying decode error.
        source: serde_json::Error,
    },
    /// A criterion was scored outside `0..=max`.
    #[error("Generated {stage} awarded {points} points, outside 0..={max}")]
    PointsOutOfRange {
        /// The criterion call that answered.
        stage:  Stage,
        /// Points the model awarded.
        points: f64,
        /// The criterion's maximum.
        max:    u32,
    },
}

impl GradingError {
    /// True for failures that happened before any LLM call was issued.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            GradingError::AssignmentNotFound(_)
                | GradingError::MissingRubric(_)
                | GradingError::InvalidRubric { .. }
                | GradingError::Store(_)
        )
    }

    /// True when the LLM failed to produce a usable answer.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            GradingError::Generation { .. }
                | GradingError::Decode { .. }
                | GradingError::PointsOutOfRange { .. }
        )
    }

    /// The pipeline stage the failure came from, for upstream failures.
    pub fn stage(&self) -> Option<&Stage> {
        match self {
            GradingError::Generation { stage, .. }
            | GradingError::Decode { stage, .. }
            | GradingError::PointsOutOfRange { stage, .. } => Some(stage),
            _ => None,
        }
    }
}
