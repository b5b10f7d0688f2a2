#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Inline annotation extraction.
pub mod annotations;
/// Per-criterion scoring.
pub mod criterion;
/// Fan-out/fan-in assembly of a full grading result.
pub mod orchestrator;
/// Holistic narrative feedback.
pub mod overall;
/// Shared grading result types.
pub mod results;

pub use annotations::AnnotationGenerator;
pub use criterion::{CriterionGrader, CriterionJudgment};
pub use orchestrator::{Grader, grade_assignment, grade_submission, resolve_assignment};
pub use overall::OverallFeedbackGenerator;
pub use results::{Annotation, AnnotationKind, CriterionFeedback, GradingResult};
