//! # thinkink
//!
//! Rubric-grounded grading for student writing. A submission is scored
//! against each row of an assignment's rubric, summarised, and annotated by
//! an LLM; the annotations are then mapped back onto the submission text for
//! display.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Helpers for authoring assignments: examples, instructions and rubrics.
pub mod authoring;
/// Environment-driven configuration.
pub mod config;
/// Error types.
pub mod error;
/// For all things related to grading
pub mod grade;
/// The LLM backend seam and its OpenAI implementation.
pub mod llm;
/// Mapping annotation quotes onto the submission.
pub mod placement;
/// Embedded prompt templates.
pub mod prompts;
/// Assignment and rubric data model.
pub mod rubric;
/// Assignment lookup.
pub mod store;
/// Student-facing chat tutor.
pub mod tutor;

pub use error::{GradingError, LlmError, Stage, StoreError};
pub use grade::{
    Annotation, AnnotationKind, CriterionFeedback, Grader, GradingResult, grade_submission,
};
pub use llm::{ChatMessage, ChatRole, LlmBackend, StructuredRequest};
pub use placement::{DisplaySegment, place_annotations};
pub use rubric::{Assignment, AssignmentExamples, Example, Level, RubricCriterion};
pub use store::{AssignmentStore, MemoryStore, PostgrestStore};
