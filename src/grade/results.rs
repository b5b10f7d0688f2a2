#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use crate::{
    placement::{DisplaySegment, place_annotations},
    rubric::Level,
};

#[derive(Tabled, Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
/// The grade and feedback for one rubric criterion.
pub struct CriterionFeedback {
    #[tabled(rename = "Criterion")]
    /// * `criteria`: name of the rubric criterion this feedback is for
    pub criteria: String,
    #[tabled(rename = "Points")]
    /// * `points`: points awarded, as returned by the model
    pub points:   f64,
    #[tabled(rename = "Level")]
    /// * `level`: performance band awarded
    pub level:    Level,
    #[tabled(rename = "Feedback")]
    /// * `feedback`: explanation and suggestions
    pub feedback: String,
}

/// Whether an annotation praises or criticises the quoted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Particularly good.
    Positive,
    /// Needs improvement.
    Negative,
}

impl Display for AnnotationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnnotationKind::Positive => f.write_str("positive"),
            AnnotationKind::Negative => f.write_str("negative"),
        }
    }
}

/// A quoted span of the submission with a comment on it.
///
/// `text` is meant to be a verbatim substring of the submission, but models
/// paraphrase; placement copes with quotes that cannot be found.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize, JsonSchema)]
#[builder(on(String, into))]
pub struct Annotation {
    /// The specific text being annotated, copied exactly from the submission
    pub text:    String,
    /// Whether this is a positive or negative annotation
    #[serde(rename = "type")]
    pub kind:    AnnotationKind,
    /// The feedback comment for this text
    pub comment: String,
}

/// Everything produced by grading one submission against one rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    /// Holistic narrative feedback.
    pub overall_feedback:  String,
    /// One entry per rubric criterion, in rubric order.
    pub criteria_feedback: Vec<CriterionFeedback>,
    /// Inline annotations, in the order the model returned them.
    pub annotations:       Vec<Annotation>,
}

impl GradingResult {
    /// Sum of awarded points across criteria.
    pub fn total_points(&self) -> f64 {
        self.criteria_feedback.iter().map(|c| c.points).sum()
    }

    /// Splits `submission` into display segments for these annotations.
    pub fn segments<'a>(&'a self, submission: &'a str) -> Vec<DisplaySegment<'a>> {
        place_annotations(submission, &self.annotations)
    }

    /// Renders the per-criterion feedback as a table. `out_of` is the rubric
    /// total shown in the footer, when known.
    pub fn criteria_table(&self, out_of: Option<u32>) -> String {
        let total = match out_of {
            Some(out_of) => format!("Total: {:.2}/{out_of}", self.total_points()),
            None => format!("Total: {:.2}", self.total_points()),
        };

        Table::new(&self.criteria_feedback)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(total))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(48).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string()
    }
}
