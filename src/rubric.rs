#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Display;

use bon::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One row of a rubric: a skill and what each performance band looks like.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct RubricCriterion {
    /// The specific skill or criterion being evaluated
    pub criteria:          String,
    /// Maximum points for this criterion
    pub points:            u32,
    /// Description of excellent performance
    pub excellent:         String,
    /// Description of good performance
    pub good:              String,
    /// Description of performance that needs improvement
    pub needs_improvement: String,
}

impl RubricCriterion {
    /// Returns the band descriptor for `level`.
    pub fn descriptor(&self, level: Level) -> &str {
        match level {
            Level::Excellent => &self.excellent,
            Level::Good => &self.good,
            Level::NeedsImprovement => &self.needs_improvement,
        }
    }
}

/// Sum of the maximum points over a rubric. Conventionally 20, but nothing
/// relies on that.
pub fn rubric_total(rubric: &[RubricCriterion]) -> u32 {
    rubric.iter().map(|c| c.points).sum()
}

/// Performance band a submission achieved on one criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    /// Top band.
    Excellent,
    /// Middle band.
    Good,
    /// Bottom band.
    NeedsImprovement,
}

impl Level {
    /// All levels, best first.
    pub const ALL: [Level; 3] = [Level::Excellent, Level::Good, Level::NeedsImprovement];

    /// Share of a criterion's points the graders are told to award for this
    /// band. Only ever used as prompt text; returned points are not checked
    /// against it.
    pub fn suggested_fraction(self) -> f64 {
        match self {
            Level::Excellent => 1.0,
            Level::Good => 0.8,
            Level::NeedsImprovement => 0.4,
        }
    }

    /// Wire name of the level (`excellent`, `good`, `needsImprovement`).
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Excellent => "excellent",
            Level::Good => "good",
            Level::NeedsImprovement => "needsImprovement",
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A worked example shown to students, with the teacher's explanation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Example {
    /// The example text itself
    pub example:     String,
    /// Why this example is strong or weak
    pub explanation: String,
}

/// Two strong and two weak examples attached to an assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AssignmentExamples {
    /// First strong example that demonstrates excellence
    pub strong1: Example,
    /// Second strong example that demonstrates excellence
    pub strong2: Example,
    /// First weak example that shows common mistakes
    pub weak1:   Example,
    /// Second weak example that shows common mistakes
    pub weak2:   Example,
}

/// An assignment as held by the assignment store.
///
/// Documents written before rubrics existed may omit `rubric`, `examples`,
/// `instructions`, `learningGoals` or `systemPrompt`; those deserialize to
/// their empty defaults.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[builder(on(String, into))]
pub struct Assignment {
    /// Store identifier.
    #[serde(alias = "_id")]
    pub id:             String,
    /// Assignment title.
    pub title:          String,
    /// What the assignment is meant to teach.
    pub goal:           String,
    /// Student-facing instructions.
    #[serde(default)]
    #[builder(default)]
    pub instructions:   String,
    /// Worked examples.
    #[serde(default)]
    #[builder(default)]
    pub examples:       AssignmentExamples,
    /// Ordered scoring criteria.
    #[serde(default)]
    #[builder(default)]
    pub rubric:         Vec<RubricCriterion>,
    /// What a student should take away from the assignment.
    #[serde(default)]
    #[builder(default)]
    pub learning_goals: Vec<String>,
    /// Persona given to the tutor for this assignment.
    #[serde(default)]
    #[builder(default)]
    pub system_prompt:  String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn criterion_uses_camel_case_on_the_wire() {
        let criterion = RubricCriterion::builder()
            .criteria("Clarity")
            .points(5)
            .excellent("Crisp")
            .good("Mostly clear")
            .needs_improvement("Muddled")
            .build();

        let value = serde_json::to_value(&criterion).unwrap();
        assert_eq!(value["needsImprovement"], "Muddled");
        assert_eq!(criterion.descriptor(Level::Good), "Mostly clear");
    }

    #[test]
    fn level_round_trips_through_wire_names() {
        for level in Level::ALL {
            let encoded = serde_json::to_value(level).unwrap();
            assert_eq!(encoded, json!(level.as_str()));
        }
        assert!(serde_json::from_value::<Level>(json!("fair")).is_err());
    }

    #[test]
    fn legacy_assignment_without_rubric_deserializes_empty() {
        let assignment: Assignment = serde_json::from_value(json!({
            "_id": "a1",
            "title": "Thesis",
            "goal": "Write a thesis"
        }))
        .unwrap();

        assert_eq!(assignment.id, "a1");
        assert!(assignment.rubric.is_empty());
        assert_eq!(assignment.examples, AssignmentExamples::default());
        assert!(assignment.learning_goals.is_empty());
        assert_eq!(assignment.system_prompt, "");
    }

    #[test]
    fn assignment_keeps_tutor_fields_on_the_wire() {
        let assignment = Assignment::builder()
            .id("a2")
            .title("Thesis")
            .goal("Write a thesis")
            .learning_goals(vec!["Define a claim".to_string()])
            .system_prompt("You are a thesis coach.")
            .build();

        let value = serde_json::to_value(&assignment).unwrap();
        assert_eq!(value["learningGoals"], json!(["Define a claim"]));
        assert_eq!(value["systemPrompt"], "You are a thesis coach.");

        let back: Assignment = serde_json::from_value(value).unwrap();
        assert_eq!(back, assignment);
    }

    #[test]
    fn rubric_total_does_not_assume_twenty() {
        let row = |points| {
            RubricCriterion::builder()
                .criteria("c")
                .points(points)
                .excellent("")
                .good("")
                .needs_improvement("")
                .build()
        };
        assert_eq!(rubric_total(&[row(3), row(4)]), 7);
        assert_eq!(rubric_total(&[]), 0);
    }
}
