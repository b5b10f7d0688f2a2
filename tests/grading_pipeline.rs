use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{Value, json};
use thinkink::{
    Annotation, AnnotationKind, Assignment, AssignmentStore, CriterionFeedback, Grader,
    GradingError, GradingResult, Level, LlmBackend, LlmError, MemoryStore, RubricCriterion,
    Stage, StoreError, StructuredRequest,
};
use tokio::time::{Instant, sleep};

/// What the fake model does for one criterion.
#[derive(Clone)]
struct Scripted {
    delay:  Duration,
    answer: Result<Value, String>,
}

#[derive(Default)]
struct ScriptedLlm {
    criteria:    HashMap<String, Scripted>,
    overall:     Option<Value>,
    annotations: Option<Value>,
    calls:       AtomicUsize,
    in_flight:   AtomicUsize,
    max_flight:  AtomicUsize,
    completed:   Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn criterion(mut self, name: &str, delay_ms: u64, answer: Result<Value, &str>) -> Self {
        self.criteria.insert(
            name.to_string(),
            Scripted {
                delay:  Duration::from_millis(delay_ms),
                answer: answer.map_err(str::to_string),
            },
        );
        self
    }

    fn overall(mut self, text: &str) -> Self {
        self.overall = Some(json!({ "overallFeedback": text }));
        self
    }

    fn annotations(mut self, annotations: Value) -> Self {
        self.annotations = Some(json!({ "annotations": annotations }));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn criterion_name(prompt: &str) -> String {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Criterion: "))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn generate_structured(&self, request: StructuredRequest) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_flight.fetch_max(now, Ordering::SeqCst);

        let (label, delay, answer) = match request.schema_name {
            "criterion_judgment" => {
                let name = criterion_name(&request.prompt);
                match self.criteria.get(&name) {
                    Some(s) => (name, s.delay, s.answer.clone()),
                    None => (name, Duration::ZERO, Err("unscripted criterion".to_string())),
                }
            }
            "overall_feedback" => (
                "overall".to_string(),
                Duration::from_millis(5),
                self.overall.clone().ok_or_else(|| "no overall".to_string()),
            ),
            "annotations" => (
                "annotations".to_string(),
                Duration::from_millis(5),
                self.annotations.clone().ok_or_else(|| "no annotations".to_string()),
            ),
            other => (other.to_string(), Duration::ZERO, Err(format!("unexpected {other}"))),
        };

        sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap().push(label);
        answer.map_err(LlmError::Api)
    }
}

/// Store whose backing service is always down.
struct UnreachableStore;

#[async_trait]
impl AssignmentStore for UnreachableStore {
    async fn get_assignment(&self, _id: &str) -> Result<Option<Assignment>, StoreError> {
        Err(StoreError::Request("connection refused".to_string()))
    }
}

fn row(name: &str, points: u32) -> RubricCriterion {
    RubricCriterion::builder()
        .criteria(name)
        .points(points)
        .excellent(format!("{name}: excellent"))
        .good(format!("{name}: good"))
        .needs_improvement(format!("{name}: weak"))
        .build()
}

fn store_with(rubric: Vec<RubricCriterion>) -> Arc<MemoryStore> {
    let assignment = Assignment::builder()
        .id("thesis")
        .title("Thesis Statements")
        .goal("Write an arguable thesis")
        .rubric(rubric)
        .build();
    Arc::new([assignment].into_iter().collect())
}

fn judgment(points: f64, level: &str) -> Result<Value, &'static str> {
    Ok(json!({ "points": points, "feedback": format!("{level} work"), "level": level }))
}

#[tokio::test]
async fn grades_the_single_criterion_example() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion(
                "Clarity",
                0,
                Ok(json!({ "points": 16, "feedback": "Solid", "level": "good" })),
            )
            .overall("Nice overall effort")
            .annotations(json!([
                { "text": "the first sentence", "type": "positive", "comment": "Strong opener" }
            ])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm.clone());

    let result = grader
        .grade_submission("thesis", "This is the first sentence. Then more.")
        .await
        .expect("grade");

    assert_eq!(
        result,
        GradingResult {
            overall_feedback:  "Nice overall effort".into(),
            criteria_feedback: vec![
                CriterionFeedback::builder()
                    .criteria("Clarity")
                    .points(16.0)
                    .feedback("Solid")
                    .level(Level::Good)
                    .build()
            ],
            annotations:       vec![
                Annotation::builder()
                    .text("the first sentence")
                    .kind(AnnotationKind::Positive)
                    .comment("Strong opener")
                    .build()
            ],
        }
    );
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn criteria_keep_rubric_order_when_answers_arrive_reversed() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Thesis", 60, judgment(5.0, "excellent"))
            .criterion("Evidence", 40, judgment(4.0, "good"))
            .criterion("Organization", 20, judgment(2.0, "needsImprovement"))
            .criterion("Style", 0, judgment(4.0, "good"))
            .overall("ok")
            .annotations(json!([])),
    );
    let rubric = vec![row("Thesis", 5), row("Evidence", 5), row("Organization", 5), row("Style", 5)];
    let grader = Grader::new(store_with(rubric), llm.clone());

    let result = grader.grade_submission("thesis", "Essay.").await.expect("grade");

    let names: Vec<&str> = result
        .criteria_feedback
        .iter()
        .map(|c| c.criteria.as_str())
        .collect();
    assert_eq!(names, ["Thesis", "Evidence", "Organization", "Style"]);
    assert_eq!(result.criteria_feedback[2].level, Level::NeedsImprovement);

    let completed = llm.completed.lock().unwrap().clone();
    let criterion_completion: Vec<&str> = completed
        .iter()
        .map(String::as_str)
        .filter(|label| names.contains(label))
        .collect();
    assert_eq!(criterion_completion, ["Style", "Organization", "Evidence", "Thesis"]);
}

#[tokio::test]
async fn every_call_is_in_flight_at_once() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("A", 50, judgment(1.0, "good"))
            .criterion("B", 50, judgment(1.0, "good"))
            .criterion("C", 50, judgment(1.0, "good"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("A", 1), row("B", 1), row("C", 1)]), llm.clone());

    grader.grade_submission("thesis", "Essay.").await.expect("grade");

    assert_eq!(llm.calls(), 5);
    assert_eq!(llm.max_flight.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn one_failed_criterion_fails_the_request() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Thesis", 0, judgment(5.0, "excellent"))
            .criterion("Evidence", 10, Err("model unavailable"))
            .criterion("Style", 10_000, judgment(4.0, "good"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(
        store_with(vec![row("Thesis", 5), row("Evidence", 5), row("Style", 5)]),
        llm.clone(),
    );

    let started = Instant::now();
    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(err.is_upstream(), "{err}");
    assert_eq!(err.stage(), Some(&Stage::Criterion("Evidence".into())));
    assert!(matches!(err, GradingError::Generation { .. }));
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "should not wait for the slow criterion"
    );
}

#[tokio::test]
async fn out_of_schema_level_fails_the_request() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion(
                "Clarity",
                0,
                Ok(json!({ "points": 20, "feedback": "wow", "level": "outstanding" })),
            )
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm);

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(matches!(err, GradingError::Decode { .. }), "{err}");
    assert!(err.is_upstream());
}

#[tokio::test]
async fn malformed_annotations_fail_the_request() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Clarity", 0, judgment(20.0, "excellent"))
            .overall("ok")
            .annotations(json!([{ "text": "x", "type": "neutral", "comment": "?" }])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm);

    let err = grader.grade_submission("thesis", "Essay x.").await.unwrap_err();
    assert_eq!(err.stage(), Some(&Stage::Annotations));
}

#[tokio::test]
async fn returned_points_are_stored_as_given() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Clarity", 0, judgment(19.5, "good"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm);

    let result = grader.grade_submission("thesis", "Essay.").await.expect("grade");

    assert_eq!(result.criteria_feedback[0].points, 19.5);
    assert_eq!(result.criteria_feedback[0].level, Level::Good);
}

#[tokio::test]
async fn unknown_assignment_fails_before_any_llm_call() {
    let llm = Arc::new(ScriptedLlm::default());
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm.clone());

    let err = grader.grade_submission("nope", "Essay.").await.unwrap_err();

    assert!(matches!(err, GradingError::AssignmentNotFound(ref id) if id == "nope"));
    assert!(err.is_precondition());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn empty_rubric_fails_before_any_llm_call() {
    let llm = Arc::new(ScriptedLlm::default());
    let grader = Grader::new(store_with(vec![]), llm.clone());

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(matches!(err, GradingError::MissingRubric(_)));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn graded_annotations_place_back_onto_the_submission() {
    let submission = "Dogs are loyal. Dogs are loyal. Cats sleep.";
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Clarity", 0, judgment(16.0, "good"))
            .overall("ok")
            .annotations(json!([
                { "text": "Cats sleep.", "type": "negative", "comment": "Off topic" },
                { "text": "Dogs are loyal.", "type": "positive", "comment": "Clear" },
                { "text": "Dogs are loyal.", "type": "negative", "comment": "Repeated" },
                { "text": "Birds sing.", "type": "positive", "comment": "Hallucinated" }
            ])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm);

    let result = grader.grade_submission("thesis", submission).await.expect("grade");
    let segments = result.segments(submission);

    let rebuilt: String = segments.iter().map(|s| s.text).collect();
    assert_eq!(rebuilt, submission);

    let comments: Vec<&str> = segments
        .iter()
        .filter_map(|s| s.annotation.map(|a| a.comment.as_str()))
        .collect();
    assert_eq!(comments, ["Clear", "Repeated", "Off topic"]);
    assert_eq!(result.annotations.len(), 4);
}

#[tokio::test]
async fn points_above_the_criterion_maximum_fail_the_request() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Thesis", 0, judgment(999.0, "excellent"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Thesis", 5)]), llm);

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(
        matches!(err, GradingError::PointsOutOfRange { points, max: 5, .. } if points == 999.0),
        "{err}"
    );
    assert!(err.is_upstream());
    assert_eq!(err.stage(), Some(&Stage::Criterion("Thesis".into())));
}

#[tokio::test]
async fn negative_points_fail_the_request() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Thesis", 0, judgment(-3.0, "needsImprovement"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Thesis", 5)]), llm);

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(matches!(err, GradingError::PointsOutOfRange { .. }), "{err}");
}

#[tokio::test]
async fn points_at_the_bounds_are_accepted() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Thesis", 0, judgment(5.0, "excellent"))
            .criterion("Style", 0, judgment(0.0, "needsImprovement"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Thesis", 5), row("Style", 5)]), llm);

    let result = grader.grade_submission("thesis", "Essay.").await.expect("grade");

    assert_eq!(result.total_points(), 5.0);
}

#[tokio::test]
async fn zero_point_criterion_fails_before_any_llm_call() {
    let llm = Arc::new(ScriptedLlm::default());
    let grader = Grader::new(store_with(vec![row("Thesis", 5), row("Style", 0)]), llm.clone());

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(
        matches!(err, GradingError::InvalidRubric { ref criterion, .. } if criterion == "Style"),
        "{err}"
    );
    assert!(err.is_precondition());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn failed_overall_feedback_fails_the_request() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Clarity", 0, judgment(16.0, "good"))
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm);

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(matches!(err, GradingError::Generation { .. }), "{err}");
    assert_eq!(err.stage(), Some(&Stage::OverallFeedback));
}

#[tokio::test]
async fn store_failure_fails_before_any_llm_call() {
    let llm = Arc::new(ScriptedLlm::default());
    let grader = Grader::new(Arc::new(UnreachableStore), llm.clone());

    let err = grader.grade_submission("thesis", "Essay.").await.unwrap_err();

    assert!(matches!(err, GradingError::Store(StoreError::Request(_))), "{err}");
    assert!(err.is_precondition());
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn resolved_assignment_grades_without_another_lookup() {
    let llm = Arc::new(
        ScriptedLlm::default()
            .criterion("Clarity", 0, judgment(16.0, "good"))
            .overall("ok")
            .annotations(json!([])),
    );
    let grader = Grader::new(store_with(vec![row("Clarity", 20)]), llm.clone());

    let assignment = grader.assignment("thesis").await.expect("assignment");
    let result = grader
        .grade_assignment(&assignment, "Essay.")
        .await
        .expect("grade");

    assert_eq!(thinkink::rubric::rubric_total(&assignment.rubric), 20);
    assert_eq!(result.criteria_feedback.len(), 1);
    assert_eq!(llm.calls(), 3);
}
