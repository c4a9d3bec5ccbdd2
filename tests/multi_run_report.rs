//! Multi-run pipeline tests: questionnaires on disk, a scripted backend,
//! engine runs, and the written Markdown report.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use enneabench::engine::{Engine, Instrument, Variant};
use enneabench::error::{LlmError, QuestionnaireError};
use enneabench::llm::CompletionBackend;
use enneabench::profile::Center;
use enneabench::prompt::LabelMode;
use enneabench::questionnaire::{LIKERT_FILE, PAIRED_FILE, Questionnaires};
use enneabench::report::{ReportInput, render_report, write_report};

const LIKERT_JSON: &str = r#"{
    "test_name": "Enneagram Likert (short)",
    "instructions": "Rate each statement from 1 to 5.",
    "types": {
        "A": {
            "label": "Reformer",
            "maps_to_enneagram_type": 1,
            "statements": ["I notice | mistakes others miss.", "I hold high standards."]
        },
        "E": {
            "label": "Investigator",
            "maps_to_enneagram_type": 5,
            "statements": ["I need time alone\nto recharge."]
        },
        "Q": {
            "label": "Filler",
            "statements": ["I like questionnaires."]
        }
    }
}"#;

const PAIRED_JSON: &str = r#"{
    "test_name": "Enneagram Paired (short)",
    "columns": {
        "X": {"type": 4, "label": "Individualist"},
        "Y": {"type": 7, "label": "Enthusiast"}
    },
    "items": [
        {"id": 1, "pair": [
            {"side": "A", "text": "I dwell on what is missing.", "column": "X"},
            {"side": "B", "text": "I chase the next adventure.", "column": "Y"}
        ]},
        {"id": "2", "pair": [
            {"side": "A", "text": "I feel things deeply.", "column": "X"},
            {"side": "B", "text": "I keep my options open.", "column": "Y"}
        ]}
    ]
}"#;

/// Replays replies in order and records prompts.
struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _model: &str, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::RequestFailed {
                provider: "scripted".to_string(),
                reason: "script exhausted".to_string(),
            })
    }
}

fn write_questionnaires(dir: &Path) {
    std::fs::write(dir.join(LIKERT_FILE), LIKERT_JSON).unwrap();
    std::fs::write(dir.join(PAIRED_FILE), PAIRED_JSON).unwrap();
}

fn variant(label_mode: LabelMode, runs: usize) -> Variant {
    Variant {
        name: "custom".to_string(),
        label_mode,
        instruments: vec![Instrument::Likert, Instrument::Paired],
        runs_per_test: runs,
    }
}

#[tokio::test]
async fn test_identical_runs_have_zero_spread() {
    let dir = tempfile::tempdir().unwrap();
    write_questionnaires(dir.path());
    let questionnaires = Questionnaires::load(dir.path(), true, true).unwrap();

    // Per run: 4 Likert statements; paired runs follow all Likert runs.
    let likert_run = ["5", "4", "2", "3"];
    let mut replies: Vec<&str> = Vec::new();
    for _ in 0..3 {
        replies.extend(likert_run);
    }
    for _ in 0..3 {
        replies.extend(["B", "a"]);
    }
    let backend = Arc::new(ScriptedBackend::new(&replies));
    let engine = Engine::new(backend.clone(), variant(LabelMode::Unlabeled, 3));

    let outcome = engine.run("mistral", &questionnaires).await.unwrap();
    let (likert, paired) = outcome.summaries();
    let likert = likert.unwrap();
    let paired = paired.unwrap();

    assert_eq!(likert.categories[&1].values, vec![9, 9, 9]);
    assert_eq!(likert.categories[&1].mean, 9.0);
    assert_eq!(likert.categories[&1].std_dev, 0.0);
    assert_eq!(likert.categories[&5].values, vec![2, 2, 2]);
    assert_eq!(likert.centers[&Center::Gut].values, vec![9, 9, 9]);
    assert_eq!(likert.centers[&Center::Head].values, vec![2, 2, 2]);
    assert_eq!(likert.centers[&Center::Heart].values, vec![0, 0, 0]);
    assert_eq!(outcome.likert_runs[0].type_key_scores["Q"], 3);

    assert_eq!(paired.combined_columns["X"], 3);
    assert_eq!(paired.combined_columns["Y"], 3);
    assert_eq!(paired.combined_categories.get(&4), Some(&3));
    assert!(paired.categories.values().all(|s| s.std_dev == 0.0));

    assert_eq!(backend.prompts.lock().unwrap().len(), 18);
}

#[tokio::test]
async fn test_labeled_prompts_reveal_type() {
    let dir = tempfile::tempdir().unwrap();
    write_questionnaires(dir.path());
    let questionnaires = Questionnaires::load(dir.path(), true, false).unwrap();

    let backend = Arc::new(ScriptedBackend::new(&["1", "1", "1", "1"]));
    let variant = Variant {
        instruments: vec![Instrument::Likert],
        runs_per_test: 1,
        ..Variant::labeled()
    };
    Engine::new(backend.clone(), variant)
        .run("mistral", &questionnaires)
        .await
        .unwrap();

    let prompts = backend.prompts.lock().unwrap();
    assert!(prompts[1].contains("[Type A → Enneagram 1] Item 2:\nI hold high standards."));
    assert!(prompts[3].contains("[Type Q → Enneagram None] Item 1:"));
}

#[tokio::test]
async fn test_report_written_with_escaped_transcript() {
    let dir = tempfile::tempdir().unwrap();
    write_questionnaires(dir.path());
    let questionnaires = Questionnaires::load(dir.path(), true, true).unwrap();

    let backend = Arc::new(ScriptedBackend::new(&[
        "4", "I'd say 5 | definitely", "no idea", "2", "B", "A",
    ]));
    let engine = Engine::new(backend, variant(LabelMode::Unlabeled, 1));
    let outcome = engine.run("qwen2:7b", &questionnaires).await.unwrap();

    let results_dir = dir.path().join("results");
    let timestamp = NaiveDate::from_ymd_opt(2025, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    let input = ReportInput {
        outcome: &outcome,
        questionnaires: &questionnaires,
        timestamp,
    };
    let path = write_report(&results_dir, &input).unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "enneagram-multi_qwen2-7b_2025-01-02_03-04-05_custom.md"
    );
    let body = std::fs::read_to_string(&path).unwrap();
    assert_eq!(body, render_report(&input));

    assert!(body.contains("**Test name:** Enneagram Likert (short)"));
    assert!(body.contains("**Test instructions:** Rate each statement from 1 to 5."));
    assert_eq!(body.matches("**Test instructions:**").count(), 1);
    assert!(body.contains("| 1 | A | 1 | I notice \\| mistakes others miss. | 4 | 4 |"));
    assert!(body.contains("| 2 | A | 1 | I hold high standards. | I'd say 5 \\| definitely | 5 |"));
    assert!(body.contains("| 3 | E | 5 | I need time alone to recharge. | no idea | 3 (default) |"));
    assert!(body.contains("| 4 | Q | - | I like questionnaires. | 2 | 2 |"));
    assert!(body.contains("- **Run 1** → Core: Type 1 (score 9); Wings: 9 (0), 2 (0); Primary wing: tie"));
    assert!(body.contains("| 2 | A | X | 4 | A | I feel things deeply. |"));
    assert!(body.contains("| X | Individualist | 4 | 1 |"));
    assert!(body.contains("- **Core type:** Type 4 (selections 1)"));
}

#[test]
fn test_missing_column_rejected_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(LIKERT_FILE), LIKERT_JSON).unwrap();
    std::fs::write(
        dir.path().join(PAIRED_FILE),
        PAIRED_JSON.replacen(r#""column": "Y""#, r#""column": "Z""#, 1),
    )
    .unwrap();

    let err = Questionnaires::load(dir.path(), true, true).unwrap_err();
    assert!(
        matches!(err, QuestionnaireError::UnknownColumn { ref column, .. } if column == "Z"),
        "got: {err}"
    );
}

#[test]
fn test_missing_questionnaire_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Questionnaires::load(dir.path(), false, true).unwrap_err();
    assert!(matches!(err, QuestionnaireError::NotFound { .. }), "got: {err}");
}
