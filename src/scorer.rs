//! Single-run scoring: one full pass of one model over one questionnaire.
//!
//! Questions are issued strictly one at a time, in a fixed order, and every
//! question/answer pair is recorded in the transcript in issuance order. A
//! backend error aborts the run; nothing partial is returned.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::{Choice, classify_choice, classify_likert};
use crate::error::LlmError;
use crate::llm::CompletionBackend;
use crate::profile::{CategoryScores, CenterScores, Profile, center_scores, derive_profile};
use crate::prompt::{
    LabelMode, LikertPosition, choice_prompt, likert_prompt, likert_question, paired_question,
};
use crate::questionnaire::{ItemId, LikertQuestionnaire, PairedQuestionnaire};

/// One answered Likert statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikertAnswer {
    pub global_index: usize,
    pub type_key: String,
    pub category: Option<u8>,
    pub index_in_type: usize,
    pub statement: String,
    pub rating: u8,
    pub defaulted: bool,
    pub raw_response: String,
}

/// Result of one Likert run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikertRun {
    pub run_index: usize,
    pub test_name: String,
    /// Sum per type key; every key is present.
    pub type_key_scores: BTreeMap<String, u32>,
    /// Sum per category over all mapped type keys.
    pub category_scores: CategoryScores,
    pub transcript: Vec<LikertAnswer>,
}

impl LikertRun {
    pub fn profile(&self) -> Profile {
        derive_profile(&self.category_scores)
    }

    pub fn center_scores(&self) -> CenterScores {
        center_scores(&self.category_scores)
    }

    pub fn defaulted_count(&self) -> usize {
        self.transcript.iter().filter(|a| a.defaulted).count()
    }
}

/// One answered paired item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedAnswer {
    pub id: ItemId,
    pub choice: Choice,
    pub defaulted: bool,
    pub raw_response: String,
    pub column: String,
    pub category: u8,
    pub chosen_text: String,
    pub a_text: String,
    pub b_text: String,
    pub a_column: String,
    pub b_column: String,
}

/// Result of one paired run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedRun {
    pub run_index: usize,
    pub test_name: String,
    /// Selections per column; every column is present.
    pub column_counts: BTreeMap<String, u32>,
    /// Selections per category.
    pub category_counts: CategoryScores,
    pub transcript: Vec<PairedAnswer>,
}

impl PairedRun {
    pub fn profile(&self) -> Profile {
        derive_profile(&self.category_counts)
    }

    pub fn center_scores(&self) -> CenterScores {
        center_scores(&self.category_counts)
    }

    pub fn defaulted_count(&self) -> usize {
        self.transcript.iter().filter(|a| a.defaulted).count()
    }
}

/// Run the Likert questionnaire once.
///
/// Statements are asked in type-key order, then statement order.
pub async fn run_likert_once(
    backend: &dyn CompletionBackend,
    model: &str,
    questionnaire: &LikertQuestionnaire,
    run_index: usize,
    label_mode: LabelMode,
) -> Result<LikertRun, LlmError> {
    let mut type_key_scores: BTreeMap<String, u32> =
        questionnaire.types.keys().map(|k| (k.clone(), 0)).collect();
    let mut category_scores = CategoryScores::new();
    let mut transcript = Vec::with_capacity(questionnaire.statement_count());

    tracing::info!(
        model,
        run = run_index,
        test = %questionnaire.test_name,
        "Starting Likert run"
    );

    let mut global_index = 1;
    for (type_key, group) in &questionnaire.types {
        let category = group.maps_to_enneagram_type;

        for (offset, statement) in group.statements.iter().enumerate() {
            let pos = LikertPosition {
                type_key,
                category,
                index_in_type: offset + 1,
                global_index,
            };
            let question = likert_question(label_mode, pos, statement);
            let reply = backend.complete(model, &likert_prompt(&question)).await?;
            let answer = classify_likert(&reply);
            let rating = answer.value;

            if let Some(score) = type_key_scores.get_mut(type_key) {
                *score += u32::from(rating);
            }
            if let Some(c) = category {
                *category_scores.entry(c).or_insert(0) += u32::from(rating);
            }

            tracing::info!(
                run = run_index,
                question = global_index,
                type_key = %type_key,
                category = ?category,
                rating,
                defaulted = answer.defaulted,
                "Likert answer"
            );

            transcript.push(LikertAnswer {
                global_index,
                type_key: type_key.clone(),
                category,
                index_in_type: offset + 1,
                statement: statement.clone(),
                rating,
                defaulted: answer.defaulted,
                raw_response: answer.raw,
            });
            global_index += 1;
        }
    }

    Ok(LikertRun {
        run_index,
        test_name: questionnaire.test_name.clone(),
        type_key_scores,
        category_scores,
        transcript,
    })
}

/// Run the paired questionnaire once, in item order.
pub async fn run_paired_once(
    backend: &dyn CompletionBackend,
    model: &str,
    questionnaire: &PairedQuestionnaire,
    run_index: usize,
) -> Result<PairedRun, LlmError> {
    let mut column_counts: BTreeMap<String, u32> =
        questionnaire.columns.keys().map(|k| (k.clone(), 0)).collect();
    let mut category_counts = CategoryScores::new();
    let mut transcript = Vec::with_capacity(questionnaire.items.len());

    tracing::info!(
        model,
        run = run_index,
        test = %questionnaire.test_name,
        "Starting paired run"
    );

    for item in &questionnaire.items {
        let reply = backend
            .complete(model, &choice_prompt(&paired_question(item)))
            .await?;
        let answer = classify_choice(&reply);
        let chosen = item.side(answer.value);

        // Columns are validated at load time, so a miss here is a broken invariant.
        let category = questionnaire.category_of(&chosen.column).ok_or_else(|| {
            LlmError::InvalidResponse {
                provider: backend.name().to_string(),
                reason: format!("column {} has no category mapping", chosen.column),
            }
        })?;

        *column_counts.entry(chosen.column.clone()).or_insert(0) += 1;
        *category_counts.entry(category).or_insert(0) += 1;

        tracing::info!(
            run = run_index,
            item = %item.id,
            choice = %answer.value,
            column = %chosen.column,
            category,
            defaulted = answer.defaulted,
            "Paired answer"
        );

        transcript.push(PairedAnswer {
            id: item.id.clone(),
            choice: answer.value,
            defaulted: answer.defaulted,
            raw_response: answer.raw,
            column: chosen.column.clone(),
            category,
            chosen_text: chosen.text.clone(),
            a_text: item.a.text.clone(),
            b_text: item.b.text.clone(),
            a_column: item.a.column.clone(),
            b_column: item.b.column.clone(),
        });
    }

    Ok(PairedRun {
        run_index,
        test_name: questionnaire.test_name.clone(),
        column_counts,
        category_counts,
        transcript,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::LlmError;
    use crate::llm::CompletionBackend;

    /// Backend that replays canned replies in order and records prompts.
    pub struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, String>>>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedBackend {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Queue a failure after the already queued replies.
        pub fn then_fail(self, reason: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(reason.to_string()));
            self
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, model: &str, prompt: &str) -> Result<String, LlmError> {
            self.prompts
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(reason)) => Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason,
                }),
                None => Err(LlmError::RequestFailed {
                    provider: "scripted".to_string(),
                    reason: "script exhausted".to_string(),
                }),
            }
        }
    }
}
