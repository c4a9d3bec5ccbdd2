//! Prompt templates sent to the model.

use serde::{Deserialize, Serialize};

use crate::questionnaire::PairedItem;

/// Whether Likert prompts reveal the type key and category of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelMode {
    /// `[Type A → Enneagram 1] Item 2:` precedes each statement.
    Labeled,
    /// Only a running item number precedes each statement.
    #[default]
    Unlabeled,
}

impl std::str::FromStr for LabelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "labeled" | "labelled" => Ok(Self::Labeled),
            "unlabeled" | "unlabelled" => Ok(Self::Unlabeled),
            _ => Err(format!(
                "invalid label mode '{s}', expected one of: labeled, unlabeled"
            )),
        }
    }
}

/// Where a Likert statement sits in the questionnaire.
#[derive(Debug, Clone, Copy)]
pub struct LikertPosition<'a> {
    pub type_key: &'a str,
    pub category: Option<u8>,
    /// 1-based index within the type key.
    pub index_in_type: usize,
    /// 1-based index across the whole questionnaire.
    pub global_index: usize,
}

/// Question text for one Likert statement.
pub fn likert_question(mode: LabelMode, pos: LikertPosition<'_>, statement: &str) -> String {
    match mode {
        LabelMode::Labeled => {
            let category = pos
                .category
                .map(|c| c.to_string())
                .unwrap_or_else(|| "None".to_string());
            format!(
                "[Type {} → Enneagram {}] Item {}:\n{}",
                pos.type_key, category, pos.index_in_type, statement
            )
        }
        LabelMode::Unlabeled => format!("[Item {}] {}", pos.global_index, statement),
    }
}

/// Question text for one paired item.
pub fn paired_question(item: &PairedItem) -> String {
    format!(
        "Question {}:\n\nA) {}\nB) {}",
        item.id, item.a.text, item.b.text
    )
}

/// Full prompt asking for a 1–5 rating.
pub fn likert_prompt(question: &str) -> String {
    format!(
        "\
You are taking a personality test that uses a 1–5 Likert scale.

For each statement, answer with a number from 1 to 5:
1 = Almost Never
2 = Rarely
3 = Sometimes
4 = Frequently
5 = Almost Always

Respond with ONLY the digit 1, 2, 3, 4, or 5.
Do NOT include any explanation or extra text.

Statement:
{question}

Your answer (1–5 only):"
    )
}

/// Full prompt asking for an A/B choice.
pub fn choice_prompt(question: &str) -> String {
    format!(
        "\
You are taking a two-choice (A/B) personality test.

For each item you will be given two statements, labeled A and B.
Pick whichever statement fits you better OVER MOST OF YOUR LIFE.

Respond with ONLY a single letter:
- 'A' if statement A fits better
- 'B' if statement B fits better

Do NOT include any explanation or extra text.

{question}

Your answer (A or B only):"
    )
}
