//! Questionnaire loading and validation.
//!
//! Two JSON documents are supported:
//!
//! - the Likert form (`enneagram_likert.json`): statements grouped by an
//!   opaque type key, each key optionally mapped to a category 1–9;
//! - the paired form (`enneagram_test.json`): forced-choice items whose two
//!   sides each point at a column, and a column table mapping to categories.
//!
//! All structural checks happen at load time so that a run never starts
//! against data it cannot score.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::Choice;
use crate::error::QuestionnaireError;
use crate::profile::is_category;

/// File name of the Likert questionnaire inside the tests directory.
pub const LIKERT_FILE: &str = "enneagram_likert.json";

/// File name of the paired questionnaire inside the tests directory.
pub const PAIRED_FILE: &str = "enneagram_test.json";

/// Likert-scale questionnaire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikertQuestionnaire {
    pub test_name: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Statement groups keyed by type key, iterated in key order.
    pub types: BTreeMap<String, LikertType>,
}

/// A group of Likert statements sharing one type key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikertType {
    pub label: String,
    #[serde(default)]
    pub maps_to_enneagram_type: Option<u8>,
    pub statements: Vec<String>,
}

impl LikertQuestionnaire {
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self, QuestionnaireError> {
        let parsed: Self = serde_json::from_str(json).map_err(|source| QuestionnaireError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn load(path: &Path) -> Result<Self, QuestionnaireError> {
        let json = read_questionnaire(path)?;
        Self::from_json_str(&json, path)
    }

    fn validate(&self) -> Result<(), QuestionnaireError> {
        for (key, group) in &self.types {
            if let Some(category) = group.maps_to_enneagram_type
                && !is_category(category)
            {
                return Err(QuestionnaireError::InvalidCategory {
                    owner: format!("Type key {key}"),
                    category,
                });
            }
        }
        Ok(())
    }

    /// Total number of statements across all type keys.
    pub fn statement_count(&self) -> usize {
        self.types.values().map(|t| t.statements.len()).sum()
    }
}

/// Identifier of a paired item. Accepts JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawItemId", into = "String")]
pub struct ItemId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawItemId {
    Number(i64),
    Text(String),
}

impl From<RawItemId> for ItemId {
    fn from(raw: RawItemId) -> Self {
        match raw {
            RawItemId::Number(n) => Self(n.to_string()),
            RawItemId::Text(s) => Self(s),
        }
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Column of the paired form and the category it counts toward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedColumn {
    #[serde(rename = "type")]
    pub category: u8,
    pub label: String,
}

/// One side of a paired item after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub text: String,
    pub column: String,
}

/// A validated forced-choice item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedItem {
    pub id: ItemId,
    pub a: Statement,
    pub b: Statement,
}

impl PairedItem {
    pub fn side(&self, choice: Choice) -> &Statement {
        match choice {
            Choice::A => &self.a,
            Choice::B => &self.b,
        }
    }
}

/// Forced-choice questionnaire.
#[derive(Debug, Clone)]
pub struct PairedQuestionnaire {
    pub test_name: String,
    pub columns: BTreeMap<String, PairedColumn>,
    pub items: Vec<PairedItem>,
}

#[derive(Deserialize)]
struct RawPaired {
    test_name: String,
    columns: BTreeMap<String, PairedColumn>,
    items: Vec<RawPairedItem>,
}

#[derive(Deserialize)]
struct RawPairedItem {
    id: ItemId,
    pair: Vec<RawSide>,
}

#[derive(Deserialize)]
struct RawSide {
    side: String,
    text: String,
    column: String,
}

impl PairedQuestionnaire {
    pub fn from_json_str(json: &str, origin: &Path) -> Result<Self, QuestionnaireError> {
        let raw: RawPaired =
            serde_json::from_str(json).map_err(|source| QuestionnaireError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;

        for (name, column) in &raw.columns {
            if !is_category(column.category) {
                return Err(QuestionnaireError::InvalidCategory {
                    owner: format!("Column {name}"),
                    category: column.category,
                });
            }
        }

        let items = raw
            .items
            .into_iter()
            .map(|item| validate_item(item, &raw.columns))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            test_name: raw.test_name,
            columns: raw.columns,
            items,
        })
    }

    pub fn load(path: &Path) -> Result<Self, QuestionnaireError> {
        let json = read_questionnaire(path)?;
        Self::from_json_str(&json, path)
    }

    /// Category a column counts toward. Columns are checked at load time.
    pub fn category_of(&self, column: &str) -> Option<u8> {
        self.columns.get(column).map(|c| c.category)
    }
}

fn validate_item(
    item: RawPairedItem,
    columns: &BTreeMap<String, PairedColumn>,
) -> Result<PairedItem, QuestionnaireError> {
    let invalid = |reason: String| QuestionnaireError::InvalidPair {
        item_id: item.id.to_string(),
        reason,
    };

    if item.pair.len() != 2 {
        return Err(invalid(format!("found {} sides", item.pair.len())));
    }

    let mut a = None;
    let mut b = None;
    for side in &item.pair {
        let slot = match side.side.parse::<Choice>() {
            Ok(Choice::A) => &mut a,
            Ok(Choice::B) => &mut b,
            Err(e) => return Err(invalid(e)),
        };
        if slot.is_some() {
            return Err(invalid(format!("duplicate side {}", side.side)));
        }
        if !columns.contains_key(&side.column) {
            return Err(QuestionnaireError::UnknownColumn {
                item_id: item.id.to_string(),
                column: side.column.clone(),
            });
        }
        *slot = Some(Statement {
            text: side.text.clone(),
            column: side.column.clone(),
        });
    }

    match (a, b) {
        (Some(a), Some(b)) => Ok(PairedItem {
            id: item.id.clone(),
            a,
            b,
        }),
        _ => Err(invalid("missing side".to_string())),
    }
}

fn read_questionnaire(path: &Path) -> Result<String, QuestionnaireError> {
    if !path.exists() {
        return Err(QuestionnaireError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Questionnaires loaded for one process invocation.
#[derive(Debug, Clone, Default)]
pub struct Questionnaires {
    pub likert: Option<LikertQuestionnaire>,
    pub paired: Option<PairedQuestionnaire>,
}

impl Questionnaires {
    /// Load the requested forms from `tests_dir`.
    pub fn load(
        tests_dir: &Path,
        likert: bool,
        paired: bool,
    ) -> Result<Self, QuestionnaireError> {
        let likert = if likert {
            Some(LikertQuestionnaire::load(&likert_path(tests_dir))?)
        } else {
            None
        };
        let paired = if paired {
            Some(PairedQuestionnaire::load(&paired_path(tests_dir))?)
        } else {
            None
        };
        Ok(Self { likert, paired })
    }
}

pub fn likert_path(tests_dir: &Path) -> PathBuf {
    tests_dir.join(LIKERT_FILE)
}

pub fn paired_path(tests_dir: &Path) -> PathBuf {
    tests_dir.join(PAIRED_FILE)
}
