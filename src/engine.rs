//! Multi-run engine: repeats each instrument a fixed number of times for one
//! model and summarizes the runs.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::aggregate::{StatSeries, aggregate_categories, aggregate_centers, combined_counts};
use crate::error::{ConfigError, Error};
use crate::llm::CompletionBackend;
use crate::profile::{CategoryScores, Center, Profile};
use crate::prompt::LabelMode;
use crate::questionnaire::Questionnaires;
use crate::scorer::{LikertRun, PairedRun, run_likert_once, run_paired_once};

/// Default number of runs per instrument.
pub const DEFAULT_RUNS_PER_TEST: usize = 3;

/// A questionnaire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    Likert,
    Paired,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Likert => write!(f, "likert"),
            Self::Paired => write!(f, "paired"),
        }
    }
}

impl std::str::FromStr for Instrument {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "likert" => Ok(Self::Likert),
            "paired" | "ab" => Ok(Self::Paired),
            _ => Err(format!(
                "invalid instrument '{s}', expected one of: likert, paired"
            )),
        }
    }
}

/// A named runner configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    /// Name used on the command line and in report file names.
    pub name: String,
    #[serde(default)]
    pub label_mode: LabelMode,
    #[serde(default = "default_instruments")]
    pub instruments: Vec<Instrument>,
    #[serde(default = "default_runs_per_test")]
    pub runs_per_test: usize,
}

fn default_instruments() -> Vec<Instrument> {
    vec![Instrument::Likert, Instrument::Paired]
}

fn default_runs_per_test() -> usize {
    DEFAULT_RUNS_PER_TEST
}

impl Variant {
    /// Both instruments, type labels shown in Likert prompts.
    pub fn labeled() -> Self {
        Self {
            name: "labeled".to_string(),
            label_mode: LabelMode::Labeled,
            instruments: default_instruments(),
            runs_per_test: DEFAULT_RUNS_PER_TEST,
        }
    }

    /// Both instruments, type labels hidden.
    pub fn unlabeled() -> Self {
        Self {
            name: "unlabeled".to_string(),
            label_mode: LabelMode::Unlabeled,
            instruments: default_instruments(),
            runs_per_test: DEFAULT_RUNS_PER_TEST,
        }
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::labeled(), Self::unlabeled()]
    }

    pub fn includes(&self, instrument: Instrument) -> bool {
        self.instruments.contains(&instrument)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "variant.name".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.instruments.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: format!("variant.{}.instruments", self.name),
                message: "at least one instrument is required".to_string(),
            });
        }
        if self.runs_per_test == 0 {
            return Err(ConfigError::InvalidValue {
                key: format!("variant.{}.runs_per_test", self.name),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Every run performed for one model under one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiRunOutcome {
    pub model: String,
    pub variant: Variant,
    pub likert_runs: Vec<LikertRun>,
    pub paired_runs: Vec<PairedRun>,
}

/// Cross-run statistics for the Likert instrument.
#[derive(Debug, Clone, Serialize)]
pub struct LikertSummary {
    pub test_name: String,
    pub categories: BTreeMap<u8, StatSeries>,
    pub centers: BTreeMap<Center, StatSeries>,
    pub profiles: Vec<Profile>,
}

/// Cross-run statistics for the paired instrument.
#[derive(Debug, Clone, Serialize)]
pub struct PairedSummary {
    pub test_name: String,
    pub categories: BTreeMap<u8, StatSeries>,
    pub centers: BTreeMap<Center, StatSeries>,
    pub profiles: Vec<Profile>,
    pub combined_columns: BTreeMap<String, u32>,
    pub combined_categories: CategoryScores,
}

impl MultiRunOutcome {
    pub fn likert_summary(&self) -> Option<LikertSummary> {
        let first = self.likert_runs.first()?;
        let scores: Vec<&CategoryScores> =
            self.likert_runs.iter().map(|r| &r.category_scores).collect();
        Some(LikertSummary {
            test_name: first.test_name.clone(),
            categories: aggregate_categories(&scores),
            centers: aggregate_centers(&scores),
            profiles: self.likert_runs.iter().map(LikertRun::profile).collect(),
        })
    }

    pub fn paired_summary(&self) -> Option<PairedSummary> {
        let first = self.paired_runs.first()?;
        let scores: Vec<&CategoryScores> =
            self.paired_runs.iter().map(|r| &r.category_counts).collect();
        let columns: Vec<&BTreeMap<String, u32>> =
            self.paired_runs.iter().map(|r| &r.column_counts).collect();
        Some(PairedSummary {
            test_name: first.test_name.clone(),
            categories: aggregate_categories(&scores),
            centers: aggregate_centers(&scores),
            profiles: self.paired_runs.iter().map(PairedRun::profile).collect(),
            combined_columns: combined_counts(&columns),
            combined_categories: combined_counts(&scores),
        })
    }

    /// Summaries for whichever instruments were run.
    pub fn summaries(&self) -> (Option<LikertSummary>, Option<PairedSummary>) {
        (self.likert_summary(), self.paired_summary())
    }
}

/// Drives repeated runs against a single backend.
pub struct Engine {
    backend: Arc<dyn CompletionBackend>,
    variant: Variant,
}

impl Engine {
    pub fn new(backend: Arc<dyn CompletionBackend>, variant: Variant) -> Self {
        Self { backend, variant }
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Perform every configured run for `model`: all Likert runs first, then
    /// all paired runs. The first backend failure aborts the whole call.
    pub async fn run(
        &self,
        model: &str,
        questionnaires: &Questionnaires,
    ) -> Result<MultiRunOutcome, Error> {
        self.variant.validate()?;
        let runs = self.variant.runs_per_test;
        let mut outcome = MultiRunOutcome {
            model: model.to_string(),
            variant: self.variant.clone(),
            likert_runs: Vec::new(),
            paired_runs: Vec::new(),
        };

        tracing::info!(
            model,
            variant = %self.variant.name,
            runs,
            "Starting multi-run test"
        );

        if self.variant.includes(Instrument::Likert) {
            let questionnaire =
                questionnaires
                    .likert
                    .as_ref()
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: format!("variant.{}.instruments", self.variant.name),
                        message: "likert questionnaire not loaded".to_string(),
                    })?;
            for run_index in 1..=runs {
                let run = run_likert_once(
                    self.backend.as_ref(),
                    model,
                    questionnaire,
                    run_index,
                    self.variant.label_mode,
                )
                .await?;
                tracing::info!(
                    model,
                    run = run_index,
                    core = ?run.profile().core_type(),
                    defaulted = run.defaulted_count(),
                    "Likert run complete"
                );
                outcome.likert_runs.push(run);
            }
        }

        if self.variant.includes(Instrument::Paired) {
            let questionnaire =
                questionnaires
                    .paired
                    .as_ref()
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: format!("variant.{}.instruments", self.variant.name),
                        message: "paired questionnaire not loaded".to_string(),
                    })?;
            for run_index in 1..=runs {
                let run =
                    run_paired_once(self.backend.as_ref(), model, questionnaire, run_index)
                        .await?;
                tracing::info!(
                    model,
                    run = run_index,
                    core = ?run.profile().core_type(),
                    defaulted = run.defaulted_count(),
                    "Paired run complete"
                );
                outcome.paired_runs.push(run);
            }
        }

        Ok(outcome)
    }
}
