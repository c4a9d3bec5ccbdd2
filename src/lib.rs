//! Enneagram questionnaire runner for local language models.
//!
//! A model served by Ollama answers a Likert questionnaire and a paired
//! forced-choice questionnaire several times. Each answer is classified, each
//! run is scored into per-type totals, and the runs are summarized into a
//! Markdown report with profiles and cross-run statistics.
//!
//! - [`classify`]: raw reply to rating or choice
//! - [`scorer`]: one run of one questionnaire
//! - [`profile`]: core type, wings, tritype, centers
//! - [`aggregate`]: per-type mean and σ across runs
//! - [`engine`]: repeated runs under a [`engine::Variant`]
//! - [`report`]: Markdown output
//! - [`batch`]: every model, every variant, one child process each

pub mod aggregate;
pub mod batch;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod profile;
pub mod prompt;
pub mod questionnaire;
pub mod report;
pub mod scorer;

pub use config::RunnerConfig;
pub use engine::{Engine, Instrument, MultiRunOutcome, Variant};
pub use error::{Error, Result};
