//! Markdown report for one multi-run test.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::aggregate::StatSeries;
use crate::engine::{LikertSummary, MultiRunOutcome, PairedSummary};
use crate::error::ReportError;
use crate::profile::{Center, Profile};
use crate::questionnaire::Questionnaires;
use crate::scorer::{LikertRun, PairedRun};

/// Everything needed to render one report.
pub struct ReportInput<'a> {
    pub outcome: &'a MultiRunOutcome,
    /// Used for column labels in the combined paired totals.
    pub questionnaires: &'a Questionnaires,
    pub timestamp: NaiveDateTime,
}

/// Lowercase, collapse runs of anything outside `[a-z0-9]` to `-`, trim `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// `{results_dir}/enneagram-multi_{model}_{timestamp}_{variant}.md`
pub fn report_path(
    results_dir: &Path,
    model: &str,
    variant: &str,
    timestamp: NaiveDateTime,
) -> PathBuf {
    results_dir.join(format!(
        "enneagram-multi_{}_{}_{}.md",
        slugify(model),
        timestamp.format("%Y-%m-%d_%H-%M-%S"),
        slugify(variant)
    ))
}

/// Make text safe for a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Per-instrument wording.
struct Section {
    number: u8,
    name: &'static str,
    heading: &'static str,
    score_word: &'static str,
    table_title: &'static str,
}

const LIKERT_SECTION: Section = Section {
    number: 1,
    name: "Likert",
    heading: "Likert Test",
    score_word: "score",
    table_title: "Scores by Enneagram Type Across Runs",
};

const PAIRED_SECTION: Section = Section {
    number: 2,
    name: "Paired",
    heading: "Paired A/B Test",
    score_word: "selections",
    table_title: "Selections by Enneagram Type Across Runs",
};

/// Render the full report.
pub fn render_report(input: &ReportInput<'_>) -> String {
    let outcome = input.outcome;
    let variant = &outcome.variant;
    let mut lines: Vec<String> = Vec::new();

    lines.push("# Enneagram LLM Multi-Run Report".to_string());
    lines.push(String::new());
    lines.push(format!("- **Model:** `{}`", outcome.model));
    lines.push(format!("- **Date:** {}", input.timestamp.format("%Y-%m-%d")));
    lines.push(format!("- **Time:** {}", input.timestamp.format("%H:%M:%S")));
    lines.push(format!("- **Variant:** {}", variant.name));
    lines.push(format!(
        "- **Likert prompts:** {}",
        match variant.label_mode {
            crate::prompt::LabelMode::Labeled => "type labels shown",
            crate::prompt::LabelMode::Unlabeled => "type labels hidden",
        }
    ));
    lines.push(format!("- **Runs per test:** {}", variant.runs_per_test));
    lines.push(String::new());
    lines.push(
        "This file aggregates multiple runs of the Enneagram tests for the same \
         LLM model to analyze consistency, variability, centers, and full transcripts."
            .to_string(),
    );
    lines.push(String::new());

    let (likert, paired) = outcome.summaries();

    if let Some(summary) = likert {
        let instructions = input
            .questionnaires
            .likert
            .as_ref()
            .and_then(|q| q.instructions.as_deref());
        render_likert(&mut lines, summary, &outcome.likert_runs, instructions);
    }
    if let Some(summary) = paired {
        render_paired(&mut lines, summary, &outcome.paired_runs, input.questionnaires);
    }

    render_cheat_sheet(&mut lines);
    lines.join("\n")
}

fn render_likert(
    lines: &mut Vec<String>,
    summary: LikertSummary,
    runs: &[LikertRun],
    instructions: Option<&str>,
) {
    let s = &LIKERT_SECTION;
    render_overview(
        lines,
        s,
        &summary.test_name,
        instructions,
        &summary.profiles,
        &summary.categories,
        &summary.centers,
        runs.len(),
    );

    lines.push(format!(
        "### {}.5 Full Question Transcripts ({})",
        s.number, s.name
    ));
    lines.push(String::new());
    for run in runs {
        lines.push(format!("#### {} – Run {} Transcript", s.name, run.run_index));
        lines.push(String::new());
        lines.push(
            "| # | Type Key | Enneagram | Statement | Raw Answer | Parsed Rating |".to_string(),
        );
        lines.push(
            "|---|----------|-----------|-----------|------------|---------------|".to_string(),
        );
        for answer in &run.transcript {
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {}{} |",
                answer.global_index,
                cell(&answer.type_key),
                or_dash(answer.category),
                cell(&answer.statement),
                cell(&answer.raw_response),
                answer.rating,
                if answer.defaulted { " (default)" } else { "" }
            ));
        }
        lines.push(String::new());
    }
}

fn render_paired(
    lines: &mut Vec<String>,
    summary: PairedSummary,
    runs: &[PairedRun],
    questionnaires: &Questionnaires,
) {
    let s = &PAIRED_SECTION;
    render_overview(
        lines,
        s,
        &summary.test_name,
        None,
        &summary.profiles,
        &summary.categories,
        &summary.centers,
        runs.len(),
    );

    lines.push(format!(
        "### {}.5 Full Question Transcripts ({})",
        s.number, s.name
    ));
    lines.push(String::new());
    for run in runs {
        lines.push(format!("#### {} – Run {} Transcript", s.name, run.run_index));
        lines.push(String::new());
        lines.push(
            "| # | Choice | Column | Enneagram | Raw Answer | Statement chosen | \
             A text (column) | B text (column) |"
                .to_string(),
        );
        lines.push(
            "|---|--------|--------|-----------|------------|------------------|\
             -----------------|-----------------|"
                .to_string(),
        );
        for answer in &run.transcript {
            lines.push(format!(
                "| {} | {}{} | {} | {} | {} | {} | {} ({}) | {} ({}) |",
                cell(answer.id.as_str()),
                answer.choice,
                if answer.defaulted { " (default)" } else { "" },
                cell(&answer.column),
                answer.category,
                cell(&answer.raw_response),
                cell(&answer.chosen_text),
                cell(&answer.a_text),
                cell(&answer.a_column),
                cell(&answer.b_text),
                cell(&answer.b_column),
            ));
        }
        lines.push(String::new());
    }

    lines.push(format!(
        "### {}.6 Combined Selection Counts (All Runs)",
        s.number
    ));
    lines.push(String::new());
    if summary.combined_categories.is_empty() {
        lines.push("- No selections at all.".to_string());
    } else {
        for (category, count) in &summary.combined_categories {
            lines.push(format!("- Type {category}: {count}"));
        }
    }
    lines.push(String::new());

    let columns = questionnaires.paired.as_ref().map(|q| &q.columns);
    lines.push("| Column | Label | Enneagram | Selections |".to_string());
    lines.push("|--------|-------|-----------|------------|".to_string());
    for (column, count) in &summary.combined_columns {
        let info = columns.and_then(|c| c.get(column));
        lines.push(format!(
            "| {} | {} | {} | {} |",
            cell(column),
            cell(info.map(|i| i.label.as_str()).unwrap_or("-")),
            or_dash(info.map(|i| i.category)),
            count
        ));
    }
    lines.push(String::new());
}

/// Sections N.1 to N.4, shared by both instruments.
fn render_overview(
    lines: &mut Vec<String>,
    s: &Section,
    test_name: &str,
    instructions: Option<&str>,
    profiles: &[Profile],
    categories: &BTreeMap<u8, StatSeries>,
    centers: &BTreeMap<Center, StatSeries>,
    run_count: usize,
) {
    lines.push(format!("## {}. {} – Multi-Run Summary", s.number, s.heading));
    lines.push(String::new());
    lines.push(format!("**Test name:** {test_name}"));
    lines.push(String::new());
    if let Some(text) = instructions.map(str::trim).filter(|t| !t.is_empty()) {
        lines.push(format!("**Test instructions:** {}", text.replace('\n', " ")));
        lines.push(String::new());
    }

    lines.push(format!(
        "### {}.1 Primary Type (and Wings) per Run ({})",
        s.number, s.name
    ));
    lines.push(String::new());
    for (i, profile) in profiles.iter().enumerate() {
        lines.push(format!(
            "- **Run {}** → Core: {}; Wings: {}; Primary wing: {}",
            i + 1,
            core_text(profile, s.score_word),
            wings_text(profile),
            primary_wing_text(profile)
        ));
    }
    lines.push(String::new());

    lines.push(format!("### {}.2 {} ({})", s.number, s.table_title, s.name));
    lines.push(String::new());
    push_table_header(lines, "Type", run_count);
    for (category, series) in categories {
        push_series_row(lines, &category.to_string(), series);
    }
    lines.push(String::new());

    lines.push(format!(
        "### {}.3 Centers of Intelligence per Run ({})",
        s.number, s.name
    ));
    lines.push(String::new());
    lines.push(
        "Head = Types 5, 6, 7 &nbsp;&nbsp; Heart = Types 2, 3, 4 &nbsp;&nbsp; Gut = Types 8, 9, 1"
            .to_string(),
    );
    lines.push(String::new());
    push_table_header(lines, "Center", run_count);
    for (center, series) in centers {
        push_series_row(lines, center.label(), series);
    }
    lines.push(String::new());

    lines.push(format!(
        "### {}.4 Derived Enneagram Profile per Run ({})",
        s.number, s.name
    ));
    lines.push(String::new());
    for (i, profile) in profiles.iter().enumerate() {
        lines.push(format!("#### {} – Run {} Profile", s.name, i + 1));
        lines.push(String::new());
        lines.push(format!(
            "- **Core type:** {}",
            core_text(profile, s.score_word)
        ));
        let top3 = if profile.top3.is_empty() {
            "-".to_string()
        } else {
            profile
                .top3
                .iter()
                .map(|(t, score)| format!("{t} ({score})"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        lines.push(format!("- **Top 3 types:** {top3}"));
        lines.push(format!(
            "- **Wings:** {}; primary wing: {}",
            wings_text(profile),
            primary_wing_text(profile)
        ));
        lines.push(format!(
            "- **Tritype (Gut / Heart / Head):** {}",
            or_dash(profile.tritype)
        ));
        let center_line = Center::ALL
            .iter()
            .map(|c| format!("{}={}", c, profile.centers.get(c).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "- **Center scores:** {} (dominant center: {})",
            center_line,
            or_dash(profile.dominant_center)
        ));
        lines.push(String::new());
    }
}

fn core_text(profile: &Profile, score_word: &str) -> String {
    match profile.core {
        Some((category, score)) => format!("Type {category} ({score_word} {score})"),
        None => "none".to_string(),
    }
}

fn wings_text(profile: &Profile) -> String {
    match (profile.left_wing, profile.right_wing) {
        (Some(l), Some(r)) => format!("{} ({}), {} ({})", l.category, l.score, r.category, r.score),
        _ => "-".to_string(),
    }
}

fn primary_wing_text(profile: &Profile) -> String {
    match (profile.core, profile.primary_wing) {
        (None, _) => "-".to_string(),
        (Some(_), Some(wing)) => wing.to_string(),
        (Some(_), None) => "tie".to_string(),
    }
}

fn push_table_header(lines: &mut Vec<String>, first: &str, run_count: usize) {
    let runs: Vec<String> = (1..=run_count).map(|i| format!("Run {i}")).collect();
    let mut header = format!("| {first} |");
    for run in &runs {
        header.push_str(&format!(" {run} |"));
    }
    header.push_str(" Mean | σ |");
    lines.push(header);
    lines.push(format!(
        "|{}|{}------|------|",
        "-".repeat(first.len() + 2),
        "------|".repeat(run_count)
    ));
}

fn push_series_row(lines: &mut Vec<String>, key: &str, series: &StatSeries) {
    let values = series
        .values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" | ");
    lines.push(format!(
        "| {key} | {values} | {:.2} | {:.2} |",
        series.mean, series.std_dev
    ));
}

fn render_cheat_sheet(lines: &mut Vec<String>) {
    lines.push("## 3. How to Use These Stats (Cheat Sheet)".to_string());
    lines.push(String::new());
    lines.push("- **High consistency (low σ) for a type** → stable trait in the model.".to_string());
    lines.push(
        "- **High variability (high σ) for a type** → volatile or prompt-sensitive trait."
            .to_string(),
    );
    lines.push("- **Dominant center across runs** → primary processing mode:".to_string());
    lines.push("  - Head (5/6/7) → thinking, anticipating, planning".to_string());
    lines.push("  - Heart (2/3/4) → relating, identity, image".to_string());
    lines.push("  - Gut (8/9/1) → instinct, control, anger".to_string());
    lines.push(String::new());
    lines.push(
        "Compare this file across models, or rerun the same model under another \
         variant and see how the Enneagram profile shifts."
            .to_string(),
    );
    lines.push(String::new());
}

/// Render and write the report, creating `results_dir` if needed.
pub fn write_report(results_dir: &Path, input: &ReportInput<'_>) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(results_dir)?;
    let path = report_path(
        results_dir,
        &input.outcome.model,
        &input.outcome.variant.name,
        input.timestamp,
    );
    std::fs::write(&path, render_report(input)).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Report written");
    Ok(path)
}
