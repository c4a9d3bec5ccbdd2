//! Answer classification: maps a model's free-text reply onto a closed answer set.
//!
//! Classification never fails. When nothing recognizable is found the
//! classifier falls back to a fixed value (3 on the Likert scale, `A` for a
//! forced choice) and sets [`Classification::defaulted`] so callers and
//! reports can tell a parsed answer from a fallback.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Likert value used when a reply contains no rating.
pub const LIKERT_DEFAULT: u8 = 3;

/// Forced-choice value used when a reply contains no A/B answer.
pub const CHOICE_DEFAULT: Choice = Choice::A;

static LIKERT_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"\b([1-5])\b").unwrap());

static CHOICE_PATTERN: std::sync::LazyLock<Regex> =
    std::sync::LazyLock::new(|| Regex::new(r"\b([AB])\b").unwrap());

/// One side of a paired item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

impl std::str::FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            other => Err(format!("invalid side '{other}', expected A or B")),
        }
    }
}

/// A classified answer together with the reply it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification<T> {
    pub value: T,
    /// The reply exactly as the backend returned it.
    pub raw: String,
    /// True when no answer was found and `value` is the fallback.
    pub defaulted: bool,
}

impl<T> Classification<T> {
    fn parsed(value: T, raw: &str) -> Self {
        Self {
            value,
            raw: raw.to_string(),
            defaulted: false,
        }
    }

    fn fallback(value: T, raw: &str) -> Self {
        Self {
            value,
            raw: raw.to_string(),
            defaulted: true,
        }
    }
}

/// Classify a reply onto the 1–5 Likert scale.
///
/// Prefers a standalone digit; otherwise takes the first character that is
/// itself a digit in 1–5; otherwise falls back to [`LIKERT_DEFAULT`].
pub fn classify_likert(raw: &str) -> Classification<u8> {
    if let Some(caps) = LIKERT_PATTERN.captures(raw) {
        let digit = caps[1].as_bytes()[0] - b'0';
        tracing::debug!(reply = %raw, rating = digit, "Classified Likert reply");
        return Classification::parsed(digit, raw);
    }

    if let Some(ch) = raw.chars().find(|c| ('1'..='5').contains(c)) {
        let digit = ch as u8 - b'0';
        tracing::debug!(reply = %raw, rating = digit, "Classified Likert reply by scan");
        return Classification::parsed(digit, raw);
    }

    tracing::warn!(reply = %raw, "No 1-5 rating in reply, defaulting to {LIKERT_DEFAULT}");
    Classification::fallback(LIKERT_DEFAULT, raw)
}

/// Classify a reply as a forced choice between `A` and `B`.
///
/// Prefers a standalone letter (case-insensitive); otherwise looks at the
/// first letter of the reply; otherwise falls back to [`CHOICE_DEFAULT`].
pub fn classify_choice(raw: &str) -> Classification<Choice> {
    let upper = raw.to_uppercase();

    if let Some(caps) = CHOICE_PATTERN.captures(&upper) {
        let choice = if &caps[1] == "A" { Choice::A } else { Choice::B };
        tracing::debug!(reply = %raw, %choice, "Classified choice reply");
        return Classification::parsed(choice, raw);
    }

    if upper.starts_with('A') {
        return Classification::parsed(Choice::A, raw);
    }
    if upper.starts_with('B') {
        return Classification::parsed(Choice::B, raw);
    }

    tracing::warn!(reply = %raw, "No A/B choice in reply, defaulting to {CHOICE_DEFAULT}");
    Classification::fallback(CHOICE_DEFAULT, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_likert_standalone_digit() {
        let c = classify_likert("I would say 4.");
        assert_eq!(c.value, 4);
        assert_eq!(c.raw, "I would say 4.");
        assert!(!c.defaulted);
    }

    #[test]
    fn test_likert_prefers_standalone_over_embedded() {
        // "12" has no standalone digit, the standalone 5 wins over the scan.
        let c = classify_likert("Item 12: 5");
        assert_eq!(c.value, 5);
    }

    #[test]
    fn test_likert_falls_back_to_first_in_range_char() {
        let c = classify_likert("rating=2x");
        assert_eq!(c.value, 2);
        assert!(!c.defaulted);

        // 9 and 0 are skipped, 3 is the first digit in range.
        let c = classify_likert("903");
        assert_eq!(c.value, 3);
    }

    #[test]
    fn test_likert_out_of_range_standalone_is_ignored() {
        let c = classify_likert("7 or maybe 8");
        assert_eq!(c.value, LIKERT_DEFAULT);
        assert!(c.defaulted);
    }

    #[traced_test]
    #[test]
    fn test_likert_defaults_to_three() {
        let c = classify_likert("I'd rather not answer");
        assert_eq!(c.value, 3);
        assert!(c.defaulted);
        assert_eq!(c.raw, "I'd rather not answer");
        assert!(logs_contain("defaulting to 3"));
    }

    #[test]
    fn test_likert_empty_reply_defaults() {
        let c = classify_likert("");
        assert_eq!(c.value, 3);
        assert!(c.defaulted);
    }

    #[test]
    fn test_choice_standalone_letter() {
        let c = classify_choice("I pick b");
        assert_eq!(c.value, Choice::B);
        assert!(!c.defaulted);

        let c = classify_choice("A please");
        assert_eq!(c.value, Choice::A);
    }

    #[test]
    fn test_choice_first_standalone_wins() {
        let c = classify_choice("B, not A");
        assert_eq!(c.value, Choice::B);
    }

    #[test]
    fn test_choice_leading_letter_fallback() {
        let c = classify_choice("Apple");
        assert_eq!(c.value, Choice::A);
        assert!(!c.defaulted);

        let c = classify_choice("beta");
        assert_eq!(c.value, Choice::B);
        assert!(!c.defaulted);
    }

    #[traced_test]
    #[test]
    fn test_choice_defaults_to_a() {
        let c = classify_choice("neither fits me");
        assert_eq!(c.value, Choice::A);
        assert!(c.defaulted);
        assert!(logs_contain("defaulting to A"));
    }

    #[test]
    fn test_choice_keeps_raw_case() {
        let c = classify_choice("b");
        assert_eq!(c.value, Choice::B);
        assert_eq!(c.raw, "b");
    }

    #[test]
    fn test_choice_from_str() {
        assert_eq!("a".parse::<Choice>().unwrap(), Choice::A);
        assert_eq!(" B ".parse::<Choice>().unwrap(), Choice::B);
        assert!("C".parse::<Choice>().is_err());
    }
}
