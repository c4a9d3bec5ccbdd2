//! Enneagram profile derivation from a category score distribution.
//!
//! Categories are the nine types 1–9, arranged on a cycle for wing purposes
//! and partitioned into three centers:
//!
//! | Center | Members (fixed order) |
//! |--------|-----------------------|
//! | Head   | 5, 6, 7               |
//! | Heart  | 2, 3, 4               |
//! | Gut    | 8, 9, 1               |
//!
//! Tie-breaking is deterministic: the core type is the lowest category among
//! equal maxima; tritype members and the dominant center are the first in the
//! fixed orders above.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category scores keyed by type number.
pub type CategoryScores = BTreeMap<u8, u32>;

/// Center sums keyed by center, in Head, Heart, Gut order.
pub type CenterScores = BTreeMap<Center, u32>;

/// Number of categories on the wing cycle.
pub const CATEGORY_COUNT: u8 = 9;

/// One of the three centers of intelligence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Center {
    Head,
    Heart,
    Gut,
}

impl Center {
    /// All three centers in canonical order.
    pub const ALL: [Center; 3] = [Center::Head, Center::Heart, Center::Gut];

    /// Member categories in their fixed order.
    pub fn members(&self) -> [u8; 3] {
        match self {
            Center::Head => [5, 6, 7],
            Center::Heart => [2, 3, 4],
            Center::Gut => [8, 9, 1],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Center::Head => "Head",
            Center::Heart => "Heart",
            Center::Gut => "Gut",
        }
    }
}

impl fmt::Display for Center {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether `category` is a valid type number.
pub fn is_category(category: u8) -> bool {
    (1..=CATEGORY_COUNT).contains(&category)
}

/// Left and right neighbors of `category` on the 9-point cycle.
pub fn wing_neighbors(category: u8) -> (u8, u8) {
    let left = if category <= 1 {
        CATEGORY_COUNT
    } else {
        category - 1
    };
    let right = if category >= CATEGORY_COUNT {
        1
    } else {
        category + 1
    };
    (left, right)
}

/// Sum of member scores for each center. Empty input yields an empty map.
pub fn center_scores(scores: &CategoryScores) -> CenterScores {
    if scores.is_empty() {
        return CenterScores::new();
    }
    Center::ALL
        .iter()
        .map(|center| {
            let sum = center
                .members()
                .iter()
                .map(|t| scores.get(t).copied().unwrap_or(0))
                .sum();
            (*center, sum)
        })
        .collect()
}

/// A neighbor of the core type and its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wing {
    pub category: u8,
    pub score: u32,
}

/// Highest-scoring member of each center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tritype {
    pub gut: u8,
    pub heart: u8,
    pub head: u8,
}

impl fmt::Display for Tritype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.gut, self.heart, self.head)
    }
}

/// Profile derived from a single score distribution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Core type and its score.
    pub core: Option<(u8, u32)>,
    /// Up to three highest-scoring types, score descending then type ascending.
    pub top3: Vec<(u8, u32)>,
    pub left_wing: Option<Wing>,
    pub right_wing: Option<Wing>,
    /// The strictly higher-scoring wing; `None` when both wings tie.
    pub primary_wing: Option<u8>,
    pub tritype: Option<Tritype>,
    pub centers: CenterScores,
    pub dominant_center: Option<Center>,
}

impl Profile {
    pub fn core_type(&self) -> Option<u8> {
        self.core.map(|(t, _)| t)
    }
}

/// Derive the full profile. Never fails; empty input yields an empty profile.
pub fn derive_profile(scores: &CategoryScores) -> Profile {
    if scores.is_empty() {
        return Profile::default();
    }

    let mut ranked: Vec<(u8, u32)> = scores.iter().map(|(t, s)| (*t, *s)).collect();
    // Stable sort over ascending keys keeps the lowest type first on ties.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let core = ranked[0];
    let top3: Vec<(u8, u32)> = ranked.iter().take(3).copied().collect();

    let score_of = |t: u8| scores.get(&t).copied().unwrap_or(0);

    let (left, right) = wing_neighbors(core.0);
    let left_wing = Wing {
        category: left,
        score: score_of(left),
    };
    let right_wing = Wing {
        category: right,
        score: score_of(right),
    };
    let primary_wing = match left_wing.score.cmp(&right_wing.score) {
        std::cmp::Ordering::Greater => Some(left),
        std::cmp::Ordering::Less => Some(right),
        std::cmp::Ordering::Equal => None,
    };

    let best_in = |center: Center| -> u8 {
        let members = center.members();
        let mut best = members[0];
        for t in &members[1..] {
            if score_of(*t) > score_of(best) {
                best = *t;
            }
        }
        best
    };
    let tritype = Tritype {
        gut: best_in(Center::Gut),
        heart: best_in(Center::Heart),
        head: best_in(Center::Head),
    };

    let centers = center_scores(scores);
    let dominant_center = dominant_center(&centers);

    Profile {
        core: Some(core),
        top3,
        left_wing: Some(left_wing),
        right_wing: Some(right_wing),
        primary_wing,
        tritype: Some(tritype),
        centers,
        dominant_center,
    }
}

/// Center with the largest sum, first in Head, Heart, Gut order on ties.
pub fn dominant_center(centers: &CenterScores) -> Option<Center> {
    let mut best: Option<(Center, u32)> = None;
    for center in Center::ALL {
        let Some(score) = centers.get(&center).copied() else {
            continue;
        };
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((center, score)),
        }
    }
    best.map(|(c, _)| c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(u8, u32)]) -> CategoryScores {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_empty_scores_give_empty_profile() {
        let profile = derive_profile(&CategoryScores::new());
        assert_eq!(profile.core, None);
        assert!(profile.top3.is_empty());
        assert!(profile.centers.is_empty());
        assert_eq!(profile.primary_wing, None);
        assert_eq!(profile.tritype, None);
        assert_eq!(profile.dominant_center, None);
    }

    #[test]
    fn test_core_tie_picks_lowest_type() {
        let profile = derive_profile(&scores(&[(1, 10), (5, 10), (6, 10), (9, 5)]));
        assert_eq!(profile.core, Some((1, 10)));
        assert_eq!(profile.centers[&Center::Gut], 15);
        assert_eq!(profile.centers[&Center::Head], 20);
        assert_eq!(profile.centers[&Center::Heart], 0);
        assert_eq!(profile.dominant_center, Some(Center::Head));
    }

    #[test]
    fn test_top3_order() {
        let profile = derive_profile(&scores(&[(2, 4), (3, 9), (7, 4), (8, 1)]));
        assert_eq!(profile.top3, vec![(3, 9), (2, 4), (7, 4)]);
    }

    #[test]
    fn test_top3_with_fewer_types() {
        let profile = derive_profile(&scores(&[(4, 2)]));
        assert_eq!(profile.top3, vec![(4, 2)]);
        assert_eq!(profile.core_type(), Some(4));
    }

    #[test]
    fn test_wing_cycle_wraps() {
        assert_eq!(wing_neighbors(1), (9, 2));
        assert_eq!(wing_neighbors(9), (8, 1));
        assert_eq!(wing_neighbors(5), (4, 6));
    }

    #[test]
    fn test_wings_for_core_one() {
        let profile = derive_profile(&scores(&[(1, 20), (9, 7), (2, 3)]));
        let left = profile.left_wing.unwrap();
        let right = profile.right_wing.unwrap();
        assert_eq!((left.category, left.score), (9, 7));
        assert_eq!((right.category, right.score), (2, 3));
        assert_eq!(profile.primary_wing, Some(9));
    }

    #[test]
    fn test_primary_wing_tie_is_none() {
        let profile = derive_profile(&scores(&[(5, 12), (4, 6), (6, 6)]));
        assert_eq!(profile.core_type(), Some(5));
        assert_eq!(profile.primary_wing, None);
    }

    #[test]
    fn test_missing_wing_scores_count_as_zero() {
        let profile = derive_profile(&scores(&[(3, 8), (4, 1)]));
        assert_eq!(profile.left_wing.unwrap().score, 0);
        assert_eq!(profile.primary_wing, Some(4));
    }

    #[test]
    fn test_tritype_ties_follow_member_order() {
        // Gut: all zero -> 8. Heart: 3 and 4 tie -> 3. Head: 7 wins.
        let profile = derive_profile(&scores(&[(3, 5), (4, 5), (7, 9)]));
        assert_eq!(
            profile.tritype,
            Some(Tritype {
                gut: 8,
                heart: 3,
                head: 7
            })
        );
    }

    #[test]
    fn test_dominant_center_tie_prefers_head_then_heart() {
        let centers: CenterScores = [(Center::Head, 4), (Center::Heart, 9), (Center::Gut, 9)]
            .into_iter()
            .collect();
        assert_eq!(dominant_center(&centers), Some(Center::Heart));
        assert_eq!(dominant_center(&CenterScores::new()), None);
    }

    #[test]
    fn test_center_scores_sum_members() {
        let centers = center_scores(&scores(&[(8, 1), (9, 2), (1, 3), (2, 10)]));
        assert_eq!(centers[&Center::Gut], 6);
        assert_eq!(centers[&Center::Heart], 10);
        assert_eq!(centers[&Center::Head], 0);
    }

    #[test]
    fn test_is_category() {
        assert!(is_category(1));
        assert!(is_category(9));
        assert!(!is_category(0));
        assert!(!is_category(10));
    }
}
