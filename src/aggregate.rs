//! Multi-run statistics: per-key value vectors, mean, and population σ.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::profile::{Center, CategoryScores, center_scores};

/// Values observed for one key across runs, in run order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSeries {
    pub values: Vec<u32>,
    pub mean: f64,
    pub std_dev: f64,
}

impl StatSeries {
    pub fn from_values(values: Vec<u32>) -> Self {
        let as_f64: Vec<f64> = values.iter().map(|v| f64::from(*v)).collect();
        let (mean, std_dev) = mean_std(&as_f64);
        Self {
            values,
            mean,
            std_dev,
        }
    }
}

/// Mean and population standard deviation (denominator N).
///
/// Returns `(0.0, 0.0)` for an empty slice.
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Statistics for every category present in at least one run.
///
/// Runs where a category is absent contribute a 0, so every series has one
/// value per run.
pub fn aggregate_categories(runs: &[&CategoryScores]) -> BTreeMap<u8, StatSeries> {
    let categories: BTreeSet<u8> = runs.iter().flat_map(|r| r.keys().copied()).collect();
    categories
        .into_iter()
        .map(|t| {
            let values = runs
                .iter()
                .map(|r| r.get(&t).copied().unwrap_or(0))
                .collect();
            (t, StatSeries::from_values(values))
        })
        .collect()
}

/// Statistics for all three centers, computed per run from category scores.
pub fn aggregate_centers(runs: &[&CategoryScores]) -> BTreeMap<Center, StatSeries> {
    let per_run: Vec<_> = runs.iter().map(|r| center_scores(r)).collect();
    Center::ALL
        .iter()
        .map(|center| {
            let values = per_run
                .iter()
                .map(|cs| cs.get(center).copied().unwrap_or(0))
                .collect();
            (*center, StatSeries::from_values(values))
        })
        .collect()
}

/// Totals per key summed over all runs.
pub fn combined_counts<K: Ord + Clone>(runs: &[&BTreeMap<K, u32>]) -> BTreeMap<K, u32> {
    let mut totals = BTreeMap::new();
    for run in runs {
        for (key, count) in run.iter() {
            *totals.entry(key.clone()).or_insert(0) += count;
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(u8, u32)]) -> CategoryScores {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_mean_std_population() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((m - 5.0).abs() < 1e-12);
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_std_empty() {
        assert_eq!(mean_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_single_run_has_zero_sigma() {
        let run = scores(&[(1, 12), (4, 7)]);
        let stats = aggregate_categories(&[&run]);
        assert_eq!(stats[&1].values, vec![12]);
        assert_eq!(stats[&1].mean, 12.0);
        assert_eq!(stats[&1].std_dev, 0.0);
        assert_eq!(stats[&4].mean, 7.0);

        let centers = aggregate_centers(&[&run]);
        assert_eq!(centers[&Center::Gut].mean, 12.0);
        assert_eq!(centers[&Center::Heart].mean, 7.0);
        assert_eq!(centers[&Center::Head].mean, 0.0);
        assert!(centers.values().all(|s| s.std_dev == 0.0));
    }

    #[test]
    fn test_identical_runs_have_zero_sigma() {
        let run = scores(&[(2, 5), (6, 3), (9, 11)]);
        let stats = aggregate_categories(&[&run, &run, &run]);
        for (t, series) in &stats {
            assert_eq!(series.mean, f64::from(run[t]));
            assert_eq!(series.std_dev, 0.0);
            assert_eq!(series.values.len(), 3);
        }
    }

    #[test]
    fn test_absent_category_is_zero_filled() {
        let a = scores(&[(3, 4)]);
        let b = scores(&[(5, 6)]);
        let stats = aggregate_categories(&[&a, &b]);
        assert_eq!(stats[&3].values, vec![4, 0]);
        assert_eq!(stats[&5].values, vec![0, 6]);
        assert_eq!(stats[&3].mean, 2.0);
        assert_eq!(stats[&3].std_dev, 2.0);
    }

    #[test]
    fn test_no_runs() {
        assert!(aggregate_categories(&[]).is_empty());
        let centers = aggregate_centers(&[]);
        assert_eq!(centers.len(), 3);
        assert!(centers.values().all(|s| s.values.is_empty() && s.mean == 0.0));
    }

    #[test]
    fn test_combined_counts() {
        let a: BTreeMap<String, u32> = [("X".to_string(), 2), ("Y".to_string(), 1)].into();
        let b: BTreeMap<String, u32> = [("X".to_string(), 1), ("Z".to_string(), 4)].into();
        let totals = combined_counts(&[&a, &b]);
        assert_eq!(totals["X"], 3);
        assert_eq!(totals["Y"], 1);
        assert_eq!(totals["Z"], 4);
    }
}
