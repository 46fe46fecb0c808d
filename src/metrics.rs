//! Discrimination, calibration and stability metrics.
//!
//! All metrics operate on a vector of predicted default probabilities
//! and the matching vector of binary outcomes. AUC uses a tie-aware
//! rank statistic; PSI buckets the reference distribution into
//! equal-frequency bins by percentile.

use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// Number of equal-frequency buckets for PSI.
pub const PSI_BUCKETS: usize = 10;

/// Floor substituted for zero-frequency PSI buckets to avoid log(0).
/// Kept at this exact value for reproducible PSI numbers.
pub const PSI_EPSILON: f64 = 0.0001;

/// Discrimination and calibration metrics for a single fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub auc: f64,
    pub gini: f64,
    pub pr_auc: f64,
    pub ks: f64,
    pub brier: f64,
}

/// Compute all fold metrics at once.
pub fn fold_metrics(proba: &[f64], targets: &[i32]) -> Result<FoldMetrics, StageError> {
    validate_fold(proba, targets)?;
    let auc = roc_auc(proba, targets);
    Ok(FoldMetrics {
        auc,
        gini: 2.0 * auc - 1.0,
        pr_auc: average_precision(proba, targets),
        ks: ks_statistic(proba, targets),
        brier: brier_score(proba, targets),
    })
}

fn validate_fold(proba: &[f64], targets: &[i32]) -> Result<(), StageError> {
    debug_assert_eq!(proba.len(), targets.len());
    let positives = targets.iter().filter(|&&t| t == 1).count();
    if positives == 0 || positives == targets.len() {
        let values = if positives == 0 { vec![0.0] } else { vec![1.0] };
        return Err(StageError::NonBinaryTarget {
            column: "fold target".to_string(),
            values,
        });
    }
    Ok(())
}

/// Area under the ROC curve via the Mann-Whitney rank statistic.
///
/// Ties in the predicted probability receive their average rank, so
/// a constant predictor scores exactly 0.5.
pub fn roc_auc(proba: &[f64], targets: &[i32]) -> f64 {
    let n = proba.len();
    if n == 0 {
        return 0.5;
    }

    let mut pairs: Vec<(f64, i32)> = proba.iter().copied().zip(targets.iter().copied()).collect();
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let total_pos = pairs.iter().filter(|(_, t)| *t == 1).count() as f64;
    let total_neg = n as f64 - total_pos;
    if total_pos == 0.0 || total_neg == 0.0 {
        return 0.5;
    }

    // Average ranks over tie groups.
    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j < n && (pairs[j].0 - pairs[i].0).abs() < 1e-12 {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0; // ranks are 1-based
        for pair in &pairs[i..j] {
            if pair.1 == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j;
    }

    let u = rank_sum_pos - total_pos * (total_pos + 1.0) / 2.0;
    (u / (total_pos * total_neg)).clamp(0.0, 1.0)
}

/// Average precision (area under the precision-recall curve).
///
/// AP = sum over descending-probability tie groups of
/// (recall delta) * (precision at that threshold).
pub fn average_precision(proba: &[f64], targets: &[i32]) -> f64 {
    let n = proba.len();
    let total_pos = targets.iter().filter(|&&t| t == 1).count() as f64;
    if n == 0 || total_pos == 0.0 {
        return 0.0;
    }

    let mut pairs: Vec<(f64, i32)> = proba.iter().copied().zip(targets.iter().copied()).collect();
    pairs.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut tp = 0.0;
    let mut seen = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        let mut group_tp = 0.0;
        while j < n && (pairs[j].0 - pairs[i].0).abs() < 1e-12 {
            if pairs[j].1 == 1 {
                group_tp += 1.0;
            }
            j += 1;
        }
        tp += group_tp;
        seen += (j - i) as f64;
        let precision = tp / seen;
        ap += (group_tp / total_pos) * precision;
        i = j;
    }

    ap
}

/// Kolmogorov-Smirnov statistic: maximum separation between the
/// empirical CDFs of predicted probability for defaulters and
/// non-defaulters.
pub fn ks_statistic(proba: &[f64], targets: &[i32]) -> f64 {
    let mut pos: Vec<f64> = Vec::new();
    let mut neg: Vec<f64> = Vec::new();
    for (&p, &t) in proba.iter().zip(targets.iter()) {
        if t == 1 {
            pos.push(p);
        } else {
            neg.push(p);
        }
    }
    if pos.is_empty() || neg.is_empty() {
        return 0.0;
    }

    pos.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    neg.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let (np, nn) = (pos.len() as f64, neg.len() as f64);
    let mut max_diff = 0.0f64;
    let (mut i, mut j) = (0usize, 0usize);
    while i < pos.len() || j < neg.len() {
        // Next threshold is the smallest unconsumed value; both CDFs
        // must step past every observation tied at that threshold
        // before the gap is measured.
        let threshold = match (pos.get(i), neg.get(j)) {
            (Some(&p), Some(&n)) => p.min(n),
            (Some(&p), None) => p,
            (None, Some(&n)) => n,
            (None, None) => break,
        };
        while i < pos.len() && pos[i] <= threshold {
            i += 1;
        }
        while j < neg.len() && neg[j] <= threshold {
            j += 1;
        }
        let diff = (i as f64 / np - j as f64 / nn).abs();
        if diff > max_diff {
            max_diff = diff;
        }
    }
    max_diff
}

/// Brier score: mean squared error between predicted probability and
/// the binary outcome.
pub fn brier_score(proba: &[f64], targets: &[i32]) -> f64 {
    if proba.is_empty() {
        return 0.0;
    }
    let sum: f64 = proba
        .iter()
        .zip(targets.iter())
        .map(|(&p, &t)| {
            let y = t as f64;
            (p - y) * (p - y)
        })
        .sum();
    sum / proba.len() as f64
}

/// Population Stability Index between an expected (train) and an
/// actual (out-of-time) probability distribution.
///
/// The expected distribution is bucketed into `PSI_BUCKETS`
/// equal-frequency bins by percentile; zero-fraction buckets are
/// floored at `PSI_EPSILON` before taking logs.
pub fn population_stability_index(expected: &[f64], actual: &[f64]) -> f64 {
    if expected.is_empty() || actual.is_empty() {
        return 0.0;
    }

    let mut sorted = expected.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let breakpoints: Vec<f64> = (0..=PSI_BUCKETS)
        .map(|i| percentile(&sorted, 100.0 * i as f64 / PSI_BUCKETS as f64))
        .collect();

    let expected_frac = bucket_fractions(expected, &breakpoints);
    let actual_frac = bucket_fractions(actual, &breakpoints);

    expected_frac
        .iter()
        .zip(actual_frac.iter())
        .map(|(&e, &a)| {
            let e = if e == 0.0 { PSI_EPSILON } else { e };
            let a = if a == 0.0 { PSI_EPSILON } else { a };
            (e - a) * (e / a).ln()
        })
        .sum()
}

/// Fraction of `values` falling in each half-open bucket
/// [b_i, b_{i+1}), with the final bucket closed on the right.
/// Values outside the breakpoint range are not counted, matching a
/// histogram over fixed edges; fractions use the full sample size.
fn bucket_fractions(values: &[f64], breakpoints: &[f64]) -> Vec<f64> {
    let buckets = breakpoints.len() - 1;
    let mut counts = vec![0usize; buckets];
    for &v in values {
        for b in 0..buckets {
            let last = b == buckets - 1;
            let in_bucket = if last {
                v >= breakpoints[b] && v <= breakpoints[b + 1]
            } else {
                v >= breakpoints[b] && v < breakpoints[b + 1]
            };
            if in_bucket {
                counts[b] += 1;
                break;
            }
        }
    }
    counts
        .into_iter()
        .map(|c| c as f64 / values.len() as f64)
        .collect()
}

/// Linear-interpolated percentile of pre-sorted values, q in [0, 100].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] + (sorted[hi] - sorted[lo]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auc_perfect_separation() {
        let proba = vec![0.1, 0.2, 0.8, 0.9];
        let targets = vec![0, 0, 1, 1];
        assert!((roc_auc(&proba, &targets) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_auc_constant_predictor_is_half() {
        let proba = vec![0.5, 0.5, 0.5, 0.5];
        let targets = vec![0, 1, 0, 1];
        assert!((roc_auc(&proba, &targets) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_auc_inverted_predictor() {
        let proba = vec![0.9, 0.8, 0.2, 0.1];
        let targets = vec![0, 0, 1, 1];
        assert!(roc_auc(&proba, &targets) < 1e-9);
    }

    #[test]
    fn test_average_precision_perfect() {
        let proba = vec![0.1, 0.2, 0.8, 0.9];
        let targets = vec![0, 0, 1, 1];
        assert!((average_precision(&proba, &targets) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_precision_ranked_example() {
        // Ranked desc: (0.9, 1), (0.8, 0), (0.7, 1), (0.6, 0)
        // AP = 1/2 * (1/1) + 1/2 * (2/3) = 0.8333...
        let proba = vec![0.9, 0.8, 0.7, 0.6];
        let targets = vec![1, 0, 1, 0];
        assert!((average_precision(&proba, &targets) - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_ks_perfect_separation() {
        let proba = vec![0.1, 0.2, 0.8, 0.9];
        let targets = vec![0, 0, 1, 1];
        assert!((ks_statistic(&proba, &targets) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ks_identical_distributions() {
        let proba = vec![0.2, 0.4, 0.2, 0.4];
        let targets = vec![0, 0, 1, 1];
        assert!(ks_statistic(&proba, &targets) < 1e-9);
    }

    #[test]
    fn test_ks_cross_class_ties_do_not_inflate() {
        // A tied pair across classes separates nothing
        assert!(ks_statistic(&[0.5, 0.5], &[1, 0]) < 1e-9);

        // Binned scores: three levels shared by both classes, with the
        // top level more often bad. Only the genuine shift counts.
        let proba = vec![0.1, 0.1, 0.5, 0.5, 0.9, 0.1, 0.5, 0.9, 0.9, 0.9];
        let targets = vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        let ks = ks_statistic(&proba, &targets);
        // CDF gap after the 0.5 level: 4/5 goods vs 2/5 bads
        assert!((ks - 0.4).abs() < 1e-9, "got {}", ks);
    }

    #[test]
    fn test_brier_extremes() {
        assert!((brier_score(&[1.0, 0.0], &[1, 0]) - 0.0).abs() < 1e-12);
        assert!((brier_score(&[0.0, 1.0], &[1, 0]) - 1.0).abs() < 1e-12);
        assert!((brier_score(&[0.5, 0.5], &[1, 0]) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_psi_self_is_zero() {
        let dist: Vec<f64> = (0..200).map(|i| i as f64 / 200.0).collect();
        let psi = population_stability_index(&dist, &dist);
        assert!(psi.abs() < 1e-9, "PSI against itself should be 0, got {}", psi);
    }

    #[test]
    fn test_psi_detects_shift() {
        let expected: Vec<f64> = (0..200).map(|i| i as f64 / 200.0).collect();
        let actual: Vec<f64> = (0..200).map(|i| 0.5 + i as f64 / 400.0).collect();
        let psi = population_stability_index(&expected, &actual);
        assert!(psi > 0.25, "shifted distribution should yield a large PSI, got {}", psi);
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0];
        assert!((percentile(&sorted, 0.0) - 1.0).abs() < 1e-12);
        assert!((percentile(&sorted, 100.0) - 4.0).abs() < 1e-12);
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_fold_metrics_rejects_single_class() {
        let proba = vec![0.1, 0.2, 0.3];
        let targets = vec![0, 0, 0];
        assert!(fold_metrics(&proba, &targets).is_err());
    }

    #[test]
    fn test_fold_metrics_gini_consistency() {
        let proba = vec![0.1, 0.4, 0.35, 0.8];
        let targets = vec![0, 0, 1, 1];
        let m = fold_metrics(&proba, &targets).unwrap();
        assert!((m.gini - (2.0 * m.auc - 1.0)).abs() < 1e-12);
        assert!(m.brier >= 0.0 && m.brier <= 1.0);
        assert!(m.ks >= 0.0 && m.ks <= 1.0);
    }
}
