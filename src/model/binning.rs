//! Supervised WoE binning fitted on the training fold.
//!
//! Numeric features are discretized into monotonic-with-target bins:
//! equal-frequency pre-bins are greedily merged by minimum IV loss to
//! a target bin count, then adjacent bins violating the dominant WoE
//! trend are merged until the trend is monotonic. Categorical features
//! are binned by category, with rare categories pooled into "OTHER".
//! The fitted process is a frozen encoder: the same raw value always
//! maps to the same WoE given a fixed fitted model.

use anyhow::{Context, Result};
use nalgebra::DMatrix;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::StageError;

/// Smoothing constant to avoid log(0) in WoE calculation (Laplace smoothing)
const SMOOTHING: f64 = 0.5;

/// Minimum non-missing samples required to bin a feature
const MIN_FIT_SAMPLES: usize = 10;

/// Pooled label for rare categorical values
const OTHER_CATEGORY: &str = "OTHER";

/// Tuning knobs for the binning fit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BinningSettings {
    /// Target number of bins per numeric feature after merging
    pub max_bins: usize,
    /// Number of equal-frequency pre-bins before merging
    pub pre_bins: usize,
    /// Minimum samples per category before pooling into OTHER
    pub min_category_samples: usize,
}

impl Default for BinningSettings {
    fn default() -> Self {
        Self {
            max_bins: 5,
            pre_bins: 20,
            min_category_samples: 5,
        }
    }
}

/// Direction of the WoE trend across a numeric feature's bins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WoeTrend {
    Ascending,
    Descending,
}

/// A single numeric bin with WoE statistics.
///
/// Terminal bins are open-ended; JSON cannot represent infinite
/// floats, so open bounds persist as null and are restored on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericBin {
    /// Lower bound (inclusive)
    #[serde(with = "lower_bound")]
    pub lower: f64,
    /// Upper bound (exclusive, except for the last bin)
    #[serde(with = "upper_bound")]
    pub upper: f64,
    pub events: f64,
    pub non_events: f64,
    pub woe: f64,
    pub iv_contribution: f64,
    pub count: f64,
    pub event_rate: f64,
}

fn serialize_bound<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

mod lower_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_bound(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
    }
}

mod upper_bound {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        super::serialize_bound(value, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// A categorical bin with WoE statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBin {
    pub category: String,
    pub events: f64,
    pub non_events: f64,
    pub woe: f64,
    pub iv_contribution: f64,
    pub count: f64,
    pub event_rate: f64,
}

/// Fitted binning for one numeric feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericBinning {
    pub bins: Vec<NumericBin>,
    /// WoE assigned to null values (0 when the fit saw none)
    pub missing_woe: f64,
    pub trend: WoeTrend,
    pub iv: f64,
}

/// Fitted binning for one categorical feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalBinning {
    pub categories: Vec<CategoryBin>,
    /// WoE for categories unseen at fit time
    pub other_woe: f64,
    /// WoE assigned to null values (0 when the fit saw none)
    pub missing_woe: f64,
    pub iv: f64,
}

/// Fitted binning for a single feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureBinning {
    Numeric(NumericBinning),
    Categorical(CategoricalBinning),
}

/// One fitted feature, keyed by column name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedFeature {
    pub name: String,
    pub binning: FeatureBinning,
}

/// The complete fitted binning process over all features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinningProcess {
    pub target: String,
    pub settings: BinningSettings,
    pub features: Vec<FittedFeature>,
}

impl BinningProcess {
    /// Fit the binning process on training features and target only.
    ///
    /// Numeric columns get monotonic WoE bins, string columns get
    /// per-category bins. Fails on a single-class target or a feature
    /// with too few usable rows.
    pub fn fit(x: &DataFrame, y: &[i32], settings: BinningSettings, target: &str) -> Result<Self> {
        if x.height() != y.len() {
            anyhow::bail!(
                "feature frame has {} rows but target has {} values",
                x.height(),
                y.len()
            );
        }

        let total_events = y.iter().filter(|&&t| t == 1).count() as f64;
        let total_non_events = y.len() as f64 - total_events;
        if total_events == 0.0 || total_non_events == 0.0 {
            return Err(StageError::DegenerateStratification {
                class: if total_events == 0.0 { 1 } else { 0 },
                count: 0,
            }
            .into());
        }

        let columns: Vec<&Column> = x.get_columns().iter().collect();
        let features: Vec<FittedFeature> = columns
            .par_iter()
            .map(|col| {
                let name = col.name().to_string();
                let binning = if col.dtype().is_primitive_numeric() {
                    fit_numeric(col, y, &settings)
                        .with_context(|| format!("binning numeric feature '{}'", name))?
                } else {
                    fit_categorical(col, y, &settings)
                        .with_context(|| format!("binning categorical feature '{}'", name))?
                };
                Ok(FittedFeature { name, binning })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            target: target.to_string(),
            settings,
            features,
        })
    }

    /// Names of the fitted features, in training column order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Encode a DataFrame into the WoE design matrix (rows x features).
    ///
    /// Every fitted feature must be present in the input; encoding is
    /// deterministic for a fixed fitted model.
    pub fn transform(&self, df: &DataFrame) -> Result<DMatrix<f64>> {
        let rows = df.height();
        let cols = self.features.len();
        let mut data = vec![0.0f64; rows * cols];

        for (j, feature) in self.features.iter().enumerate() {
            let col = df.column(feature.name.as_str()).map_err(|_| {
                StageError::MissingColumn {
                    stage: "binning transform",
                    column: feature.name.clone(),
                }
            })?;
            let encoded = encode_column(col, &feature.binning)?;
            for (i, woe) in encoded.into_iter().enumerate() {
                data[i * cols + j] = woe;
            }
        }

        Ok(DMatrix::from_row_slice(rows, cols, &data))
    }

    /// Total information value per feature, sorted descending.
    pub fn information_values(&self) -> Vec<(String, f64)> {
        let mut ivs: Vec<(String, f64)> = self
            .features
            .iter()
            .map(|f| {
                let iv = match &f.binning {
                    FeatureBinning::Numeric(n) => n.iv,
                    FeatureBinning::Categorical(c) => c.iv,
                };
                (f.name.clone(), iv)
            })
            .collect();
        ivs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ivs
    }

    /// Persist the fitted process as a JSON document.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize binning process to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write binning process to {}", path.display()))?;
        Ok(())
    }

    /// Load a fitted process from its JSON document.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read binning process from {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse binning process at {}", path.display()))
    }
}

/// Encode one column into WoE values.
fn encode_column(col: &Column, binning: &FeatureBinning) -> Result<Vec<f64>> {
    match binning {
        FeatureBinning::Numeric(nb) => {
            let float_col = col.cast(&DataType::Float64)?;
            let values = float_col.f64()?;
            Ok(values
                .into_iter()
                .map(|v| match v {
                    Some(val) => woe_for_value(val, &nb.bins),
                    None => nb.missing_woe,
                })
                .collect())
        }
        FeatureBinning::Categorical(cb) => {
            let string_col = col.cast(&DataType::String)?;
            let values = string_col.str()?;
            Ok(values
                .into_iter()
                .map(|v| match v {
                    Some(cat) => cb
                        .categories
                        .iter()
                        .find(|c| c.category == cat)
                        .map(|c| c.woe)
                        .unwrap_or(cb.other_woe),
                    None => cb.missing_woe,
                })
                .collect())
        }
    }
}

/// Find the WoE for a numeric value; bins cover the full real line.
fn woe_for_value(value: f64, bins: &[NumericBin]) -> f64 {
    for bin in bins {
        if value >= bin.lower && value < bin.upper {
            return bin.woe;
        }
    }
    // Last bin is inclusive of its upper bound
    if let Some(last) = bins.last() {
        if value >= last.lower {
            return last.woe;
        }
    }
    0.0
}

/// WoE and IV contribution for a bin, with Laplace smoothing.
///
/// Uses the ln(%bad/%good) convention: WoE > 0 means higher risk.
fn calculate_woe_iv(
    events: f64,
    non_events: f64,
    total_events: f64,
    total_non_events: f64,
) -> (f64, f64) {
    let dist_events = (events + SMOOTHING) / (total_events + SMOOTHING);
    let dist_non_events = (non_events + SMOOTHING) / (total_non_events + SMOOTHING);
    let woe = (dist_events / dist_non_events).ln();
    let iv_contrib = (dist_events - dist_non_events) * woe;
    (woe, iv_contrib)
}

fn fit_numeric(col: &Column, y: &[i32], settings: &BinningSettings) -> Result<FeatureBinning> {
    let float_col = col.cast(&DataType::Float64)?;
    let values = float_col.f64()?;

    let mut pairs: Vec<(f64, i32)> = Vec::new();
    let mut missing_events = 0.0f64;
    let mut missing_non_events = 0.0f64;

    for (v, &t) in values.into_iter().zip(y.iter()) {
        match v {
            Some(val) => pairs.push((val, t)),
            None => {
                if t == 1 {
                    missing_events += 1.0;
                } else {
                    missing_non_events += 1.0;
                }
            }
        }
    }

    if pairs.len() < MIN_FIT_SAMPLES {
        anyhow::bail!(
            "insufficient non-missing rows ({}, need {})",
            pairs.len(),
            MIN_FIT_SAMPLES
        );
    }

    let total_events = y.iter().filter(|&&t| t == 1).count() as f64;
    let total_non_events = y.len() as f64 - total_events;

    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let pre_bins = quantile_prebins(&pairs, settings.pre_bins, total_events, total_non_events);
    let merged = greedy_merge_bins(pre_bins, settings.max_bins, total_events, total_non_events);
    let (mut bins, trend) = enforce_monotonic_trend(merged, total_events, total_non_events);

    // The fitted bins cover the full real line so unseen extremes land
    // in a terminal bin.
    if let Some(first) = bins.first_mut() {
        first.lower = f64::NEG_INFINITY;
    }
    if let Some(last) = bins.last_mut() {
        last.upper = f64::INFINITY;
    }

    let missing_count = missing_events + missing_non_events;
    let (missing_woe, missing_iv) = if missing_count > 0.0 {
        calculate_woe_iv(missing_events, missing_non_events, total_events, total_non_events)
    } else {
        (0.0, 0.0)
    };

    let iv = bins.iter().map(|b| b.iv_contribution).sum::<f64>() + missing_iv;

    Ok(FeatureBinning::Numeric(NumericBinning {
        bins,
        missing_woe,
        trend,
        iv,
    }))
}

fn fit_categorical(col: &Column, y: &[i32], settings: &BinningSettings) -> Result<FeatureBinning> {
    let string_col = col.cast(&DataType::String)?;
    let values = string_col.str()?;

    // BTreeMap keeps category iteration deterministic across runs
    let mut stats: BTreeMap<String, (f64, f64, usize)> = BTreeMap::new();
    let mut missing_events = 0.0f64;
    let mut missing_non_events = 0.0f64;

    for (v, &t) in values.into_iter().zip(y.iter()) {
        match v {
            Some(cat) => {
                let entry = stats.entry(cat.to_string()).or_insert((0.0, 0.0, 0));
                if t == 1 {
                    entry.0 += 1.0;
                } else {
                    entry.1 += 1.0;
                }
                entry.2 += 1;
            }
            None => {
                if t == 1 {
                    missing_events += 1.0;
                } else {
                    missing_non_events += 1.0;
                }
            }
        }
    }

    if stats.is_empty() {
        anyhow::bail!("no non-missing categorical values");
    }

    let total_events = y.iter().filter(|&&t| t == 1).count() as f64;
    let total_non_events = y.len() as f64 - total_events;

    // Pool rare categories into OTHER
    let mut other_events = 0.0f64;
    let mut other_non_events = 0.0f64;
    let mut kept: Vec<(String, f64, f64)> = Vec::new();
    for (cat, (events, non_events, raw_count)) in stats {
        if raw_count < settings.min_category_samples {
            other_events += events;
            other_non_events += non_events;
        } else {
            kept.push((cat, events, non_events));
        }
    }
    if other_events + other_non_events > 0.0 {
        kept.push((OTHER_CATEGORY.to_string(), other_events, other_non_events));
    }

    let mut categories: Vec<CategoryBin> = kept
        .into_iter()
        .map(|(category, events, non_events)| {
            let count = events + non_events;
            let (woe, iv_contribution) =
                calculate_woe_iv(events, non_events, total_events, total_non_events);
            CategoryBin {
                category,
                events,
                non_events,
                woe,
                iv_contribution,
                count,
                event_rate: if count > 0.0 { events / count } else { 0.0 },
            }
        })
        .collect();
    categories.sort_by(|a, b| a.woe.partial_cmp(&b.woe).unwrap_or(std::cmp::Ordering::Equal));

    let other_woe = categories
        .iter()
        .find(|c| c.category == OTHER_CATEGORY)
        .map(|c| c.woe)
        .unwrap_or(0.0);

    let missing_count = missing_events + missing_non_events;
    let (missing_woe, missing_iv) = if missing_count > 0.0 {
        calculate_woe_iv(missing_events, missing_non_events, total_events, total_non_events)
    } else {
        (0.0, 0.0)
    };

    let iv = categories.iter().map(|c| c.iv_contribution).sum::<f64>() + missing_iv;

    Ok(FeatureBinning::Categorical(CategoricalBinning {
        categories,
        other_woe,
        missing_woe,
        iv,
    }))
}

/// Create initial equal-frequency pre-bins from sorted (value, target)
/// pairs.
fn quantile_prebins(
    sorted_pairs: &[(f64, i32)],
    num_prebins: usize,
    total_events: f64,
    total_non_events: f64,
) -> Vec<NumericBin> {
    let n = sorted_pairs.len();
    let bin_size = n.div_ceil(num_prebins.max(1));

    let mut bins = Vec::new();
    let mut start_idx = 0;

    while start_idx < n {
        let mut end_idx = (start_idx + bin_size).min(n);
        // Never split a run of identical values across two bins
        while end_idx < n && (sorted_pairs[end_idx].0 - sorted_pairs[end_idx - 1].0).abs() < 1e-12 {
            end_idx += 1;
        }

        let bin_pairs = &sorted_pairs[start_idx..end_idx];
        let lower = bin_pairs.first().map(|(v, _)| *v).unwrap_or(f64::NEG_INFINITY);
        let upper = if end_idx < n {
            sorted_pairs[end_idx].0
        } else {
            f64::INFINITY
        };

        let events = bin_pairs.iter().filter(|(_, t)| *t == 1).count() as f64;
        let non_events = bin_pairs.len() as f64 - events;
        let count = events + non_events;
        let (woe, iv_contrib) = calculate_woe_iv(events, non_events, total_events, total_non_events);

        bins.push(NumericBin {
            lower,
            upper,
            events,
            non_events,
            woe,
            iv_contribution: iv_contrib,
            count,
            event_rate: if count > 0.0 { events / count } else { 0.0 },
        });

        start_idx = end_idx;
    }

    bins
}

/// Greedy merge bins to minimize IV loss until the target count is
/// reached.
fn greedy_merge_bins(
    mut bins: Vec<NumericBin>,
    target_bins: usize,
    total_events: f64,
    total_non_events: f64,
) -> Vec<NumericBin> {
    while bins.len() > target_bins && bins.len() > 1 {
        let mut min_loss = f64::MAX;
        let mut merge_idx = 0;

        for i in 0..bins.len() - 1 {
            let merged = merge_two_bins(&bins[i], &bins[i + 1], total_events, total_non_events);
            let loss = bins[i].iv_contribution + bins[i + 1].iv_contribution - merged.iv_contribution;
            if loss < min_loss {
                min_loss = loss;
                merge_idx = i;
            }
        }

        let merged = merge_two_bins(
            &bins[merge_idx],
            &bins[merge_idx + 1],
            total_events,
            total_non_events,
        );
        bins.remove(merge_idx + 1);
        bins[merge_idx] = merged;
    }

    bins
}

/// Merge adjacent bins until the WoE sequence is monotonic in the
/// dominant direction.
///
/// The direction is re-derived from the terminal bins after every
/// merge; with two or fewer bins any sequence is monotonic.
fn enforce_monotonic_trend(
    mut bins: Vec<NumericBin>,
    total_events: f64,
    total_non_events: f64,
) -> (Vec<NumericBin>, WoeTrend) {
    loop {
        let trend = derive_trend(&bins);
        if bins.len() <= 2 {
            return (bins, trend);
        }

        let violation = (0..bins.len() - 1).find(|&i| match trend {
            WoeTrend::Ascending => bins[i + 1].woe < bins[i].woe,
            WoeTrend::Descending => bins[i + 1].woe > bins[i].woe,
        });

        match violation {
            Some(i) => {
                let merged = merge_two_bins(&bins[i], &bins[i + 1], total_events, total_non_events);
                bins.remove(i + 1);
                bins[i] = merged;
            }
            None => return (bins, trend),
        }
    }
}

fn derive_trend(bins: &[NumericBin]) -> WoeTrend {
    match (bins.first(), bins.last()) {
        (Some(first), Some(last)) if last.woe < first.woe => WoeTrend::Descending,
        _ => WoeTrend::Ascending,
    }
}

fn merge_two_bins(
    bin1: &NumericBin,
    bin2: &NumericBin,
    total_events: f64,
    total_non_events: f64,
) -> NumericBin {
    let events = bin1.events + bin2.events;
    let non_events = bin1.non_events + bin2.non_events;
    let count = bin1.count + bin2.count;
    let (woe, iv_contrib) = calculate_woe_iv(events, non_events, total_events, total_non_events);

    NumericBin {
        lower: bin1.lower,
        upper: bin2.upper,
        events,
        non_events,
        woe,
        iv_contribution: iv_contrib,
        count,
        event_rate: if count > 0.0 { events / count } else { 0.0 },
    }
}
