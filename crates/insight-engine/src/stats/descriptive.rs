//! Descriptive statistics over plain slices.
//!
//! All functions here are total: degenerate input (empty slices, a single
//! value, zero variance) yields `None` or a neutral value instead of NaN.

use crate::types::DistributionShape;
use std::cmp::Ordering;

/// Sort a copy of the values ascending (NaN-safe).
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator).
pub fn variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some(ss / (values.len() as f64 - 1.0))
}

/// Sample standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Skewness as the third central moment over the cubed sample deviation.
pub fn skewness(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let std = std_dev(values)?;
    if std == 0.0 {
        return Some(0.0);
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / values.len() as f64;
    Some(m3 / std.powi(3))
}

/// Excess kurtosis (0 for a normal distribution).
pub fn kurtosis(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let std = std_dev(values)?;
    if std == 0.0 {
        return Some(0.0);
    }
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / values.len() as f64;
    Some(m4 / std.powi(4) - 3.0)
}

/// Coarse shape label from skewness and excess kurtosis.
pub fn distribution_shape(skewness: f64, kurtosis: f64) -> DistributionShape {
    if skewness > 1.0 {
        DistributionShape::RightSkewed
    } else if skewness < -1.0 {
        DistributionShape::LeftSkewed
    } else if kurtosis > 3.0 {
        DistributionShape::HeavyTailed
    } else {
        DistributionShape::Normal
    }
}

/// Linear-interpolated quantile of ascending values.
pub fn quantile_sorted(values: &[f64], quantile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let pos = quantile.clamp(0.0, 1.0) * (values.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return values[lower];
    }
    let weight = pos - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(quantile_sorted(&sorted(values), 0.5))
}

/// Median of the absolute deviations from `median`.
pub fn median_absolute_deviation(values: &[f64], median: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    quantile_sorted(&sorted(&deviations), 0.5)
}

/// Average ranks (1-based); tied values share the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Sizes of the groups of tied values, used by rank-test tie corrections.
pub fn tie_group_sizes(values: &[f64]) -> Vec<usize> {
    let sorted = sorted(values);
    let mut sizes = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let mut j = i;
        while j + 1 < sorted.len() && sorted[j + 1] == sorted[i] {
            j += 1;
        }
        if j > i {
            sizes.push(j - i + 1);
        }
        i = j + 1;
    }
    sizes
}

/// Drop missing entries, keeping only rows where both sides are present.
pub fn complete_pairs(a: &[Option<f64>], b: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    a.iter()
        .zip(b.iter())
        .filter_map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some((*x, *y)),
            _ => None,
        })
        .unzip()
}

/// Present values of a column with their row indices.
pub fn present_with_index(values: &[Option<f64>]) -> (Vec<usize>, Vec<f64>) {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .unzip()
}

pub fn is_constant(values: &[f64]) -> bool {
    match values.first() {
        Some(first) => values.iter().all(|v| v == first),
        None => true,
    }
}
