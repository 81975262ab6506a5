//! Anomaly detection for numeric columns.
//!
//! Three interchangeable methods, selected per call:
//! - isolation forest with a fixed seed and expected contamination rate
//! - robust z-score `0.6745 * (x - median) / MAD`
//! - standard z-score `(x - mean) / std`
//!
//! Columns with fewer present values than `min_samples` are skipped and
//! produce `None`.

pub mod isolation_forest;

use crate::config::{AnomalyConfig, AnomalyMethod};
use crate::error::Result;
use crate::stats::descriptive::{mean, median, median_absolute_deviation, present_with_index, std_dev};
use crate::types::AnomalyResult;
use isolation_forest::IsolationForestParams;
use tracing::debug;

/// Consistency constant that makes the MAD comparable to a standard deviation.
const MAD_SCALE: f64 = 0.6745;

/// Mean-absolute-deviation scale used when more than half the values are equal.
const MEAN_AD_SCALE: f64 = 0.797_884_560_8;

/// Flag anomalous rows of one column.
///
/// Indices refer to positions in `values`, so missing entries keep their
/// place and results line up with the source rows.
pub fn detect_anomalies(
    column: &str,
    values: &[Option<f64>],
    method: AnomalyMethod,
    config: &AnomalyConfig,
) -> Option<AnomalyResult> {
    let (rows, present) = present_with_index(values);
    if present.len() < config.min_samples {
        debug!(column, n = present.len(), "Too few values for anomaly detection");
        return None;
    }

    let (positions, threshold) = match method {
        AnomalyMethod::IsolationForest => {
            let params = IsolationForestParams {
                n_estimators: config.n_estimators,
                max_samples: config.max_samples,
                contamination: config.contamination,
                seed: config.seed,
            };
            let scores = isolation_forest::score(&present, &params)?;
            (scores.anomalous_positions(), scores.threshold)
        }
        AnomalyMethod::RobustZScore => (
            flag_beyond(&robust_z_scores(&present)?, config.z_threshold),
            config.z_threshold,
        ),
        AnomalyMethod::ZScore => (
            flag_beyond(&z_scores(&present)?, config.z_threshold),
            config.z_threshold,
        ),
    };

    let outlier_indices: Vec<usize> = positions.into_iter().map(|p| rows[p]).collect();
    debug!(column, method = method.as_str(), count = outlier_indices.len(), "Anomaly scan finished");

    Some(AnomalyResult {
        column: column.to_string(),
        method,
        outlier_count: outlier_indices.len(),
        outlier_indices,
        threshold,
    })
}

/// Same as [`detect_anomalies`] with the method given by name.
///
/// Unknown names are a configuration error, distinct from "no anomalies".
pub fn detect_anomalies_by_name(
    column: &str,
    values: &[Option<f64>],
    method: &str,
    config: &AnomalyConfig,
) -> Result<Option<AnomalyResult>> {
    let method: AnomalyMethod = method.parse()?;
    Ok(detect_anomalies(column, values, method, config))
}

/// Robust z-scores. Falls back to the mean absolute deviation when the MAD
/// is zero; `None` when the values have no spread at all.
pub fn robust_z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let med = median(values)?;
    let mad = median_absolute_deviation(values, med);
    if mad > 0.0 {
        return Some(values.iter().map(|v| MAD_SCALE * (v - med) / mad).collect());
    }

    let mean_ad = values.iter().map(|v| (v - med).abs()).sum::<f64>() / values.len() as f64;
    if mean_ad == 0.0 {
        return None;
    }
    Some(
        values
            .iter()
            .map(|v| MEAN_AD_SCALE * (v - med) / mean_ad)
            .collect(),
    )
}

/// Standard z-scores; `None` for zero variance.
pub fn z_scores(values: &[f64]) -> Option<Vec<f64>> {
    let m = mean(values)?;
    let s = std_dev(values)?;
    if s == 0.0 {
        return None;
    }
    Some(values.iter().map(|v| (v - m) / s).collect())
}

fn flag_beyond(scores: &[f64], threshold: f64) -> Vec<usize> {
    scores
        .iter()
        .enumerate()
        .filter(|(_, z)| z.abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}
