//! Dataset-wide checks: correlations, IQR outliers, dominant categories,
//! distribution shape, missing values, duplicate rows and anomalies.
//!
//! Every check runs per column or per pair. A unit that fails is logged and
//! skipped, so one bad column never aborts the run.

use super::correlation::correlate;
use super::descriptive::{
    complete_pairs, distribution_shape, is_constant, kurtosis, mean, quantile_sorted, skewness,
    sorted, std_dev,
};
use crate::anomaly::detect_anomalies;
use crate::config::InsightConfig;
use crate::dataset::Dataset;
use crate::types::{ColumnProfile, CorrelationMethod, CorrelationResult, Finding, LogicalType, Strength};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Output of the basic statistics module.
#[derive(Debug, Clone, Default)]
pub struct BasicReport {
    pub findings: Vec<Finding>,
    /// Every pair that could be evaluated, with its representative coefficient.
    pub correlations: Vec<CorrelationResult>,
    /// Correlations with `exploratory <= |value| < strong`, the subspace search input.
    pub exploratory_correlations: Vec<CorrelationResult>,
}

pub struct BasicStatistics<'a> {
    config: &'a InsightConfig,
}

impl<'a> BasicStatistics<'a> {
    pub fn new(config: &'a InsightConfig) -> Self {
        Self { config }
    }

    /// Run every basic check.
    pub fn run(&self, dataset: &Dataset, profiles: &[ColumnProfile]) -> BasicReport {
        let numeric = numeric_columns(dataset, profiles);
        let mut report = BasicReport::default();

        let correlations = self.correlations(&numeric);
        for result in &correlations {
            if result.value.abs() >= self.config.correlation_threshold {
                report.findings.push(Finding::StrongCorrelation(result.clone()));
            }
        }
        report.exploratory_correlations = self.exploratory(&correlations);
        report.correlations = correlations;

        for (name, values) in &numeric {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            report.findings.extend(self.iqr_outliers(name, &present));
            report.findings.extend(self.distribution(name, &present));
            if let Some(result) =
                detect_anomalies(name, values, self.config.anomaly.method, &self.config.anomaly)
                && result.outlier_count > 0
            {
                report.findings.push(Finding::Anomalies(result));
            }
        }

        for profile in profiles.iter().filter(|p| {
            matches!(p.logical_type, LogicalType::Categorical | LogicalType::Boolean)
        }) {
            match dataset.string_values(&profile.name) {
                Ok(values) => report.findings.extend(self.dominant_category(&profile.name, &values)),
                Err(e) => warn!(column = %profile.name, error = %e, "Skipping dominant category check"),
            }
        }

        let height = dataset.height();
        for profile in profiles.iter().filter(|p| p.null_count > 0) {
            report.findings.push(Finding::MissingValues {
                column: profile.name.clone(),
                null_count: profile.null_count,
                null_percentage: percentage(profile.null_count, height),
            });
        }

        match dataset.duplicate_row_count() {
            Ok(count) if count > 0 => report.findings.push(Finding::DuplicateRows {
                count,
                percentage: percentage(count, height),
            }),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Skipping duplicate row check"),
        }

        debug!(
            findings = report.findings.len(),
            correlations = report.correlations.len(),
            exploratory = report.exploratory_correlations.len(),
            "Basic statistics finished"
        );
        report
    }

    /// Correlations in the exploratory band `exploratory <= |value| < strong`.
    pub fn exploratory(&self, correlations: &[CorrelationResult]) -> Vec<CorrelationResult> {
        correlations
            .iter()
            .filter(|r| {
                let v = r.value.abs();
                v >= self.config.exploratory_threshold && v < self.config.strong_correlation
            })
            .cloned()
            .collect()
    }

    /// Evaluate every numeric pair.
    ///
    /// Linear first; when the linear coefficient is below the reporting
    /// threshold the pair is inconclusive and the monotonic coefficient is
    /// computed too. The stronger of the two represents the pair.
    pub fn correlations(&self, numeric: &[(String, Vec<Option<f64>>)]) -> Vec<CorrelationResult> {
        let mut results = Vec::new();
        for i in 0..numeric.len() {
            for j in (i + 1)..numeric.len() {
                let (name_a, values_a) = &numeric[i];
                let (name_b, values_b) = &numeric[j];
                let (x, y) = complete_pairs(values_a, values_b);
                if x.len() < self.config.min_pair_observations || is_constant(&x) || is_constant(&y) {
                    debug!(column_a = %name_a, column_b = %name_b, n = x.len(), "Skipping pair");
                    continue;
                }

                let Some(linear) = correlate(CorrelationMethod::Linear, &x, &y) else {
                    continue;
                };
                let mut best = (CorrelationMethod::Linear, linear);
                if linear.value.abs() < self.config.correlation_threshold
                    && let Some(monotonic) = correlate(CorrelationMethod::Monotonic, &x, &y)
                    && monotonic.value.abs() > linear.value.abs()
                {
                    best = (CorrelationMethod::Monotonic, monotonic);
                }

                let (method, coefficient) = best;
                results.push(CorrelationResult {
                    column_a: name_a.clone(),
                    column_b: name_b.clone(),
                    method,
                    value: coefficient.value,
                    n: coefficient.n,
                    p_value: coefficient.p_value,
                    adjusted_p_value: None,
                    strength: Strength::classify(coefficient.value, self.config.strong_correlation),
                });
            }
        }
        results
    }

    fn iqr_outliers(&self, column: &str, values: &[f64]) -> Option<Finding> {
        if values.len() < 4 {
            return None;
        }
        let ordered = sorted(values);
        let q1 = quantile_sorted(&ordered, 0.25);
        let q3 = quantile_sorted(&ordered, 0.75);
        let iqr = q3 - q1;
        let lower_bound = q1 - 1.5 * iqr;
        let upper_bound = q3 + 1.5 * iqr;
        let outlier_count = values
            .iter()
            .filter(|v| **v < lower_bound || **v > upper_bound)
            .count();
        let outlier_fraction = outlier_count as f64 / values.len() as f64;

        (outlier_fraction > self.config.outlier_fraction_threshold).then(|| Finding::Outliers {
            column: column.to_string(),
            q1,
            q3,
            lower_bound,
            upper_bound,
            outlier_count,
            outlier_fraction,
        })
    }

    fn distribution(&self, column: &str, values: &[f64]) -> Option<Finding> {
        if values.len() < 3 {
            return None;
        }
        let skew = skewness(values)?;
        let kurt = kurtosis(values)?;
        Some(Finding::Distribution {
            column: column.to_string(),
            n: values.len(),
            mean: mean(values)?,
            std: std_dev(values)?,
            skewness: skew,
            kurtosis: kurt,
            shape: distribution_shape(skew, kurt),
        })
    }

    fn dominant_category(&self, column: &str, values: &[Option<String>]) -> Option<Finding> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut total = 0;
        for value in values.iter().flatten() {
            *counts.entry(value.as_str()).or_insert(0) += 1;
            total += 1;
        }
        if total == 0 {
            return None;
        }

        let (value, count) = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))?;
        let share = count as f64 / total as f64;

        (share > self.config.dominant_category_threshold).then(|| Finding::DominantCategory {
            column: column.to_string(),
            value: value.to_string(),
            count,
            share,
        })
    }
}

/// Extract every numeric column, skipping (and logging) those that fail.
pub fn numeric_columns(
    dataset: &Dataset,
    profiles: &[ColumnProfile],
) -> Vec<(String, Vec<Option<f64>>)> {
    profiles
        .iter()
        .filter(|p| p.logical_type == LogicalType::Numeric)
        .filter_map(|p| match dataset.numeric_values(&p.name) {
            Ok(values) => Some((p.name.clone(), values)),
            Err(e) => {
                warn!(column = %p.name, error = %e, "Skipping numeric column");
                None
            }
        })
        .collect()
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
