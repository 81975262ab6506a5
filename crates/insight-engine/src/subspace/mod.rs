//! Subspace search: segments of the data where a pattern is much stronger
//! than over the whole dataset.
//!
//! Four independent searches run in a fixed order and their results are
//! concatenated:
//!
//! 1. **Single-level correlation**: every moderate correlation is recomputed
//!    inside `column = value` subspaces of the first categorical columns.
//! 2. **Two-level correlation**: the same inside `c1 = v1 AND c2 = v2`,
//!    with a stricter improvement requirement since far more subspaces are
//!    tried. Skipped when `max_depth < 2`.
//! 3. **Category-specific deviation**: a numeric column whose mean inside a
//!    category sits far from its global mean.
//! 4. **Temporal trend**: the linear association between elapsed days and a
//!    numeric column inside a category.
//!
//! Columns are visited in dataset order and values by frequency descending
//! (ties by value ascending), so the output is fully deterministic. See
//! [`SearchCaps`] for the cost of each step.
//!
//! While recomputing correlations the search also records subspaces where
//! the coefficient flips sign relative to the whole dataset. These feed the
//! Simpson's paradox check.

pub mod index;

use crate::config::{InsightConfig, SearchCaps};
use crate::dataset::Dataset;
use crate::profiler::columns_of_type;
use crate::stats::correlation::{correlate, correlation_p_value, linear_slope, pearson};
use crate::stats::descriptive::{complete_pairs, mean, std_dev};
use crate::testing::HypothesisTester;
use crate::types::{
    ColumnProfile, CorrelationResult, FilterCondition, InsightDetail, InsightKind, LogicalType,
    Significance, SimpsonParadox, SubspaceInsight,
};
use index::{CategoryIndex, intersect_sorted, pairs_at, values_at};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Everything the search produced.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub insights: Vec<SubspaceInsight>,
    /// Subspaces whose correlation sign is opposite to the global one.
    pub reversals: Vec<SimpsonParadox>,
}

/// Columns extracted once per search.
struct Prepared {
    categories: Vec<CategoryIndex>,
    numeric: Vec<(String, Vec<Option<f64>>)>,
    temporal: Vec<(String, Vec<Option<f64>>)>,
    /// Numeric columns referenced by the candidate correlations.
    by_name: HashMap<String, Vec<Option<f64>>>,
}

pub struct SubspaceSearch<'a> {
    config: &'a InsightConfig,
    caps: &'a SearchCaps,
    max_depth: usize,
}

impl<'a> SubspaceSearch<'a> {
    pub fn new(config: &'a InsightConfig) -> Self {
        Self {
            config,
            caps: &config.search,
            max_depth: config.search.max_depth,
        }
    }

    /// Override the configured maximum filter depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Run all searches.
    ///
    /// `candidates` are the global correlations to explore; only those below
    /// the strong cut-off are used.
    pub fn run(
        &self,
        dataset: &Dataset,
        profiles: &[ColumnProfile],
        candidates: &[CorrelationResult],
    ) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();
        if self.max_depth == 0 {
            return outcome;
        }

        let moderate: Vec<&CorrelationResult> = candidates
            .iter()
            .filter(|c| c.value.abs() < self.config.strong_correlation)
            .collect();
        let prepared = self.prepare(dataset, profiles, &moderate);
        if prepared.categories.is_empty() {
            debug!("No categorical columns, subspace search has nothing to split on");
            return outcome;
        }

        self.single_level(&prepared, &moderate, &mut outcome);
        if self.max_depth >= 2 {
            self.two_level(&prepared, &moderate, &mut outcome);
        }
        self.category_deviations(&prepared, &mut outcome);
        self.temporal_trends(&prepared, &mut outcome);

        info!(
            insights = outcome.insights.len(),
            reversals = outcome.reversals.len(),
            "Subspace search finished"
        );
        outcome
    }

    fn prepare(
        &self,
        dataset: &Dataset,
        profiles: &[ColumnProfile],
        moderate: &[&CorrelationResult],
    ) -> Prepared {
        let categories = columns_of_type(profiles, LogicalType::Categorical)
            .into_iter()
            .take(self.caps.max_categorical_columns)
            .filter_map(|name| match dataset.string_values(&name) {
                Ok(values) => Some(CategoryIndex::build(name, &values)),
                Err(e) => {
                    warn!(column = %name, error = %e, "Skipping categorical column");
                    None
                }
            })
            .collect();

        let numeric = extract(dataset, columns_of_type(profiles, LogicalType::Numeric), self.caps.max_numeric_columns, Dataset::numeric_values);
        let temporal = extract(dataset, columns_of_type(profiles, LogicalType::Temporal), self.caps.max_temporal_columns, Dataset::temporal_days);

        let mut by_name = HashMap::new();
        for c in moderate {
            for name in [&c.column_a, &c.column_b] {
                if by_name.contains_key(name) {
                    continue;
                }
                match dataset.numeric_values(name) {
                    Ok(values) => {
                        by_name.insert(name.clone(), values);
                    }
                    Err(e) => warn!(column = %name, error = %e, "Skipping correlation column"),
                }
            }
        }

        Prepared {
            categories,
            numeric,
            temporal,
            by_name,
        }
    }

    // ========================================================================
    // Correlation subspaces
    // ========================================================================

    fn single_level(&self, prepared: &Prepared, moderate: &[&CorrelationResult], outcome: &mut SearchOutcome) {
        for base in moderate {
            let (Some(x), Some(y)) = (prepared.by_name.get(&base.column_a), prepared.by_name.get(&base.column_b)) else {
                continue;
            };
            for category in &prepared.categories {
                for (value, rows) in category.top(self.caps.max_values_per_column) {
                    let filter = vec![FilterCondition::new(&category.column, value)];
                    self.correlation_subspace(base, x, y, rows, filter, 1, outcome);
                }
            }
        }
    }

    fn two_level(&self, prepared: &Prepared, moderate: &[&CorrelationResult], outcome: &mut SearchOutcome) {
        let columns = &prepared.categories[..self.caps.two_level_columns.min(prepared.categories.len())];
        for base in moderate {
            let (Some(x), Some(y)) = (prepared.by_name.get(&base.column_a), prepared.by_name.get(&base.column_b)) else {
                continue;
            };
            for (i, first) in columns.iter().enumerate() {
                for second in &columns[i + 1..] {
                    for (v1, rows1) in first.top(self.caps.two_level_values) {
                        if rows1.len() < self.caps.min_subspace_size {
                            continue;
                        }
                        for (v2, rows2) in second.top(self.caps.two_level_values) {
                            let rows = intersect_sorted(rows1, rows2);
                            let filter = vec![
                                FilterCondition::new(&first.column, v1),
                                FilterCondition::new(&second.column, v2),
                            ];
                            self.correlation_subspace(base, x, y, &rows, filter, 2, outcome);
                        }
                    }
                }
            }
        }
    }

    /// Recompute one correlation inside one subspace and record what it shows.
    #[allow(clippy::too_many_arguments)]
    fn correlation_subspace(
        &self,
        base: &CorrelationResult,
        x: &[Option<f64>],
        y: &[Option<f64>],
        rows: &[usize],
        filter: Vec<FilterCondition>,
        depth: usize,
        outcome: &mut SearchOutcome,
    ) {
        if rows.len() < self.caps.min_subspace_size {
            return;
        }
        let (xs, ys) = pairs_at(x, y, rows);
        if xs.len() < self.caps.min_subspace_size {
            return;
        }
        let Some(sub) = correlate(base.method, &xs, &ys) else {
            return;
        };

        if sub.value * base.value < 0.0
            && sub.value.abs() >= self.config.exploratory_threshold
            && sub.p_value.is_some_and(|p| p < self.config.alpha)
        {
            outcome.reversals.push(SimpsonParadox {
                column_a: base.column_a.clone(),
                column_b: base.column_b.clone(),
                method: base.method,
                global_value: base.value,
                filter: filter.clone(),
                subspace_value: sub.value,
                subspace_size: xs.len(),
                significance: Significance::VeryHigh,
            });
        }

        let improvement = sub.value.abs() - base.value.abs();
        let (kind, required, significance) = if depth == 1 {
            let significance = if sub.value.abs() > self.config.strong_correlation {
                Significance::High
            } else {
                Significance::Moderate
            };
            (InsightKind::SubspaceCorrelation, self.caps.single_level_improvement, significance)
        } else {
            let significance = if sub.value.abs() > 0.9 {
                Significance::VeryHigh
            } else {
                Significance::High
            };
            (InsightKind::TwoLevelSubspaceCorrelation, self.caps.two_level_improvement, significance)
        };
        if improvement <= required {
            return;
        }

        outcome.insights.push(SubspaceInsight {
            kind,
            filter,
            subspace_size: xs.len(),
            detail: InsightDetail::Correlation {
                column_a: base.column_a.clone(),
                column_b: base.column_b.clone(),
                method: base.method,
                base_value: base.value,
                subspace_value: sub.value,
            },
            improvement,
            significance,
            p_value: sub.p_value,
            adjusted_p_value: None,
        });
    }

    // ========================================================================
    // Category-specific deviations
    // ========================================================================

    fn category_deviations(&self, prepared: &Prepared, outcome: &mut SearchOutcome) {
        let tester = HypothesisTester::new(self.config.alpha, self.config.min_group_size);

        for category in &prepared.categories {
            for (numeric_column, values) in &prepared.numeric {
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                let (Some(global_mean), Some(global_std)) = (mean(&present), std_dev(&present)) else {
                    continue;
                };
                if global_std <= 0.0 {
                    continue;
                }

                for (value, rows) in category.top(self.caps.max_values_per_column) {
                    if rows.len() < self.caps.min_subspace_size {
                        continue;
                    }
                    let segment = values_at(values, rows);
                    if segment.len() < self.caps.min_subspace_size {
                        continue;
                    }
                    let Some(subspace_mean) = mean(&segment) else {
                        continue;
                    };
                    let deviation = (subspace_mean - global_mean).abs() / global_std;
                    if deviation <= self.caps.deviation_threshold {
                        continue;
                    }

                    let rest = complement_values(values, rows);
                    let p_value = tester
                        .compare(&[(value.clone(), segment.clone()), ("rest".to_string(), rest)])
                        .p_value();

                    let significance = if deviation > self.caps.high_deviation_threshold {
                        Significance::High
                    } else {
                        Significance::Moderate
                    };

                    outcome.insights.push(SubspaceInsight {
                        kind: InsightKind::CategorySpecificPattern,
                        filter: vec![FilterCondition::new(&category.column, value)],
                        subspace_size: segment.len(),
                        detail: InsightDetail::CategoryDeviation {
                            category_column: category.column.clone(),
                            numeric_column: numeric_column.clone(),
                            subspace_mean,
                            global_mean,
                            global_std,
                            deviation,
                        },
                        improvement: deviation,
                        significance,
                        p_value,
                        adjusted_p_value: None,
                    });
                }
            }
        }
    }

    // ========================================================================
    // Temporal trends
    // ========================================================================

    fn temporal_trends(&self, prepared: &Prepared, outcome: &mut SearchOutcome) {
        for (temporal_column, days) in &prepared.temporal {
            for (numeric_column, values) in &prepared.numeric {
                let (all_days, all_values) = complete_pairs(days, values);
                let global_trend = pearson(&all_days, &all_values);

                for category in &prepared.categories {
                    for (value, rows) in category.top(self.caps.temporal_values) {
                        if rows.len() < self.caps.temporal_min_subspace_size {
                            continue;
                        }
                        let (xs, ys) = pairs_at(days, values, rows);
                        if xs.len() < self.caps.temporal_min_subspace_size {
                            continue;
                        }
                        let Some(trend) = pearson(&xs, &ys) else {
                            continue;
                        };
                        if trend.abs() <= self.caps.temporal_strength_threshold {
                            continue;
                        }

                        let significance = if trend.abs() > self.caps.temporal_high_threshold {
                            Significance::High
                        } else {
                            Significance::Moderate
                        };

                        outcome.insights.push(SubspaceInsight {
                            kind: InsightKind::TemporalSubspaceTrend,
                            filter: vec![FilterCondition::new(&category.column, value)],
                            subspace_size: xs.len(),
                            detail: InsightDetail::TemporalTrend {
                                temporal_column: temporal_column.clone(),
                                numeric_column: numeric_column.clone(),
                                subspace_trend: trend,
                                global_trend,
                                slope_per_day: linear_slope(&xs, &ys).unwrap_or(0.0),
                            },
                            improvement: trend.abs() - global_trend.map_or(0.0, f64::abs),
                            significance,
                            p_value: correlation_p_value(trend, xs.len()),
                            adjusted_p_value: None,
                        });
                    }
                }
            }
        }
    }
}

fn extract(
    dataset: &Dataset,
    columns: Vec<String>,
    limit: usize,
    read: fn(&Dataset, &str) -> crate::error::Result<Vec<Option<f64>>>,
) -> Vec<(String, Vec<Option<f64>>)> {
    columns
        .into_iter()
        .take(limit)
        .filter_map(|name| match read(dataset, &name) {
            Ok(values) => Some((name, values)),
            Err(e) => {
                warn!(column = %name, error = %e, "Skipping column in subspace search");
                None
            }
        })
        .collect()
}

/// Present values outside `rows` (which must be ascending).
fn complement_values(values: &[Option<f64>], rows: &[usize]) -> Vec<f64> {
    let mut inside = rows.iter().peekable();
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            while inside.peek().is_some_and(|&&r| r < i) {
                inside.next();
            }
            if inside.peek() == Some(&&i) { None } else { *v }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::ColumnClassifier;
    use crate::stats::BasicStatistics;
    use polars::prelude::*;

    fn search(df: DataFrame, config: &InsightConfig) -> SearchOutcome {
        let dataset = Dataset::new(df);
        let profiles = ColumnClassifier::from_config(config).classify(&dataset);
        let basic = BasicStatistics::new(config).run(&dataset, &profiles);
        SubspaceSearch::new(config).run(&dataset, &profiles, &basic.exploratory_correlations)
    }

    /// 40 rows per region. East: y = x exactly; elsewhere y is unrelated.
    fn segmented() -> DataFrame {
        let noise = [5.0, -3.0, 8.0, -7.0, 2.0, -9.0, 6.0, -1.0, 4.0, -5.0];
        let mut region = Vec::new();
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (r, name) in ["East", "West", "North"].iter().enumerate() {
            for i in 0..40 {
                let xi = i as f64;
                region.push(*name);
                x.push(xi);
                let yi = if r == 0 {
                    xi
                } else {
                    20.0 + noise[(i * 7 + r) % 10] * 2.0 + 0.3 * xi
                };
                y.push(yi);
            }
        }
        df!["region" => region, "x" => x, "y" => y].unwrap()
    }

    #[test]
    fn test_single_level_finds_strong_segment() {
        let config = InsightConfig::default();
        let outcome = search(segmented(), &config);
        let east = outcome
            .insights
            .iter()
            .find(|i| {
                i.kind == InsightKind::SubspaceCorrelation
                    && i.filter == vec![FilterCondition::new("region", "East")]
            })
            .expect("East subspace should be reported");
        assert!(east.improvement > 0.2);
        assert!(east.subspace_size >= 10);
        assert_eq!(east.significance, Significance::High);
    }

    #[test]
    fn test_depth_zero_returns_nothing() {
        let config = InsightConfig::default();
        let dataset = Dataset::new(segmented());
        let profiles = ColumnClassifier::from_config(&config).classify(&dataset);
        let basic = BasicStatistics::new(&config).run(&dataset, &profiles);
        let outcome = SubspaceSearch::new(&config)
            .with_max_depth(0)
            .run(&dataset, &profiles, &basic.exploratory_correlations);
        assert!(outcome.insights.is_empty());
    }

    #[test]
    fn test_no_categorical_columns() {
        let config = InsightConfig::default();
        let outcome = search(df!["x" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0]].unwrap(), &config);
        assert!(outcome.insights.is_empty());
        assert!(outcome.reversals.is_empty());
    }

    #[test]
    fn test_category_deviation() {
        let mut group = Vec::new();
        let mut amount = Vec::new();
        for i in 0..90 {
            let g = ["a", "b", "c"][i % 3];
            group.push(g);
            let base = 10.0 + (i % 5) as f64;
            amount.push(if g == "c" { base + 40.0 } else { base });
        }
        // Append a larger low-value group so "c" sits well above the global mean.
        for i in 0..60 {
            group.push("d");
            amount.push(10.0 + (i % 5) as f64);
        }
        let config = InsightConfig::default();
        let outcome = search(df!["group" => group, "amount" => amount].unwrap(), &config);
        let deviation = outcome
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::CategorySpecificPattern)
            .expect("deviation expected");
        assert_eq!(deviation.filter[0].value, "c");
        assert!(deviation.improvement > 1.5);
        assert!(deviation.p_value.is_some_and(|p| p < 0.05));
    }

    #[test]
    fn test_temporal_trend() {
        let mut when = Vec::new();
        let mut store = Vec::new();
        let mut sales = Vec::new();
        let noise = [3.0, -2.0, 5.0, -4.0, 1.0, -6.0, 2.0, 0.0];
        for i in 0..60 {
            let day = i / 2;
            when.push(format!("2024-01-{:02}", day % 28 + 1));
            let s = if i % 2 == 0 { "growing" } else { "flat" };
            store.push(s);
            sales.push(if s == "growing" {
                100.0 + (day % 28) as f64 * 5.0
            } else {
                100.0 + noise[i % 8] * 4.0
            });
        }
        let config = InsightConfig::default();
        let outcome = search(df!["when" => when, "store" => store, "sales" => sales].unwrap(), &config);
        let trend = outcome
            .insights
            .iter()
            .find(|i| i.kind == InsightKind::TemporalSubspaceTrend)
            .expect("trend expected");
        assert_eq!(trend.filter[0].value, "growing");
        assert!(trend.subspace_size >= 20);
        assert_eq!(trend.significance, Significance::High);
    }

    #[test]
    fn test_complement_values() {
        let values = vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
        assert_eq!(complement_values(&values, &[1, 3]), vec![1.0, 5.0]);
        assert_eq!(complement_values(&values, &[]), vec![1.0, 2.0, 4.0, 5.0]);
    }
}
