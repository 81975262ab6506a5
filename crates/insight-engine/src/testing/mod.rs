//! Hypothesis testing for numeric observations split into groups.
//!
//! # Test selection
//!
//! Groups smaller than the minimum size are dropped first. The first
//! remaining group goes through a D'Agostino-Pearson normality gate (groups
//! with fewer than 8 values are treated as non-normal), then:
//!
//! | groups | normal | test | effect size | interval |
//! |---|---|---|---|---|
//! | 2 | yes | Welch's t | Cohen's d | mean difference |
//! | 2 | no | Mann-Whitney U | rank-biserial r | rank-biserial r |
//! | 3+ | yes | one-way ANOVA | eta squared | none |
//! | 3+ | no | Kruskal-Wallis H | epsilon squared | none |
//!
//! Fewer than two usable groups is reported as
//! [`ComparisonResult::InsufficientData`], never as an error.

pub mod fdr;
pub mod normality;

pub use fdr::{benjamini_hochberg, rejected_at};

use crate::stats::descriptive::{average_ranks, mean, std_dev, tie_group_sizes, variance};
use crate::types::{
    ComparisonResult, ConfidenceInterval, GroupComparison, GroupStats, HypothesisTestResult,
    NormalityCheck, TestKind,
};
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use tracing::debug;

/// Runs group comparisons at a fixed significance level.
#[derive(Debug, Clone)]
pub struct HypothesisTester {
    alpha: f64,
    min_group_size: usize,
}

impl Default for HypothesisTester {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            min_group_size: 3,
        }
    }
}

impl HypothesisTester {
    pub fn new(alpha: f64, min_group_size: usize) -> Self {
        Self {
            alpha,
            min_group_size,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Compare the groups with the test the data calls for.
    pub fn compare(&self, values_by_group: &[(String, Vec<f64>)]) -> ComparisonResult {
        let mut valid: Vec<(&str, Vec<f64>)> = Vec::new();
        let mut excluded = Vec::new();
        for (name, values) in values_by_group {
            let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
            if finite.len() >= self.min_group_size {
                valid.push((name.as_str(), finite));
            } else {
                excluded.push(name.clone());
            }
        }

        if valid.len() < 2 {
            return ComparisonResult::InsufficientData {
                valid_groups: valid.len(),
                reason: format!(
                    "need at least 2 groups with {} or more observations",
                    self.min_group_size
                ),
            };
        }

        let normality = normality_gate(valid[0].0, &valid[0].1, self.alpha);
        let kind = TestKind::select(valid.len(), normality.is_normal);
        let samples: Vec<&[f64]> = valid.iter().map(|(_, v)| v.as_slice()).collect();

        let test = match kind {
            TestKind::WelchT => welch_t_test(samples[0], samples[1], self.alpha),
            TestKind::MannWhitneyU => mann_whitney_u(samples[0], samples[1], self.alpha),
            TestKind::OneWayAnova => one_way_anova(&samples, self.alpha),
            TestKind::KruskalWallis => kruskal_wallis(&samples, self.alpha),
        };

        let Some(test) = test else {
            return ComparisonResult::InsufficientData {
                valid_groups: valid.len(),
                reason: format!("{} is undefined for groups without spread", kind.display_name()),
            };
        };

        debug!(test = kind.display_name(), p_value = test.p_value, groups = valid.len(), "Compared groups");

        let groups = valid
            .iter()
            .map(|(name, values)| GroupStats {
                name: name.to_string(),
                n: values.len(),
                mean: mean(values).unwrap_or(0.0),
                std: std_dev(values).unwrap_or(0.0),
            })
            .collect();

        ComparisonResult::Tested(GroupComparison {
            test,
            normality,
            groups,
            excluded_groups: excluded,
        })
    }
}

/// Compare groups with the default settings (alpha 0.05, minimum 3 per group).
pub fn compare_groups(values_by_group: &[(String, Vec<f64>)]) -> ComparisonResult {
    HypothesisTester::default().compare(values_by_group)
}

fn normality_gate(name: &str, values: &[f64], alpha: f64) -> NormalityCheck {
    match normality::dagostino_k_squared(values) {
        Some(k2) => NormalityCheck {
            group: name.to_string(),
            statistic: Some(k2.statistic),
            p_value: Some(k2.p_value),
            is_normal: k2.p_value >= alpha,
        },
        None => NormalityCheck {
            group: name.to_string(),
            statistic: None,
            p_value: None,
            is_normal: false,
        },
    }
}

fn finish(
    kind: TestKind,
    statistic: f64,
    p_value: f64,
    effect_size: f64,
    effect_size_name: &str,
    confidence_interval: Option<ConfidenceInterval>,
    alpha: f64,
) -> Option<HypothesisTestResult> {
    if !statistic.is_finite() || !p_value.is_finite() || !effect_size.is_finite() {
        return None;
    }
    let p_value = p_value.clamp(0.0, 1.0);
    Some(HypothesisTestResult {
        test_name: kind.display_name().to_string(),
        test: kind,
        statistic,
        p_value,
        effect_size,
        effect_size_name: effect_size_name.to_string(),
        confidence_interval,
        alpha,
        reject_null: p_value < alpha,
    })
}

// ============================================================================
// Two-group tests
// ============================================================================

/// Welch's unequal-variance t-test with Cohen's d and a CI of the mean difference.
pub fn welch_t_test(a: &[f64], b: &[f64], alpha: f64) -> Option<HypothesisTestResult> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (mean(a)?, mean(b)?);
    let (v1, v2) = (variance(a)?, variance(b)?);

    let se2 = v1 / n1 + v2 / n2;
    if se2 <= 0.0 {
        return None;
    }
    let se = se2.sqrt();
    let diff = m1 - m2;
    let t = diff / se;
    let df = se2 * se2 / ((v1 / n1).powi(2) / (n1 - 1.0) + (v2 / n2).powi(2) / (n2 - 1.0));

    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    let p_value = 2.0 * dist.sf(t.abs());

    let pooled = (((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0)).sqrt();
    let cohens_d = if pooled > 0.0 { diff / pooled } else { 0.0 };

    let critical = dist.inverse_cdf(1.0 - alpha / 2.0);
    let interval = ConfidenceInterval {
        lower: diff - critical * se,
        upper: diff + critical * se,
        level: 1.0 - alpha,
    };

    finish(TestKind::WelchT, t, p_value, cohens_d, "cohens_d", Some(interval), alpha)
}

/// Mann-Whitney U with tie and continuity correction.
///
/// The statistic is U of the first sample. The effect size is the
/// rank-biserial correlation `2 * U1 / (n1 * n2) - 1`, positive when the
/// first group tends to be larger.
pub fn mann_whitney_u(a: &[f64], b: &[f64], alpha: f64) -> Option<HypothesisTestResult> {
    let (n1, n2) = (a.len(), b.len());
    if n1 == 0 || n2 == 0 {
        return None;
    }
    let combined: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let ranks = average_ranks(&combined);
    let r1: f64 = ranks[..n1].iter().sum();

    let (n1f, n2f) = (n1 as f64, n2 as f64);
    let n = n1f + n2f;
    let u1 = r1 - n1f * (n1f + 1.0) / 2.0;
    let expected = n1f * n2f / 2.0;

    let tie_term: f64 = tie_group_sizes(&combined)
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum();
    let sigma = (n1f * n2f / 12.0 * ((n + 1.0) - tie_term / (n * (n - 1.0)))).sqrt();

    let p_value = if sigma > 0.0 {
        let deviation = u1 - expected;
        let corrected = (deviation.abs() - 0.5).max(0.0);
        let z = corrected / sigma;
        let normal = Normal::new(0.0, 1.0).ok()?;
        2.0 * normal.sf(z)
    } else {
        1.0
    };

    let rank_biserial = 2.0 * u1 / (n1f * n2f) - 1.0;
    let normal = Normal::new(0.0, 1.0).ok()?;
    let critical = normal.inverse_cdf(1.0 - alpha / 2.0);
    let se = ((n1f + n2f + 1.0) / (3.0 * n1f * n2f)).sqrt();
    let interval = ConfidenceInterval {
        lower: (rank_biserial - critical * se).max(-1.0),
        upper: (rank_biserial + critical * se).min(1.0),
        level: 1.0 - alpha,
    };

    finish(
        TestKind::MannWhitneyU,
        u1,
        p_value,
        rank_biserial,
        "rank_biserial",
        Some(interval),
        alpha,
    )
}

// ============================================================================
// Multi-group tests
// ============================================================================

/// One-way ANOVA with eta squared (`SS_between / SS_total`).
pub fn one_way_anova(groups: &[&[f64]], alpha: f64) -> Option<HypothesisTestResult> {
    let k = groups.len();
    let total: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || total <= k {
        return None;
    }

    let grand_mean = groups.iter().flat_map(|g| g.iter()).sum::<f64>() / total as f64;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let m = mean(group)?;
        ss_between += group.len() as f64 * (m - grand_mean).powi(2);
        ss_within += group.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    }
    if ss_within <= 0.0 {
        return None;
    }

    let df1 = (k - 1) as f64;
    let df2 = (total - k) as f64;
    let f = (ss_between / df1) / (ss_within / df2);
    let dist = FisherSnedecor::new(df1, df2).ok()?;
    let p_value = dist.sf(f);
    let eta_squared = ss_between / (ss_between + ss_within);

    finish(TestKind::OneWayAnova, f, p_value, eta_squared, "eta_squared", None, alpha)
}

/// Kruskal-Wallis H with tie correction and epsilon squared (`H / (N - 1)`).
pub fn kruskal_wallis(groups: &[&[f64]], alpha: f64) -> Option<HypothesisTestResult> {
    let k = groups.len();
    let combined: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let n = combined.len() as f64;
    if k < 2 || combined.len() <= k {
        return None;
    }

    let ranks = average_ranks(&combined);
    let mut offset = 0;
    let mut rank_term = 0.0;
    for group in groups {
        let r: f64 = ranks[offset..offset + group.len()].iter().sum();
        rank_term += r * r / group.len() as f64;
        offset += group.len();
    }

    let h_raw = 12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0);
    let tie_term: f64 = tie_group_sizes(&combined)
        .iter()
        .map(|&t| {
            let t = t as f64;
            t * t * t - t
        })
        .sum();
    let correction = 1.0 - tie_term / (n * n * n - n);

    let (h, p_value) = if correction > 0.0 {
        let h = (h_raw / correction).max(0.0);
        let dist = ChiSquared::new((k - 1) as f64).ok()?;
        (h, dist.sf(h))
    } else {
        (0.0, 1.0)
    };
    let epsilon_squared = h / (n - 1.0);

    finish(TestKind::KruskalWallis, h, p_value, epsilon_squared, "epsilon_squared", None, alpha)
}
