//! Ordering and counting of subspace insights.

use crate::types::{SignificanceCounts, SubspaceInsight};
use std::cmp::Ordering;

/// Sort insights by significance tier (highest first), then p-value
/// (adjusted when available, smallest first, missing last), then
/// improvement (largest first). The sort is stable, so insights that tie on
/// all three keep their search order.
pub fn rank_insights(insights: &mut [SubspaceInsight]) {
    insights.sort_by(|a, b| {
        b.significance
            .cmp(&a.significance)
            .then_with(|| compare_p(ranking_p(a), ranking_p(b)))
            .then_with(|| b.improvement.total_cmp(&a.improvement))
    });
}

/// Insight counts per significance tier.
pub fn count_by_significance(insights: &[SubspaceInsight]) -> SignificanceCounts {
    let mut counts = SignificanceCounts::default();
    for insight in insights {
        counts.record(insight.significance);
    }
    counts
}

fn ranking_p(insight: &SubspaceInsight) -> Option<f64> {
    insight.adjusted_p_value.or(insight.p_value)
}

fn compare_p(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
