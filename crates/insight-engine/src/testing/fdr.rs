//! Benjamini-Hochberg false-discovery-rate control.

use std::cmp::Ordering;

/// Benjamini-Hochberg adjusted p-values, returned in input order.
///
/// `adjusted_(i) = min_{j >= i} p_(j) * m / j`, capped at 1, which keeps the
/// adjusted values monotone in the raw p-values. Non-finite inputs are
/// treated as 1.
pub fn benjamini_hochberg(p_values: &[f64]) -> Vec<f64> {
    let m = p_values.len();
    if m == 0 {
        return Vec::new();
    }
    let clean: Vec<f64> = p_values
        .iter()
        .map(|p| if p.is_finite() { p.clamp(0.0, 1.0) } else { 1.0 })
        .collect();

    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| clean[a].partial_cmp(&clean[b]).unwrap_or(Ordering::Equal));

    let mut adjusted = vec![1.0; m];
    let mut running_min: f64 = 1.0;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let value = clean[idx] * m as f64 / (rank + 1) as f64;
        running_min = running_min.min(value);
        adjusted[idx] = running_min.min(1.0);
    }
    adjusted
}

/// Which hypotheses are rejected at false-discovery rate `q`.
pub fn rejected_at(adjusted: &[f64], q: f64) -> Vec<bool> {
    adjusted.iter().map(|p| *p <= q).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_adjustment() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let adjusted = benjamini_hochberg(&p);
        // sorted: 0.005 (r1), 0.01 (r2), 0.03 (r3), 0.04 (r4)
        // raw:    0.02,        0.02,      0.04,      0.04
        let expected = [0.02, 0.04, 0.04, 0.02];
        for (a, e) in adjusted.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "{} vs {}", a, e);
        }
    }

    #[test]
    fn test_monotone_and_capped() {
        let p = [0.9, 0.5, 0.8, 0.95, 0.2];
        let adjusted = benjamini_hochberg(&p);
        assert!(adjusted.iter().all(|a| *a <= 1.0));
        for (i, pi) in p.iter().enumerate() {
            assert!(adjusted[i] >= *pi);
            for (j, pj) in p.iter().enumerate() {
                if pi < pj {
                    assert!(adjusted[i] <= adjusted[j]);
                }
            }
        }
    }

    #[test]
    fn test_rejected_at() {
        let adjusted = benjamini_hochberg(&[0.001, 0.2, 0.04]);
        assert_eq!(rejected_at(&adjusted, 0.05), vec![true, false, false]);
    }

    #[test]
    fn test_empty_and_nan() {
        assert!(benjamini_hochberg(&[]).is_empty());
        assert_eq!(benjamini_hochberg(&[f64::NAN]), vec![1.0]);
    }
}
