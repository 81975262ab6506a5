//! Linear (Pearson) and monotonic (Spearman) correlation with p-values.

use super::descriptive::{average_ranks, is_constant, mean};
use crate::types::CorrelationMethod;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// A correlation coefficient with the sample size it was computed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficient {
    pub value: f64,
    pub n: usize,
    pub p_value: Option<f64>,
}

/// Pearson correlation. `None` for fewer than 3 pairs or a constant side.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 3 || is_constant(&x[..n]) || is_constant(&y[..n]) {
        return None;
    }
    let mx = mean(&x[..n])?;
    let my = mean(&y[..n])?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denom = (sxx * syy).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some((sxy / denom).clamp(-1.0, 1.0))
}

/// Spearman rank correlation (Pearson over average ranks).
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 3 {
        return None;
    }
    pearson(&average_ranks(&x[..n]), &average_ranks(&y[..n]))
}

/// Two-sided p-value of a correlation coefficient via the t approximation
/// `t = r * sqrt((n - 2) / (1 - r^2))` with `n - 2` degrees of freedom.
pub fn correlation_p_value(r: f64, n: usize) -> Option<f64> {
    if n < 3 {
        return None;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= f64::EPSILON {
        return Some(0.0);
    }
    let t = r * (df / denom).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

/// Correlation of the paired values with the given method.
pub fn correlate(method: CorrelationMethod, x: &[f64], y: &[f64]) -> Option<Coefficient> {
    let value = match method {
        CorrelationMethod::Linear => pearson(x, y)?,
        CorrelationMethod::Monotonic => spearman(x, y)?,
    };
    let n = x.len().min(y.len());
    Some(Coefficient {
        value,
        n,
        p_value: correlation_p_value(value, n),
    })
}

/// Least-squares slope of `y` on `x`.
pub fn linear_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&x[..n])?;
    let my = mean(&y[..n])?;
    let sxx: f64 = x[..n].iter().map(|a| (a - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = x[..n]
        .iter()
        .zip(y[..n].iter())
        .map(|(a, b)| (a - mx) * (b - my))
        .sum();
    Some(sxy / sxx)
}
