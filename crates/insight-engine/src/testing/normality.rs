//! D'Agostino-Pearson K² omnibus normality test.
//!
//! Combines a skewness z-score (D'Agostino 1970) and a kurtosis z-score
//! (Anscombe & Glynn 1983) into `K² = Z1² + Z2²`, which is chi-squared with
//! two degrees of freedom under normality.

use statrs::distribution::{ChiSquared, ContinuousCDF};

/// The skewness transform needs at least 8 observations.
pub const MIN_NORMALITY_SAMPLE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KSquared {
    pub statistic: f64,
    pub p_value: f64,
}

/// Run the test. `None` for fewer than 8 values or a constant sample.
pub fn dagostino_k_squared(values: &[f64]) -> Option<KSquared> {
    let n = values.len();
    if n < MIN_NORMALITY_SAMPLE {
        return None;
    }
    let nf = n as f64;
    let mean = values.iter().sum::<f64>() / nf;
    let m2 = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / nf;
    if m2 <= f64::EPSILON * mean.abs().max(1.0) {
        return None;
    }
    let m3 = values.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / nf;
    let m4 = values.iter().map(|v| (v - mean).powi(4)).sum::<f64>() / nf;

    let z1 = skew_z(m3 / m2.powf(1.5), nf)?;
    let z2 = kurtosis_z(m4 / (m2 * m2), nf)?;
    let statistic = z1 * z1 + z2 * z2;
    if !statistic.is_finite() {
        return None;
    }

    let chi2 = ChiSquared::new(2.0).ok()?;
    Some(KSquared {
        statistic,
        p_value: chi2.sf(statistic).clamp(0.0, 1.0),
    })
}

fn skew_z(b1: f64, n: f64) -> Option<f64> {
    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / w2.sqrt().ln().sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    let z = delta * (y / alpha).asinh();
    z.is_finite().then_some(z)
}

fn kurtosis_z(b2: f64, n: f64) -> Option<f64> {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let variance = 24.0 * n * (n - 2.0) * (n - 3.0)
        / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / variance.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    if denom == 0.0 {
        return None;
    }
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    let z = (term1 - term2) / (2.0 / (9.0 * a)).sqrt();
    z.is_finite().then_some(z)
}
