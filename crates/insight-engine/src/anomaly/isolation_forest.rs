//! Isolation forest over a single numeric column.
//!
//! Anomalies need fewer random splits to be isolated, so they end up with
//! shorter average path lengths. Scores follow Liu, Ting & Zhou (2008):
//! `s(x, n) = 2^(-E(h(x)) / c(n))`, close to 1 for anomalies and around 0.5
//! or below for ordinary points.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    /// Subsample size per tree (capped at the number of points).
    pub max_samples: usize,
    /// Expected share of anomalies, used to place the score threshold.
    pub contamination: f64,
    pub seed: u64,
}

/// Scores plus the threshold derived from the contamination rate.
#[derive(Debug, Clone)]
pub struct IsolationScores {
    pub scores: Vec<f64>,
    pub threshold: f64,
}

impl IsolationScores {
    /// Positions whose score reaches the threshold and exceeds the neutral 0.5.
    pub fn anomalous_positions(&self) -> Vec<usize> {
        self.scores
            .iter()
            .enumerate()
            .filter(|(_, s)| **s >= self.threshold && **s > 0.5)
            .map(|(i, _)| i)
            .collect()
    }
}

enum Node {
    Split {
        value: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// Fit a forest on `data` and score every point. `None` for fewer than 2 points.
pub fn score(data: &[f64], params: &IsolationForestParams) -> Option<IsolationScores> {
    let n = data.len();
    if n < 2 || params.n_estimators == 0 {
        return None;
    }

    let max_samples = params.max_samples.clamp(2, n);
    let max_depth = (max_samples as f64).log2().ceil() as usize;
    let mut rng = StdRng::seed_from_u64(params.seed);

    let trees: Vec<Node> = (0..params.n_estimators)
        .map(|_| {
            let subsample: Vec<f64> = rand::seq::index::sample(&mut rng, n, max_samples)
                .into_iter()
                .map(|i| data[i])
                .collect();
            build_tree(&subsample, max_depth, &mut rng)
        })
        .collect();

    let cn = c_factor(max_samples);
    let scores: Vec<f64> = data
        .iter()
        .map(|&x| {
            let avg = trees.iter().map(|t| path_length(x, t, 0)).sum::<f64>()
                / params.n_estimators as f64;
            if cn > 0.0 { 2.0f64.powf(-avg / cn) } else { 0.5 }
        })
        .collect();

    let mut ranked = scores.clone();
    ranked.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    let k = ((n as f64 * params.contamination).ceil() as usize).clamp(1, n);
    let threshold = ranked[k - 1];

    Some(IsolationScores { scores, threshold })
}

fn build_tree(data: &[f64], depth_left: usize, rng: &mut StdRng) -> Node {
    if data.len() <= 1 || depth_left == 0 {
        return Node::Leaf { size: data.len() };
    }

    let (min, max) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if (max - min).abs() < 1e-15 {
        return Node::Leaf { size: data.len() };
    }

    let value = split_point(min, max, rng);
    let (left, right): (Vec<f64>, Vec<f64>) = data.iter().partition(|&&v| v < value);
    if left.is_empty() || right.is_empty() {
        return Node::Leaf { size: data.len() };
    }

    Node::Split {
        value,
        left: Box::new(build_tree(&left, depth_left - 1, rng)),
        right: Box::new(build_tree(&right, depth_left - 1, rng)),
    }
}

/// Uniform split in `[min, max)`. Halves the span when `max - min` overflows.
fn split_point(min: f64, max: f64, rng: &mut StdRng) -> f64 {
    if (max - min).is_finite() {
        return rng.gen_range(min..max);
    }
    let half = max / 2.0 - min / 2.0;
    let u: f64 = rng.r#gen();
    min + half * u + half * u
}

fn path_length(x: f64, node: &Node, depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + c_factor(*size),
        Node::Split { value, left, right } => {
            if x < *value {
                path_length(x, left, depth + 1)
            } else {
                path_length(x, right, depth + 1)
            }
        }
    }
}

/// Average path length of an unsuccessful search in a BST of `n` nodes.
fn c_factor(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            let harmonic = (n - 1.0).ln() + 0.577_215_664_9;
            2.0 * harmonic - 2.0 * (n - 1.0) / n
        }
    }
}
