//! Row indices per categorical value.
//!
//! Each subspace is represented by the sorted row indices it contains, so a
//! one-condition filter is a lookup and a two-condition filter is a merge of
//! two sorted lists. No data frame is ever copied.

use std::collections::HashMap;

/// Values of one categorical column, most frequent first, with their rows.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    pub column: String,
    /// `(value, ascending row indices)`; frequency descending, ties by value ascending.
    pub values: Vec<(String, Vec<usize>)>,
}

impl CategoryIndex {
    pub fn build(column: impl Into<String>, values: &[Option<String>]) -> Self {
        let mut rows: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, value) in values.iter().enumerate() {
            if let Some(v) = value {
                rows.entry(v.as_str()).or_default().push(i);
            }
        }

        let mut ordered: Vec<(String, Vec<usize>)> = rows
            .into_iter()
            .map(|(value, rows)| (value.to_string(), rows))
            .collect();
        ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            column: column.into(),
            values: ordered,
        }
    }

    /// The `limit` most frequent values.
    pub fn top(&self, limit: usize) -> &[(String, Vec<usize>)] {
        &self.values[..limit.min(self.values.len())]
    }
}

/// Intersection of two ascending index lists.
pub fn intersect_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Present values of `column` at `rows`.
pub fn values_at(column: &[Option<f64>], rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|&r| column.get(r).copied().flatten()).collect()
}

/// Complete `(x, y)` pairs at `rows`.
pub fn pairs_at(x: &[Option<f64>], y: &[Option<f64>], rows: &[usize]) -> (Vec<f64>, Vec<f64>) {
    rows.iter()
        .filter_map(|&r| match (x.get(r).copied().flatten(), y.get(r).copied().flatten()) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
        .unzip()
}
