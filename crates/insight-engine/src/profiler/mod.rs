//! Column classification.
//!
//! Decides the logical type of every column from declared hints, the polars
//! storage type and a sample of the observed values:
//!
//! 1. a declared hint always wins
//! 2. Date/Datetime storage, or a string column whose sample mostly parses
//!    as dates, is temporal
//! 3. numeric storage is numeric
//! 4. boolean storage (or a two-valued string column of boolean literals)
//!    is boolean
//! 5. a string column with a low unique/non-null ratio is categorical
//! 6. everything else is text

pub mod temporal;

use crate::config::InsightConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::types::{ColumnProfile, LogicalType};
use crate::utils::{first_non_null, is_boolean_dtype, is_boolean_string, is_numeric_dtype, is_string_dtype, is_temporal_dtype, parse_number};
use polars::prelude::*;
use tracing::{debug, warn};

/// Classifies columns into logical types. Pure function of its input.
#[derive(Debug, Clone)]
pub struct ColumnClassifier {
    categorical_ratio: f64,
    temporal_parse_ratio: f64,
    sample_size: usize,
}

impl Default for ColumnClassifier {
    fn default() -> Self {
        Self::from_config(&InsightConfig::default())
    }
}

impl ColumnClassifier {
    pub fn from_config(config: &InsightConfig) -> Self {
        Self {
            categorical_ratio: config.categorical_ratio_threshold,
            temporal_parse_ratio: config.temporal_parse_ratio,
            sample_size: config.classifier_sample_size,
        }
    }

    /// Profile every column of the dataset, in dataset order.
    ///
    /// A column that cannot be read is reported as text rather than
    /// aborting the whole run.
    pub fn classify(&self, dataset: &Dataset) -> Vec<ColumnProfile> {
        dataset
            .column_names()
            .into_iter()
            .map(|name| match self.classify_column(dataset, &name) {
                Ok(profile) => profile,
                Err(e) => {
                    warn!(column = %name, error = %e, "Column classification failed, treating as text");
                    ColumnProfile {
                        name,
                        dtype: "unknown".to_string(),
                        logical_type: LogicalType::Text,
                        null_count: 0,
                        unique_count: 0,
                        cardinality_ratio: 0.0,
                        declared: false,
                    }
                }
            })
            .collect()
    }

    /// Profile a single column.
    pub fn classify_column(&self, dataset: &Dataset, column: &str) -> Result<ColumnProfile> {
        let series = dataset.series(column)?;
        let null_count = series.null_count();
        let non_null = series.len() - null_count;
        let unique_count = if non_null == 0 {
            0
        } else {
            series.drop_nulls().n_unique()?
        };
        let cardinality_ratio = if non_null == 0 {
            0.0
        } else {
            unique_count as f64 / non_null as f64
        };

        let (logical_type, declared) = match dataset.declared_type(column) {
            Some(hint) => (hint, true),
            None => (
                self.infer(dataset, series, unique_count, cardinality_ratio)?,
                false,
            ),
        };

        debug!(column, %logical_type, unique_count, null_count, "Classified column");

        Ok(ColumnProfile {
            name: column.to_string(),
            dtype: format!("{:?}", series.dtype()),
            logical_type,
            null_count,
            unique_count,
            cardinality_ratio,
            declared,
        })
    }

    fn infer(
        &self,
        dataset: &Dataset,
        series: &Series,
        unique_count: usize,
        cardinality_ratio: f64,
    ) -> Result<LogicalType> {
        let dtype = series.dtype();

        if is_temporal_dtype(dtype) {
            return Ok(LogicalType::Temporal);
        }
        if is_numeric_dtype(dtype) {
            return Ok(LogicalType::Numeric);
        }
        if is_boolean_dtype(dtype) {
            return Ok(LogicalType::Boolean);
        }
        if !is_string_dtype(dtype) {
            return Ok(LogicalType::Text);
        }

        let values = dataset.string_values(series.name().as_str())?;
        let sample = first_non_null(&values, self.sample_size);

        if !sample.is_empty() {
            if unique_count <= 2 && sample.iter().all(|s| is_boolean_string(s)) {
                return Ok(LogicalType::Boolean);
            }
            // Text-loaded numbers, e.g. a CSV read without schema inference
            if sample.iter().all(|s| parse_number(s).is_some()) {
                return Ok(LogicalType::Numeric);
            }
            if temporal::parse_ratio(&sample) >= self.temporal_parse_ratio {
                return Ok(LogicalType::Temporal);
            }
        }

        if cardinality_ratio < self.categorical_ratio {
            Ok(LogicalType::Categorical)
        } else {
            Ok(LogicalType::Text)
        }
    }
}

/// Names of the profiled columns with the given logical type, in dataset order.
pub fn columns_of_type(profiles: &[ColumnProfile], logical_type: LogicalType) -> Vec<String> {
    profiles
        .iter()
        .filter(|p| p.logical_type == logical_type)
        .map(|p| p.name.clone())
        .collect()
}
