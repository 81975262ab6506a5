//! Read-only view over a loaded table plus optional declared column types.
//!
//! Every statistical check works on plain vectors extracted here, so the
//! rest of the crate never has to care about polars storage types. Missing
//! values stay in place as `None` so that row indices remain comparable
//! across columns.

use crate::error::{InsightError, Result, ResultExt};
use crate::profiler::temporal::parse_epoch_days;
use crate::types::LogicalType;
use crate::utils::{is_boolean_dtype, is_numeric_dtype, parse_number};
use polars::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Dataset {
    frame: DataFrame,
    declared: HashMap<String, LogicalType>,
}

impl Dataset {
    pub fn new(frame: DataFrame) -> Self {
        Self {
            frame,
            declared: HashMap::new(),
        }
    }

    /// Attach declared column types; declared types win over inference.
    pub fn with_declared_types(mut self, declared: HashMap<String, LogicalType>) -> Self {
        self.declared.extend(declared);
        self
    }

    /// Declare the logical type of a single column.
    pub fn declare(mut self, column: impl Into<String>, logical_type: LogicalType) -> Self {
        self.declared.insert(column.into(), logical_type);
        self
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn declared_type(&self, column: &str) -> Option<LogicalType> {
        self.declared.get(column).copied()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Column names in dataset order.
    pub fn column_names(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Borrow a column as a series.
    pub fn series(&self, column: &str) -> Result<&Series> {
        self.frame
            .column(column)
            .map(|c| c.as_materialized_series())
            .map_err(|_| InsightError::ColumnNotFound(column.to_string()))
    }

    /// Column values as `f64`. Booleans map to 0/1; string columns are parsed.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(column)?;
        let dtype = series.dtype();

        if is_numeric_dtype(dtype) || is_boolean_dtype(dtype) {
            let casted = series
                .cast(&DataType::Float64)
                .context(format!("Casting '{}' to Float64", column))?;
            let values = casted
                .f64()
                .context(format!("Reading '{}' as Float64", column))?
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();
            return Ok(values);
        }

        if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
            return Ok(self
                .string_values(column)?
                .into_iter()
                .map(|v| v.as_deref().and_then(parse_number))
                .collect());
        }

        Err(InsightError::ColumnTypeMismatch {
            column: column.to_string(),
            expected: "numeric".to_string(),
            reason: format!("storage type {} has no numeric reading", dtype),
        })
    }

    /// Column values rendered as strings (numbers and booleans included).
    pub fn string_values(&self, column: &str) -> Result<Vec<Option<String>>> {
        let series = self.series(column)?;
        let casted = series
            .cast(&DataType::String)
            .context(format!("Casting '{}' to String", column))?;
        let values = casted
            .str()
            .context(format!("Reading '{}' as String", column))?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        Ok(values)
    }

    /// Column values as elapsed days since 1970-01-01.
    ///
    /// Date columns use their physical day count, datetime columns are scaled
    /// by their time unit, string columns are parsed and numeric columns are
    /// taken as an ordinal already.
    pub fn temporal_days(&self, column: &str) -> Result<Vec<Option<f64>>> {
        let series = self.series(column)?;

        let per_day = match series.dtype() {
            DataType::Date => Some(1.0),
            DataType::Datetime(TimeUnit::Nanoseconds, _) => Some(86_400_000_000_000.0),
            DataType::Datetime(TimeUnit::Microseconds, _) => Some(86_400_000_000.0),
            DataType::Datetime(TimeUnit::Milliseconds, _) => Some(86_400_000.0),
            _ => None,
        };

        if let Some(per_day) = per_day {
            let physical = series.to_physical_repr();
            let casted = physical
                .cast(&DataType::Float64)
                .context(format!("Casting '{}' to elapsed days", column))?;
            let values = casted
                .f64()
                .context(format!("Reading '{}' as elapsed days", column))?
                .into_iter()
                .map(|v| v.map(|x| x / per_day))
                .collect();
            return Ok(values);
        }

        let dtype = series.dtype();
        if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
            return Ok(self
                .string_values(column)?
                .into_iter()
                .map(|v| v.as_deref().and_then(parse_epoch_days))
                .collect());
        }

        if is_numeric_dtype(dtype) {
            return self.numeric_values(column);
        }

        Err(InsightError::ColumnTypeMismatch {
            column: column.to_string(),
            expected: "temporal".to_string(),
            reason: format!("storage type {} has no time reading", dtype),
        })
    }

    /// Number of rows that exactly repeat an earlier row.
    pub fn duplicate_row_count(&self) -> Result<usize> {
        if self.frame.height() == 0 || self.frame.width() == 0 {
            return Ok(0);
        }
        let unique = self
            .frame
            .unique::<&str, &str>(None, UniqueKeepStrategy::First, None)
            .context("Computing unique rows")?;
        Ok(self.frame.height() - unique.height())
    }
}

impl From<DataFrame> for Dataset {
    fn from(frame: DataFrame) -> Self {
        Self::new(frame)
    }
}
