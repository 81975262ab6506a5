//! Statistics building blocks and the basic statistics module.

pub mod basic;
pub mod correlation;
pub mod descriptive;

pub use basic::{BasicReport, BasicStatistics};
pub use correlation::{correlate, correlation_p_value, pearson, spearman};
