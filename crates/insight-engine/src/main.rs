//! CLI entry point for the insight discovery engine.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use insight_engine::{
    AnomalyMethod, Dataset, Finding, InsightConfig, InsightEngine, InsightEngineBuilder,
    LogicalType, QuestionOutcome, QuisResult,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

#[cfg(feature = "ai")]
use insight_engine::ai::OpenRouterQuestionGenerator;
#[cfg(feature = "ai")]
use std::sync::Arc;
#[cfg(feature = "ai")]
use tracing::warn;

/// CLI-compatible anomaly detection method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAnomalyMethod {
    /// Random isolation trees
    IsolationForest,
    /// Median / MAD based z-score
    RobustZScore,
    /// Mean / standard deviation z-score
    ZScore,
}

impl From<CliAnomalyMethod> for AnomalyMethod {
    fn from(cli: CliAnomalyMethod) -> Self {
        match cli {
            CliAnomalyMethod::IsolationForest => AnomalyMethod::IsolationForest,
            CliAnomalyMethod::RobustZScore => AnomalyMethod::RobustZScore,
            CliAnomalyMethod::ZScore => AnomalyMethod::ZScore,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Statistical Insight Discovery Engine",
    long_about = "Profiles a CSV dataset and reports statistically meaningful patterns:\n\
                  correlations, outliers, anomalies and subspaces where a pattern is much\n\
                  stronger than over the whole dataset.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (AI-generated questions)\n\n\
                  EXAMPLES:\n  \
                  # Full analysis\n  \
                  insight-engine -i sales.csv\n\n  \
                  # Declare column types and search single-condition subspaces only\n  \
                  insight-engine -i sales.csv --declare store_id=categorical --max-depth 1\n\n  \
                  # Machine-readable output\n  \
                  insight-engine -i sales.csv --json | jq .summary"
)]
struct Args {
    /// Path to the CSV file to analyse
    #[arg(short, long)]
    input: String,

    /// Declare a column's logical type as `column=type` (repeatable)
    ///
    /// Types: numeric, categorical, temporal, boolean, text
    #[arg(short, long = "declare", value_name = "COLUMN=TYPE")]
    declare: Vec<String>,

    /// Maximum number of filter conditions per subspace (0, 1 or 2)
    #[arg(long, default_value = "2")]
    max_depth: usize,

    /// Method used for per-column anomaly detection
    #[arg(long, value_enum, default_value = "robust-z-score")]
    anomaly_method: CliAnomalyMethod,

    /// |r| at or above which a correlation is reported
    #[arg(long, default_value = "0.7")]
    correlation_threshold: f64,

    /// Disable AI-generated questions (heuristic questions only)
    #[arg(long, default_value = "false")]
    no_ai: bool,

    /// Disable question evaluation, false-discovery-rate correction and
    /// the Simpson's paradox check
    #[arg(long, default_value = "false")]
    no_enhanced: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only outputs the final JSON result.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !std::path::Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let declared = parse_declarations(&args.declare)?;

    info!("Loading dataset from: {}", args.input);
    let frame = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", frame.shape());
    let dataset = Dataset::new(frame).with_declared_types(declared);

    let config = InsightConfig::builder()
        .max_depth(args.max_depth)
        .anomaly_method(args.anomaly_method.into())
        .correlation_threshold(args.correlation_threshold)
        .enable_enhanced_analysis(!args.no_enhanced)
        .use_ai_questions(!args.no_ai)
        .build()?;

    let engine = build_engine(&args, config)?;
    let result = engine.run_quis_analysis(&dataset, Some(&args.input));

    if args.json {
        println!("{}", serde_json::to_string_pretty(result.as_ref())?);
    } else {
        print_human_readable_summary(&result, &args);
    }
    Ok(())
}

/// Parse `column=type` declarations.
fn parse_declarations(raw: &[String]) -> Result<HashMap<String, LogicalType>> {
    raw.iter()
        .map(|entry| {
            let (column, logical_type) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid declaration '{}', expected COLUMN=TYPE", entry))?;
            let logical_type: LogicalType = logical_type.parse()?;
            Ok((column.trim().to_string(), logical_type))
        })
        .collect()
}

#[cfg(feature = "ai")]
fn build_engine(args: &Args, config: InsightConfig) -> Result<InsightEngine> {
    let builder = InsightEngine::builder().config(config);
    if args.no_ai || args.no_enhanced {
        info!("Running with heuristic questions (AI disabled)");
        return Ok(builder.build()?);
    }

    let builder: InsightEngineBuilder = match OpenRouterQuestionGenerator::from_env() {
        Ok(generator) => {
            info!("Running with AI-generated questions (OpenRouter)");
            builder.question_generator(Arc::new(generator))
        }
        Err(e) => {
            warn!("{}. Falling back to heuristic questions.", e);
            builder
        }
    };
    Ok(builder.build()?)
}

#[cfg(not(feature = "ai"))]
fn build_engine(args: &Args, config: InsightConfig) -> Result<InsightEngine> {
    if !args.no_ai {
        tracing::warn!("AI support not compiled in. Using heuristic questions.");
        tracing::warn!("Compile with --features ai to enable AI support.");
    }
    let builder: InsightEngineBuilder = InsightEngine::builder().config(config);
    Ok(builder.build()?)
}

fn load_csv(path: &str) -> Result<DataFrame> {
    // Strategy 1: Standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Every column as text; the classifier re-types them
    CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .map_err(|e| anyhow!("Could not parse '{}' as CSV: {}", path, e))
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

/// Print the analysis for a terminal.
///
/// Uses `println!` intentionally: this is the primary output, not a log.
fn print_human_readable_summary(result: &QuisResult, args: &Args) {
    let summary = &result.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("INSIGHT ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input: {} ({} rows x {} columns), {}ms",
        args.input, summary.rows, summary.columns, result.duration_ms
    );
    println!();

    println!("COLUMN PROFILES");
    println!("{}", "-".repeat(40));
    println!("{:<24} {:<12} {:<10} {:<10}", "Column", "Type", "Missing", "Unique");
    for profile in &result.profiles {
        println!(
            "{:<24} {:<12} {:<10} {:<10}",
            truncate_str(&profile.name, 23),
            profile.logical_type,
            profile.null_count,
            profile.unique_count
        );
    }
    println!();

    println!("BASIC FINDINGS ({})", summary.basic_insight_count);
    println!("{}", "-".repeat(40));
    for finding in result.basic_insights.iter().take(15) {
        println!("  - {}", describe_finding(finding));
    }
    if result.basic_insights.len() > 15 {
        println!("  ... and {} more", result.basic_insights.len() - 15);
    }
    println!();

    println!(
        "DEEP INSIGHTS ({}: {} very high, {} high, {} moderate)",
        summary.deep_insight_count,
        summary.by_significance.very_high,
        summary.by_significance.high,
        summary.by_significance.moderate
    );
    println!("{}", "-".repeat(40));
    for insight in result.deep_insights.iter().take(10) {
        println!(
            "  [{:?}] {:?} where {} (n = {}, improvement {:+.3})",
            insight.significance,
            insight.kind,
            insight.filter_label(),
            insight.subspace_size,
            insight.improvement
        );
    }
    println!();

    if summary.enhanced {
        if !result.simpson_paradoxes.is_empty() {
            println!("SIMPSON'S PARADOX ({})", summary.simpson_paradox_count);
            println!("{}", "-".repeat(40));
            for paradox in &result.simpson_paradoxes {
                println!(
                    "  ! {} ~ {}: {:+.3} overall, {:+.3} where {}",
                    paradox.column_a,
                    paradox.column_b,
                    paradox.global_value,
                    paradox.subspace_value,
                    paradox
                        .filter
                        .iter()
                        .map(|c| c.to_string())
                        .collect::<Vec<_>>()
                        .join(" AND ")
                );
            }
            println!();
        }

        println!("QUESTIONS ({})", summary.questions_evaluated);
        println!("{}", "-".repeat(40));
        for answer in &result.question_answers {
            let verdict = match (&answer.outcome, answer.adjusted_p_value) {
                (QuestionOutcome::Unanswerable { reason }, _) => format!("unanswerable: {}", reason),
                (_, Some(p)) => format!("adjusted p = {:.4}", p),
                _ => "no p-value".to_string(),
            };
            println!("  - {} ({})", answer.question.text, verdict);
        }
        println!();
        println!(
            "False-discovery control: {} of {} hypotheses significant",
            summary.significant_after_correction, summary.hypotheses_tested
        );
    }

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}

fn describe_finding(finding: &Finding) -> String {
    match finding {
        Finding::StrongCorrelation(c) => format!(
            "{} ~ {}: {} correlation {:+.3}",
            c.column_a,
            c.column_b,
            c.method.as_str(),
            c.value
        ),
        Finding::Outliers {
            column,
            outlier_count,
            outlier_fraction,
            ..
        } => format!(
            "{}: {} outliers ({:.1}%)",
            column,
            outlier_count,
            outlier_fraction * 100.0
        ),
        Finding::DominantCategory {
            column, value, share, ..
        } => format!("{}: '{}' covers {:.1}% of rows", column, value, share * 100.0),
        Finding::Distribution { column, shape, skewness, .. } => {
            format!("{}: {:?} distribution (skewness {:.2})", column, shape, skewness)
        }
        Finding::MissingValues {
            column,
            null_percentage,
            ..
        } => format!("{}: {:.1}% missing", column, null_percentage),
        Finding::DuplicateRows { count, percentage } => {
            format!("{} duplicate rows ({:.1}%)", count, percentage)
        }
        Finding::Anomalies(a) => format!(
            "{}: {} anomalies ({})",
            a.column,
            a.outlier_count,
            a.method.as_str()
        ),
    }
}
