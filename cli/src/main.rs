//! Logmetrics CLI
//!
//! Runs the log-to-metrics pipeline locally, without a server or a real
//! metrics backend. Useful for checking what a deployment would publish for a
//! captured event, or what a single log line yields.
//!
//! # Usage
//!
//! ```bash
//! logmetrics --help
//! logmetrics process event.json --usage --cost
//! cat event.json | logmetrics process -
//! logmetrics extract 'MONITORING|1|count|hits|my.app|service=a' --function-name hello
//! ```

#![deny(unsafe_code)]

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use shared::backend::{InMemoryMetricsBackend, PutMetricsRequest};
use shared::config::{ExtractorFlags, PipelineConfig};
use shared::context::OriginContext;
use shared::extract::MetricExtractors;
use shared::models::{DimensionSet, LogLine, MetricRecord};
use shared::{InvocationSummary, Pipeline};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Logmetrics CLI - turn function logs into metrics
#[derive(Parser)]
#[command(name = "logmetrics")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a delivery event through the pipeline and print what would be published
    Process {
        /// JSON event file, or `-` for stdin
        file: PathBuf,

        #[command(flatten)]
        flags: FlagArgs,
    },
    /// Run the extractors on a single log line
    Extract {
        /// The log line
        line: String,

        /// Function name used as a default dimension
        #[arg(long)]
        function_name: Option<String>,

        /// Function version used as a default dimension
        #[arg(long, default_value = "$LATEST")]
        function_version: String,

        #[command(flatten)]
        flags: FlagArgs,
    },
}

/// Enables optional extractors on top of those enabled by environment variables.
#[derive(Args, Debug, Default, Clone, Copy)]
struct FlagArgs {
    /// Emit BilledDuration, MemorySize and MemoryUsed from report lines
    #[arg(long)]
    usage: bool,

    /// Emit EstimatedCost from report lines
    #[arg(long)]
    cost: bool,

    /// Emit InitDuration from cold start report lines
    #[arg(long)]
    cold_start: bool,
}

impl FlagArgs {
    fn apply(self, base: ExtractorFlags) -> ExtractorFlags {
        ExtractorFlags {
            usage_metrics: base.usage_metrics || self.usage,
            cost_metric: base.cost_metric || self.cost,
            cold_start_metric: base.cold_start_metric || self.cold_start,
        }
    }
}

/// What `process` prints.
#[derive(Debug, Serialize)]
struct ProcessOutput {
    requests: Vec<PutMetricsRequest>,
    summary: InvocationSummary,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Process { file, flags }) => {
            let event = read_event(&file)?;
            let mut config = PipelineConfig::from_env()?;
            config.extractors = flags.apply(config.extractors);

            let runtime = tokio::runtime::Runtime::new()?;
            let output = runtime.block_on(process_event(&config, &event));
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Some(Commands::Extract {
            line,
            function_name,
            function_version,
            flags,
        }) => {
            let config = PipelineConfig::from_env()?;
            let records = extract_line(
                &line,
                function_name.as_deref(),
                &function_version,
                flags.apply(config.extractors),
            );
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        None => {
            println!("Logmetrics CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn read_event(file: &Path) -> Result<serde_json::Value> {
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read event from stdin")?;
        text
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read event file {}", file.display()))?
    };

    tracing::debug!(bytes = text.len(), "Read event");
    serde_json::from_str(&text).context("Event is not valid JSON")
}

async fn process_event(config: &PipelineConfig, event: &serde_json::Value) -> ProcessOutput {
    let backend = InMemoryMetricsBackend::new_shared();
    let pipeline = Pipeline::new(config, backend.clone());
    let summary = pipeline.handle(event).await;
    tracing::debug!(
        requests = backend.request_count(),
        metrics = backend.metric_count(),
        "Captured metric requests"
    );

    ProcessOutput {
        requests: backend.requests(),
        summary,
    }
}

/// Runs the extractors on one line. Without a function name the line is treated
/// like a plain streaming record: no default dimensions and only custom metrics.
fn extract_line(
    text: &str,
    function_name: Option<&str>,
    function_version: &str,
    flags: ExtractorFlags,
) -> Vec<MetricRecord> {
    let line = LogLine::new(text, Utc::now());

    match function_name {
        Some(name) => {
            let context = OriginContext {
                name: name.to_string(),
                version: function_version.to_string(),
            };
            MetricExtractors::from_flags(flags).extract_line(&line, &context.dimensions())
        }
        None => MetricExtractors::custom_only().extract_line(&line, &DimensionSet::new()),
    }
}
