//! CLI command definitions for longchain-judge.
//!
//! `evaluate` judges agent predictions against reference answers and writes
//! the judged output file; `average` summarizes a judged output file.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::aggregate::{load_and_summarize, SummaryReport};
use crate::config::JudgeConfig;
use crate::judge::LlmJudge;
use crate::llm::ChatCompletionsClient;
use crate::metrics::JudgeMetrics;
use crate::pipeline::{EvaluationPipeline, PipelineConfig, RunReport};

/// LLM-as-judge evaluation for long-chain web agent trajectories.
#[derive(Parser)]
#[command(name = "longchain-judge")]
#[command(about = "Score agent predictions on long-chain web tasks with an LLM judge")]
#[command(version)]
#[command(
    long_about = "longchain-judge compares each agent prediction with the task's reference answer using an LLM judge, writes one judged record per task, and reports average scores per task type.\n\nExample usage:\n  longchain-judge evaluate --input_file predictions.json --output_file judged.json\n  longchain-judge average --input_file judged.json"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Judge every prediction and write the judged output file.
    #[command(alias = "eval")]
    Evaluate(EvaluateArgs),

    /// Print overall and per-type averages of a judged output file.
    #[command(alias = "aggregate")]
    Average(AverageArgs),
}

/// Arguments for `longchain-judge evaluate`.
#[derive(Parser, Debug)]
pub struct EvaluateArgs {
    /// Predictions file (JSON array). Holds the task fields too unless --dataset_file is given.
    #[arg(short = 'i', long = "input_file", visible_alias = "input-file")]
    pub input_file: PathBuf,

    /// Judged output file (JSON array).
    #[arg(short = 'o', long = "output_file", visible_alias = "output-file")]
    pub output_file: PathBuf,

    /// Task dataset file (JSON array), joined with the predictions by id.
    #[arg(short = 'd', long = "dataset_file", visible_alias = "dataset-file")]
    pub dataset_file: Option<PathBuf>,

    /// Judge model identifier (default: JUDGE_MODEL or openai/gpt-4o).
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible API (default: JUDGE_API_BASE).
    #[arg(long = "api_base", visible_alias = "api-base")]
    pub api_base: Option<String>,

    /// API key for the judge backend.
    #[arg(long = "api_key", visible_alias = "api-key", env = "JUDGE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Total attempts per record on transient backend failures.
    #[arg(long = "max_retries", visible_alias = "max-retries")]
    pub max_retries: Option<u32>,

    /// Maximum number of judge calls in flight.
    #[arg(short = 'c', long)]
    pub concurrency: Option<usize>,

    /// Keep records already judged in the output file or its checkpoint.
    #[arg(long)]
    pub resume: bool,

    /// Split the batch into this many shards.
    #[arg(long = "num_shards", visible_alias = "num-shards", default_value = "1")]
    pub num_shards: usize,

    /// Shard judged by this process (0-based).
    #[arg(long = "shard_index", visible_alias = "shard-index", default_value = "0")]
    pub shard_index: usize,

    /// Write Prometheus metrics for the run to this file.
    #[arg(long = "metrics_file", visible_alias = "metrics-file")]
    pub metrics_file: Option<PathBuf>,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

/// Arguments for `longchain-judge average`.
#[derive(Parser, Debug)]
pub struct AverageArgs {
    /// Judged output file (JSON array).
    #[arg(short = 'i', long = "input_file", visible_alias = "input-file")]
    pub input_file: PathBuf,

    /// Output JSON summary.
    #[arg(short = 'j', long)]
    pub json: bool,
}

impl EvaluateArgs {
    /// Judge configuration: environment first, then flags.
    fn judge_config(&self) -> anyhow::Result<JudgeConfig> {
        let config = JudgeConfig::load_env().context("Invalid judge environment")?;
        self.apply_overrides(config)
    }

    /// Applies flag values over `config` and validates the result once.
    fn apply_overrides(&self, mut config: JudgeConfig) -> anyhow::Result<JudgeConfig> {

        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(api_key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            config.api_key = Some(api_key.clone());
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }

        config.validate().context("Invalid judge configuration")?;
        Ok(config)
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(&self.input_file, &self.output_file)
            .with_resume(self.resume)
            .with_shard(self.num_shards, self.shard_index);
        if let Some(dataset) = &self.dataset_file {
            config = config.with_dataset_file(dataset);
        }
        if let Some(metrics) = &self.metrics_file {
            config = config.with_metrics_file(metrics);
        }
        config
    }
}

/// Parse CLI arguments and return the Cli struct.
///
/// This allows main.rs to access CLI arguments (like log_level) before running commands.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Run the CLI by parsing arguments and executing the command.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the CLI with the parsed arguments.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Evaluate(args) => run_evaluate_command(args).await,
        Commands::Average(args) => run_average_command(args),
    }
}

async fn run_evaluate_command(args: EvaluateArgs) -> anyhow::Result<()> {
    let judge_config = args.judge_config()?;
    let pipeline_config = args.pipeline_config();

    info!(
        model = %judge_config.model,
        api_base = %judge_config.api_base,
        concurrency = judge_config.concurrency,
        max_retries = judge_config.max_retries,
        "Configured judge"
    );

    let metrics = Arc::new(JudgeMetrics::new().context("Failed to initialize metrics")?);
    let client = ChatCompletionsClient::from_config(&judge_config)
        .context("Failed to initialize judge client")?;
    let concurrency = judge_config.concurrency;
    let judge = LlmJudge::new(Arc::new(client), judge_config).with_metrics(metrics.clone());

    let pipeline = EvaluationPipeline::new(pipeline_config, Arc::new(judge), concurrency)?
        .with_metrics(metrics.clone());
    let report = pipeline.run().await.with_context(|| {
        format!(
            "Evaluation of '{}' failed",
            args.input_file.display()
        )
    })?;

    let snapshot = metrics.snapshot();
    info!(
        requests = snapshot.requests_success + snapshot.requests_transient + snapshot.requests_fatal,
        retries = snapshot.retries,
        parse_failures = snapshot.parse_failures,
        prompt_tokens = snapshot.prompt_tokens,
        completion_tokens = snapshot.completion_tokens,
        "Judge usage"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_run_report(&report);
    }
    Ok(())
}

fn run_average_command(args: AverageArgs) -> anyhow::Result<()> {
    let summary = load_and_summarize(&args.input_file)
        .with_context(|| format!("Failed to summarize '{}'", args.input_file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn print_run_report(report: &RunReport) {
    println!("Evaluation complete");
    println!("  Output:          {}", report.output_file.display());
    println!("  Records:         {}", report.records);
    println!("  Judged:          {}", report.judged);
    println!("  Failed:          {}", report.failed);
    if report.carried_over > 0 {
        println!("  Carried over:    {}", report.carried_over);
    }
    if report.tasks_without_prediction > 0 || report.orphan_predictions > 0 {
        println!(
            "  Excluded ids:    {} tasks without prediction, {} orphan predictions",
            report.tasks_without_prediction, report.orphan_predictions
        );
    }
    println!("  Elapsed:         {:.1}s", report.elapsed_secs);
    println!();
    print_summary(&report.summary);
}

fn print_summary(summary: &SummaryReport) {
    print!("{}", summary.render_table());
    if summary.excluded > 0 {
        println!(
            "({} record(s) without a verdict excluded from averages)",
            summary.excluded
        );
    }
}
