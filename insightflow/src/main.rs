use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use insightflow::agents::{default_collaborators, run_analysis};
use insightflow::config::PipelineConfig;
use insightflow::observability::{init_tracing, LogFormat};

#[derive(Debug, Parser)]
#[command(name = "insightflow")]
#[command(about = "Profile, analyze and report on a sales dataset")]
struct Cli {
    /// CSV dataset to analyze.
    #[arg(long, short = 'f')]
    file: PathBuf,

    /// TOML configuration file.
    #[arg(long, env = "INSIGHTFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for the report, charts and model outputs.
    #[arg(long)]
    report_dir: Option<PathBuf>,

    /// Worker limit for the parallel analysis stage.
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run_cli(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            eprintln!("error: {err:#}");
            tracing::error!(error = %err, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run_cli(cli: Cli) -> Result<bool> {
    init_tracing(cli.log_format).context("failed to initialize logging")?;

    let mut config = PipelineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.report_dir {
        config.report_dir = dir;
    }
    if let Some(workers) = cli.workers {
        config.parallel_workers = workers;
    }
    config.validate()?;

    let collaborators = default_collaborators(&config)?;
    let result = run_analysis(&config, &collaborators, &cli.file).await?;

    println!("Status: {}", result.status);
    for failure in &result.failures {
        println!("  {} / {}: {}", failure.stage, failure.agent, failure.message);
    }
    if !result.skipped_stages.is_empty() {
        println!("Skipped stages: {}", result.skipped_stages.join(", "));
    }
    match result.report_path() {
        Some(path) => println!("Report: {}", path.display()),
        None => println!("No report was written"),
    }
    Ok(result.is_success())
}
