//! shrink - Reduce a failing text file to a smaller one that fails the same way.
//!
//! The input is split into blocks (runs of non-blank lines) and lines. The
//! reducer first deletes whole blocks, then single lines of the surviving
//! blocks, keeping a deletion only if the oracle command still fails with the
//! same exit code and first stderr line.
//!
//! # Usage
//!
//! ```bash
//! # Reduce a file that makes the compiler crash
//! shrink --input crash.rs --output small.rs -- rustc --crate-type lib {file}
//!
//! # Use a configuration file and write a JSON report
//! shrink --config shrink.toml --input crash.rs --output small.rs --report report.json
//!
//! # Print the default configuration
//! shrink --print-config
//! ```
//!
//! Ctrl-C stops the run; the last committed document is still written.

mod config;
mod document;
mod oracle;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shrink_core::{CancellationToken, PropertyTester};
use shrink_minimizer::{
    Algorithm, AlgorithmKind, CachingTester, DdAlgorithmExt, HierarchicalDd, HierarchicalReport,
    LoggingTester, TreeHierarchyGenerator,
};
use shrink_snapshot::{
    minimize_project, CheckpointSnapshotManager, CloningSnapshotManager, LoggingListener,
    MinimizationOutcome, SameFailurePropertyTester, SnapshotManager,
};

use config::{ReducerConfig, SnapshotStrategy};
use document::{TextDocument, TextLens, TextUnit};
use oracle::{CommandOracle, FailureComparator};

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "shrink",
    about = "Reduce a failing input while it keeps failing the same way",
    version
)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// File to reduce.
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Where the reduced file is written.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write a JSON report of the run.
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Base algorithm (ddmin, probabilistic).
    #[arg(short, long, value_name = "ALGORITHM")]
    algorithm: Option<AlgorithmKind>,

    /// Seed for the probabilistic algorithm.
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Maximum number of hierarchy levels.
    #[arg(long, value_name = "N")]
    max_levels: Option<usize>,

    /// Oracle timeout in seconds.
    #[arg(long, value_name = "SECS")]
    timeout_secs: Option<u64>,

    /// How trials are isolated.
    #[arg(long, value_enum)]
    snapshot: Option<SnapshotStrategy>,

    /// Do not cache verdicts.
    #[arg(long)]
    no_cache: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Enable JSON log output.
    #[arg(long)]
    json_logs: bool,

    /// Print the default configuration and exit.
    #[arg(long)]
    print_config: bool,

    /// The oracle command; `{file}` is replaced by the document path.
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

/// Summary written with `--report`.
#[derive(Debug, Serialize)]
struct RunReport {
    input: PathBuf,
    output: PathBuf,
    algorithm: AlgorithmKind,
    original_lines: usize,
    final_lines: usize,
    trials: usize,
    complete: bool,
    error: Option<String>,
    report: Option<HierarchicalReport>,
}

type TextTester<M> = Box<dyn PropertyTester<M, TextUnit>>;

/// Reduce `manager`'s document with the configured algorithm and oracle.
async fn reduce<M>(
    manager: M,
    config: &ReducerConfig,
    file_name: &str,
    token: CancellationToken,
) -> Result<(MinimizationOutcome<TextDocument>, usize)>
where
    M: SnapshotManager<Context = TextDocument> + 'static,
{
    let oracle = CommandOracle::from_config(&config.oracle, file_name)?;
    let tester = SameFailurePropertyTester::create(
        manager.context(),
        Arc::new(oracle),
        Arc::new(FailureComparator::new(config.oracle.compare_message)),
        Arc::new(TextLens),
    )
    .await
    .context("The input does not reproduce a failure")?
    .with_listener(Arc::new(LoggingListener));

    let tester: TextTester<M> = if config.minimizer.cache_results {
        Box::new(CachingTester::<_, TextUnit>::new(tester))
    } else {
        Box::new(tester)
    };
    let tester = LoggingTester::new(tester);

    let document = manager.context();
    let mut generator =
        TreeHierarchyGenerator::new(document.block_units(), document.children(), tester);

    let algorithm = Algorithm::from_kind(
        config.minimizer.algorithm,
        config.minimizer.limits.clone(),
        config.minimizer.seed,
    )
    .with_cancellation(token)
    .with_zero_testing()
    .with_log();
    let driver = HierarchicalDd::with_config(algorithm, config.hierarchy.clone());

    let outcome = minimize_project(manager, &driver, &mut generator).await;
    Ok((outcome, generator.tester_ref().trials()))
}

async fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write report to {:?}", path))
}

/// Initialize tracing/logging.
fn init_tracing(config: &config::LoggingConfig, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Failed to parse log filter")?;

    let format = if json_logs || config.format == "json" {
        "json"
    } else {
        &config.format
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        "compact" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    if args.print_config {
        let config = ReducerConfig::default();
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut config = if let Some(ref config_path) = args.config {
        ReducerConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        ReducerConfig::default()
    };
    config.merge_cli_args(&args);
    config.validate().context("Invalid configuration")?;

    init_tracing(&config.logging, args.json_logs)?;

    let input = args.input.clone().context("--input is required")?;
    let output = args.output.clone().context("--output is required")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %input.display(),
        algorithm = %config.minimizer.algorithm,
        "shrink starting"
    );

    let document = TextDocument::load(&input).await?;
    let original_lines = document.alive_lines();
    let file_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, rolling back the current trial");
        canceller.cancel();
    });

    let (outcome, trials) = match config.snapshot.strategy {
        SnapshotStrategy::Clone => {
            let manager = CloningSnapshotManager::new(document).with_cancellation(token.clone());
            reduce(manager, &config, &file_name, token).await?
        }
        SnapshotStrategy::Checkpoint => {
            let manager = CheckpointSnapshotManager::new(document).with_cancellation(token.clone());
            reduce(manager, &config, &file_name, token).await?
        }
    };

    let MinimizationOutcome { context, result } = outcome;
    tokio::fs::write(&output, context.render())
        .await
        .with_context(|| format!("Failed to write {:?}", output))?;
    info!(
        output = %output.display(),
        original_lines,
        final_lines = context.alive_lines(),
        trials,
        "Wrote reduced document"
    );

    if let Some(ref path) = args.report {
        let report = RunReport {
            input: input.clone(),
            output: output.clone(),
            algorithm: config.minimizer.algorithm,
            original_lines,
            final_lines: context.alive_lines(),
            trials,
            complete: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
            report: result.as_ref().ok().cloned(),
        };
        write_report(path, &report).await?;
    }

    match result {
        Ok(_) => {
            info!("shrink finished");
            Ok(())
        }
        Err(e) if e.is_cancelled() => {
            warn!("Run cancelled, wrote the last committed document");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Reduction failed");
            Err(anyhow::Error::new(e).context("Reduction stopped early"))
        }
    }
}
