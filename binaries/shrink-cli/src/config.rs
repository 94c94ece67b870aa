//! Reducer configuration.
//!
//! Loaded from a TOML file, then overridden by CLI arguments.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use shrink_minimizer::{AlgorithmKind, HierarchicalConfig, MinimizerConfig};

/// Reducer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    /// Base algorithm selection and limits.
    pub minimizer: MinimizerSection,

    /// Hierarchical driver guards.
    pub hierarchy: HierarchicalConfig,

    /// The failing command.
    pub oracle: OracleConfig,

    /// How trials are isolated from the committed document.
    pub snapshot: SnapshotConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Base algorithm configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinimizerSection {
    pub algorithm: AlgorithmKind,

    /// Seed for the probabilistic algorithm.
    pub seed: u64,

    /// Remember verdicts per retained set.
    pub cache_results: bool,

    #[serde(flatten)]
    pub limits: MinimizerConfig,
}

impl Default for MinimizerSection {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::default(),
            seed: 0,
            cache_results: true,
            limits: MinimizerConfig::default(),
        }
    }
}

/// Failure oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Program and arguments. `{file}` is replaced by the scratch file path;
    /// without a placeholder the path is appended.
    pub command: Vec<String>,

    /// Kill the command after this many seconds.
    pub timeout_secs: u64,

    /// Where scratch files are written. Defaults to the system temp directory.
    pub scratch_dir: Option<PathBuf>,

    /// Also require the first stderr line to match, not just the exit code.
    pub compare_message: bool,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 60,
            scratch_dir: None,
            compare_message: true,
        }
    }
}

impl OracleConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Snapshot strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotStrategy {
    /// Every trial works on a clone of the document.
    #[default]
    Clone,
    /// Trials work in place and restore a checkpoint on rollback.
    Checkpoint,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub strategy: SnapshotStrategy,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Log format (pretty, json, compact).
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ReducerConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merges CLI arguments into the configuration.
    pub fn merge_cli_args(&mut self, args: &super::CliArgs) {
        if let Some(algorithm) = args.algorithm {
            self.minimizer.algorithm = algorithm;
        }

        if let Some(seed) = args.seed {
            self.minimizer.seed = seed;
        }

        if args.no_cache {
            self.minimizer.cache_results = false;
        }

        if let Some(max_levels) = args.max_levels {
            self.hierarchy.max_levels = max_levels;
        }

        if !args.command.is_empty() {
            self.oracle.command = args.command.clone();
        }

        if let Some(timeout) = args.timeout_secs {
            self.oracle.timeout_secs = timeout;
        }

        if let Some(strategy) = args.snapshot {
            self.snapshot.strategy = strategy;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log level: {}", self.logging.level);
        }

        let valid_formats = ["pretty", "json", "compact"];
        if !valid_formats.contains(&self.logging.format.to_lowercase().as_str()) {
            anyhow::bail!("Invalid log format: {}", self.logging.format);
        }

        if self.oracle.command.is_empty() {
            anyhow::bail!("No oracle command given (pass it after `--` or set oracle.command)");
        }

        if self.oracle.timeout_secs == 0 {
            anyhow::bail!("Oracle timeout must be at least one second");
        }

        if self.hierarchy.max_levels == 0 {
            anyhow::bail!("hierarchy.max_levels must be positive");
        }

        if self.minimizer.limits.max_iterations == 0 {
            anyhow::bail!("minimizer.max_iterations must be positive");
        }

        if let Some(ref dir) = self.oracle.scratch_dir {
            if !dir.is_dir() {
                anyhow::bail!("Scratch directory not found: {:?}", dir);
            }
        }

        Ok(())
    }
}
