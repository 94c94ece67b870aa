//! Result types for minimization operations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The outcome of one base algorithm run over a flat list of items.
#[derive(Debug, Clone, PartialEq)]
pub struct DdAlgorithmResult<T> {
    /// Items that must stay, in input order.
    pub retained: Vec<T>,

    /// Items that were deleted, in input order.
    pub deleted: Vec<T>,

    /// Statistics about the run.
    pub stats: MinimizationStats,
}

impl<T> DdAlgorithmResult<T> {
    /// Create a new result; sizes in the statistics are derived from the partition.
    pub fn new(retained: Vec<T>, deleted: Vec<T>, mut stats: MinimizationStats) -> Self {
        stats.original_size = retained.len() + deleted.len();
        stats.minimized_size = retained.len();
        stats.items_removed = deleted.len();
        Self {
            retained,
            deleted,
            stats,
        }
    }

    /// The result of minimizing nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), MinimizationStats::default())
    }

    /// The ratio of minimized size to original size (0.0 to 1.0).
    pub fn reduction_ratio(&self) -> f64 {
        let original = self.stats.original_size;
        if original > 0 {
            self.retained.len() as f64 / original as f64
        } else {
            1.0
        }
    }

    /// Get the percentage reduction achieved.
    pub fn reduction_percentage(&self) -> f64 {
        (1.0 - self.reduction_ratio()) * 100.0
    }
}

/// Statistics about the minimization process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinimizationStats {
    /// Number of items given to the algorithm.
    pub original_size: usize,

    /// Number of items left after minimization.
    pub minimized_size: usize,

    /// Number of items deleted.
    pub items_removed: usize,

    /// Time taken for minimization.
    #[serde(skip)]
    pub duration: Option<Duration>,

    /// Number of tester invocations.
    pub checks_performed: usize,

    /// Number of trials whose deletion was kept.
    pub successful_removals: usize,

    /// Number of trials whose deletion was rolled back.
    pub failed_removals: usize,

    /// Failed trials where the oracle could not decide.
    pub unknown_results: usize,

    /// Number of times we had to increase granularity.
    pub granularity_increases: usize,

    /// Maximum granularity reached during minimization.
    pub max_granularity: usize,

    /// Whether early termination was triggered.
    pub early_terminated: bool,

    /// Reason for early termination, if applicable.
    pub termination_reason: Option<String>,
}

impl MinimizationStats {
    /// Create new empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a trial whose deletion was kept.
    pub fn record_successful_removal(&mut self) {
        self.checks_performed += 1;
        self.successful_removals += 1;
    }

    /// Record a trial whose deletion was rolled back.
    pub fn record_failed_removal(&mut self) {
        self.checks_performed += 1;
        self.failed_removals += 1;
    }

    /// Record a rolled-back trial where the oracle could not decide.
    pub fn record_unknown_result(&mut self) {
        self.record_failed_removal();
        self.unknown_results += 1;
    }

    /// Record a granularity increase.
    pub fn record_granularity_increase(&mut self, new_granularity: usize) {
        self.granularity_increases += 1;
        if new_granularity > self.max_granularity {
            self.max_granularity = new_granularity;
        }
    }

    /// Record early termination.
    pub fn record_early_termination(&mut self, reason: &str) {
        self.early_terminated = true;
        self.termination_reason = Some(reason.to_string());
    }

    /// Fold the counters of another run into this one.
    pub fn absorb(&mut self, other: &MinimizationStats) {
        self.checks_performed += other.checks_performed;
        self.successful_removals += other.successful_removals;
        self.failed_removals += other.failed_removals;
        self.unknown_results += other.unknown_results;
        self.granularity_increases += other.granularity_increases;
        self.max_granularity = self.max_granularity.max(other.max_granularity);
        if other.early_terminated {
            self.early_terminated = true;
            self.termination_reason = other.termination_reason.clone();
        }
    }

    /// Get the total number of removal attempts.
    pub fn total_attempts(&self) -> usize {
        self.successful_removals + self.failed_removals
    }

    /// Get the success rate of removal attempts.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_attempts();
        if total == 0 {
            0.0
        } else {
            self.successful_removals as f64 / total as f64
        }
    }
}

impl fmt::Display for MinimizationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ {}/{} items removed, {} checks, {:.1}% success rate",
            self.items_removed,
            self.original_size,
            self.checks_performed,
            self.success_rate() * 100.0
        )?;
        if self.unknown_results > 0 {
            write!(f, ", {} undecided", self.unknown_results)?;
        }
        if self.early_terminated {
            if let Some(ref reason) = self.termination_reason {
                write!(f, ", early terminated: {}", reason)?;
            }
        }
        write!(f, " }}")
    }
}

/// Per-level summary recorded by the hierarchical driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    /// One-based level index.
    pub level: usize,

    /// Number of items in the level.
    pub size: usize,

    /// Items kept at this level.
    pub retained: usize,

    /// Items deleted at this level.
    pub deleted: usize,

    /// Tester invocations spent on this level.
    pub checks: usize,
}

/// Summary of a whole hierarchical run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalReport {
    /// One entry per minimized level, in order.
    pub levels: Vec<LevelReport>,

    /// Counters aggregated over all levels.
    pub stats: MinimizationStats,

    /// Wall-clock time of the run.
    #[serde(skip)]
    pub duration: Option<Duration>,
}

impl HierarchicalReport {
    /// Record the outcome of one level.
    pub fn record_level(&mut self, size: usize, retained: usize, deleted: usize, stats: &MinimizationStats) {
        self.levels.push(LevelReport {
            level: self.levels.len() + 1,
            size,
            retained,
            deleted,
            checks: stats.checks_performed,
        });
        self.stats.original_size += size;
        self.stats.minimized_size += retained;
        self.stats.items_removed += deleted;
        self.stats.absorb(stats);
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Total number of items deleted over all levels.
    pub fn total_deleted(&self) -> usize {
        self.levels.iter().map(|level| level.deleted).sum()
    }
}

impl fmt::Display for HierarchicalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HierarchicalReport {{ {} levels, {} items deleted, {} checks",
            self.levels.len(),
            self.total_deleted(),
            self.stats.checks_performed
        )?;
        if let Some(duration) = self.duration {
            write!(f, ", {:?}", duration)?;
        }
        write!(f, " }}")
    }
}
