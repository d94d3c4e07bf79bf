//! Run results and the event stream emitted by the driver.

use std::fmt;

/// Why a selected fault was thrown away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Fault needs hardware the setup does not have
    Platform,
    /// Fault is on the caller's ignore list
    Ignored,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Platform => "platform",
            SkipReason::Ignored => "ignored",
        }
    }
}

/// What happened to the resolve step of an iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveStatus {
    /// Fault has no resolve alert
    NotApplicable,
    Resolved(&'static str),
    Failed { fault: &'static str, reason: String },
}

/// How an iteration ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    SetupFailed { reason: String },
    InjectFailed { reason: String },
    TeardownFailed { resolve: ResolveStatus, reason: String },
    Completed { resolve: ResolveStatus },
}

impl IterationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, IterationOutcome::Completed { .. })
    }

    /// Whether the fault itself went in
    pub fn injected(&self) -> bool {
        matches!(
            self,
            IterationOutcome::Completed { .. } | IterationOutcome::TeardownFailed { .. }
        )
    }
}

/// Notification sent on the optional event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Selected { fault: &'static str },
    Skipped { fault: &'static str, reason: SkipReason },
    SetupFailed { fault: &'static str, reason: String },
    /// `fault` is whatever was injected: the original or its resolve alert
    Injected { iteration: u64, fault: &'static str },
    InjectFailed { iteration: u64, fault: &'static str, reason: String },
    Resolved { iteration: u64, fault: &'static str },
    ResolveFailed { iteration: u64, fault: &'static str, reason: String },
    TeardownFailed { fault: &'static str, reason: String },
    IterationComplete {
        iteration: u64,
        fault: &'static str,
        outcome: IterationOutcome,
    },
}

/// One attempted (non-skipped) iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationRecord {
    pub iteration: u64,
    pub fault: &'static str,
    pub outcome: IterationOutcome,
}

/// Counters over a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Random draws, skipped ones included
    pub selected: u64,
    pub skipped_platform: u64,
    pub skipped_ignored: u64,
    /// Draws that passed the filter
    pub iterations: u64,
    pub setup_failures: u64,
    pub injected: u64,
    pub inject_failures: u64,
    pub resolved: u64,
    pub resolve_failures: u64,
    pub teardown_failures: u64,
    pub completed: u64,
}

impl DriverStats {
    pub fn skipped(&self) -> u64 {
        self.skipped_platform + self.skipped_ignored
    }
}

/// Result of a driver run
#[derive(Debug, Clone)]
pub struct DriverReport {
    /// Seed to replay the same fault sequence
    pub seed: u64,
    pub stats: DriverStats,
    pub history: Vec<IterationRecord>,
}

impl DriverReport {
    pub fn new(seed: u64) -> Self {
        DriverReport {
            seed,
            stats: DriverStats::default(),
            history: Vec::new(),
        }
    }

    pub fn record(&mut self, iteration: u64, fault: &'static str, outcome: IterationOutcome) {
        match &outcome {
            IterationOutcome::SetupFailed { .. } => self.stats.setup_failures += 1,
            IterationOutcome::InjectFailed { .. } => self.stats.inject_failures += 1,
            IterationOutcome::TeardownFailed { resolve, .. } => {
                self.stats.teardown_failures += 1;
                self.count_resolve(resolve);
            }
            IterationOutcome::Completed { resolve } => {
                self.stats.completed += 1;
                self.count_resolve(resolve);
            }
        }
        if outcome.injected() {
            self.stats.injected += 1;
        }
        self.history.push(IterationRecord {
            iteration,
            fault,
            outcome,
        });
    }

    fn count_resolve(&mut self, resolve: &ResolveStatus) {
        match resolve {
            ResolveStatus::Resolved(_) => self.stats.resolved += 1,
            ResolveStatus::Failed { .. } => self.stats.resolve_failures += 1,
            ResolveStatus::NotApplicable => {}
        }
    }

    /// Faults whose injection was attempted, in order
    pub fn attempted_faults(&self) -> Vec<&'static str> {
        self.history.iter().map(|r| r.fault).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Seed {}: {} selected, {} skipped, {} iterations, {} injected, {} resolved, \
             {} completed, failures setup={} inject={} resolve={} teardown={}",
            self.seed,
            self.stats.selected,
            self.stats.skipped(),
            self.stats.iterations,
            self.stats.injected,
            self.stats.resolved,
            self.stats.completed,
            self.stats.setup_failures,
            self.stats.inject_failures,
            self.stats.resolve_failures,
            self.stats.teardown_failures
        )
    }
}

impl fmt::Display for DriverReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}
