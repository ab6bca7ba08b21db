//! Run outcome and counters

use crate::oracle::OracleStatistics;
use std::time::Duration;

/// Why a sampling run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The formula has no model; nothing was sampled
    Unsatisfiable,
    /// The oracle could not decide the formula at startup
    SolverUnknown,
    /// Total sampling attempts reached the configured ceiling
    SampleLimit,
    /// Overall wall-clock time ran out
    TimeLimit,
    /// The configured number of epochs completed
    EpochLimit,
    /// An epoch recorded as many samples as one epoch may
    EpochSampleLimit,
    /// An epoch ran for as long as one epoch may
    EpochTimeLimit,
}

impl StopReason {
    /// Whether sampling actually started (the formula was satisfiable)
    pub fn sampled(&self) -> bool {
        !matches!(self, StopReason::Unsatisfiable | StopReason::SolverUnknown)
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Unsatisfiable => write!(f, "formula is unsat"),
            StopReason::SolverUnknown => write!(f, "solver returned unknown"),
            StopReason::SampleLimit => write!(f, "sample limit reached"),
            StopReason::TimeLimit => write!(f, "timeout"),
            StopReason::EpochLimit => write!(f, "epoch limit reached"),
            StopReason::EpochSampleLimit => write!(f, "per-epoch sample limit reached"),
            StopReason::EpochTimeLimit => write!(f, "per-epoch timeout"),
        }
    }
}

/// Counters of one sampling run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingStatistics {
    pub epochs: u64,
    /// Assignments considered, repetitions included
    pub total_samples: u64,
    /// Attempts that produced a model, repetitions included
    pub valid_samples: u64,
    /// Distinct samples, equal to the number of lines in the results file
    pub unique_samples: u64,
    pub elapsed_time: Duration,
    pub oracle: OracleStatistics,
}

impl SamplingStatistics {
    /// Fraction of models that were new (0.0 to 1.0)
    pub fn uniqueness_rate(&self) -> f64 {
        if self.valid_samples == 0 {
            0.0
        } else {
            self.unique_samples as f64 / self.valid_samples as f64
        }
    }

    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Epochs: {}\n", self.epochs));
        s.push_str(&format!(
            "Assignments considered (with repetitions): {}\n",
            self.total_samples
        ));
        s.push_str(&format!("Models (with repetitions): {}\n", self.valid_samples));
        s.push_str(&format!(
            "Unique models (# samples in file): {}\n",
            self.unique_samples
        ));

        if self.oracle.guided_checks > 0 {
            s.push_str(&format!("MAX-SMT checks: {}\n", self.oracle.guided_checks));
            s.push_str(&format!(
                "Fallbacks to plain SMT: {}\n",
                self.oracle.fallbacks
            ));
        }
        s.push_str(&format!("Time: {:.2?}\n", self.elapsed_time));
        s
    }
}

/// What [`Sampler::run`](crate::sampling::Sampler::run) hands back on a
/// controlled stop
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub stop_reason: StopReason,
    pub statistics: SamplingStatistics,
}
