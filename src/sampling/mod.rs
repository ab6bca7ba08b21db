//! Epoch-based sampling engine
//!
//! [`Sampler`] ties the pieces together: it indexes the formula once, checks
//! that it is satisfiable, then runs epochs until a configured ceiling is
//! reached. Whatever ends the run, the solving statistics are reported and
//! the results file is flushed before control returns.

pub mod config;
pub mod epoch;
pub mod random;
pub mod result;

pub use config::{BitVecTargeting, SamplerConfig, Strategy};
pub use epoch::{
    EpochController, EpochOutcome, EpochReport, ExtensionContext, KeepSeedOnly,
    NeighborhoodSearch,
};
pub use random::RandomAssignmentGenerator;
pub use result::{RunReport, SamplingStatistics, StopReason};

use crate::error::Result;
use crate::formula::{FormulaIndex, FormulaStatistics, Variable};
use crate::oracle::{Backend, ConstraintOracle, Solution};
use crate::stats::StatsRegistry;
use crate::store::SampleStore;
use std::io::Write;
use std::time::Instant;

/// Sampling run over one formula
pub struct Sampler<B: Backend, W: Write> {
    oracle: ConstraintOracle<B>,
    index: FormulaIndex,
    controller: EpochController,
    neighborhood: Box<dyn NeighborhoodSearch<B, W>>,
    store: SampleStore<W>,
    stats: StatsRegistry,
    config: SamplerConfig,
    start_time: Instant,
}

impl<B: Backend, W: Write> Sampler<B, W> {
    /// Index the formula held by `backend` and prepare a run.
    ///
    /// Fails if the configuration asks for an unsupported strategy or the
    /// formula declares a variable of an unsupported sort.
    pub fn new(backend: B, store: SampleStore<W>, config: SamplerConfig) -> Result<Self> {
        config.validate()?;

        let index = FormulaIndex::traverse(&backend)?;
        log::info!("\n{}", index.statistics().format_summary());

        let generator = RandomAssignmentGenerator::new(config.targeting(), config.seed);
        log::info!(
            "Strategy: {} ({} bit-vector targets)",
            config.strategy,
            generator.targeting()
        );
        let controller =
            EpochController::new(generator, config.max_epoch_samples, config.max_epoch_time);

        Ok(Self {
            oracle: ConstraintOracle::new(backend),
            index,
            controller,
            neighborhood: Box::new(KeepSeedOnly),
            store,
            stats: StatsRegistry::new(),
            config,
            start_time: Instant::now(),
        })
    }

    /// Replace the per-epoch neighbourhood search
    pub fn with_neighborhood(mut self, search: impl NeighborhoodSearch<B, W> + 'static) -> Self {
        self.neighborhood = Box::new(search);
        self
    }

    /// Sample until a ceiling is reached.
    ///
    /// On a fatal error the statistics are still reported and the results
    /// file flushed before the error is returned.
    pub fn run(&mut self) -> Result<RunReport> {
        self.start_time = Instant::now();

        let outcome = self.sample_loop();
        let finished = self.finish();

        let stop_reason = outcome?;
        finished?;
        log::info!("Stopping: {}", stop_reason);

        Ok(RunReport {
            stop_reason,
            statistics: self.statistics(),
        })
    }

    fn sample_loop(&mut self) -> Result<StopReason> {
        if let Some(reason) = self.check_if_satisfiable()? {
            return Ok(reason);
        }

        loop {
            if let Some(reason) = self.run_limit_reached() {
                return Ok(reason);
            }

            let report = self.controller.run_epoch(
                &mut self.oracle,
                self.index.variables(),
                &mut self.store,
                &mut self.stats,
                self.neighborhood.as_mut(),
            )?;

            if let Some(reason) = self.epoch_limit_reached(&report) {
                return Ok(reason);
            }
        }
    }

    /// Solve the formula once with no soft targets.
    ///
    /// Returns the stop reason if there is nothing to sample.
    pub fn check_if_satisfiable(&mut self) -> Result<Option<StopReason>> {
        self.stats.start("initial_solving");
        let solution = self.oracle.solve(self.index.variables())?;
        let elapsed = self.stats.stop("initial_solving")?;

        match solution {
            Solution::Sat(_) => {
                log::info!("Formula is satisfiable");
                log::info!("Time to find initial model: {:.6}", elapsed.as_secs_f64());
                Ok(None)
            }
            Solution::Unsat => {
                log::info!("Formula is unsat");
                Ok(Some(StopReason::Unsatisfiable))
            }
            Solution::Unknown => {
                log::info!("Solver returned unknown");
                Ok(Some(StopReason::SolverUnknown))
            }
        }
    }

    /// Global ceilings, checked before every epoch
    fn run_limit_reached(&self) -> Option<StopReason> {
        if self.start_time.elapsed() >= self.config.max_time {
            return Some(StopReason::TimeLimit);
        }
        if self.controller.total_samples() >= self.config.max_samples {
            return Some(StopReason::SampleLimit);
        }
        if self
            .config
            .max_epochs
            .is_some_and(|max| self.controller.epochs() >= max)
        {
            return Some(StopReason::EpochLimit);
        }
        None
    }

    /// Ceilings checked right after an epoch
    fn epoch_limit_reached(&self, report: &EpochReport) -> Option<StopReason> {
        if let Some(reason) = self.run_limit_reached() {
            return Some(reason);
        }
        if self
            .config
            .max_epoch_samples
            .is_some_and(|max| report.samples >= max)
        {
            return Some(StopReason::EpochSampleLimit);
        }
        if self
            .config
            .max_epoch_time
            .is_some_and(|max| report.elapsed >= max)
        {
            return Some(StopReason::EpochTimeLimit);
        }
        None
    }

    /// Report solving statistics and flush the results file
    pub fn finish(&mut self) -> Result<()> {
        log::info!("\n{}", self.format_summary());
        self.store.flush()
    }

    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str("---------SOLVING STATISTICS--------\n");
        s.push_str(&self.stats.format_summary());
        s.push_str(&self.statistics().format_summary());
        s.push_str("-----------------------------------\n");
        s
    }

    pub fn statistics(&self) -> SamplingStatistics {
        SamplingStatistics {
            epochs: self.controller.epochs(),
            total_samples: self.controller.total_samples(),
            valid_samples: self.controller.valid_samples(),
            unique_samples: self.store.unique_count(),
            elapsed_time: self.start_time.elapsed(),
            oracle: self.oracle.statistics(),
        }
    }

    /// Variables in discovery order
    pub fn variables(&self) -> &[Variable] {
        self.index.variables()
    }

    pub fn formula_statistics(&self) -> &FormulaStatistics {
        self.index.statistics()
    }

    pub fn oracle(&self) -> &ConstraintOracle<B> {
        &self.oracle
    }

    pub fn store(&self) -> &SampleStore<W> {
        &self.store
    }

    pub fn timers(&self) -> &StatsRegistry {
        &self.stats
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }
}
