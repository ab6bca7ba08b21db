//! One sampling epoch
//!
//! Each epoch runs the same fixed sequence:
//! 1. PUSH a scope on the optimizing oracle
//! 2. GENERATE random soft targets into that scope
//! 3. SOLVE for the nearest satisfying assignment
//! 4. POP the scope, so targets never leak into later epochs
//! 5. RECORD the model as one sample, then let the neighbourhood search
//!    add nearby samples within the per-epoch budget

use crate::error::{Result, SamplerError};
use crate::formula::Variable;
use crate::model::{encode, Model};
use crate::oracle::{Backend, ConstraintOracle, Solution};
use crate::sampling::random::RandomAssignmentGenerator;
use crate::stats::StatsRegistry;
use crate::store::SampleStore;
use std::io::Write;
use std::time::{Duration, Instant};

/// What an epoch produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EpochOutcome {
    /// The epoch model was encoded and offered to the store
    Recorded {
        sample: String,
        /// Whether the sample was not seen before
        is_new: bool,
    },
    /// Neither oracle attempt decided the formula; nothing was recorded
    NoModel,
}

/// Summary of one completed epoch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochReport {
    pub outcome: EpochOutcome,
    /// Samples offered to the store this epoch, primary sample included
    pub samples: u64,
    pub elapsed: Duration,
}

/// Everything a [`NeighborhoodSearch`] may use while extending one epoch
pub struct ExtensionContext<'a, W: Write> {
    variables: &'a [Variable],
    store: &'a mut SampleStore<W>,
    stats: &'a mut StatsRegistry,
    started: Instant,
    max_samples: Option<u64>,
    max_time: Option<Duration>,
    recorded: u64,
}

impl<'a, W: Write> ExtensionContext<'a, W> {
    pub fn variables(&self) -> &[Variable] {
        self.variables
    }

    pub fn stats(&mut self) -> &mut StatsRegistry {
        &mut *self.stats
    }

    /// Samples offered to the store this epoch so far
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Whether the per-epoch sample or time budget is used up
    pub fn is_exhausted(&self) -> bool {
        let samples_done = self.max_samples.is_some_and(|max| self.recorded >= max);
        let time_done = self
            .max_time
            .is_some_and(|max| self.started.elapsed() >= max);
        samples_done || time_done
    }

    /// Encode `model` and offer it to the store through the usual dedup
    /// path. Returns whether it was new.
    pub fn record(&mut self, model: &Model) -> Result<bool> {
        let sample = encode(model, self.variables)?;
        let is_new = self.store.insert(sample)?;
        self.recorded += 1;
        Ok(is_new)
    }
}

/// Extension point run after each epoch's primary sample
///
/// An implementation may query the oracle for assignments near `seed` and
/// record them through `ctx`, stopping once [`ExtensionContext::is_exhausted`]
/// says so. Scopes it opens on the oracle must be closed before returning.
pub trait NeighborhoodSearch<B: Backend, W: Write> {
    fn extend(
        &mut self,
        oracle: &mut ConstraintOracle<B>,
        seed: &Model,
        ctx: &mut ExtensionContext<'_, W>,
    ) -> Result<()>;
}

/// Neighbourhood search that adds nothing beyond the epoch model
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepSeedOnly;

impl<B: Backend, W: Write> NeighborhoodSearch<B, W> for KeepSeedOnly {
    fn extend(
        &mut self,
        _oracle: &mut ConstraintOracle<B>,
        _seed: &Model,
        _ctx: &mut ExtensionContext<'_, W>,
    ) -> Result<()> {
        log::trace!("Epoch: keeping only original model");
        Ok(())
    }
}

/// Drives epochs and owns the run-wide counters
#[derive(Debug)]
pub struct EpochController {
    generator: RandomAssignmentGenerator,
    max_epoch_samples: Option<u64>,
    max_epoch_time: Option<Duration>,
    epochs: u64,
    total_samples: u64,
    valid_samples: u64,
}

impl EpochController {
    pub fn new(
        generator: RandomAssignmentGenerator,
        max_epoch_samples: Option<u64>,
        max_epoch_time: Option<Duration>,
    ) -> Self {
        Self {
            generator,
            max_epoch_samples,
            max_epoch_time,
            epochs: 0,
            total_samples: 0,
            valid_samples: 0,
        }
    }

    pub fn epochs(&self) -> u64 {
        self.epochs
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }

    pub fn valid_samples(&self) -> u64 {
        self.valid_samples
    }

    /// Run one epoch.
    ///
    /// An Unsat answer is an invariant violation: the formula was shown
    /// satisfiable before the first epoch. The scope opened by the epoch is
    /// left open on that path and on any other error.
    pub fn run_epoch<B: Backend, W: Write>(
        &mut self,
        oracle: &mut ConstraintOracle<B>,
        variables: &[Variable],
        store: &mut SampleStore<W>,
        stats: &mut StatsRegistry,
        neighborhood: &mut dyn NeighborhoodSearch<B, W>,
    ) -> Result<EpochReport> {
        let started = Instant::now();
        log::debug!("Starting epoch {}", self.epochs + 1);
        stats.start("epoch");

        oracle.push();

        stats.start("random_assignment");
        self.generator.generate(oracle, variables)?;
        stats.stop("random_assignment")?;

        stats.start("solving");
        let solution = oracle.solve(variables)?;
        stats.stop("solving")?;

        if solution == Solution::Unsat {
            return Err(SamplerError::InvariantViolation(
                "MAX-SMT returned unsat for a formula already shown satisfiable".to_string(),
            ));
        }

        oracle.pop();

        self.epochs += 1;
        self.total_samples += 1;

        let model = match solution {
            Solution::Sat(model) => model,
            _ => {
                log::warn!("Epoch {} produced no model", self.epochs);
                stats.stop("epoch")?;
                return Ok(EpochReport {
                    outcome: EpochOutcome::NoModel,
                    samples: 0,
                    elapsed: started.elapsed(),
                });
            }
        };
        self.valid_samples += 1;

        stats.start("model_encoding");
        let sample = encode(&model, variables)?;
        stats.stop("model_encoding")?;
        let is_new = store.insert(sample.clone())?;

        let mut ctx = ExtensionContext {
            variables,
            store: &mut *store,
            stats: &mut *stats,
            started,
            max_samples: self.max_epoch_samples,
            max_time: self.max_epoch_time,
            recorded: 1,
        };
        if !ctx.is_exhausted() {
            ctx.stats.start("neighborhood");
            neighborhood.extend(oracle, &model, &mut ctx)?;
            ctx.stats.stop("neighborhood")?;
        }
        let samples = ctx.recorded;

        // extension samples are attempts that produced a model
        self.total_samples += samples - 1;
        self.valid_samples += samples - 1;

        stats.stop("epoch")?;
        Ok(EpochReport {
            outcome: EpochOutcome::Recorded { sample, is_new },
            samples,
            elapsed: started.elapsed(),
        })
    }
}
