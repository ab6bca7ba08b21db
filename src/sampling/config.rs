//! Configuration types for the sampler

use crate::error::{Result, SamplerError};
use std::time::Duration;

/// Sampling strategy selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// MAX-SMT with one soft constraint per bit-vector bit
    #[default]
    SmtBit,
    /// MAX-SMT with one soft equality per bit-vector
    SmtBv,
    /// Propositional sampling after bit-blasting (not available)
    Sat,
}

impl Strategy {
    /// Bit-vector targeting used when none is configured explicitly
    pub fn default_targeting(&self) -> BitVecTargeting {
        match self {
            Strategy::SmtBv => BitVecTargeting::WholeValue,
            Strategy::SmtBit | Strategy::Sat => BitVecTargeting::PerBit,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::SmtBit => write!(f, "smtbit"),
            Strategy::SmtBv => write!(f, "smtbv"),
            Strategy::Sat => write!(f, "sat"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "smtbit" | "smt-bit" | "bit" => Ok(Strategy::SmtBit),
            "smtbv" | "smt-bv" | "bv" => Ok(Strategy::SmtBv),
            "sat" => Ok(Strategy::Sat),
            _ => Err(format!(
                "Unknown strategy: '{}'. Valid options: smtbit, smtbv, sat",
                s
            )),
        }
    }
}

/// How random targets are expressed for bit-vector variables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitVecTargeting {
    /// One soft constraint per bit, so the optimizer can honour a subset
    PerBit,
    /// A single soft equality to a random numeral
    WholeValue,
}

impl std::fmt::Display for BitVecTargeting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitVecTargeting::PerBit => write!(f, "per-bit"),
            BitVecTargeting::WholeValue => write!(f, "whole-value"),
        }
    }
}

impl std::str::FromStr for BitVecTargeting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "per-bit" | "bit" => Ok(BitVecTargeting::PerBit),
            "whole-value" | "whole" | "value" => Ok(BitVecTargeting::WholeValue),
            _ => Err(format!(
                "Unknown bit-vector targeting: '{}'. Valid options: per-bit, whole-value",
                s
            )),
        }
    }
}

/// Main sampler configuration
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Ceiling on total sampling attempts
    pub max_samples: u64,
    /// Ceiling on overall wall-clock time
    pub max_time: Duration,
    /// Ceiling on the number of epochs (None = unlimited)
    pub max_epochs: Option<u64>,
    /// Ceiling on samples a single epoch may contribute
    pub max_epoch_samples: Option<u64>,
    /// Ceiling on wall-clock time of a single epoch
    pub max_epoch_time: Option<Duration>,
    /// Per-attempt oracle timeout
    pub solver_timeout: Duration,
    pub strategy: Strategy,
    /// Explicit bit-vector targeting (None = follow the strategy)
    pub targeting: Option<BitVecTargeting>,
    /// Seed for random number generator (None = random seed)
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_samples: 1_000_000,
            max_time: Duration::from_secs(3600),
            max_epochs: None,
            max_epoch_samples: None,
            max_epoch_time: None,
            solver_timeout: Duration::from_secs(50),
            strategy: Strategy::default(),
            targeting: None,
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn with_max_samples(mut self, samples: u64) -> Self {
        self.max_samples = samples;
        self
    }

    pub fn with_max_time(mut self, time: Duration) -> Self {
        self.max_time = time;
        self
    }

    pub fn with_max_epochs(mut self, epochs: u64) -> Self {
        self.max_epochs = Some(epochs);
        self
    }

    pub fn with_max_epoch_samples(mut self, samples: u64) -> Self {
        self.max_epoch_samples = Some(samples);
        self
    }

    pub fn with_max_epoch_time(mut self, time: Duration) -> Self {
        self.max_epoch_time = Some(time);
        self
    }

    pub fn with_solver_timeout(mut self, timeout: Duration) -> Self {
        self.solver_timeout = timeout;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_targeting(mut self, targeting: BitVecTargeting) -> Self {
        self.targeting = Some(targeting);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_seed_option(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Targeting in effect: the explicit one, else the strategy's default
    pub fn targeting(&self) -> BitVecTargeting {
        self.targeting
            .unwrap_or_else(|| self.strategy.default_targeting())
    }

    /// Reject configurations the sampler cannot run
    pub fn validate(&self) -> Result<()> {
        if self.strategy == Strategy::Sat {
            return Err(SamplerError::UnsupportedStrategy(
                "conversion to SAT is not supported".to_string(),
            ));
        }
        Ok(())
    }
}
