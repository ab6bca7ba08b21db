//! Constraint oracle: MAX-SMT first, plain SMT as fallback
//!
//! The solver is a black box behind the [`Backend`] trait. A backend owns
//! the hard formula twice: once in an optimizing (MAX-SMT) context that
//! also carries the soft random targets, and once in a plain context that
//! never sees them. [`ConstraintOracle::solve`] asks the optimizer first and
//! only falls back to the plain context when the optimizer cannot decide.

pub mod scripted;
#[cfg(feature = "z3")]
pub mod z3_backend;

pub use scripted::{Answer, ScriptedBackend, TermId};

use crate::error::Result;
use crate::formula::{FormulaView, Variable};
use crate::model::Model;
use num_bigint::{BigInt, BigUint, Sign};
use std::fmt;

/// One random target, asserted with unit weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftConstraint {
    /// `var` (value true) or `(not var)`
    Bool { var: String, value: bool },
    /// Single-bit extraction `((_ extract i i) var)` equals 1 (value true) or 0
    Bit {
        var: String,
        width: u32,
        index: u32,
        value: bool,
    },
    /// `var` equals a `width`-bit numeral
    BitVec {
        var: String,
        width: u32,
        value: BigUint,
    },
    /// `var` equals an integer
    Int { var: String, value: BigInt },
}

impl SoftConstraint {
    /// Name of the targeted variable
    pub fn var(&self) -> &str {
        match self {
            SoftConstraint::Bool { var, .. }
            | SoftConstraint::Bit { var, .. }
            | SoftConstraint::BitVec { var, .. }
            | SoftConstraint::Int { var, .. } => var,
        }
    }
}

impl fmt::Display for SoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoftConstraint::Bool { var, value: true } => write!(f, "{}", var),
            SoftConstraint::Bool { var, value: false } => write!(f, "(not {})", var),
            SoftConstraint::Bit {
                var, index, value, ..
            } => write!(
                f,
                "(= ((_ extract {} {}) {}) #b{})",
                index,
                index,
                var,
                u8::from(*value)
            ),
            SoftConstraint::BitVec { var, width, value } => {
                write!(f, "(= {} (_ bv{} {}))", var, value, width)
            }
            SoftConstraint::Int { var, value } if value.sign() == Sign::Minus => {
                write!(f, "(= {} (- {}))", var, value.magnitude())
            }
            SoftConstraint::Int { var, value } => write!(f, "(= {} {})", var, value),
        }
    }
}

/// Outcome of one oracle query
#[derive(Debug, Clone, PartialEq)]
pub enum Solution {
    Sat(Model),
    Unsat,
    Unknown,
}

impl Solution {
    pub fn is_sat(&self) -> bool {
        matches!(self, Solution::Sat(_))
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Solution::Sat(_) => write!(f, "sat"),
            Solution::Unsat => write!(f, "unsat"),
            Solution::Unknown => write!(f, "unknown"),
        }
    }
}

/// External solver pair holding the hard formula
///
/// Errors returned by the check methods are solver faults; the oracle does
/// not retry after one.
pub trait Backend: FormulaView {
    /// Open a scope on the optimizing context
    fn push(&mut self);

    /// Close the innermost scope, discarding the soft constraints asserted in it
    fn pop(&mut self);

    /// Number of open scopes on the optimizing context
    fn scope_depth(&self) -> usize;

    /// Add a unit-weight soft constraint to the optimizing context
    fn assert_soft(&mut self, constraint: &SoftConstraint) -> Result<()>;

    /// MAX-SMT check: hard formula plus all soft constraints in scope
    fn check_guided(&mut self, variables: &[Variable]) -> Result<Solution>;

    /// Plain satisfiability check of the hard formula alone
    fn check_plain(&mut self, variables: &[Variable]) -> Result<Solution>;
}

/// Counters for oracle activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStatistics {
    /// MAX-SMT queries issued
    pub guided_checks: u64,
    /// Plain queries issued after the optimizer returned unknown
    pub fallbacks: u64,
    pub sat: u64,
    pub unsat: u64,
    pub unknown: u64,
}

/// Single `solve()` entry point over a [`Backend`]
#[derive(Debug)]
pub struct ConstraintOracle<B: Backend> {
    backend: B,
    statistics: OracleStatistics,
}

impl<B: Backend> ConstraintOracle<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            statistics: OracleStatistics::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn statistics(&self) -> OracleStatistics {
        self.statistics
    }

    pub fn push(&mut self) {
        self.backend.push();
    }

    pub fn pop(&mut self) {
        self.backend.pop();
    }

    pub fn scope_depth(&self) -> usize {
        self.backend.scope_depth()
    }

    pub fn assert_soft(&mut self, constraint: &SoftConstraint) -> Result<()> {
        self.backend.assert_soft(constraint)
    }

    /// Solve the hard formula as close to the current soft targets as the
    /// optimizer manages
    ///
    /// If the MAX-SMT attempt is undecided the soft targets are dropped and
    /// the plain formula is solved instead. A fault from either attempt is
    /// returned as is.
    pub fn solve(&mut self, variables: &[Variable]) -> Result<Solution> {
        self.statistics.guided_checks += 1;
        let mut result = self.backend.check_guided(variables)?;

        if result == Solution::Unknown {
            log::warn!("MAX-SMT timed out, solving without soft constraints");
            self.statistics.fallbacks += 1;
            result = self.backend.check_plain(variables)?;
            log::info!("SMT result: {}", result);
        }

        match result {
            Solution::Sat(_) => self.statistics.sat += 1,
            Solution::Unsat => self.statistics.unsat += 1,
            Solution::Unknown => self.statistics.unknown += 1,
        }
        Ok(result)
    }
}
