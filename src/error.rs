//! Error types shared by every sampling phase

use std::io;
use std::path::PathBuf;

/// Fatal sampler errors
///
/// Every variant ends the run: the sampler reports the solving statistics
/// and flushes the results file before handing the error back.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    /// The formula file could not be read or parsed
    #[error("Could not read input formula {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A variable (or random target) has a sort the sampler does not handle
    #[error("Invalid sort for '{name}': {sort}")]
    InvalidSort { name: String, sort: String },

    /// The formula contains a node that is not an application, such as a
    /// quantifier or bound variable
    #[error("Unsupported term in formula at depth {depth}: quantifiers and bound variables are not supported")]
    UnsupportedTerm { depth: usize },

    /// The selected strategy is recognised but not implemented
    #[error("Unsupported strategy: {0}")]
    UnsupportedStrategy(String),

    /// The oracle raised an internal exception; its state is no longer trusted
    #[error("Oracle fault: {0}")]
    OracleFault(String),

    /// The guided solve disagreed with an earlier satisfiability result
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// A timer category was stopped without being started
    #[error("Cannot stop timer for category '{0}': timer was never started")]
    TimerNotStarted(String),

    /// A model value does not fit the variable it is recorded for
    #[error("Cannot encode '{name}': {reason}")]
    Codec { name: String, reason: String },

    /// Writing the results file failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SamplerError {
    pub fn invalid_sort(name: impl Into<String>, sort: impl ToString) -> Self {
        SamplerError::InvalidSort {
            name: name.into(),
            sort: sort.to_string(),
        }
    }

    pub fn codec(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SamplerError::Codec {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = SamplerError> = std::result::Result<T, E>;
