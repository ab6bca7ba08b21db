//! smtsampler: diverse satisfying assignments for SMT formulas
//!
//! Sampling proceeds in epochs. Each epoch asks a MAX-SMT oracle for the
//! model closest to a fresh random assignment, encodes that model
//! canonically and keeps it if it has not been seen before:
//! - [`formula`]: one-pass variable discovery over the formula DAG
//! - [`oracle`]: MAX-SMT solving with a plain SMT fallback
//! - [`sampling`]: random targets, the epoch loop and run limits
//! - [`model`]: backend-independent models and their canonical encoding
//! - [`store`]: deduplicated results file
//! - [`stats`]: per-phase wall-clock timers

pub mod error;
pub mod formula;
pub mod model;
pub mod oracle;
pub mod sampling;
pub mod stats;
pub mod store;

pub use error::{Result, SamplerError};
pub use sampling::{RunReport, Sampler, SamplerConfig, StopReason};
