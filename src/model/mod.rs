//! Backend-independent models
//!
//! A [`Model`] is what one oracle call hands back: a value for every
//! variable the backend could decode. Scalars are kept as exact integers so
//! that bit-vectors of any width survive without truncation.

pub mod codec;

pub use codec::encode;

use crate::formula::Sort;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use std::collections::{BTreeMap, HashSet};

/// A single value of sort Bool, BitVec or Int
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Bool(bool),
    BitVec { width: u32, value: BigUint },
    Int(BigInt),
}

impl Scalar {
    pub fn bitvec(width: u32, value: impl Into<BigUint>) -> Self {
        Scalar::BitVec {
            width,
            value: value.into(),
        }
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Scalar::Int(value.into())
    }

    /// Value used for a variable the model leaves unassigned
    pub fn default_for(sort: &Sort) -> Option<Self> {
        match sort {
            Sort::Bool => Some(Scalar::Bool(false)),
            Sort::BitVec(width) => Some(Scalar::bitvec(*width, BigUint::zero())),
            Sort::Int => Some(Scalar::Int(BigInt::zero())),
            _ => None,
        }
    }

    /// Parse a bit-vector numeral as printed by SMT-LIB backends:
    /// `#b0110`, `#x1f` or `(_ bv6 4)`.
    pub fn parse_bitvec(text: &str, width: u32) -> Option<Self> {
        let text = text.trim();
        let value = if let Some(bits) = text.strip_prefix("#b") {
            BigUint::parse_bytes(bits.as_bytes(), 2)?
        } else if let Some(hex) = text.strip_prefix("#x") {
            BigUint::parse_bytes(hex.as_bytes(), 16)?
        } else if let Some(rest) = text.strip_prefix("(_ bv") {
            let digits = rest.split_whitespace().next()?;
            BigUint::parse_bytes(digits.as_bytes(), 10)?
        } else {
            BigUint::parse_bytes(text.as_bytes(), 10)?
        };
        if value.bits() > u64::from(width) {
            return None;
        }
        Some(Scalar::BitVec { width, value })
    }

    /// Parse an integer numeral: `42`, `-42` or `(- 42)`.
    pub fn parse_int(text: &str) -> Option<Self> {
        let text = text.trim();
        let value = if let Some(inner) = text.strip_prefix("(-").and_then(|t| t.strip_suffix(')')) {
            -BigInt::parse_bytes(inner.trim().as_bytes(), 10)?
        } else {
            BigInt::parse_bytes(text.as_bytes(), 10)?
        };
        Some(Scalar::Int(value))
    }
}

/// Canonical array interpretation: entries most recent write first, each
/// index at most once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiniteArray {
    pub default: Scalar,
    pub entries: Vec<(Scalar, Scalar)>,
}

/// Array value in the shape the oracle produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayInterpretation {
    /// Nested stores over a constant array. `writes` is in application
    /// order: the innermost store first, the latest write last.
    StoreChain {
        default: Scalar,
        writes: Vec<(Scalar, Scalar)>,
    },
    /// Explicit finite function, entries listed most recent first
    Table {
        default: Scalar,
        entries: Vec<(Scalar, Scalar)>,
    },
}

impl ArrayInterpretation {
    /// Bring either representation to the canonical most-recent-first form.
    /// A write shadowed by a later write to the same index is dropped.
    pub fn normalize(&self) -> FiniteArray {
        let (default, newest_first): (&Scalar, Vec<&(Scalar, Scalar)>) = match self {
            ArrayInterpretation::StoreChain { default, writes } => {
                (default, writes.iter().rev().collect())
            }
            ArrayInterpretation::Table { default, entries } => (default, entries.iter().collect()),
        };

        let mut seen = HashSet::new();
        let entries = newest_first
            .into_iter()
            .filter(|(index, _)| seen.insert(index))
            .cloned()
            .collect();

        FiniteArray {
            default: default.clone(),
            entries,
        }
    }
}

/// Finite interpretation of an uninterpreted function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTable {
    pub default: Scalar,
    pub entries: Vec<(Vec<Scalar>, Scalar)>,
}

/// Value of one variable in a model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Scalar(Scalar),
    Array(ArrayInterpretation),
    Function(FunctionTable),
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

/// Valuation produced by one oracle call, keyed by variable name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Model {
    values: BTreeMap<String, Value>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
