//! Formula view and variable discovery
//!
//! The formula itself is owned by the oracle backend. The sampler only sees
//! it through [`Node`] views: which declaration a node applies and which
//! children it has. Everything else about the AST stays opaque.

pub mod index;

pub use index::{FormulaIndex, FormulaStatistics};

use std::fmt;
use std::hash::Hash;

/// Sort of a term as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    BitVec(u32),
    Int,
    Real,
    Array { domain: Box<Sort>, range: Box<Sort> },
    /// Anything the sampler cannot enumerate (strings, floats, datatypes, ...)
    Unsupported(String),
}

impl Sort {
    pub fn array(domain: Sort, range: Sort) -> Self {
        Sort::Array {
            domain: Box::new(domain),
            range: Box::new(range),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Sort::Array { .. })
    }

    /// Number of bits a value of this sort contributes to the bit count
    pub fn bits(&self) -> u32 {
        match self {
            Sort::Bool => 1,
            Sort::BitVec(width) => *width,
            _ => 0,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Bool => write!(f, "Bool"),
            Sort::BitVec(width) => write!(f, "(_ BitVec {})", width),
            Sort::Int => write!(f, "Int"),
            Sort::Real => write!(f, "Real"),
            Sort::Array { domain, range } => write!(f, "(Array {} {})", domain, range),
            Sort::Unsupported(name) => write!(f, "{}", name),
        }
    }
}

/// Sort category of a discovered variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKind {
    Boolean,
    BitVector(u32),
    Integer,
    Real,
    Array,
    UninterpretedFunction(usize),
}

impl fmt::Display for SortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKind::Boolean => write!(f, "bool"),
            SortKind::BitVector(width) => write!(f, "bv{}", width),
            SortKind::Integer => write!(f, "int"),
            SortKind::Real => write!(f, "real"),
            SortKind::Array => write!(f, "array"),
            SortKind::UninterpretedFunction(arity) => write!(f, "uf/{}", arity),
        }
    }
}

/// A free symbol of the formula, fixed once discovered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    /// Declaration name, unique within the formula
    pub name: String,
    pub kind: SortKind,
    /// Range sort: the sort of the constant, the element sort of an array
    /// or the result sort of a function
    pub range: Sort,
    /// Position in discovery order
    pub index: usize,
}

impl Variable {
    /// Whether the variable takes a single scalar value (bool, bv, int, real)
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self.kind,
            SortKind::Array | SortKind::UninterpretedFunction(_)
        )
    }
}

/// How a declaration is interpreted by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclClass {
    /// User-declared symbol: a constant or an uninterpreted function
    Uninterpreted,
    /// Literal value: `true`, `false`, numerals
    Literal,
    /// Built-in operator (`and`, `bvadd`, `select`, ...)
    Builtin,
}

/// Declaration applied at a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decl {
    pub name: String,
    pub arity: usize,
    pub class: DeclClass,
    /// Sort of the application's result
    pub range: Sort,
}

impl Decl {
    pub fn new(name: impl Into<String>, arity: usize, class: DeclClass, range: Sort) -> Self {
        Self {
            name: name.into(),
            arity,
            class,
            range,
        }
    }
}

/// Backend view of one AST node
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// `None` for nodes that are not applications, such as quantifiers or
    /// bound variables. [`index::FormulaIndex`] rejects these.
    pub decl: Option<Decl>,
    pub children: Vec<T>,
}

/// Read-only access to a formula DAG
pub trait FormulaView {
    /// Handle to one AST node. Equality must be node identity: two handles
    /// compare equal only if they refer to the same node.
    type Term: Clone + Eq + Hash;

    /// The hard constraint being sampled
    fn root(&self) -> Self::Term;

    /// Declaration and children of a node
    fn node(&self, term: &Self::Term) -> Node<Self::Term>;
}
