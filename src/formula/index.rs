//! One-pass variable discovery over the formula DAG

use crate::error::{Result, SamplerError};
use crate::formula::{DeclClass, FormulaView, Sort, SortKind, Variable};
use std::collections::HashSet;

/// Aggregate counts gathered while indexing a formula
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormulaStatistics {
    pub arrays: u64,
    pub bitvecs: u64,
    pub bools: u64,
    /// Bools count one bit, bit-vectors their width
    pub bits: u64,
    pub functions: u64,
    pub ints: u64,
    pub reals: u64,
    /// Distinct AST nodes visited
    pub nodes: u64,
    /// Longest root-to-node path, root at depth 0
    pub max_depth: usize,
}

impl FormulaStatistics {
    /// Format statistics as a human-readable string
    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        s.push_str("-------------FORMULA STATISTICS-------------\n");
        s.push_str(&format!("Arrays {}\n", self.arrays));
        s.push_str(&format!("Bit-vectors {}\n", self.bitvecs));
        s.push_str(&format!("Bools {}\n", self.bools));
        s.push_str(&format!("Bits {}\n", self.bits));
        s.push_str(&format!("Uninterpreted functions {}\n", self.functions));
        s.push_str(&format!("Ints {}\n", self.ints));
        s.push_str(&format!("Reals {}\n", self.reals));
        s.push_str(&format!("Nodes {}\n", self.nodes));
        s.push_str(&format!("Formula tree depth {}\n", self.max_depth));
        s.push_str("--------------------------------------------\n");
        s
    }
}

/// Ordered variable list and statistics of one formula
#[derive(Debug, Clone, Default)]
pub struct FormulaIndex {
    variables: Vec<Variable>,
    statistics: FormulaStatistics,
}

impl FormulaIndex {
    /// Walk the formula once, depth-first pre-order, children left to right.
    ///
    /// Each distinct node (by handle identity) is expanded at most once, so
    /// shared subterms cost nothing after their first visit. The walk uses
    /// an explicit stack. A node that is not an application (a quantifier
    /// or bound variable) fails the walk with `UnsupportedTerm`.
    pub fn traverse<F: FormulaView>(formula: &F) -> Result<Self> {
        let mut index = FormulaIndex::default();
        let mut visited: HashSet<F::Term> = HashSet::new();
        let mut seen_names: HashSet<String> =
            ["true", "false"].iter().map(|s| s.to_string()).collect();
        let mut stack = vec![(formula.root(), 0usize)];

        while let Some((term, depth)) = stack.pop() {
            if !visited.insert(term.clone()) {
                continue;
            }

            let node = formula.node(&term);
            index.statistics.nodes += 1;
            index.statistics.max_depth = index.statistics.max_depth.max(depth);

            let decl = node.decl.ok_or(SamplerError::UnsupportedTerm { depth })?;
            match decl.class {
                DeclClass::Literal => {
                    seen_names.insert(decl.name);
                }
                DeclClass::Uninterpreted if !seen_names.contains(&decl.name) => {
                    seen_names.insert(decl.name.clone());
                    index.discover(decl.name, decl.arity, decl.range)?;
                }
                _ => {}
            }

            for child in node.children.into_iter().rev() {
                if !visited.contains(&child) {
                    stack.push((child, depth + 1));
                }
            }
        }

        log::debug!(
            "Indexed {} variables over {} nodes",
            index.variables.len(),
            index.statistics.nodes
        );
        Ok(index)
    }

    fn discover(&mut self, name: String, arity: usize, range: Sort) -> Result<()> {
        let stats = &mut self.statistics;
        let (kind, range) = if arity > 0 {
            stats.functions += 1;
            (SortKind::UninterpretedFunction(arity), range)
        } else {
            match range {
                Sort::Bool => {
                    stats.bools += 1;
                    stats.bits += 1;
                    (SortKind::Boolean, Sort::Bool)
                }
                Sort::BitVec(width) => {
                    stats.bitvecs += 1;
                    stats.bits += u64::from(width);
                    (SortKind::BitVector(width), Sort::BitVec(width))
                }
                Sort::Int => {
                    stats.ints += 1;
                    (SortKind::Integer, Sort::Int)
                }
                Sort::Real => {
                    stats.reals += 1;
                    (SortKind::Real, Sort::Real)
                }
                Sort::Array { range: element, .. } => {
                    stats.arrays += 1;
                    (SortKind::Array, *element)
                }
                unsupported @ Sort::Unsupported(_) => {
                    return Err(SamplerError::invalid_sort(name, unsupported));
                }
            }
        };

        let index = self.variables.len();
        self.variables.push(Variable {
            name,
            kind,
            range,
            index,
        });
        Ok(())
    }

    /// Variables in discovery order
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn statistics(&self) -> &FormulaStatistics {
        &self.statistics
    }
}
