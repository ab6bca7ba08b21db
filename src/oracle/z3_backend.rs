//! Z3 oracle backend
//!
//! The hard formula is asserted twice: into an `Optimize` context that also
//! receives the soft random targets, and into a plain `Solver` used only as
//! the fallback. Both share the same per-check timeout.

use crate::error::{Result, SamplerError};
use crate::formula::{Decl, DeclClass, FormulaView, Node, Sort, SortKind, Variable};
use crate::model::{ArrayInterpretation, FunctionTable, Model, Scalar, Value};
use crate::oracle::{Backend, SoftConstraint, Solution};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use z3::ast::{Ast, Bool, Dynamic, Int, BV};
use z3::{DeclKind, FuncDecl, Optimize, Params, SatResult, Solver};

/// Backend over an SMT-LIB2 formula loaded into Z3
pub struct Z3Backend {
    optimizer: Optimize,
    solver: Solver,
    root: Dynamic,
    /// Zero-arity symbols seen while viewing the formula, by name
    constants: RefCell<HashMap<String, Dynamic>>,
    /// Uninterpreted function declarations seen while viewing the formula
    functions: RefCell<HashMap<String, FuncDecl>>,
    depth: usize,
}

impl Z3Backend {
    /// Parse `path` and set up both solving contexts with `timeout` per check
    pub fn from_file(path: &Path, timeout: Duration) -> Result<Self> {
        log::info!("Parsing input file: {}", path.display());
        let source = fs::read_to_string(path).map_err(|e| SamplerError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        z3::set_global_param("rewriter.expand_select_store", "true");
        z3::set_global_param("model_evaluator.array_as_stores", "true");

        let parser = Solver::new();
        parser.from_string(source);
        let assertions = parser.get_assertions();
        log::debug!("Parsed {} assertions", assertions.len());

        let mut params = Params::new();
        params.set_u32(
            "timeout",
            u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX),
        );

        let optimizer = Optimize::new();
        optimizer.set_params(&params);
        let solver = Solver::new();
        solver.set_params(&params);

        for assertion in &assertions {
            optimizer.assert(assertion);
            solver.assert(assertion);
        }

        let root = match assertions.len() {
            0 => Bool::from_bool(true),
            1 => assertions[0].clone(),
            _ => Bool::and(&assertions.iter().collect::<Vec<_>>()),
        };

        Ok(Self {
            optimizer,
            solver,
            root: Dynamic::from_ast(&root),
            constants: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            depth: 0,
        })
    }

    fn soft_bool(constraint: &SoftConstraint) -> Result<Bool> {
        let soft = match constraint {
            SoftConstraint::Bool { var, value } => {
                let b = Bool::new_const(var.as_str());
                if *value {
                    b
                } else {
                    b.not()
                }
            }
            SoftConstraint::Bit {
                var,
                width,
                index,
                value,
            } => {
                let bit = BV::new_const(var.as_str(), *width).extract(*index, *index);
                bit.eq(&BV::from_u64(u64::from(*value), 1))
            }
            SoftConstraint::BitVec { var, width, value } => {
                let target = BV::from_str(*width, &value.to_str_radix(10))
                    .ok_or_else(|| SamplerError::codec(var, format!("bad numeral {}", value)))?;
                BV::new_const(var.as_str(), *width).eq(&target)
            }
            SoftConstraint::Int { var, value } => {
                let target = Int::from_str(&value.to_string())
                    .ok_or_else(|| SamplerError::codec(var, format!("bad numeral {}", value)))?;
                Int::new_const(var.as_str()).eq(&target)
            }
        };
        Ok(soft)
    }

    fn decode(&self, model: &z3::Model, variables: &[Variable]) -> Result<Model> {
        let constants = self.constants.borrow();
        let functions = self.functions.borrow();
        let mut decoded = Model::new();

        for var in variables {
            match var.kind {
                SortKind::UninterpretedFunction(_) => {
                    let interp = functions
                        .get(&var.name)
                        .and_then(|decl| model.get_func_interp(decl));
                    if let Some(interp) = interp {
                        let mut entries = Vec::new();
                        for entry in interp.get_entries() {
                            let args = entry
                                .get_args()
                                .iter()
                                .map(|arg| scalar_of(&var.name, arg))
                                .collect::<Result<Vec<_>>>()?;
                            entries.push((args, scalar_of(&var.name, &entry.get_value())?));
                        }
                        decoded.insert(
                            var.name.as_str(),
                            Value::Function(FunctionTable {
                                default: scalar_of(&var.name, &interp.get_else())?,
                                entries,
                            }),
                        );
                    }
                }
                SortKind::Array => {
                    if let Some(term) = constants.get(&var.name) {
                        if let Some(value) = model.eval(term, true) {
                            decoded
                                .insert(var.name.as_str(), decode_array(model, &var.name, value)?);
                        }
                    }
                }
                _ => {
                    let value = constants
                        .get(&var.name)
                        .and_then(|term| model.get_const_interp(term));
                    if let Some(value) = value {
                        decoded.insert(var.name.as_str(), scalar_of(&var.name, &value)?);
                    }
                }
            }
        }

        Ok(decoded)
    }

    fn solution(
        &self,
        result: SatResult,
        model: Option<z3::Model>,
        variables: &[Variable],
    ) -> Result<Solution> {
        match result {
            SatResult::Sat => {
                let model = model.ok_or_else(|| {
                    SamplerError::OracleFault("solver reported sat without a model".to_string())
                })?;
                Ok(Solution::Sat(self.decode(&model, variables)?))
            }
            SatResult::Unsat => Ok(Solution::Unsat),
            SatResult::Unknown => Ok(Solution::Unknown),
        }
    }
}

/// Translate a Z3 sort
fn sort_of(sort: &z3::Sort) -> Sort {
    match sort.kind() {
        z3::SortKind::Bool => Sort::Bool,
        z3::SortKind::BV => Sort::BitVec(sort.bv_size().unwrap_or(0)),
        z3::SortKind::Int => Sort::Int,
        z3::SortKind::Real => Sort::Real,
        z3::SortKind::Array => match (sort.array_domain(), sort.array_range()) {
            (Some(domain), Some(range)) => Sort::array(sort_of(&domain), sort_of(&range)),
            _ => Sort::Unsupported(sort.to_string()),
        },
        _ => Sort::Unsupported(sort.to_string()),
    }
}

/// Read a model value of sort Bool, BitVec or Int
fn scalar_of(name: &str, value: &Dynamic) -> Result<Scalar> {
    let sort = sort_of(&value.get_sort());
    let text = value.to_string();
    let scalar = match sort {
        Sort::Bool => value.as_bool().and_then(|b| b.as_bool()).map(Scalar::Bool),
        Sort::BitVec(width) => Scalar::parse_bitvec(&text, width),
        Sort::Int => Scalar::parse_int(&text),
        _ => None,
    };
    scalar.ok_or_else(|| {
        SamplerError::codec(name, format!("cannot read value {} of sort {}", text, sort))
    })
}

/// Unwind `(store ... (store base i1 v1) ... in vn)` where `base` is either
/// `((as const ..) d)` or `(_ as-array f)` for a function `f` in `model`
fn decode_array(model: &z3::Model, name: &str, value: Dynamic) -> Result<Value> {
    let mut newest_first = Vec::new();
    let mut term = value;

    loop {
        let kind = term.safe_decl().map(|decl| decl.kind()).ok();
        let children = term.children();
        match kind {
            Some(DeclKind::STORE) if children.len() == 3 => {
                newest_first.push((
                    scalar_of(name, &children[1])?,
                    scalar_of(name, &children[2])?,
                ));
                term = children[0].clone();
            }
            Some(DeclKind::CONST_ARRAY) if children.len() == 1 => {
                let default = scalar_of(name, &children[0])?;
                newest_first.reverse();
                return Ok(Value::Array(ArrayInterpretation::StoreChain {
                    default,
                    writes: newest_first,
                }));
            }
            Some(DeclKind::AS_ARRAY) => {
                let (default, entries) = as_array_table(model, name, &term)?;
                newest_first.extend(entries);
                return Ok(Value::Array(ArrayInterpretation::Table {
                    default,
                    entries: newest_first,
                }));
            }
            _ => {
                return Err(SamplerError::codec(
                    name,
                    format!("unsupported array interpretation {}", term),
                ));
            }
        }
    }
}

/// Name of the function behind `(_ as-array f)`
fn as_array_function(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("(_ as-array")?.strip_suffix(')')?;
    let name = inner.trim();
    let name = name
        .strip_prefix('|')
        .and_then(|n| n.strip_suffix('|'))
        .unwrap_or(name);
    (!name.is_empty()).then_some(name)
}

/// Finite table of the unary function an `as-array` term refers to
fn as_array_table(
    model: &z3::Model,
    name: &str,
    term: &Dynamic,
) -> Result<(Scalar, Vec<(Scalar, Scalar)>)> {
    let text = term.to_string();
    let interp = as_array_function(&text)
        .and_then(|function| model.iter().find(|decl| decl.name() == function))
        .and_then(|decl| model.get_func_interp(&decl))
        .ok_or_else(|| {
            SamplerError::codec(name, format!("no interpretation for array {}", text))
        })?;

    let mut entries = Vec::new();
    for entry in interp.get_entries() {
        let args = entry.get_args();
        if args.len() != 1 {
            return Err(SamplerError::codec(
                name,
                format!("array table entry with {} indices", args.len()),
            ));
        }
        entries.push((scalar_of(name, &args[0])?, scalar_of(name, &entry.get_value())?));
    }
    Ok((scalar_of(name, &interp.get_else())?, entries))
}

impl FormulaView for Z3Backend {
    type Term = Dynamic;

    fn root(&self) -> Dynamic {
        self.root.clone()
    }

    fn node(&self, term: &Dynamic) -> Node<Dynamic> {
        let decl = match term.safe_decl() {
            Ok(decl) => decl,
            Err(_) => {
                return Node {
                    decl: None,
                    children: Vec::new(),
                };
            }
        };

        let class = match decl.kind() {
            DeclKind::UNINTERPRETED => DeclClass::Uninterpreted,
            DeclKind::TRUE | DeclKind::FALSE | DeclKind::BNUM | DeclKind::ANUM => {
                DeclClass::Literal
            }
            _ => DeclClass::Builtin,
        };
        let name = decl.name();
        let arity = decl.arity();

        if class == DeclClass::Uninterpreted {
            if arity == 0 {
                self.constants
                    .borrow_mut()
                    .entry(name.clone())
                    .or_insert_with(|| term.clone());
            } else {
                self.functions
                    .borrow_mut()
                    .entry(name.clone())
                    .or_insert_with(|| decl.clone());
            }
        }

        Node {
            decl: Some(Decl::new(name, arity, class, sort_of(&term.get_sort()))),
            children: term.children(),
        }
    }
}

impl Backend for Z3Backend {
    fn push(&mut self) {
        self.optimizer.push();
        self.depth += 1;
    }

    fn pop(&mut self) {
        if self.depth > 0 {
            self.optimizer.pop();
            self.depth -= 1;
        }
    }

    fn scope_depth(&self) -> usize {
        self.depth
    }

    fn assert_soft(&mut self, constraint: &SoftConstraint) -> Result<()> {
        let soft = Self::soft_bool(constraint)?;
        log::trace!("soft {}", constraint);
        self.optimizer.assert_soft(&soft, 1u64, None);
        Ok(())
    }

    fn check_guided(&mut self, variables: &[Variable]) -> Result<Solution> {
        let result = self.optimizer.check(&[]);
        if result == SatResult::Unknown {
            log::debug!(
                "MAX-SMT unknown: {}",
                self.optimizer.get_reason_unknown().unwrap_or_default()
            );
        }
        self.solution(result, self.optimizer.get_model(), variables)
    }

    fn check_plain(&mut self, variables: &[Variable]) -> Result<Solution> {
        let result = self.solver.check();
        self.solution(result, self.solver.get_model(), variables)
    }
}
