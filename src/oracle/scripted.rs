//! Replay backend
//!
//! [`ScriptedBackend`] stands in for a real solver: the formula is built by
//! hand in a small term arena, and every check returns the next scripted
//! [`Answer`] (or whatever a responder closure computes from the soft
//! constraints in scope). It never decides anything itself, which makes the
//! sampling loop observable step by step.

use crate::error::{Result, SamplerError};
use crate::formula::{Decl, DeclClass, FormulaView, Node, Sort, Variable};
use crate::model::Model;
use crate::oracle::{Backend, SoftConstraint, Solution};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// Identity of a node in the scripted formula arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(usize);

/// Scripted reply to one check
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Sat(Model),
    Unsat,
    Unknown,
    /// Simulated solver exception
    Fault(String),
}

type ResponderFn = Box<dyn FnMut(&[SoftConstraint]) -> Answer>;

enum Responder {
    /// Replay answers in order; the last one repeats once the queue is empty
    Queue {
        pending: VecDeque<Answer>,
        last: Answer,
    },
    Computed(ResponderFn),
}

impl Responder {
    fn new() -> Self {
        Responder::Queue {
            pending: VecDeque::new(),
            last: Answer::Unknown,
        }
    }

    fn enqueue(&mut self, answer: Answer) {
        match self {
            Responder::Queue { pending, .. } => pending.push_back(answer),
            Responder::Computed(_) => {
                *self = Responder::Queue {
                    pending: VecDeque::from([answer]),
                    last: Answer::Unknown,
                }
            }
        }
    }

    fn respond(&mut self, soft: &[SoftConstraint]) -> Answer {
        match self {
            Responder::Queue { pending, last } => {
                if let Some(next) = pending.pop_front() {
                    *last = next;
                }
                last.clone()
            }
            Responder::Computed(f) => f(soft),
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedTerm {
    decl: Option<Decl>,
    children: Vec<TermId>,
}

/// Backend replaying predetermined answers over a hand-built formula
pub struct ScriptedBackend {
    terms: Vec<ScriptedTerm>,
    root: Option<TermId>,
    visits: RefCell<Vec<usize>>,
    /// Soft constraints per open scope; index 0 is the base level
    scopes: Vec<Vec<SoftConstraint>>,
    guided: Responder,
    plain: Responder,
    guided_checks: usize,
    plain_checks: usize,
    soft_history: Vec<SoftConstraint>,
}

impl fmt::Debug for ScriptedBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedBackend")
            .field("terms", &self.terms.len())
            .field("scope_depth", &self.scope_depth())
            .field("guided_checks", &self.guided_checks)
            .field("plain_checks", &self.plain_checks)
            .finish_non_exhaustive()
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackend {
    /// Empty formula whose root is the literal `true`
    pub fn new() -> Self {
        let mut backend = Self {
            terms: Vec::new(),
            root: None,
            visits: RefCell::new(Vec::new()),
            scopes: vec![Vec::new()],
            guided: Responder::new(),
            plain: Responder::new(),
            guided_checks: 0,
            plain_checks: 0,
            soft_history: Vec::new(),
        };
        let top = backend.literal("true", Sort::Bool);
        backend.root = Some(top);
        backend
    }

    fn add(&mut self, decl: Option<Decl>, children: Vec<TermId>) -> TermId {
        let id = TermId(self.terms.len());
        self.terms.push(ScriptedTerm { decl, children });
        self.visits.borrow_mut().push(0);
        id
    }

    /// Declare a fresh constant (zero-arity uninterpreted symbol)
    pub fn constant(&mut self, name: &str, sort: Sort) -> TermId {
        self.add(
            Some(Decl::new(name, 0, DeclClass::Uninterpreted, sort)),
            Vec::new(),
        )
    }

    /// A literal such as `true` or a numeral
    pub fn literal(&mut self, name: &str, sort: Sort) -> TermId {
        self.add(Some(Decl::new(name, 0, DeclClass::Literal, sort)), Vec::new())
    }

    /// Application of a built-in operator
    pub fn apply(&mut self, op: &str, sort: Sort, args: &[TermId]) -> TermId {
        self.add(
            Some(Decl::new(op, args.len(), DeclClass::Builtin, sort)),
            args.to_vec(),
        )
    }

    /// Application of an uninterpreted function
    pub fn apply_uninterpreted(&mut self, name: &str, range: Sort, args: &[TermId]) -> TermId {
        self.add(
            Some(Decl::new(name, args.len(), DeclClass::Uninterpreted, range)),
            args.to_vec(),
        )
    }

    /// A node that is not an application, e.g. a quantifier
    pub fn opaque(&mut self, args: &[TermId]) -> TermId {
        self.add(None, args.to_vec())
    }

    /// Use `term` as the hard formula
    pub fn set_root(&mut self, term: TermId) {
        self.root = Some(term);
    }

    pub fn answer_guided(&mut self, answer: Answer) {
        self.guided.enqueue(answer);
    }

    pub fn answer_plain(&mut self, answer: Answer) {
        self.plain.enqueue(answer);
    }

    /// Compute every guided answer from the soft constraints in scope
    pub fn respond_guided_with(&mut self, f: impl FnMut(&[SoftConstraint]) -> Answer + 'static) {
        self.guided = Responder::Computed(Box::new(f));
    }

    /// Number of times [`FormulaView::node`] was asked about `term`
    pub fn visits(&self, term: TermId) -> usize {
        self.visits.borrow()[term.0]
    }

    pub fn guided_checks(&self) -> usize {
        self.guided_checks
    }

    pub fn plain_checks(&self) -> usize {
        self.plain_checks
    }

    /// Soft constraints currently in scope
    pub fn active_soft_constraints(&self) -> Vec<SoftConstraint> {
        self.scopes.iter().flatten().cloned().collect()
    }

    /// Every soft constraint ever asserted, in order
    pub fn soft_history(&self) -> &[SoftConstraint] {
        &self.soft_history
    }

    fn into_solution(answer: Answer) -> Result<Solution> {
        match answer {
            Answer::Sat(model) => Ok(Solution::Sat(model)),
            Answer::Unsat => Ok(Solution::Unsat),
            Answer::Unknown => Ok(Solution::Unknown),
            Answer::Fault(reason) => Err(SamplerError::OracleFault(reason)),
        }
    }
}

impl FormulaView for ScriptedBackend {
    type Term = TermId;

    fn root(&self) -> TermId {
        self.root.unwrap_or(TermId(0))
    }

    fn node(&self, term: &TermId) -> Node<TermId> {
        self.visits.borrow_mut()[term.0] += 1;
        let t = &self.terms[term.0];
        Node {
            decl: t.decl.clone(),
            children: t.children.clone(),
        }
    }
}

impl Backend for ScriptedBackend {
    fn push(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn pop(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    fn scope_depth(&self) -> usize {
        self.scopes.len() - 1
    }

    fn assert_soft(&mut self, constraint: &SoftConstraint) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(constraint.clone());
        }
        self.soft_history.push(constraint.clone());
        Ok(())
    }

    fn check_guided(&mut self, _variables: &[Variable]) -> Result<Solution> {
        self.guided_checks += 1;
        let soft = self.active_soft_constraints();
        Self::into_solution(self.guided.respond(&soft))
    }

    fn check_plain(&mut self, _variables: &[Variable]) -> Result<Solution> {
        self.plain_checks += 1;
        Self::into_solution(self.plain.respond(&[]))
    }
}
