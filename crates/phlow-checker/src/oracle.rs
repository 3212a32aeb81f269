//! The narrowing seam.
//!
//! The checker never reasons about types directly; every narrowing step
//! goes through [`TypeOracle`]. The default implementation delegates to
//! `phlow-solver`, and tests substitute their own to pin down merge
//! behavior independently of the solver.

use rustc_hash::FxHashMap;

use phlow_ast::Expr;
use phlow_common::{CheckResult, DiagnosticSink, VarId};
use phlow_solver::{Assertion, AssertionMap, Atomic, Union};

use crate::context::SourceContext;

pub trait TypeOracle {
    /// Facts established by `cond` when it evaluates truthy.
    fn assertions_for(&self, cond: &Expr, is_negatable: bool, ctx: &SourceContext)
        -> AssertionMap;

    fn negate(&self, assertions: &AssertionMap) -> AssertionMap;

    /// Applies assertions to a snapshot of bound types; failures are
    /// reported to `sink` and may abort.
    fn reconcile(
        &self,
        assertions: &AssertionMap,
        bound: &FxHashMap<VarId, Union>,
        file: &str,
        line: u32,
        sink: &dyn DiagnosticSink,
    ) -> CheckResult<FxHashMap<VarId, Union>>;

    fn combine(&self, a: &Union, b: &Union) -> Union;

    /// Whether a union part is outright refuted by an assertion.
    fn is_negation_of(&self, part: &Atomic, assertion: &Assertion) -> bool;
}

/// [`TypeOracle`] backed by `phlow-solver`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolverOracle;

impl TypeOracle for SolverOracle {
    fn assertions_for(
        &self,
        cond: &Expr,
        is_negatable: bool,
        ctx: &SourceContext,
    ) -> AssertionMap {
        phlow_solver::assertions_for(cond, is_negatable, &ctx.assertion_context())
    }

    fn negate(&self, assertions: &AssertionMap) -> AssertionMap {
        phlow_solver::negate_assertions(assertions)
    }

    fn reconcile(
        &self,
        assertions: &AssertionMap,
        bound: &FxHashMap<VarId, Union>,
        file: &str,
        line: u32,
        sink: &dyn DiagnosticSink,
    ) -> CheckResult<FxHashMap<VarId, Union>> {
        phlow_solver::reconcile_keyed_types(assertions, bound, file, line, sink)
    }

    fn combine(&self, a: &Union, b: &Union) -> Union {
        a.combine(b)
    }

    fn is_negation_of(&self, part: &Atomic, assertion: &Assertion) -> bool {
        phlow_solver::is_negation_of(part, assertion)
    }
}
