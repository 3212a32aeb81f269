//! Loop bodies and post-body widening.
//!
//! Loops run their body once against a copy of the pre-loop state, then
//! widen: the body may have run zero or many times, so a changed type
//! becomes the union of before and after, and a post-body `mixed`
//! overwrites. There is no fixed-point iteration.

use rustc_hash::FxHashSet;
use tracing::debug;

use phlow_ast::{Expr, Stmt};
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::{Atomic, Union};

use crate::branches::contains_disjunction;
use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    pub(crate) fn check_while(
        &mut self,
        cond: &Expr,
        body: &[Stmt],
        scope: &mut ScopeState,
    ) -> CheckResult {
        let mut loop_scope = scope.clone();
        self.check_expression(cond, &mut loop_scope)?;

        let while_types = self.host.oracle.assertions_for(cond, true, &self.ctx);

        // Same rule as `if`: a disjunction cannot narrow the body entry.
        if !contains_disjunction(cond) {
            loop_scope.bound = self.reconcile_into(&while_types, &loop_scope.bound, cond.line)?;
        }

        let mut escape = FxHashSet::default();
        self.check(body, &mut loop_scope, &mut escape)?;

        self.widen_after_loop(scope, &loop_scope);
        scope.reachable.extend(loop_scope.reachable);
        scope.reachable.extend(escape);
        Ok(())
    }

    /// A `do` body always runs at least once, so it flows straight through
    /// the caller's scope; only the trailing condition runs on a copy.
    pub(crate) fn check_do_while(
        &mut self,
        body: &[Stmt],
        cond: &Expr,
        scope: &mut ScopeState,
    ) -> CheckResult {
        let mut escape = FxHashSet::default();
        self.check(body, scope, &mut escape)?;
        scope.reachable.extend(escape);

        let mut cond_scope = scope.clone();
        self.check_expression(cond, &mut cond_scope)?;
        scope.reachable.extend(cond_scope.reachable);
        Ok(())
    }

    pub(crate) fn check_for(
        &mut self,
        init: &[Expr],
        cond: &[Expr],
        step: &[Expr],
        body: &[Stmt],
        scope: &mut ScopeState,
        _loop_escape: &mut FxHashSet<VarId>,
    ) -> CheckResult {
        let mut loop_scope = scope.clone();

        for expr in init.iter().chain(cond).chain(step) {
            self.check_expression(expr, &mut loop_scope)?;
        }

        let mut escape = FxHashSet::default();
        self.check(body, &mut loop_scope, &mut escape)?;

        self.widen_after_loop(scope, &loop_scope);
        scope.reachable.extend(loop_scope.reachable);
        scope.reachable.extend(escape);
        Ok(())
    }

    pub(crate) fn check_foreach(
        &mut self,
        source: &Expr,
        key_var: Option<&str>,
        value_var: &str,
        body: &[Stmt],
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult {
        self.check_expression(source, scope)?;

        let mut loop_scope = scope.clone();

        if let Some(key) = key_var {
            let id = VarId::new(key);
            loop_scope.bind(id.clone(), Union::mixed());
            scope.mark_reachable(id.clone());
            self.register_variable(id, line);
        }

        let mut value_type = None;
        let source_type = phlow_ast::var_id(source).and_then(|id| scope.type_of(&id).cloned());

        if let Some(source_type) = &source_type {
            for part in &source_type.types {
                match part {
                    Atomic::Mixed | Atomic::Array => {}
                    Atomic::Null => {
                        self.report(
                            IssueKind::NullReference,
                            "Cannot iterate over null".to_owned(),
                            line,
                        )?;
                    }
                    Atomic::String | Atomic::Void | Atomic::Int => {
                        self.report(
                            IssueKind::InvalidIterator,
                            format!("Cannot iterate over {part}"),
                            line,
                        )?;
                    }
                    Atomic::Generic { name, params, .. } if name == "array" => {
                        if let Some(element) = params.last() {
                            value_type = Some(element.clone());
                        }
                    }
                    Atomic::Named(class) => {
                        let traversable = class == "Traversable"
                            || self.host.resolver.is_subclass_of(class, "Traversable")
                            || self.host.resolver.class_implements(class, "Traversable")
                            || Some(class.as_str()) == self.ctx.class_name.as_deref();
                        if !traversable && self.settings.check_classes {
                            self.report(
                                IssueKind::InvalidIterator,
                                format!("Cannot iterate over {class}"),
                                line,
                            )?;
                        }
                    }
                    other => {
                        self.report(
                            IssueKind::InvalidIterator,
                            format!("Cannot iterate over {other}"),
                            line,
                        )?;
                    }
                }
            }
        }

        let value_id = VarId::new(value_var);
        loop_scope.bind(value_id.clone(), value_type.unwrap_or_else(Union::mixed));
        scope.mark_reachable(value_id.clone());
        self.register_variable(value_id, line);

        let mut escape = FxHashSet::default();
        self.check(body, &mut loop_scope, &mut escape)?;

        self.widen_after_loop(scope, &loop_scope);
        scope.reachable.extend(loop_scope.reachable);
        scope.reachable.extend(escape);
        Ok(())
    }

    /// Folds a post-body scope back into the pre-loop scope.
    fn widen_after_loop(&self, scope: &mut ScopeState, loop_scope: &ScopeState) {
        let mut widened = Vec::new();
        for (id, pre) in &scope.bound {
            if pre.is_mixed() {
                continue;
            }
            let Some(post) = loop_scope.bound.get(id) else {
                continue;
            };
            if post.is_mixed() {
                widened.push((id.clone(), post.clone()));
            } else if post.to_string() != pre.to_string() {
                widened.push((id.clone(), self.host.oracle.combine(pre, post)));
            }
        }
        if !widened.is_empty() {
            debug!(
                file = %self.ctx.file_name,
                vars = widened.len(),
                "widening loop-modified variables"
            );
        }
        for (id, ty) in widened {
            scope.bound.insert(id, ty);
        }
    }
}
