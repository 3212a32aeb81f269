//! Closure literals.
//!
//! A closure body runs in a scope of its own, seeded from the `use` clause,
//! the declared parameters, and the receiver context. The use clause itself
//! is checked against the enclosing scope first: capturing an unknown
//! variable by value is a read and follows the three-state model, while a
//! by-ref capture of an unknown variable is a write and brings it to life
//! as `mixed` in the enclosing scope.

use rustc_hash::FxHashSet;

use phlow_ast::Closure;
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::Union;

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    pub(crate) fn check_closure(
        &mut self,
        closure: &Closure,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        self.check_closure_uses(closure, line, scope)?;

        let mut closure_scope = ScopeState::new();

        if !self.ctx.is_static {
            if let Some(class) = &self.ctx.absolute_class {
                closure_scope.bind(VarId::new("this"), Union::named(class.clone()));
            }
        }

        // Receiver-property knowledge carries into the closure; plain
        // locals only cross through the use clause.
        for (id, ty) in &scope.bound {
            if id.is_this_path() {
                closure_scope.bind(id.clone(), ty.clone());
            }
        }
        for id in &scope.reachable {
            if id.is_this_path() {
                closure_scope.mark_reachable(id.clone());
            }
        }

        for capture in &closure.uses {
            let id = VarId::new(capture.var.clone());
            let ty = scope.type_of(&id).cloned().unwrap_or_else(Union::mixed);
            closure_scope.bind(id, ty);
        }

        let mut checker =
            StatementsChecker::new(self.ctx.clone(), self.settings.clone(), self.host);
        for param in &closure.params {
            let ty = param
                .ty
                .as_deref()
                .map(|ty| checker.documented_type(ty))
                .unwrap_or_else(Union::mixed);
            let id = VarId::new(param.name.clone());
            closure_scope.bind(id.clone(), ty);
            checker.register_variable(id, line);
        }

        let mut escape = FxHashSet::default();
        checker.check(&closure.body, &mut closure_scope, &mut escape)?;

        Ok(None)
    }

    fn check_closure_uses(
        &mut self,
        closure: &Closure,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult {
        for capture in &closure.uses {
            let id = VarId::new(capture.var.clone());
            if scope.is_bound(&id) {
                continue;
            }

            if capture.by_ref {
                scope.bind(id.clone(), Union::mixed());
                self.register_variable(id, line);
                continue;
            }

            let first_seen = self.all_vars.get(&id).copied();

            if !scope.is_reachable(&id) && first_seen.is_none() {
                self.report(
                    IssueKind::UndefinedVariable,
                    format!("Cannot find referenced variable ${}", capture.var),
                    line,
                )?;
                continue;
            }

            if let Some(first_line) = first_seen {
                if !self.warned_vars.contains(&id) {
                    self.warned_vars.insert(id.clone());
                    self.report(
                        IssueKind::PossiblyUndefinedVariable,
                        format!(
                            "Possibly undefined variable ${}, first seen on line {first_line}",
                            capture.var
                        ),
                        line,
                    )?;
                }
            }
        }
        Ok(())
    }
}
