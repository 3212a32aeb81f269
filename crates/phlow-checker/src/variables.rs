//! Variable reads, registration, and the three-state model.
//!
//! A variable is in one of three states at a read: bound (typed on every
//! path), reachable-but-unbound (assigned on some path only), or unseen.
//! The middle state warns once per variable per body, citing the line the
//! binding path saw it first.

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

use phlow_ast::{Expr, ExprKind, MemberName};
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::Union;

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

/// Names the runtime defines in every scope.
static SUPERGLOBALS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "_SERVER", "_GET", "_POST", "_COOKIE", "_REQUEST", "_FILES", "_ENV", "GLOBALS", "argv",
    ]
    .into_iter()
    .collect()
});

impl StatementsChecker<'_> {
    /// Checks a variable read and returns its bound type, if known.
    ///
    /// `call_site` is set when the read is an argument to a resolved call:
    /// the argument type is checked against the parameter, and a by-ref
    /// parameter turns the read into a write.
    pub(crate) fn check_variable(
        &mut self,
        name: &str,
        line: u32,
        scope: &mut ScopeState,
        call_site: Option<(&str, usize)>,
        array_assignment: bool,
    ) -> CheckResult<Option<Union>> {
        if name == "this" && self.ctx.is_static {
            self.report(
                IssueKind::InvalidStaticVariable,
                "Invalid use of $this in static context".to_owned(),
                line,
            )?;
        }

        if !self.settings.check_variables {
            scope.bind(VarId::new(name), Union::mixed());
            return Ok(Some(Union::mixed()));
        }

        if name == "this" || SUPERGLOBALS.contains(name) {
            return Ok(None);
        }

        let id = VarId::new(name);

        if let Some((call_id, offset)) = call_site {
            if let Some(bound) = scope.type_of(&id) {
                if !bound.is_mixed() {
                    let input = bound.clone();
                    self.check_function_argument_type(&input, call_id, offset, line)?;
                }
            }
            if self.param_is_by_ref(call_id, offset) {
                self.bind_by_ref_variable(id, line, scope);
                return Ok(None);
            }
        }

        if !scope.is_bound(&id) {
            let first_seen = self.all_vars.get(&id).copied();

            if !scope.is_reachable(&id) && first_seen.is_none() {
                if array_assignment {
                    // Writing into a dimension of an unseen variable brings
                    // it to life as an empty array.
                    scope.bind(id.clone(), Union::empty_array());
                    self.register_variable(id.clone(), line);
                } else if !self
                    .settings
                    .inherit_variables_files
                    .contains(&self.ctx.file_name)
                {
                    self.report(
                        IssueKind::UndefinedVariable,
                        format!("Cannot find referenced variable ${name}"),
                        line,
                    )?;
                }
            } else if let Some(first_line) = first_seen {
                if !self.warned_vars.contains(&id) {
                    self.warned_vars.insert(id.clone());
                    self.report(
                        IssueKind::PossiblyUndefinedVariable,
                        format!(
                            "Possibly undefined variable ${name}, first seen on line {first_line}"
                        ),
                        line,
                    )?;
                }
            }
        }

        Ok(scope.type_of(&id).cloned())
    }

    /// Records the line a variable first appeared on.
    pub(crate) fn register_variable(&mut self, id: VarId, line: u32) {
        self.all_vars.entry(id).or_insert(line);
    }

    /// A by-ref parameter binds its argument in the caller's scope; the
    /// callee may write anything, so the type degrades to `mixed`.
    pub(crate) fn bind_by_ref_variable(&mut self, id: VarId, line: u32, scope: &mut ScopeState) {
        if !scope.is_bound(&id) {
            scope.mark_reachable(id.clone());
            self.register_variable(id.clone(), line);
        }
        scope.bind(id, Union::mixed());
    }

    /// By-ref binding for argument expressions. Only a bare variable or a
    /// fixed property of `$this` can be passed by reference; anything else
    /// is a malformed tree the parser should not have produced.
    pub(crate) fn assign_by_ref_param(&mut self, target: &Expr, scope: &mut ScopeState) {
        match &target.kind {
            ExprKind::Variable(name) => {
                self.bind_by_ref_variable(VarId::new(name.clone()), target.line, scope);
            }
            ExprKind::PropertyFetch {
                target: receiver,
                name: MemberName::Fixed(property),
            } if matches!(&receiver.kind, ExprKind::Variable(n) if n == "this") => {
                let id = VarId::property("this", property);
                if !scope.is_bound(&id) {
                    scope.mark_reachable(id.clone());
                    self.register_variable(id.clone(), target.line);
                }
                scope.bind(id, Union::mixed());
                if let Some(method_id) = self.ctx.method_id.clone() {
                    self.host
                        .registry
                        .record_this_assignment(&method_id, property, Union::mixed());
                }
            }
            _ => panic!("Bad variable passed in by reference"),
        }
    }

    pub(crate) fn param_is_by_ref(&self, call_id: &str, offset: usize) -> bool {
        let params = if call_id.contains("::") {
            self.host.resolver.method_params(call_id)
        } else {
            self.host.resolver.function_params(call_id)
        };
        params.is_some_and(|params| params.get(offset).is_some_and(|param| param.by_ref))
    }
}
