//! Switch dispatch and class-name narrowing.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use phlow_ast::{Callee, Case, Expr, ExprKind, StmtKind};
use phlow_common::{CheckResult, VarId};
use phlow_solver::Union;

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    /// Each case runs against the pre-switch state; the accumulated sets are
    /// only promoted when a `default` case closes the universe. A
    /// `switch (get_class($x))` discriminant narrows `$x` inside each case
    /// to the union of the string labels seen since the last break.
    pub(crate) fn check_switch(
        &mut self,
        cond: &Expr,
        cases: &[Case],
        line: u32,
        scope: &mut ScopeState,
        loop_escape: &mut FxHashSet<VarId>,
    ) -> CheckResult {
        let type_candidate = class_name_discriminant(cond);

        self.check_expression(cond, scope)?;

        let mut case_labels: Vec<String> = Vec::new();
        let mut new_vars: Option<FxHashMap<VarId, Union>> = None;
        let mut new_reachable: FxHashSet<VarId> = FxHashSet::default();
        let mut redefined: Option<FxHashMap<VarId, Union>> = None;

        for case in cases {
            if let Some(case_cond) = &case.cond {
                self.check_expression(case_cond, scope)?;
                if type_candidate.is_some() {
                    if let ExprKind::Str(label) = &case_cond.kind {
                        case_labels.push(label.clone());
                    }
                }
            }

            let mut last_stmt = None;

            if !case.body.is_empty() {
                let mut case_scope = scope.clone();
                if let (Some(candidate), false) = (type_candidate, case_labels.is_empty()) {
                    let narrowed = Union::parse(&case_labels.join("|"));
                    debug!(
                        file = %self.ctx.file_name,
                        line,
                        var = candidate,
                        ty = %narrowed,
                        "narrowing switch discriminant by case labels"
                    );
                    case_scope.bind(VarId::new(candidate), narrowed);
                }
                let case_entry = case_scope.bound.clone();

                let mut case_escape = FxHashSet::default();
                self.check(&case.body, &mut case_scope, &mut case_escape)?;
                loop_escape.extend(case_escape);

                last_stmt = case.body.last();

                if !self.host.termination.leaves_block(&case.body, false, false) {
                    let leaked: Vec<VarId> = case_scope
                        .reachable
                        .iter()
                        .filter(|id| !scope.reachable.contains(*id))
                        .cloned()
                        .collect();

                    if self.host.termination.leaves_block(&case.body, true, false) {
                        loop_escape.extend(leaked);
                    } else {
                        let mut case_redefined = FxHashMap::default();
                        for (id, old) in &case_entry {
                            if let Some(new) = case_scope.bound.get(id) {
                                if new.to_string() != old.to_string() {
                                    case_redefined.insert(id.clone(), new.clone());
                                }
                            }
                        }

                        // Intersection only: the first surviving case's type
                        // is kept, later cases just have to agree the
                        // variable changed.
                        match &mut redefined {
                            None => redefined = Some(case_redefined),
                            Some(map) => {
                                map.retain(|id, _| case_redefined.contains_key(id));
                            }
                        }

                        match &mut new_vars {
                            None => {
                                new_vars = Some(
                                    case_scope
                                        .bound
                                        .iter()
                                        .filter(|(id, _)| !scope.bound.contains_key(*id))
                                        .map(|(id, ty)| (id.clone(), ty.clone()))
                                        .collect(),
                                );
                            }
                            Some(map) => {
                                map.retain(|id, _| case_scope.bound.contains_key(id));
                            }
                        }

                        new_reachable.extend(leaked);
                    }
                }
            }

            if type_candidate.is_some()
                && last_stmt
                    .is_some_and(|stmt| matches!(stmt.kind, StmtKind::Break | StmtKind::Return(_)))
            {
                case_labels.clear();
            }

            if case.cond.is_none() {
                if let Some(new_vars) = new_vars.as_ref().filter(|map| !map.is_empty()) {
                    for (id, ty) in new_vars {
                        scope.bind(id.clone(), ty.clone());
                    }
                }
                if let Some(redefined) = redefined.as_ref().filter(|map| !map.is_empty()) {
                    for (id, ty) in redefined {
                        scope.bound.insert(id.clone(), ty.clone());
                    }
                }
            }
        }

        scope.reachable.extend(new_reachable);
        Ok(())
    }
}

/// Matches `get_class($x)` on a bare variable.
fn class_name_discriminant(cond: &Expr) -> Option<&str> {
    let ExprKind::FuncCall {
        name: Callee::Name(name),
        args,
    } = &cond.kind
    else {
        return None;
    };
    if name.text != "get_class" {
        return None;
    }
    let [arg] = args.as_slice() else {
        return None;
    };
    match &arg.kind {
        ExprKind::Variable(var) => Some(var),
        _ => None,
    }
}
