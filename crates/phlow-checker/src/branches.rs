//! Merging conditional chains and exception handlers.
//!
//! An `if` chain is the hard case: each arm is checked against its own
//! narrowed copy of the scope, and what flows into the continuation depends
//! on which arms survive, whether the chain is closed by an `else`, and
//! whether the arm types confirm or refute the original condition.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use phlow_ast::{BinOp, Catch, ExprKind, IfStmt, Stmt};
use phlow_common::{CheckResult, VarId};
use phlow_solver::{AssertionMap, Union};

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

/// Knowledge accumulated across the arms of one `if` chain.
#[derive(Default)]
struct IfMerge {
    /// Identities every surviving arm binds for the first time.
    new_vars: Option<FxHashMap<VarId, Union>>,
    /// Reachability leaked by surviving arms.
    new_reachable: FxHashSet<VarId>,
    /// Identities every surviving arm rebinds to a changed type.
    redefined: Option<FxHashMap<VarId, Union>>,
    /// Identities some surviving arm may have rebound.
    possibly_redefined: FxHashMap<VarId, Union>,
    /// Asserted identities whose final type refutes the condition in
    /// every surviving arm.
    refuting: Option<FxHashMap<VarId, Union>>,
    /// Asserted identities whose final type confirms the condition in
    /// every surviving arm.
    agreeing: Option<FxHashMap<VarId, Union>>,
    /// Negated condition facts made unconditional by a leaving arm.
    post_type_assertions: AssertionMap,
}

/// What one surviving arm contributed, relative to the pre-branch state
/// and the arm's own entry state.
#[derive(Default)]
struct ArmSets {
    new_vars: FxHashMap<VarId, Union>,
    redefined: FxHashMap<VarId, Union>,
    refuting: FxHashMap<VarId, Union>,
    agreeing: FxHashMap<VarId, Union>,
}

impl StatementsChecker<'_> {
    pub(crate) fn check_if(
        &mut self,
        if_stmt: &IfStmt,
        line: u32,
        scope: &mut ScopeState,
        loop_escape: &mut FxHashSet<VarId>,
    ) -> CheckResult {
        self.check_expression(&if_stmt.cond, scope)?;

        let if_types = self.host.oracle.assertions_for(&if_stmt.cond, true, &self.ctx);

        let has_leaving = self.host.termination.leaves_block(&if_stmt.then, true, true);

        // Negations are only needed when some path skips the then arm.
        let need_negations =
            has_leaving || !if_stmt.elseifs.is_empty() || if_stmt.otherwise.is_some();
        let can_negate = !matches!(if_stmt.cond.kind, ExprKind::Binary { op: BinOp::And, .. });

        let mut negated_types = if !if_types.is_empty() && need_negations && can_negate {
            self.host.oracle.negate(&if_types)
        } else {
            AssertionMap::new()
        };
        let negated_if_types = negated_types.clone();

        // A disjunction in the condition cannot be reconciled into a single
        // narrowing, so the then arm starts unnarrowed.
        let mut then_scope = if contains_disjunction(&if_stmt.cond) {
            scope.clone()
        } else {
            let bound = self.reconcile_into(&if_types, &scope.bound, line)?;
            let mut narrowed = ScopeState {
                bound,
                reachable: scope.reachable.clone(),
            };
            for id in if_types.keys() {
                narrowed.mark_reachable(id.clone());
            }
            narrowed
        };
        let then_entry = then_scope.bound.clone();

        self.check(&if_stmt.then, &mut then_scope, loop_escape)?;

        let mut merge = IfMerge::default();
        let mut visited_elseifs = false;

        if !if_stmt.then.is_empty() {
            if !has_leaving {
                let sets = self.arm_sets(&scope.bound, &then_entry, &then_scope, &if_types);
                self.fold_surviving_arm(&mut merge, sets, false);
            } else {
                merge.post_type_assertions = negated_types.clone();
            }
            self.leak_reachability(
                scope,
                &then_scope,
                &if_stmt.then,
                has_leaving,
                &mut merge.new_reachable,
                loop_escape,
            );
        }

        for arm in &if_stmt.elseifs {
            let bound = if negated_types.is_empty() {
                scope.bound.clone()
            } else {
                self.reconcile_into(&negated_types, &scope.bound, line)?
            };
            let mut arm_scope = ScopeState {
                bound,
                reachable: scope.reachable.clone(),
            };
            let arm_entry = arm_scope.bound.clone();

            let arm_types = self.host.oracle.assertions_for(&arm.cond, true, &self.ctx);
            if !matches!(arm.cond.kind, ExprKind::Binary { op: BinOp::And, .. }) {
                negated_types.extend(self.host.oracle.negate(&arm_types));
            } else {
                arm_scope.bound = self.reconcile_into(&arm_types, &arm_scope.bound, line)?;
            }

            self.check_expression(&arm.cond, &mut arm_scope)?;
            let narrowing = self.host.oracle.assertions_for(&arm.cond, false, &self.ctx);
            arm_scope.bound = self.reconcile_into(&narrowing, &arm_scope.bound, arm.cond.line)?;

            self.check(&arm.body, &mut arm_scope, loop_escape)?;

            if !arm.body.is_empty() {
                let arm_leaves = self.host.termination.leaves_block(&arm.body, true, true);
                if !arm_leaves {
                    let sets = self.arm_sets(&scope.bound, &arm_entry, &arm_scope, &if_types);
                    self.fold_surviving_arm(&mut merge, sets, false);
                    visited_elseifs = true;
                } else {
                    merge.post_type_assertions = negated_types.clone();
                }
                self.leak_reachability(
                    scope,
                    &arm_scope,
                    &arm.body,
                    arm_leaves,
                    &mut merge.new_reachable,
                    loop_escape,
                );
            }
        }

        match &if_stmt.otherwise {
            Some(else_body) => {
                let bound = if negated_types.is_empty() {
                    scope.bound.clone()
                } else {
                    self.reconcile_into(&negated_types, &scope.bound, line)?
                };
                let mut else_scope = ScopeState {
                    bound,
                    reachable: scope.reachable.clone(),
                };
                let else_entry = else_scope.bound.clone();

                self.check(else_body, &mut else_scope, loop_escape)?;

                if !else_body.is_empty() {
                    let else_leaves = self.host.termination.leaves_block(else_body, true, true);
                    if !else_leaves {
                        let sets =
                            self.arm_sets(&scope.bound, &else_entry, &else_scope, &if_types);
                        self.fold_surviving_arm(&mut merge, sets, true);
                    } else {
                        merge.refuting = None;
                        merge.agreeing = None;
                    }
                    self.leak_reachability(
                        scope,
                        &else_scope,
                        else_body,
                        else_leaves,
                        &mut merge.new_reachable,
                        loop_escape,
                    );

                    // The else closes the universe, so what every arm did
                    // unconditionally holds in the continuation.
                    if let Some(new_vars) = &merge.new_vars {
                        for (id, ty) in new_vars {
                            scope.bind(id.clone(), ty.clone());
                        }
                    }
                    if merge.redefined.as_ref().is_some_and(|vars| !vars.is_empty()) {
                        for (id, ty) in merge.redefined.take().into_iter().flatten() {
                            scope.bound.insert(id, ty);
                        }
                    }
                }
            }
            None => {
                if visited_elseifs {
                    merge.refuting = None;
                }
                merge.redefined = None;
                merge.agreeing = None;
            }
        }

        scope.reachable.extend(merge.new_reachable.iter().cloned());

        if !if_types.is_empty() {
            // Guard-and-return: the whole then arm terminates, so the
            // negated condition holds on the only surviving path.
            if self.host.termination.leaves_block(&if_stmt.then, false, false)
                && !negated_if_types.is_empty()
            {
                debug!(
                    file = %self.ctx.file_name,
                    line,
                    "terminating then arm, keeping negated condition facts"
                );
                scope.bound = self.reconcile_into(&negated_if_types, &scope.bound, line)?;
                for id in negated_if_types.keys() {
                    scope.mark_reachable(id.clone());
                }
            }

            if let Some(redefined) = merge.redefined.as_ref().filter(|vars| !vars.is_empty()) {
                for id in if_types.keys() {
                    if let Some(ty) = redefined.get(id) {
                        scope.bound.insert(id.clone(), ty.clone());
                    }
                }
            }
            if let Some(agreeing) = &merge.agreeing {
                for (id, ty) in agreeing {
                    if !merge.redefined.as_ref().is_some_and(|vars| vars.contains_key(id)) {
                        scope.bound.insert(id.clone(), ty.clone());
                    }
                }
            }
            if let Some(refuting) = &merge.refuting {
                for (id, ty) in refuting {
                    if !merge.redefined.as_ref().is_some_and(|vars| vars.contains_key(id)) {
                        scope.bound.insert(id.clone(), ty.clone());
                    }
                }
            }
        }

        for (id, ty) in &merge.possibly_redefined {
            let promoted = merge.redefined.as_ref().is_some_and(|vars| vars.contains_key(id))
                || merge.refuting.as_ref().is_some_and(|vars| vars.contains_key(id))
                || merge.agreeing.as_ref().is_some_and(|vars| vars.contains_key(id));
            if promoted {
                continue;
            }
            if let Some(existing) = scope.bound.get(id) {
                let combined = self.host.oracle.combine(existing, ty);
                scope.bound.insert(id.clone(), combined);
            }
        }

        if !merge.post_type_assertions.is_empty() {
            scope.bound = self.reconcile_into(&merge.post_type_assertions, &scope.bound, line)?;
        }

        Ok(())
    }

    /// The try body flows straight through; each catch starts from a copy of
    /// the post-try state with its variable bound to the caught class, and
    /// anything a catch rebinds differently is unioned back.
    pub(crate) fn check_try_catch(
        &mut self,
        body: &[Stmt],
        catches: &[Catch],
        finally: Option<&[Stmt]>,
        scope: &mut ScopeState,
        loop_escape: &mut FxHashSet<VarId>,
    ) -> CheckResult {
        self.check(body, scope, loop_escape)?;

        for catch in catches {
            let mut catch_scope = scope.clone();
            let catch_id = VarId::new(catch.var.clone());

            let caught_type = match &catch.class {
                Some(class) => Union::named(self.ctx.qualify(class)),
                None => Union::mixed(),
            };
            catch_scope.bind(catch_id.clone(), caught_type);
            scope.mark_reachable(catch_id.clone());
            self.register_variable(catch_id.clone(), catch.line);

            self.check(&catch.body, &mut catch_scope, loop_escape)?;

            for (id, ty) in &catch_scope.bound {
                if *id == catch_id {
                    continue;
                }
                let Some(existing) = scope.bound.get(id) else {
                    continue;
                };
                if existing.to_string() != ty.to_string() {
                    let combined = self.host.oracle.combine(existing, ty);
                    scope.bound.insert(id.clone(), combined);
                }
            }
        }

        if let Some(finally) = finally {
            self.check(finally, scope, loop_escape)?;
        }

        Ok(())
    }

    /// One reconcile call with the ambient file and sink filled in.
    pub(crate) fn reconcile_into(
        &self,
        assertions: &AssertionMap,
        bound: &FxHashMap<VarId, Union>,
        line: u32,
    ) -> CheckResult<FxHashMap<VarId, Union>> {
        self.host
            .oracle
            .reconcile(assertions, bound, &self.ctx.file_name, line, self.host.sink)
    }

    fn arm_sets(
        &self,
        pre: &FxHashMap<VarId, Union>,
        entry: &FxHashMap<VarId, Union>,
        arm: &ScopeState,
        if_types: &AssertionMap,
    ) -> ArmSets {
        let mut sets = ArmSets::default();

        for (id, ty) in &arm.bound {
            if !pre.contains_key(id) {
                sets.new_vars.insert(id.clone(), ty.clone());
            }
        }

        for (id, old) in entry {
            if let Some(new) = arm.bound.get(id) {
                if new.to_string() != old.to_string() {
                    sets.redefined.insert(id.clone(), new.clone());
                }
            }
        }

        for (id, ty) in &arm.bound {
            let Some(assertion) = if_types.get(id) else {
                continue;
            };
            let negating = ty
                .types
                .iter()
                .filter(|part| self.host.oracle.is_negation_of(part, assertion))
                .count();
            if negating == ty.types.len() {
                sets.refuting.insert(id.clone(), ty.clone());
            }
            if negating == 0 {
                sets.agreeing.insert(id.clone(), ty.clone());
            }
        }

        sets
    }

    fn fold_surviving_arm(&self, merge: &mut IfMerge, sets: ArmSets, skip_asserted: bool) {
        let oracle = self.host.oracle;

        match &mut merge.redefined {
            None => {
                merge.possibly_redefined = sets.redefined.clone();
                merge.redefined = Some(sets.redefined);
            }
            Some(redefined) => {
                redefined.retain(|id, ty| match sets.redefined.get(id) {
                    Some(new) => {
                        *ty = oracle.combine(new, ty);
                        true
                    }
                    None => false,
                });
                for (id, ty) in sets.redefined {
                    if skip_asserted && merge.post_type_assertions.contains_key(&id) {
                        continue;
                    }
                    if ty.is_mixed() {
                        merge.possibly_redefined.insert(id, ty);
                    } else if let Some(existing) = merge.possibly_redefined.get(&id) {
                        let combined = oracle.combine(&ty, existing);
                        merge.possibly_redefined.insert(id, combined);
                    } else {
                        merge.possibly_redefined.insert(id, ty);
                    }
                }
            }
        }

        intersect_combine(&mut merge.refuting, sets.refuting, |a, b| oracle.combine(a, b));
        intersect_combine(&mut merge.agreeing, sets.agreeing, |a, b| oracle.combine(a, b));
        intersect_combine(&mut merge.new_vars, sets.new_vars, |a, b| oracle.combine(a, b));
    }

    fn leak_reachability(
        &self,
        pre: &ScopeState,
        arm: &ScopeState,
        body: &[Stmt],
        has_leaving: bool,
        merge_reachable: &mut FxHashSet<VarId>,
        loop_escape: &mut FxHashSet<VarId>,
    ) {
        if self.host.termination.leaves_block(body, false, false) {
            return;
        }
        let vars = arm
            .reachable
            .iter()
            .filter(|id| !pre.reachable.contains(*id))
            .cloned();
        if has_leaving {
            loop_escape.extend(vars);
        } else {
            merge_reachable.extend(vars);
        }
    }
}

/// Keeps only the identities present in both maps, combining their types.
fn intersect_combine(
    accumulated: &mut Option<FxHashMap<VarId, Union>>,
    incoming: FxHashMap<VarId, Union>,
    combine: impl Fn(&Union, &Union) -> Union,
) {
    match accumulated {
        None => *accumulated = Some(incoming),
        Some(map) => {
            map.retain(|id, ty| match incoming.get(id) {
                Some(new) => {
                    *ty = combine(new, ty);
                    true
                }
                None => false,
            });
        }
    }
}

/// A condition whose truth may come from either side of an `||` cannot be
/// narrowed as a unit.
pub(crate) fn contains_disjunction(cond: &phlow_ast::Expr) -> bool {
    match &cond.kind {
        ExprKind::Binary { op: BinOp::Or, .. } => true,
        ExprKind::Binary { left, right, .. } => {
            matches!(left.kind, ExprKind::Binary { op: BinOp::Or, .. })
                && matches!(right.kind, ExprKind::Binary { op: BinOp::Or, .. })
        }
        _ => false,
    }
}
