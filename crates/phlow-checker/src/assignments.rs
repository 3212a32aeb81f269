//! Assignment targets and array refinement.

use phlow_ast::{var_id, Expr, ExprKind, MemberName, TypeComment};
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::{Atomic, Union};

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    /// Checks `target = value`, binding the target to the inferred (or
    /// documented) type. Returns the assigned type.
    pub(crate) fn check_assignment(
        &mut self,
        target: &Expr,
        value: &Expr,
        doc: Option<&TypeComment>,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        let value_type = self.check_expression(value, scope)?;

        let target_id = var_id(target);

        // `@var T $other` naming a different in-scope identity overrides
        // that identity instead of this assignment.
        let mut doc_type = doc.map(|doc| self.documented_type(&doc.ty));
        if let Some(doc) = doc {
            if let Some(doc_var) = &doc.var {
                let doc_id = VarId::new(doc_var.clone());
                if Some(&doc_id) != target_id.as_ref() {
                    if scope.is_bound(&doc_id) {
                        if let Some(ty) = doc_type.take() {
                            scope.bind(doc_id, ty);
                        }
                    }
                    doc_type = None;
                }
            }
        }

        let assigned = doc_type
            .or(value_type)
            .unwrap_or_else(Union::mixed);

        match &target.kind {
            ExprKind::Variable(name) => {
                let id = VarId::new(name.clone());
                scope.bind(id.clone(), assigned.clone());
                self.register_variable(id, target.line);
            }
            ExprKind::List(items) => {
                for item in items.iter().flatten() {
                    if let ExprKind::Variable(name) = &item.kind {
                        let id = VarId::new(name.clone());
                        scope.bind(id.clone(), Union::mixed());
                        self.register_variable(id, item.line);
                    }
                }
            }
            ExprKind::ArrayDimFetch { target: base, dim } => {
                self.check_array_assignment(base, dim.as_deref(), &assigned, line, scope)?;
            }
            ExprKind::PropertyFetch {
                target: receiver,
                name: MemberName::Fixed(property),
            } if matches!(&receiver.kind, ExprKind::Variable(n) if n == "this") => {
                let id = VarId::property("this", property);
                scope.bind(id, assigned.clone());

                if let Some(class) = &self.ctx.absolute_class {
                    self.host
                        .registry
                        .note_property(&format!("{class}::{property}"));
                }
                if let Some(method_id) = self.ctx.method_id.clone() {
                    // Cross-body queries settle for mixed here.
                    self.host
                        .registry
                        .record_this_assignment(&method_id, property, Union::mixed());
                }
            }
            _ => {
                self.check_expression(target, scope)?;
            }
        }

        if let Some(id) = &target_id {
            if scope.type_of(id).is_some_and(Union::is_void) {
                self.report(
                    IssueKind::FailedTypeResolution,
                    format!("Cannot assign ${id} to type void"),
                    line,
                )?;
            }
        }

        Ok(Some(assigned))
    }

    /// `target = &value`: the target is rebound to an unknown type, since
    /// writes through either name are invisible to the other.
    pub(crate) fn check_assign_ref(
        &mut self,
        target: &Expr,
        value: &Expr,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        if let ExprKind::Variable(name) = &target.kind {
            let id = VarId::new(name.clone());
            scope.bind(id.clone(), Union::mixed());
            self.register_variable(id, target.line);
        } else {
            self.check_expression(target, scope)?;
        }
        self.check_expression(value, scope)?;
        Ok(None)
    }

    /// Checks a `base[dim] = value` target chain and refines the base's
    /// array type with the assigned value.
    fn check_array_assignment(
        &mut self,
        base: &Expr,
        dim: Option<&Expr>,
        assigned: &Union,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult {
        if let Some(dim) = dim {
            self.check_expression(dim, scope)?;
        }

        // The base is resolved in auto-vivification mode: an unseen base
        // comes to life as an empty array instead of erroring.
        let base_type = self.check_expression_inner(base, scope, true)?;

        let Some(id) = var_id(base) else {
            return Ok(());
        };
        let Some(base_type) = base_type else {
            return Ok(());
        };
        if base_type.is_mixed() {
            return Ok(());
        }

        let mut refined = Vec::with_capacity(base_type.types.len());
        for part in &base_type.types {
            if part.is_scalar() {
                self.report(
                    IssueKind::InvalidArrayAssignment,
                    format!("Cannot assign value on variable ${id} of scalar type {part}"),
                    line,
                )?;
                refined.push(part.clone());
                continue;
            }
            refined.push(self.refine_array_part(part, assigned, &id, line)?);
        }

        scope.bind(
            id,
            Union {
                types: refined.into_iter().collect(),
            },
        );
        Ok(())
    }

    fn refine_array_part(
        &mut self,
        part: &Atomic,
        assigned: &Union,
        id: &VarId,
        line: u32,
    ) -> CheckResult<Atomic> {
        match part {
            Atomic::Null => {
                self.report(
                    IssueKind::NullReference,
                    format!("Cannot assign value on possibly null array {id}"),
                    line,
                )?;
                Ok(part.clone())
            }
            Atomic::Array => Ok(part.clone()),
            Atomic::Generic { name, params, is_empty } if name == "array" => {
                if *is_empty {
                    // First real element: the placeholder parameters are
                    // replaced outright, or the whole thing collapses to a
                    // plain array when the value is unknown.
                    if assigned.is_mixed() {
                        return Ok(Atomic::Array);
                    }
                    let params = assigned
                        .types
                        .iter()
                        .map(|atomic| Union::of(atomic.clone()))
                        .collect();
                    return Ok(Atomic::Generic {
                        name: name.clone(),
                        params,
                        is_empty: false,
                    });
                }

                let mut params = params.clone();
                if let Some(element) = params.last_mut() {
                    if element.to_string() != assigned.to_string() {
                        *element = self.host.oracle.combine(element, assigned);
                    }
                }
                Ok(Atomic::Generic {
                    name: name.clone(),
                    params,
                    is_empty: false,
                })
            }
            Atomic::Named(class)
                if self.host.resolver.class_implements(class, "ArrayAccess") =>
            {
                Ok(part.clone())
            }
            other => {
                self.report(
                    IssueKind::InvalidArrayAssignment,
                    format!("Cannot assign value on variable {id} that does not implement ArrayAccess"),
                    line,
                )?;
                Ok(other.clone())
            }
        }
    }
}
