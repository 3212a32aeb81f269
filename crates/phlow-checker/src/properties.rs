//! Property, static-property, and class-constant fetches.
//!
//! Only `$this->name` paths carry a tracked identity, so that case does the
//! real work: the property either has a narrowed type in scope, is declared
//! on the class, or is undefined. Static members and class constants are
//! pure existence checks against the resolver, memoized in the shared
//! registry.

use phlow_ast::{var_id, ClassRef, Expr, ExprKind, MemberName};
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::Union;

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    pub(crate) fn check_property_fetch(
        &mut self,
        expr: &Expr,
        scope: &mut ScopeState,
        array_assignment: bool,
    ) -> CheckResult<Option<Union>> {
        let ExprKind::PropertyFetch { target, name } = &expr.kind else {
            return Ok(None);
        };

        if let MemberName::Dynamic(name_expr) = name {
            self.check_expression(name_expr, scope)?;
        }

        match &target.kind {
            ExprKind::Variable(var) if var == "this" => {
                if let MemberName::Fixed(property) = name {
                    return self.check_this_property_fetch(
                        property,
                        expr.line,
                        scope,
                        array_assignment,
                    );
                }
                Ok(None)
            }
            ExprKind::Variable(var) => {
                self.check_variable(var, target.line, scope, None, false)?;
                // A one-level path on a bare receiver has an identity, so a
                // narrowed type may be waiting for it.
                Ok(var_id(expr).and_then(|id| scope.type_of(&id).cloned()))
            }
            _ => {
                self.check_expression(target, scope)?;
                Ok(None)
            }
        }
    }

    fn check_this_property_fetch(
        &mut self,
        property: &str,
        line: u32,
        scope: &mut ScopeState,
        array_assignment: bool,
    ) -> CheckResult<Option<Union>> {
        let Some(absolute_class) = self.ctx.absolute_class.clone() else {
            self.report(
                IssueKind::InvalidScope,
                "Cannot use $this when not inside class".to_owned(),
                line,
            )?;
            return Ok(None);
        };

        let id = VarId::property("this", property);
        let inferred = scope.type_of(&id).cloned();

        let declared = self
            .host
            .resolver
            .class_property_names(&absolute_class)
            .iter()
            .any(|name| name == property);

        if !declared {
            let property_id = format!("{absolute_class}::{property}");
            let in_scope = scope.is_bound(&id) || scope.is_reachable(&id);

            if !in_scope && !self.property_exists(&property_id) {
                if array_assignment {
                    // Writing into a dimension of an undeclared property is
                    // allowed by the runtime; it comes to life as an array.
                    scope.bind(id.clone(), Union::array());
                    self.register_variable(id.clone(), line);
                } else {
                    self.report(
                        IssueKind::UndefinedProperty,
                        format!("$this->{property} is not defined"),
                        line,
                    )?;
                }
            }
        }

        Ok(inferred)
    }

    /// Property existence with the shared registry as memoization cache.
    fn property_exists(&self, property_id: &str) -> bool {
        if self.host.registry.property_known(property_id) {
            return true;
        }
        if self.host.resolver.property_exists(property_id) {
            self.host.registry.note_property(property_id);
            return true;
        }
        false
    }

    pub(crate) fn check_static_property_fetch(
        &mut self,
        class: &ClassRef,
        name: &str,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        let class_name = match class {
            // `$class::$prop` cannot be statically resolved.
            ClassRef::Dynamic(expr) => {
                self.check_expression(expr, scope)?;
                return Ok(None);
            }
            ClassRef::Name(class_name) => class_name,
        };

        let absolute_class = if class_name.is_parent() {
            self.ctx.parent_class.clone()
        } else if class_name.is_self() || class_name.is_static() {
            self.ctx.absolute_class.clone()
        } else {
            self.resolve_class_name(class_name, line)?
        };

        let Some(absolute_class) = absolute_class else {
            return Ok(None);
        };

        if self.settings.check_variables
            && !self.settings.mock_classes.contains(&absolute_class)
        {
            let static_id = format!("{absolute_class}::${name}");
            if !self.static_var_exists(&static_id) {
                self.report(
                    IssueKind::UndefinedVariable,
                    format!("Static variable {static_id} does not exist"),
                    line,
                )?;
            }
        }

        Ok(None)
    }

    fn static_var_exists(&self, static_id: &str) -> bool {
        if self.host.registry.static_var_known(static_id) {
            return true;
        }
        if self.host.resolver.static_var_exists(static_id) {
            self.host.registry.note_static_var(static_id);
            return true;
        }
        false
    }

    pub(crate) fn check_class_const_fetch(
        &mut self,
        class: &ClassRef,
        name: &str,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        let class_name = match class {
            ClassRef::Dynamic(expr) => {
                self.check_expression(expr, scope)?;
                return Ok(None);
            }
            ClassRef::Name(class_name) => class_name,
        };

        if !self.settings.check_consts || class_name.is_static() {
            return Ok(None);
        }

        let absolute_class = if class_name.is_self() {
            self.ctx.absolute_class.clone()
        } else if class_name.is_parent() {
            self.ctx.parent_class.clone()
        } else {
            self.resolve_class_name(class_name, line)?
        };
        let Some(absolute_class) = absolute_class else {
            return Ok(None);
        };

        let const_id = format!("{absolute_class}::{name}");
        if !self.host.resolver.constant_exists(&const_id) {
            self.report(
                IssueKind::UndefinedConstant,
                format!("Const {const_id} is not defined"),
                line,
            )?;
        }

        Ok(None)
    }
}
