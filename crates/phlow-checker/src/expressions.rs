//! Expression dispatch and the simple expression rules.

use phlow_ast::{BinOp, CastKind, Expr, ExprKind, MemberName, Name};
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::{Atomic, Union};

use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    /// Checks one expression and returns its inferred type, when one is
    /// known. `None` means "no opinion", not "error".
    pub fn check_expression(
        &mut self,
        expr: &Expr,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        self.check_expression_inner(expr, scope, false)
    }

    /// `array_assignment` is threaded down the target chain of a dimension
    /// assignment so unseen bases auto-vivify instead of erroring.
    pub(crate) fn check_expression_inner(
        &mut self,
        expr: &Expr,
        scope: &mut ScopeState,
        array_assignment: bool,
    ) -> CheckResult<Option<Union>> {
        match &expr.kind {
            ExprKind::Variable(name) => {
                self.check_variable(name, expr.line, scope, None, array_assignment)
            }
            ExprKind::Assign { target, value } => {
                self.check_assignment(target, value, None, expr.line, scope)
            }
            ExprKind::AssignOp { target, value, .. } => {
                // Compound assignment reads the target first; its binding
                // state is checked, its type is left alone.
                self.check_expression(target, scope)?;
                self.check_expression(value, scope)?;
                Ok(None)
            }
            ExprKind::AssignRef { target, value } => {
                self.check_assign_ref(target, value, scope)
            }
            ExprKind::List(items) => {
                for item in items.iter().flatten() {
                    self.check_expression(item, scope)?;
                }
                Ok(None)
            }
            ExprKind::ArrayDimFetch { target, dim } => {
                if let Some(dim) = dim {
                    self.check_expression(dim, scope)?;
                }
                self.check_expression_inner(target, scope, array_assignment)?;
                Ok(None)
            }
            ExprKind::PropertyFetch { .. } => {
                self.check_property_fetch(expr, scope, array_assignment)
            }
            ExprKind::StaticPropertyFetch { class, name } => {
                self.check_static_property_fetch(class, name, expr.line, scope)
            }
            ExprKind::MethodCall { target, name, args } => {
                self.check_method_call(target, name, args, expr.line, scope)
            }
            ExprKind::StaticCall { class, name, args } => {
                self.check_static_call(class, name, args, expr.line, scope)
            }
            ExprKind::FuncCall { name, args } => {
                self.check_function_call(name, args, expr.line, scope)
            }
            ExprKind::New { class, args } => self.check_new(class, args, expr.line, scope),
            ExprKind::ConstFetch(name) => Ok(const_fetch_type(name)),
            ExprKind::ClassConstFetch { class, name } => {
                self.check_class_const_fetch(class, name, expr.line, scope)
            }
            ExprKind::Int(_) => Ok(Some(Union::int())),
            ExprKind::Float(_) => Ok(Some(Union::float())),
            ExprKind::Str(_) => Ok(Some(Union::string())),
            ExprKind::InterpolatedString(parts) => {
                for part in parts {
                    self.check_expression(part, scope)?;
                }
                Ok(None)
            }
            ExprKind::MagicConst => Ok(None),
            ExprKind::Array(items) => {
                for item in items {
                    if let Some(key) = &item.key {
                        self.check_expression(key, scope)?;
                    }
                    self.check_expression(&item.value, scope)?;
                }
                Ok(Some(if items.is_empty() {
                    Union::empty_array()
                } else {
                    Union::array()
                }))
            }
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => self.check_ternary(cond, then.as_deref(), otherwise, expr.line, scope),
            ExprKind::BooleanNot(inner) => {
                self.check_expression(inner, scope)?;
                Ok(Some(Union::bool()))
            }
            ExprKind::BitwiseNot(inner)
            | ExprKind::UnaryMinus(inner)
            | ExprKind::UnaryPlus(inner)
            | ExprKind::Suppress(inner)
            | ExprKind::PreInc(inner)
            | ExprKind::PreDec(inner)
            | ExprKind::PostInc(inner)
            | ExprKind::PostDec(inner)
            | ExprKind::Print(inner) => {
                self.check_expression(inner, scope)?;
                Ok(None)
            }
            ExprKind::Binary { op, left, right } => {
                self.check_binary(*op, left, right, expr.line, scope, 0)
            }
            ExprKind::Instanceof { target, class } => {
                self.check_expression(target, scope)?;
                self.verify_class_ref(class, expr.line, scope)?;
                Ok(Some(Union::bool()))
            }
            ExprKind::Cast { kind, value } => {
                self.check_expression(value, scope)?;
                Ok(Some(cast_type(*kind)))
            }
            ExprKind::Isset(args) => {
                // isset() is itself the guard, so its arguments are not
                // checked as reads; a receiver property becomes known.
                for arg in args {
                    if let ExprKind::PropertyFetch {
                        target,
                        name: MemberName::Fixed(property),
                    } = &arg.kind
                    {
                        if matches!(&target.kind, ExprKind::Variable(n) if n == "this") {
                            scope.bind(VarId::property("this", property), Union::mixed());
                        }
                    }
                }
                Ok(Some(Union::bool()))
            }
            ExprKind::Empty(inner) => {
                self.check_expression(inner, scope)?;
                Ok(Some(Union::bool()))
            }
            ExprKind::Clone(inner) => self.check_expression(inner, scope),
            ExprKind::Closure(closure) => self.check_closure(closure, expr.line, scope),
            ExprKind::Exit(status) => {
                if let Some(status) = status {
                    self.check_expression(status, scope)?;
                }
                self.report(IssueKind::ForbiddenCode, "Unsafe exit".to_owned(), expr.line)?;
                Ok(None)
            }
            ExprKind::Eval(inner) => {
                self.check_expression(inner, scope)?;
                // Whatever eval'd code does is invisible to us; stop
                // trusting class and variable knowledge for this body.
                self.settings.check_classes = false;
                self.settings.check_variables = false;
                Ok(None)
            }
            ExprKind::ShellExec(parts) => {
                for part in parts {
                    self.check_expression(part, scope)?;
                }
                self.report(
                    IssueKind::ForbiddenCode,
                    "Use of shell_exec".to_owned(),
                    expr.line,
                )?;
                Ok(None)
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
        line: u32,
        scope: &mut ScopeState,
        nesting: u32,
    ) -> CheckResult<Option<Union>> {
        match op {
            BinOp::And => {
                let assertions = self.host.oracle.assertions_for(left, true, &self.ctx);
                self.check_expression(left, scope)?;
                let bound = self.host.oracle.reconcile(
                    &assertions,
                    &scope.bound,
                    &self.ctx.file_name,
                    line,
                    self.host.sink,
                )?;
                let mut op_scope = ScopeState {
                    bound,
                    reachable: scope.reachable.clone(),
                };
                self.check_expression(right, &mut op_scope)?;
                scope.reachable.extend(op_scope.reachable);
                Ok(Some(Union::bool()))
            }
            BinOp::Or => {
                let assertions = self.host.oracle.assertions_for(left, true, &self.ctx);
                self.check_expression(left, scope)?;
                let mut op_scope =
                    if matches!(left.kind, ExprKind::Binary { op: BinOp::And, .. }) {
                        scope.clone()
                    } else {
                        let negated = self.host.oracle.negate(&assertions);
                        let bound = self.host.oracle.reconcile(
                            &negated,
                            &scope.bound,
                            &self.ctx.file_name,
                            line,
                            self.host.sink,
                        )?;
                        ScopeState {
                            bound,
                            reachable: scope.reachable.clone(),
                        }
                    };
                self.check_expression(right, &mut op_scope)?;
                scope.reachable.extend(op_scope.reachable);
                Ok(Some(Union::bool()))
            }
            BinOp::Concat => {
                if nesting > 20 {
                    // Generated code concatenates hundreds of parts; stop
                    // inferring once the chain is clearly mechanical.
                    return Ok(None);
                }
                if let ExprKind::Binary {
                    op: BinOp::Concat,
                    left: inner_left,
                    right: inner_right,
                } = &left.kind
                {
                    self.check_binary(
                        BinOp::Concat,
                        inner_left,
                        inner_right,
                        left.line,
                        scope,
                        nesting + 1,
                    )?;
                } else {
                    self.check_expression(left, scope)?;
                }
                self.check_expression(right, scope)?;
                Ok(Some(Union::string()))
            }
            BinOp::Equal
            | BinOp::NotEqual
            | BinOp::Identical
            | BinOp::NotIdentical
            | BinOp::Greater
            | BinOp::GreaterOrEqual
            | BinOp::Smaller
            | BinOp::SmallerOrEqual => {
                self.check_expression(left, scope)?;
                self.check_expression(right, scope)?;
                Ok(Some(Union::bool()))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                self.check_expression(left, scope)?;
                self.check_expression(right, scope)?;
                Ok(None)
            }
        }
    }

    fn check_ternary(
        &mut self,
        cond: &Expr,
        then: Option<&Expr>,
        otherwise: &Expr,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        self.check_expression(cond, scope)?;
        let assertions = self.host.oracle.assertions_for(cond, true, &self.ctx);

        let bound = self.host.oracle.reconcile(
            &assertions,
            &scope.bound,
            &self.ctx.file_name,
            line,
            self.host.sink,
        )?;
        let mut then_scope = ScopeState {
            bound,
            reachable: scope.reachable.clone(),
        };
        let then_type = match then {
            Some(then_expr) => self.check_expression(then_expr, &mut then_scope)?,
            None => None,
        };

        let can_negate = !matches!(cond.kind, ExprKind::Binary { op: BinOp::And, .. });
        let mut else_scope = if can_negate {
            let negated = self.host.oracle.negate(&assertions);
            let bound = self.host.oracle.reconcile(
                &negated,
                &scope.bound,
                &self.ctx.file_name,
                line,
                self.host.sink,
            )?;
            ScopeState {
                bound,
                reachable: scope.reachable.clone(),
            }
        } else {
            scope.clone()
        };
        let else_type = self.check_expression(otherwise, &mut else_scope)?;

        // Branch bindings stay in their branch; reachability leaks out.
        scope.reachable.extend(then_scope.reachable);
        scope.reachable.extend(else_scope.reachable);

        Ok(match (then_type, else_type) {
            (Some(a), Some(b)) => Some(self.host.oracle.combine(&a, &b)),
            _ => None,
        })
    }
}

fn const_fetch_type(name: &Name) -> Option<Union> {
    match name.text.as_str() {
        "null" => Some(Union::null()),
        "false" => Some(Union::of(Atomic::False)),
        "true" => Some(Union::bool()),
        _ => None,
    }
}

fn cast_type(kind: CastKind) -> Union {
    match kind {
        CastKind::Int => Union::int(),
        CastKind::Float => Union::float(),
        CastKind::String => Union::string(),
        CastKind::Bool => Union::bool(),
        CastKind::Array => Union::array(),
        CastKind::Object => Union::of(Atomic::Object),
    }
}
