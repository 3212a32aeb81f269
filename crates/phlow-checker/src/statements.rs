//! The checker core and statement dispatch.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use phlow_ast::{Expr, ExprKind, Name, Stmt, StmtKind};
use phlow_common::{Aborted, CheckResult, Diagnostic, DiagnosticSink, IssueKind, VarId};
use phlow_solver::{Atomic, Union};

use crate::context::SourceContext;
use crate::oracle::TypeOracle;
use crate::registry::Registry;
use crate::resolver::SymbolResolver;
use crate::scope::ScopeState;
use crate::settings::CheckerSettings;
use crate::termination::TerminationOracle;

/// Borrowed collaborators. `Copy`, so nested checkers for closures and
/// declared functions share the same host.
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub sink: &'a dyn DiagnosticSink,
    pub oracle: &'a dyn TypeOracle,
    pub resolver: &'a dyn SymbolResolver,
    pub termination: &'a dyn TerminationOracle,
    pub registry: &'a Registry,
}

/// Single-pass flow checker for one body.
///
/// Create one per function, method, closure, or file body, then call
/// [`StatementsChecker::check`] with the body's statements and a starting
/// scope (parameters already bound). The checker accumulates first-seen
/// lines and once-per-variable warnings across the whole body, so reuse
/// one instance per body, not per block.
pub struct StatementsChecker<'a> {
    pub(crate) ctx: SourceContext,
    pub(crate) settings: CheckerSettings,
    pub(crate) host: Host<'a>,
    /// First line each variable was bound on.
    pub(crate) all_vars: FxHashMap<VarId, u32>,
    pub(crate) warned_vars: FxHashSet<VarId>,
    inferred_returns: Vec<Union>,
}

impl<'a> StatementsChecker<'a> {
    pub fn new(ctx: SourceContext, settings: CheckerSettings, host: Host<'a>) -> Self {
        StatementsChecker {
            ctx,
            settings,
            host,
            all_vars: FxHashMap::default(),
            warned_vars: FxHashSet::default(),
            inferred_returns: Vec::new(),
        }
    }

    /// Checks a statement list against `scope`.
    ///
    /// `loop_escape` collects variables that became possibly-defined in
    /// arms that jump out of an enclosing loop; the loop handler folds it
    /// back after the body. Callers outside any loop pass a scratch set.
    pub fn check(
        &mut self,
        stmts: &[Stmt],
        scope: &mut ScopeState,
        loop_escape: &mut FxHashSet<VarId>,
    ) -> CheckResult {
        // Function declarations are hoisted within their block.
        for stmt in stmts {
            if let StmtKind::FunctionDecl(decl) = &stmt.kind {
                self.host.registry.register_function(&decl.name);
            }
        }

        let mut has_left = false;
        for stmt in stmts {
            if has_left && !matches!(stmt.kind, StmtKind::Nop | StmtKind::InlineHtml(_)) {
                warn!(
                    file = %self.ctx.file_name,
                    line = stmt.line,
                    "statements after return, throw, or continue are never reached"
                );
                break;
            }
            self.check_stmt(stmt, scope, loop_escape)?;
            if matches!(
                stmt.kind,
                StmtKind::Return(_) | StmtKind::Throw(_) | StmtKind::Continue
            ) {
                has_left = true;
            }
        }
        Ok(())
    }

    fn check_stmt(
        &mut self,
        stmt: &Stmt,
        scope: &mut ScopeState,
        loop_escape: &mut FxHashSet<VarId>,
    ) -> CheckResult {
        match &stmt.kind {
            StmtKind::Expr(expr) => {
                // A docblock above a plain assignment overrides the
                // assigned type, so route it through here.
                if let ExprKind::Assign { target, value } = &expr.kind {
                    self.check_assignment(target, value, stmt.doc.as_ref(), expr.line, scope)?;
                    Ok(())
                } else {
                    self.check_expression(expr, scope).map(|_| ())
                }
            }
            StmtKind::If(if_stmt) => self.check_if(if_stmt, stmt.line, scope, loop_escape),
            StmtKind::While { cond, body } => self.check_while(cond, body, scope),
            StmtKind::DoWhile { body, cond } => self.check_do_while(body, cond, scope),
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => self.check_for(init, cond, step, body, scope, loop_escape),
            StmtKind::Foreach {
                source,
                key_var,
                value_var,
                body,
            } => self.check_foreach(source, key_var.as_deref(), value_var, body, stmt.line, scope),
            StmtKind::Switch { cond, cases } => {
                self.check_switch(cond, cases, stmt.line, scope, loop_escape)
            }
            StmtKind::TryCatch {
                body,
                catches,
                finally,
            } => self.check_try_catch(body, catches, finally.as_deref(), scope, loop_escape),
            StmtKind::Return(value) => self.check_return(stmt, value.as_ref(), scope),
            StmtKind::Throw(value) => self.check_expression(value, scope).map(|_| ()),
            StmtKind::Break | StmtKind::Continue => Ok(()),
            StmtKind::Echo(values) => {
                for value in values {
                    self.check_expression(value, scope)?;
                }
                Ok(())
            }
            StmtKind::Const(items) | StmtKind::ClassConstDecl(items) => {
                for item in items {
                    self.check_expression(&item.value, scope)?;
                }
                Ok(())
            }
            StmtKind::StaticVars(vars) => {
                for var in vars {
                    if let Some(default) = &var.default {
                        self.check_expression(default, scope)?;
                    }
                    if self.settings.check_variables {
                        let id = VarId::new(var.name.clone());
                        scope.bind(id.clone(), Union::mixed());
                        self.register_variable(id, stmt.line);
                    }
                }
                Ok(())
            }
            StmtKind::Global(names) => {
                // Globals arrive bound but unregistered: reading one later
                // is fine, and there is no local first-seen line to cite.
                for name in names {
                    scope.bind(VarId::new(name.clone()), Union::mixed());
                }
                Ok(())
            }
            StmtKind::Unset(_) => Ok(()),
            StmtKind::FunctionDecl(decl) => self.check_function_decl(decl),
            StmtKind::Use(items) => {
                for item in items {
                    let path = item.path.trim_start_matches('\\');
                    let alias = match &item.alias {
                        Some(alias) => alias.clone(),
                        None => path.rsplit('\\').next().unwrap_or(path).to_owned(),
                    };
                    self.ctx
                        .aliased_classes
                        .insert(alias.to_ascii_lowercase(), path.to_owned());
                }
                Ok(())
            }
            StmtKind::Namespace { name, body } => {
                if self.ctx.namespace.is_some() {
                    self.report(
                        IssueKind::InvalidNamespace,
                        "Cannot redeclare namespace".to_owned(),
                        stmt.line,
                    )?;
                } else {
                    self.ctx.namespace.clone_from(name);
                }
                self.check(body, scope, loop_escape)
            }
            StmtKind::PropertyDecl(items) => {
                for item in items {
                    if let Some(default) = &item.default {
                        self.check_expression(default, scope)?;
                    }
                    if let Some(class) = &self.ctx.absolute_class {
                        self.host
                            .registry
                            .note_property(&format!("{class}::{}", item.name));
                    }
                }
                Ok(())
            }
            StmtKind::Nop | StmtKind::InlineHtml(_) => Ok(()),
        }
    }

    fn check_return(
        &mut self,
        stmt: &Stmt,
        value: Option<&Expr>,
        scope: &mut ScopeState,
    ) -> CheckResult {
        let doc_type = stmt.doc.as_ref().map(|doc| self.documented_type(&doc.ty));
        let inferred = match value {
            Some(expr) => {
                let expr_type = self.check_expression(expr, scope)?;
                let ty = doc_type.unwrap_or_else(|| expr_type.unwrap_or_else(Union::mixed));
                if ty.is_void() {
                    self.report(
                        IssueKind::FailedTypeResolution,
                        "Cannot return type void".to_owned(),
                        stmt.line,
                    )?;
                }
                ty
            }
            None => Union::void(),
        };
        self.inferred_returns.push(inferred);
        Ok(())
    }

    /// Types collected from `return` statements, in source order.
    pub fn inferred_returns(&self) -> &[Union] {
        &self.inferred_returns
    }

    /// The union of everything the body returns, if it returns at all.
    pub fn combined_return_type(&self) -> Option<Union> {
        let mut returns = self.inferred_returns.iter();
        let first = returns.next()?.clone();
        Some(returns.fold(first, |combined, ty| self.host.oracle.combine(&combined, ty)))
    }

    /// Resolves a docblock type string, qualifying class-looking names.
    pub(crate) fn documented_type(&self, ty_text: &str) -> Union {
        let parsed = Union::parse(ty_text);
        let types = parsed
            .types
            .into_iter()
            .map(|atomic| match atomic {
                Atomic::Named(name)
                    if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) =>
                {
                    Atomic::Named(self.ctx.qualify(&Name::new(name)))
                }
                other => other,
            })
            .collect();
        Union { types }
    }

    /// Hands one finding to the sink; a fatal answer aborts the body.
    pub(crate) fn report(&self, kind: IssueKind, message: String, line: u32) -> CheckResult {
        if self
            .host
            .sink
            .accept(Diagnostic::new(kind, message, &self.ctx.file_name, line))
        {
            return Err(Aborted);
        }
        Ok(())
    }
}
