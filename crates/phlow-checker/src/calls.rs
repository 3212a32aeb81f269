//! Function, method, static, and constructor calls.
//!
//! Call checking has three layers: resolving what is being called (and
//! diagnosing receivers and class references on the way), checking the
//! arguments against the resolved parameter list, and substituting the
//! declared return type into something usable at the call site. A by-ref
//! parameter turns its argument into a write, handled in `variables`.

use phlow_ast::{Callee, ClassRef, Expr, ExprKind, FunctionDecl, MemberName, Name};
use phlow_common::{CheckResult, IssueKind, VarId};
use phlow_solver::{Atomic, Union};

use crate::resolver::Visibility;
use crate::scope::ScopeState;
use crate::statements::StatementsChecker;

impl StatementsChecker<'_> {
    pub(crate) fn check_function_call(
        &mut self,
        name: &Callee,
        args: &[Expr],
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        let name = match name {
            Callee::Name(name) => name,
            Callee::Dynamic(callee) => {
                self.check_expression(callee, scope)?;
                for arg in args {
                    self.check_expression(arg, scope)?;
                }
                return Ok(None);
            }
        };

        // The dynamic escape hatches: code probing its own capabilities
        // gets the corresponding check turned off for the rest of the body.
        match name.text.as_str() {
            "method_exists" => self.settings.check_methods = false,
            "function_exists" => self.settings.check_functions = false,
            "defined" => self.settings.check_consts = false,
            "extract" => self.settings.check_variables = false,
            "var_dump" | "die" | "exit" => {
                self.report(
                    IssueKind::ForbiddenCode,
                    format!("Unsafe {}", name.text),
                    line,
                )?;
            }
            _ => {}
        }

        let mut function_id = None;
        if self.settings.check_functions {
            let id = name
                .text
                .trim_start_matches('\\')
                .to_ascii_lowercase();
            self.check_function_exists(&id, line)?;
            function_id = Some(id);
        }

        for (i, arg) in args.iter().enumerate() {
            if let ExprKind::Variable(var) = &arg.kind {
                let call_site = function_id.as_deref().map(|id| (id, i));
                self.check_variable(var, arg.line, scope, call_site, false)?;
            } else {
                self.check_expression(arg, scope)?;
            }
        }

        Ok(function_id
            .and_then(|id| self.host.resolver.function_return_type(&id))
            .or_else(|| Some(Union::mixed())))
    }

    /// Functions resolved once stay resolved: the shared registry doubles
    /// as the memoization cache for resolver lookups.
    fn check_function_exists(&mut self, function_id: &str, line: u32) -> CheckResult {
        if self.host.registry.function_registered(function_id) {
            return Ok(());
        }
        if self.host.resolver.function_exists(function_id) {
            self.host.registry.register_function(function_id);
            return Ok(());
        }
        self.report(
            IssueKind::UndefinedFunction,
            format!("Function {function_id} does not exist"),
            line,
        )
    }

    pub(crate) fn check_method_call(
        &mut self,
        target: &Expr,
        name: &MemberName,
        args: &[Expr],
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        if let ExprKind::Variable(var) = &target.kind {
            if var == "this" && self.ctx.class_name.is_none() {
                self.report(
                    IssueKind::InvalidScope,
                    "Use of $this in non-class context".to_owned(),
                    line,
                )?;
            }
        }
        self.check_expression(target, scope)?;

        if let MemberName::Dynamic(name_expr) = name {
            self.check_expression(name_expr, scope)?;
            self.check_call_arguments(args, None, scope)?;
            return Ok(None);
        }
        let MemberName::Fixed(method_name) = name else {
            unreachable!()
        };

        let receiver_type = phlow_ast::var_id(target).and_then(|id| scope.type_of(&id).cloned());

        if matches!(&target.kind, ExprKind::Variable(var) if var == "this") {
            if let Some(this_method_id) = self.ctx.method_id.clone() {
                if let Some(class) = &self.ctx.absolute_class {
                    let called = format!("{class}::{}", method_name.to_ascii_lowercase());
                    self.host.registry.record_this_call(&this_method_id, &called);
                }
            }
        }

        if !self.settings.check_methods {
            return Ok(None);
        }

        let mut method_id = None;
        let mut return_type = None;

        let receiver_class = match &receiver_type {
            Some(ty) => {
                for part in &ty.types {
                    match part {
                        Atomic::Null => {
                            self.report(
                                IssueKind::NullReference,
                                format!(
                                    "Cannot call method {method_name} on possibly null variable {ty}"
                                ),
                                line,
                            )?;
                        }
                        Atomic::Int | Atomic::Bool | Atomic::Array => {
                            self.report(
                                IssueKind::InvalidArgument,
                                format!("Cannot call method {method_name} on {ty} variable"),
                                line,
                            )?;
                        }
                        Atomic::Named(class) => {
                            if let Some((id, ret)) =
                                self.check_instance_method(class, method_name, args, line)?
                            {
                                method_id = Some(id);
                                return_type = ret;
                            }
                        }
                        _ => {}
                    }
                }
                None
            }
            None => matches!(&target.kind, ExprKind::Variable(var) if var == "this")
                .then(|| self.ctx.absolute_class.clone())
                .flatten(),
        };

        // A `$this` receiver resolves against the enclosing class even with
        // no tracked identity type.
        if let Some(class) = receiver_class {
            if let Some((id, ret)) = self.check_instance_method(&class, method_name, args, line)? {
                method_id = Some(id);
                return_type = ret;
            }
        }

        self.check_call_arguments(args, method_id.as_deref(), scope)?;
        Ok(return_type)
    }

    /// Existence, visibility, and return type of one resolved instance
    /// method. `None` when the class is mocked or unknown.
    fn check_instance_method(
        &mut self,
        class: &str,
        method_name: &str,
        args: &[Expr],
        line: u32,
    ) -> CheckResult<Option<(String, Option<Union>)>> {
        if self.settings.mock_classes.contains(class) {
            return Ok(None);
        }
        if self.settings.check_classes && !self.host.resolver.class_exists(class) {
            self.report(
                IssueKind::FailedTypeResolution,
                format!("Class {class} does not exist"),
                line,
            )?;
            return Ok(None);
        }

        let method_id = format!("{class}::{}", method_name.to_ascii_lowercase());
        self.host
            .registry
            .record_call(&method_id, self.ctx.calling_id());

        if !self.host.resolver.method_exists(&method_id) {
            self.report(
                IssueKind::UndefinedMethod,
                format!("Method {method_id} does not exist"),
                line,
            )?;
            return Ok(None);
        }
        self.check_method_visibility(&method_id, line)?;

        let return_type = self
            .host
            .resolver
            .method_return_type(&method_id)
            .map(|ty| self.substitute_return_type(&ty, &method_id, args));
        Ok(Some((method_id, return_type)))
    }

    pub(crate) fn check_static_call(
        &mut self,
        class: &ClassRef,
        name: &str,
        args: &[Expr],
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        // `$class::method()` cannot be statically resolved at all.
        let class_name = match class {
            ClassRef::Dynamic(_) => return Ok(None),
            ClassRef::Name(class_name) => class_name,
        };

        let absolute_class = if class_name.is_parent() {
            if self.ctx.parent_class.is_none() {
                self.report(
                    IssueKind::ParentNotFound,
                    "Cannot call method on parent as this class does not extend another"
                        .to_owned(),
                    line,
                )?;
            }
            self.ctx.parent_class.clone()
        } else if class_name.is_self() || class_name.is_static() {
            self.ctx.absolute_class.clone()
        } else {
            self.resolve_class_name(class_name, line)?
        };

        if !self.settings.check_methods {
            return Ok(None);
        }

        let mut method_id = None;
        let mut return_type = None;

        if let Some(class) = &absolute_class {
            if !self.settings.mock_classes.contains(class) {
                let id = format!("{class}::{}", name.to_ascii_lowercase());
                self.host.registry.record_call(&id, self.ctx.calling_id());

                if !self.host.resolver.method_exists(&id) {
                    self.report(
                        IssueKind::UndefinedMethod,
                        format!("Method {id} does not exist"),
                        line,
                    )?;
                } else {
                    self.check_method_visibility(&id, line)?;

                    let is_static = self.host.resolver.method_is_static(&id);
                    if self.ctx.is_static {
                        if !is_static {
                            self.report(
                                IssueKind::InvalidStaticInvocation,
                                format!("Method {id} is not static"),
                                line,
                            )?;
                        }
                    } else if class_name.is_self() && name != "__construct" && !is_static {
                        self.report(
                            IssueKind::InvalidStaticInvocation,
                            format!("Cannot call non-static method {id} as if it were static"),
                            line,
                        )?;
                    }

                    return_type = self
                        .host
                        .resolver
                        .method_return_type(&id)
                        .map(|ty| self.substitute_return_type(&ty, &id, args));
                    method_id = Some(id);
                }
            }
        }

        self.check_call_arguments(args, method_id.as_deref(), scope)?;
        Ok(return_type)
    }

    pub(crate) fn check_new(
        &mut self,
        class: &ClassRef,
        args: &[Expr],
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult<Option<Union>> {
        let mut absolute_class = None;

        match class {
            ClassRef::Name(name)
                if !name.is_self() && !name.is_static() && !name.is_parent() =>
            {
                if self.settings.check_classes {
                    absolute_class = self.resolve_class_name(name, line)?;
                }
            }
            ClassRef::Name(_) => {}
            ClassRef::Dynamic(expr) => {
                self.check_expression(expr, scope)?;
            }
        }

        let Some(absolute_class) = absolute_class else {
            self.check_call_arguments(args, None, scope)?;
            return Ok(None);
        };

        let constructor_id = format!("{absolute_class}::__construct");
        let constructor = self
            .host
            .resolver
            .method_exists(&constructor_id)
            .then_some(constructor_id);
        self.check_call_arguments(args, constructor.as_deref(), scope)?;

        Ok(Some(Union::named(absolute_class)))
    }

    /// Argument checks shared by method, static, and constructor calls.
    ///
    /// Bare-variable and `$this` property arguments get their bound type
    /// checked against the parameter and their identity rebound for by-ref
    /// parameters; with no resolved callee they are assumed passed by
    /// reference and degrade to `mixed`.
    pub(crate) fn check_call_arguments(
        &mut self,
        args: &[Expr],
        call_id: Option<&str>,
        scope: &mut ScopeState,
    ) -> CheckResult {
        for (i, arg) in args.iter().enumerate() {
            match &arg.kind {
                ExprKind::PropertyFetch {
                    target,
                    name: MemberName::Fixed(property),
                } if matches!(&target.kind, ExprKind::Variable(var) if var == "this") => {
                    let id = VarId::property("this", property);
                    match call_id {
                        Some(call_id) => {
                            if let Some(bound) = scope.type_of(&id) {
                                if !bound.is_mixed() {
                                    let input = bound.clone();
                                    self.check_function_argument_type(
                                        &input, call_id, i, arg.line,
                                    )?;
                                }
                            }
                            if self.param_is_by_ref(call_id, i) {
                                self.assign_by_ref_param(arg, scope);
                            } else {
                                self.check_expression(arg, scope)?;
                            }
                        }
                        None => {
                            let unknown = scope.type_of(&id).is_none_or(Union::is_null);
                            if unknown {
                                scope.bind(id.clone(), Union::mixed());
                                self.register_variable(id, arg.line);
                            }
                        }
                    }
                }
                ExprKind::Variable(var) => match call_id {
                    Some(call_id) => {
                        self.check_variable(var, arg.line, scope, Some((call_id, i)), false)?;
                    }
                    None => {
                        let id = VarId::new(var.clone());
                        let unknown = scope.type_of(&id).is_none_or(Union::is_null);
                        if unknown {
                            scope.bind(id.clone(), Union::mixed());
                            self.register_variable(id, arg.line);
                        }
                    }
                },
                _ => {
                    let inferred = self.check_expression(arg, scope)?;
                    if let (Some(call_id), Some(inferred)) = (call_id, inferred) {
                        self.check_function_argument_type(&inferred, call_id, i, arg.line)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Compares an argument's inferred type against the declared parameter
    /// type at that position.
    pub(crate) fn check_function_argument_type(
        &mut self,
        input: &Union,
        call_id: &str,
        offset: usize,
        line: u32,
    ) -> CheckResult {
        let params = if call_id.contains("::") {
            self.host.resolver.method_params(call_id)
        } else {
            self.host.resolver.function_params(call_id)
        };
        let Some(param_type) = params
            .and_then(|params| params.into_iter().nth(offset))
            .and_then(|param| param.ty)
        else {
            return Ok(());
        };

        if param_type.is_mixed() || input.is_mixed() {
            return Ok(());
        }

        if input.is_nullable() && !param_type.is_nullable() {
            self.report(
                IssueKind::NullReference,
                format!(
                    "Argument {} of {call_id} cannot be null, possibly null value provided",
                    offset + 1
                ),
                line,
            )?;
        }

        for input_part in &input.types {
            if matches!(input_part, Atomic::Null) {
                continue;
            }
            for param_part in &param_type.types {
                if matches!(param_part, Atomic::Null) {
                    continue;
                }
                if input_part.to_string() == param_part.to_string() {
                    continue;
                }
                if let (Atomic::Named(input_class), Atomic::Named(param_class)) =
                    (input_part, param_part)
                {
                    if self.settings.mock_classes.contains(input_class) {
                        continue;
                    }
                    if self.host.resolver.is_subclass_of(input_class, param_class) {
                        continue;
                    }
                    if self.host.resolver.is_subclass_of(param_class, input_class) {
                        // Coercion from a supertype may be fine at runtime.
                        return Ok(());
                    }
                }
                self.report(
                    IssueKind::InvalidArgument,
                    format!(
                        "Argument {} of {call_id} expects {param_type}, {input} provided",
                        offset + 1
                    ),
                    line,
                )?;
            }
        }
        Ok(())
    }

    fn check_method_visibility(&mut self, method_id: &str, line: u32) -> CheckResult {
        let Some(visibility) = self.host.resolver.method_visibility(method_id) else {
            return Ok(());
        };
        let declaring_class = method_id.split("::").next().unwrap_or(method_id);
        let calling_class = self.ctx.absolute_class.as_deref();

        let accessible = match visibility {
            Visibility::Public => true,
            Visibility::Private => calling_class == Some(declaring_class),
            Visibility::Protected => calling_class.is_some_and(|calling| {
                calling == declaring_class
                    || self.host.resolver.is_subclass_of(calling, declaring_class)
                    || self.host.resolver.is_subclass_of(declaring_class, calling)
            }),
        };
        if !accessible {
            self.report(
                IssueKind::InaccessibleMethod,
                format!("Cannot access {method_id}"),
                line,
            )?;
        }
        Ok(())
    }

    /// Replaces declaration-site placeholders in a return type: `$this` and
    /// `static` become the receiver class, and a `$param` name becomes the
    /// literal string passed at that position.
    pub(crate) fn substitute_return_type(
        &self,
        ty: &Union,
        method_id: &str,
        args: &[Expr],
    ) -> Union {
        let types = ty
            .types
            .iter()
            .map(|part| self.substitute_return_part(part, method_id, args))
            .collect();
        Union { types }
    }

    fn substitute_return_part(&self, part: &Atomic, method_id: &str, args: &[Expr]) -> Atomic {
        match part {
            Atomic::Named(name) if name == "$this" || name == "static" => {
                let class = method_id.split("::").next().unwrap_or(method_id);
                Atomic::Named(class.to_owned())
            }
            Atomic::Named(name) if name.starts_with('$') => {
                let params = self.host.resolver.method_params(method_id).unwrap_or_default();
                for (param, arg) in params.iter().zip(args) {
                    if name[1..] == param.name {
                        if let ExprKind::Str(value) = &arg.kind {
                            return Atomic::Named(
                                value.trim_start_matches('\\').to_owned(),
                            );
                        }
                    }
                }
                Atomic::Mixed
            }
            Atomic::Generic {
                name,
                params,
                is_empty,
            } => Atomic::Generic {
                name: name.clone(),
                params: params
                    .iter()
                    .map(|param| self.substitute_return_type(param, method_id, args))
                    .collect(),
                is_empty: *is_empty,
            },
            other => other.clone(),
        }
    }

    /// Qualifies a class name and checks that it resolves.
    pub(crate) fn resolve_class_name(
        &mut self,
        name: &Name,
        line: u32,
    ) -> CheckResult<Option<String>> {
        let absolute_class = self.ctx.qualify(name);
        if self.settings.check_classes
            && !self.settings.mock_classes.contains(&absolute_class)
            && !self.host.resolver.class_exists(&absolute_class)
        {
            self.report(
                IssueKind::FailedTypeResolution,
                format!("Class {absolute_class} does not exist"),
                line,
            )?;
            return Ok(None);
        }
        Ok(Some(absolute_class))
    }

    /// Class position of `instanceof`: a name is validated, an expression
    /// is checked as a read.
    pub(crate) fn verify_class_ref(
        &mut self,
        class: &ClassRef,
        line: u32,
        scope: &mut ScopeState,
    ) -> CheckResult {
        match class {
            ClassRef::Name(name) => {
                if name.is_self() || name.is_static() {
                    return Ok(());
                }
                if name.is_parent() {
                    if self.ctx.parent_class.is_none() {
                        return self.report(
                            IssueKind::ParentNotFound,
                            "Cannot reference parent as this class does not extend another"
                                .to_owned(),
                            line,
                        );
                    }
                    return Ok(());
                }
                self.resolve_class_name(name, line)?;
                Ok(())
            }
            ClassRef::Dynamic(expr) => self.check_expression(expr, scope).map(|_| ()),
        }
    }

    /// A function declared mid-block gets its own checker with parameters
    /// pre-bound; its scope shares nothing with the enclosing body.
    pub(crate) fn check_function_decl(&mut self, decl: &FunctionDecl) -> CheckResult {
        self.host.registry.register_function(&decl.name);

        let mut fn_ctx = self.ctx.clone();
        fn_ctx.class_name = None;
        fn_ctx.absolute_class = None;
        fn_ctx.parent_class = None;
        fn_ctx.is_static = false;
        fn_ctx.method_id = Some(decl.name.to_ascii_lowercase());

        let mut checker =
            StatementsChecker::new(fn_ctx, self.settings.clone(), self.host);
        let mut fn_scope = ScopeState::new();
        for param in &decl.params {
            let ty = param
                .ty
                .as_deref()
                .map(|ty| checker.documented_type(ty))
                .unwrap_or_else(Union::mixed);
            let id = VarId::new(param.name.clone());
            fn_scope.bind(id.clone(), ty);
            checker.register_variable(id, decl.body.first().map_or(0, |stmt| stmt.line));
        }

        let mut escape = Default::default();
        checker.check(&decl.body, &mut fn_scope, &mut escape)
    }
}
