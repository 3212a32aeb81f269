//! Shared fixture for the scenario suites.
//!
//! A [`Session`] owns every collaborator one checked body needs, so a test
//! can populate the codebase, run statements against a scope, and inspect
//! the sink afterwards without wiring the host up by hand each time.

#![allow(dead_code)]

use rustc_hash::FxHashSet;

use phlow_ast::Stmt;
use phlow_checker::{
    BlockTermination, CheckerSettings, Codebase, Host, Registry, ScopeState, SolverOracle,
    SourceContext, StatementsChecker,
};
use phlow_common::{CollectingSink, Diagnostic, IssueKind, VarId};
use phlow_solver::Union;

pub struct Session {
    pub codebase: Codebase,
    pub registry: Registry,
    pub sink: CollectingSink,
    pub settings: CheckerSettings,
    pub ctx: SourceContext,
}

impl Session {
    pub fn new() -> Self {
        Session {
            codebase: Codebase::new(),
            registry: Registry::new(),
            sink: CollectingSink::new(),
            settings: CheckerSettings::default(),
            ctx: SourceContext::file("test.php"),
        }
    }

    /// A session whose body is a method of `absolute_class`.
    pub fn in_method(absolute_class: &str, method: &str, is_static: bool) -> Self {
        let mut session = Session::new();
        session.ctx = SourceContext::for_method("test.php", absolute_class, method, is_static);
        session
    }

    /// Checks `stmts` against `scope`; `true` means the body ran to the end.
    pub fn check(&self, stmts: &[Stmt], scope: &mut ScopeState) -> bool {
        let host = Host {
            sink: &self.sink,
            oracle: &SolverOracle,
            resolver: &self.codebase,
            termination: &BlockTermination,
            registry: &self.registry,
        };
        let mut checker = StatementsChecker::new(self.ctx.clone(), self.settings.clone(), host);
        let mut escape = FxHashSet::default();
        checker.check(stmts, scope, &mut escape).is_ok()
    }

    pub fn kinds(&self) -> Vec<IssueKind> {
        self.sink.kinds()
    }

    pub fn issues(&self) -> Vec<Diagnostic> {
        self.sink.issues()
    }

    pub fn assert_clean(&self) {
        assert!(
            self.sink.is_empty(),
            "expected no findings, got {:?}",
            self.issues()
        );
    }
}

/// A scope pre-seeded with typed variables.
pub fn scope_with(entries: &[(&str, &str)]) -> ScopeState {
    let mut scope = ScopeState::new();
    for (name, ty) in entries {
        scope.bind(VarId::new(*name), Union::parse(ty));
    }
    scope
}

/// Rendered type of a variable, or the empty string when unbound.
pub fn ty(scope: &ScopeState, name: &str) -> String {
    scope
        .type_of(&VarId::new(name))
        .map(ToString::to_string)
        .unwrap_or_default()
}
