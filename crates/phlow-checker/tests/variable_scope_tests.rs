//! The three-state variable model: bound, reachable-but-unbound, unseen.

mod common;

use common::{scope_with, ty, Session};

use phlow_ast::{Expr, Stmt, StmtKind};
use phlow_checker::ScopeState;
use phlow_common::IssueKind;

fn echo(expr: Expr) -> Stmt {
    let line = expr.line;
    Stmt::new(StmtKind::Echo(vec![expr]), line)
}

#[test]
fn unseen_variable_read_is_undefined() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    assert!(session.check(&[echo(Expr::var("a", 1))], &mut scope));

    assert_eq!(session.kinds(), vec![IssueKind::UndefinedVariable]);
    assert_eq!(
        session.issues()[0].message,
        "Cannot find referenced variable $a"
    );
    assert_eq!(session.issues()[0].line, 1);
}

#[test]
fn undefined_reads_do_not_vivify() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    let body = vec![echo(Expr::var("a", 1)), echo(Expr::var("a", 2))];
    session.check(&body, &mut scope);

    // A plain read never brings the variable to life, so both reads fire.
    assert_eq!(
        session.kinds(),
        vec![IssueKind::UndefinedVariable, IssueKind::UndefinedVariable]
    );
    assert_eq!(ty(&scope, "a"), "");
}

#[test]
fn bound_variable_reads_cleanly() {
    let session = Session::new();
    let mut scope = scope_with(&[("a", "int")]);

    session.check(&[echo(Expr::var("a", 1))], &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "a"), "int");
}

#[test]
fn conditionally_bound_variable_warns_once_citing_first_sight() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "bool")]);

    let body = vec![
        Stmt::if_then(
            Expr::var("c", 1),
            vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2))],
            1,
        ),
        echo(Expr::var("x", 4)),
        echo(Expr::var("x", 5)),
    ];
    session.check(&body, &mut scope);

    // One warning for both reads, pointing at the branch that bound it.
    assert_eq!(session.kinds(), vec![IssueKind::PossiblyUndefinedVariable]);
    let issue = &session.issues()[0];
    assert_eq!(
        issue.message,
        "Possibly undefined variable $x, first seen on line 2"
    );
    assert_eq!(issue.line, 4);
}

#[test]
fn superglobals_are_exempt() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    let body = vec![echo(Expr::var("_SERVER", 1)), echo(Expr::var("argv", 2))];
    session.check(&body, &mut scope);

    session.assert_clean();
}

#[test]
fn this_in_static_context_is_invalid() {
    let session = Session::in_method("Acme\\Widget", "boot", true);
    let mut scope = ScopeState::new();

    session.check(&[echo(Expr::var("this", 3))], &mut scope);

    assert_eq!(session.kinds(), vec![IssueKind::InvalidStaticVariable]);
}

#[test]
fn array_write_vivifies_unseen_variable() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    // $x[] = 5;
    let stmt = Stmt::expr(Expr::assign(
        Expr::array_dim(Expr::var("x", 1), None, 1),
        Expr::int(5, 1),
        1,
    ));
    session.check(&[stmt], &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "array<int>");
}

#[test]
fn extract_disables_variable_checking() {
    let session = Session::new();
    session
        .codebase
        .add_function("extract", phlow_checker::FunctionMeta::new());
    let mut scope = scope_with(&[("data", "array")]);

    let body = vec![
        Stmt::expr(Expr::func_call("extract", vec![Expr::var("data", 1)], 1)),
        echo(Expr::var("conjured", 2)),
    ];
    session.check(&body, &mut scope);

    session.assert_clean();
}
