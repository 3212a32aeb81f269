//! Merging `if` chains: closure of the arm types, guard-and-return
//! recovery, and the disjunction restriction.

mod common;

use common::{scope_with, ty, Session};

use phlow_ast::{BinOp, ElseIf, Expr, IfStmt, Stmt, StmtKind};
use phlow_checker::{ClassMeta, MethodMeta};
use phlow_common::IssueKind;

fn assign(name: &str, value: Expr, line: u32) -> Stmt {
    Stmt::expr(Expr::assign_var(name, value, line))
}

#[test]
fn if_else_closure_combines_both_arms() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "bool"), ("x", "bool")]);

    // if ($c) { $x = "a"; } else { $x = 1; }
    let body = vec![Stmt::if_else(
        Expr::var("c", 1),
        vec![assign("x", Expr::str_lit("a", 2), 2)],
        vec![assign("x", Expr::int(1, 4), 4)],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "int|string");
}

#[test]
fn if_without_else_combines_with_pre_type() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "bool"), ("x", "string")]);

    let body = vec![Stmt::if_then(
        Expr::var("c", 1),
        vec![assign("x", Expr::int(1, 2), 2)],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "string|int");
}

#[test]
fn guard_and_return_keeps_negated_condition() {
    let session = Session::new();
    session.codebase.add_class(ClassMeta::new("Conn"));
    let mut scope = scope_with(&[("x", "Conn|null")]);

    // if ($x === null) { return; }
    let cond = Expr::binary(BinOp::Identical, Expr::var("x", 1), Expr::null(1), 1);
    let body = vec![Stmt::if_then(cond, vec![Stmt::ret_void(2)], 1)];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "Conn");
}

#[test]
fn every_arm_binding_a_new_variable_promotes_it() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "mixed"), ("d", "mixed")]);

    // if ($c) { $y = 1; } elseif ($d) { $y = "s"; } else { $y = false; }
    let stmt = Stmt::new(
        StmtKind::If(IfStmt {
            cond: Expr::var("c", 1),
            then: vec![assign("y", Expr::int(1, 2), 2)],
            elseifs: vec![ElseIf {
                cond: Expr::var("d", 3),
                body: vec![assign("y", Expr::str_lit("s", 4), 4)],
            }],
            otherwise: Some(vec![assign("y", Expr::false_(6), 6)]),
        }),
        1,
    );
    session.check(&[stmt], &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "y"), "false|string|int");
}

#[test]
fn variable_bound_in_one_arm_only_is_not_promoted() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "bool")]);

    let body = vec![Stmt::if_else(
        Expr::var("c", 1),
        vec![assign("y", Expr::int(1, 2), 2)],
        vec![Stmt::nop(4)],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "y"), "");
}

#[test]
fn null_check_narrows_method_receiver() {
    let session = Session::new();
    session
        .codebase
        .add_class(ClassMeta::new("Conn").with_method("ping", MethodMeta::public()));
    let mut scope = scope_with(&[("x", "Conn|null")]);

    // if ($x !== null) { $x->ping(); }
    let cond = Expr::binary(BinOp::NotIdentical, Expr::var("x", 1), Expr::null(1), 1);
    let body = vec![Stmt::if_then(
        cond,
        vec![Stmt::expr(Expr::method_call(
            Expr::var("x", 2),
            "ping",
            vec![],
            2,
        ))],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
}

#[test]
fn disjunction_condition_does_not_narrow_the_then_arm() {
    let session = Session::new();
    session
        .codebase
        .add_class(ClassMeta::new("Conn").with_method("ping", MethodMeta::public()));
    let mut scope = scope_with(&[("c", "bool"), ("x", "Conn|null")]);

    // if ($x !== null || $c) { $x->ping(); }
    let null_check = Expr::binary(BinOp::NotIdentical, Expr::var("x", 1), Expr::null(1), 1);
    let cond = Expr::binary(BinOp::Or, null_check, Expr::var("c", 1), 1);
    let body = vec![Stmt::if_then(
        cond,
        vec![Stmt::expr(Expr::method_call(
            Expr::var("x", 2),
            "ping",
            vec![],
            2,
        ))],
        1,
    )];
    session.check(&body, &mut scope);

    // The truth may have come from $c, so $x stays possibly null inside.
    assert_eq!(session.kinds(), vec![IssueKind::NullReference]);
}
