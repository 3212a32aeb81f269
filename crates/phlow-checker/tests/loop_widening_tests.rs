//! Loop bodies run once against a snapshot; afterwards changed types widen.

mod common;

use common::{scope_with, ty, Session};

use phlow_ast::{Expr, Stmt, StmtKind};
use phlow_checker::{FunctionMeta, FunctionParam};
use phlow_common::IssueKind;
use phlow_solver::Union;

fn echo(expr: Expr) -> Stmt {
    let line = expr.line;
    Stmt::new(StmtKind::Echo(vec![expr]), line)
}

fn foreach(source: Expr, value_var: &str, body: Vec<Stmt>, line: u32) -> Stmt {
    Stmt::new(
        StmtKind::Foreach {
            source,
            key_var: None,
            value_var: value_var.to_owned(),
            body,
        },
        line,
    )
}

#[test]
fn reassignment_in_while_body_widens_to_union() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "mixed"), ("x", "int")]);

    // while ($c) { $x = "s"; }
    let body = vec![Stmt::while_loop(
        Expr::var("c", 1),
        vec![Stmt::expr(Expr::assign_var("x", Expr::str_lit("s", 2), 2))],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    // Zero or many iterations, so both types survive.
    assert_eq!(ty(&scope, "x"), "int|string");
}

#[test]
fn post_body_mixed_overwrites_instead_of_widening() {
    let session = Session::new();
    session.codebase.add_function("load", FunctionMeta::new());
    let mut scope = scope_with(&[("c", "mixed"), ("x", "int")]);

    // while ($c) { $x = load(); }
    let body = vec![Stmt::while_loop(
        Expr::var("c", 1),
        vec![Stmt::expr(Expr::assign_var(
            "x",
            Expr::func_call("load", vec![], 2),
            2,
        ))],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "mixed");
}

#[test]
fn do_while_body_flows_through() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "mixed")]);

    // do { $x = 1; } while ($c); echo $x;
    let body = vec![
        Stmt::new(
            StmtKind::DoWhile {
                body: vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2))],
                cond: Expr::var("c", 3),
            },
            1,
        ),
        echo(Expr::var("x", 4)),
    ];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "int");
}

#[test]
fn break_leaks_reachability_out_of_the_loop() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "mixed"), ("d", "mixed")]);

    // while ($c) { if ($d) { $x = 1; break; } }
    // echo $x;
    let body = vec![
        Stmt::while_loop(
            Expr::var("c", 1),
            vec![Stmt::if_then(
                Expr::var("d", 2),
                vec![
                    Stmt::expr(Expr::assign_var("x", Expr::int(1, 3), 3)),
                    Stmt::brk(4),
                ],
                2,
            )],
            1,
        ),
        echo(Expr::var("x", 6)),
    ];
    session.check(&body, &mut scope);

    // Possibly bound on the break path, never unconditionally.
    assert_eq!(session.kinds(), vec![IssueKind::PossiblyUndefinedVariable]);
    assert!(session.issues()[0].message.contains("first seen on line 3"));
}

#[test]
fn foreach_over_null_is_a_null_reference() {
    let session = Session::new();
    let mut scope = scope_with(&[("rows", "null")]);

    let body = vec![foreach(Expr::var("rows", 1), "row", vec![], 1)];
    session.check(&body, &mut scope);

    assert_eq!(session.kinds(), vec![IssueKind::NullReference]);
    assert_eq!(session.issues()[0].message, "Cannot iterate over null");
}

#[test]
fn foreach_over_scalar_is_an_invalid_iterator() {
    let session = Session::new();
    let mut scope = scope_with(&[("rows", "string")]);

    let body = vec![foreach(Expr::var("rows", 1), "row", vec![], 1)];
    session.check(&body, &mut scope);

    assert_eq!(session.kinds(), vec![IssueKind::InvalidIterator]);
    assert_eq!(session.issues()[0].message, "Cannot iterate over string");
}

#[test]
fn foreach_element_type_reaches_the_value_variable() {
    let session = Session::new();
    session.codebase.add_function(
        "consume",
        FunctionMeta::new().params(vec![FunctionParam::typed("value", Union::string())]),
    );
    let mut scope = scope_with(&[("rows", "array<int>")]);

    // foreach ($rows as $row) { consume($row); }
    let body = vec![foreach(
        Expr::var("rows", 1),
        "row",
        vec![Stmt::expr(Expr::func_call(
            "consume",
            vec![Expr::var("row", 2)],
            2,
        ))],
        1,
    )];
    session.check(&body, &mut scope);

    assert_eq!(session.kinds(), vec![IssueKind::InvalidArgument]);
    assert_eq!(
        session.issues()[0].message,
        "Argument 1 of consume expects string, int provided"
    );
}
