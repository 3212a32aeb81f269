//! Switch cases run against the pre-switch state, with class-name
//! narrowing for `switch (get_class($x))` discriminants.

mod common;

use common::{scope_with, ty, Session};

use phlow_ast::{Case, Expr, Stmt, StmtKind};
use phlow_checker::{ClassMeta, FunctionMeta, MethodMeta};
use phlow_common::IssueKind;
use phlow_solver::Union;

fn switch_stmt(cond: Expr, cases: Vec<Case>, line: u32) -> Stmt {
    Stmt::new(StmtKind::Switch { cond, cases }, line)
}

fn case(label: &str, body: Vec<Stmt>) -> Case {
    Case {
        cond: Some(Expr::str_lit(label, 1)),
        body,
    }
}

fn default(body: Vec<Stmt>) -> Case {
    Case { cond: None, body }
}

fn session_with_animals() -> Session {
    let session = Session::new();
    session.codebase.add_class(
        ClassMeta::new("Dog").with_method("bark", MethodMeta::public()),
    );
    session.codebase.add_class(ClassMeta::new("Cat"));
    session.codebase.add_function(
        "get_class",
        FunctionMeta::new().returning(Union::string()),
    );
    session
}

fn bark(line: u32) -> Stmt {
    Stmt::expr(Expr::method_call(Expr::var("x", line), "bark", vec![], line))
}

#[test]
fn get_class_discriminant_narrows_inside_the_case() {
    let session = session_with_animals();
    let mut scope = scope_with(&[("x", "mixed")]);

    // switch (get_class($x)) { case 'Dog': $x->bark(); break; }
    let body = vec![switch_stmt(
        Expr::func_call("get_class", vec![Expr::var("x", 1)], 1),
        vec![case("Dog", vec![bark(2), Stmt::brk(3)])],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
}

#[test]
fn candidate_labels_reset_after_break() {
    let session = session_with_animals();
    let mut scope = scope_with(&[("x", "mixed")]);

    // case 'Dog': $x->bark(); break;
    // case 'Cat': $x->bark(); break;
    let body = vec![switch_stmt(
        Expr::func_call("get_class", vec![Expr::var("x", 1)], 1),
        vec![
            case("Dog", vec![bark(2), Stmt::brk(3)]),
            case("Cat", vec![bark(4), Stmt::brk(5)]),
        ],
        1,
    )];
    session.check(&body, &mut scope);

    // Inside the second case $x is Cat, not Dog|Cat, so bark() is gone.
    assert_eq!(session.kinds(), vec![IssueKind::UndefinedMethod]);
    assert_eq!(
        session.issues()[0].message,
        "Method Cat::bark does not exist"
    );
    assert_eq!(session.issues()[0].line, 4);
}

#[test]
fn fall_through_accumulates_labels() {
    let session = session_with_animals();
    let mut scope = scope_with(&[("x", "mixed")]);

    // case 'Dog': (falls through) case 'Cat': $x->bark();
    let body = vec![switch_stmt(
        Expr::func_call("get_class", vec![Expr::var("x", 1)], 1),
        vec![
            case("Dog", vec![]),
            case("Cat", vec![bark(3), Stmt::brk(4)]),
        ],
        1,
    )];
    session.check(&body, &mut scope);

    // $x is Dog|Cat in the shared body; the Cat part still has no bark().
    assert_eq!(session.kinds(), vec![IssueKind::UndefinedMethod]);
    assert_eq!(
        session.issues()[0].message,
        "Method Cat::bark does not exist"
    );
}

#[test]
fn default_case_promotes_intersected_bindings() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "mixed")]);

    // Fall-through cases, each binding $x, closed by a default.
    let body = vec![switch_stmt(
        Expr::var("c", 1),
        vec![
            Case {
                cond: Some(Expr::int(1, 2)),
                body: vec![Stmt::expr(Expr::assign_var("x", Expr::str_lit("a", 2), 2))],
            },
            Case {
                cond: Some(Expr::int(2, 3)),
                body: vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 3), 3))],
            },
            default(vec![Stmt::expr(Expr::assign_var("x", Expr::true_(4), 4))]),
        ],
        1,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert!(scope.is_bound(&phlow_common::VarId::new("x")));
}

#[test]
fn break_terminated_cases_leave_bindings_conditional() {
    let session = Session::new();
    let mut scope = scope_with(&[("c", "mixed")]);

    // switch ($c) { case 1: $x = 1; break; }
    // echo $x;
    let body = vec![
        switch_stmt(
            Expr::var("c", 1),
            vec![Case {
                cond: Some(Expr::int(1, 2)),
                body: vec![
                    Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2)),
                    Stmt::brk(3),
                ],
            }],
            1,
        ),
        Stmt::new(StmtKind::Echo(vec![Expr::var("x", 5)]), 5),
    ];
    session.check(&body, &mut scope);

    assert_eq!(session.kinds(), vec![IssueKind::PossiblyUndefinedVariable]);
    assert_eq!(ty(&scope, "x"), "");
}
