//! Assignments: inference, docblock overrides, and array refinement.

mod common;

use common::{scope_with, ty, Session};

use phlow_ast::{Expr, ExprKind, Stmt, TypeComment};
use phlow_checker::{FunctionMeta, ScopeState};
use phlow_common::IssueKind;
use phlow_solver::Union;

#[test]
fn assignment_binds_the_inferred_type() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    let body = vec![
        Stmt::expr(Expr::assign_var("n", Expr::int(1, 1), 1)),
        Stmt::expr(Expr::assign_var("s", Expr::str_lit("a", 2), 2)),
        Stmt::expr(Expr::assign_var("e", Expr::new(ExprKind::Array(vec![]), 3), 3)),
    ];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "n"), "int");
    assert_eq!(ty(&scope, "s"), "string");
    assert_eq!(ty(&scope, "e"), "array<empty>");
}

#[test]
fn doc_comment_overrides_the_inferred_type() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    // /** @var string */ $x = 1;
    let stmt = Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2)).with_doc(TypeComment {
        ty: "string".to_owned(),
        var: None,
    });
    session.check(&[stmt], &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "string");
}

#[test]
fn doc_comment_naming_another_variable_redirects() {
    let session = Session::new();
    let mut scope = scope_with(&[("y", "int")]);

    // /** @var string $y */ $x = 1;
    let stmt = Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2)).with_doc(TypeComment {
        ty: "string".to_owned(),
        var: Some("y".to_owned()),
    });
    session.check(&[stmt], &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "y"), "string");
    assert_eq!(ty(&scope, "x"), "int");
}

#[test]
fn assigning_a_void_call_is_reported() {
    let session = Session::new();
    session
        .codebase
        .add_function("emit", FunctionMeta::new().returning(Union::void()));
    let mut scope = ScopeState::new();

    session.check(
        &[Stmt::expr(Expr::assign_var(
            "x",
            Expr::func_call("emit", vec![], 1),
            1,
        ))],
        &mut scope,
    );

    assert_eq!(session.kinds(), vec![IssueKind::FailedTypeResolution]);
    assert_eq!(session.issues()[0].message, "Cannot assign $x to type void");
}

#[test]
fn array_write_widens_the_element_type() {
    let session = Session::new();
    let mut scope = scope_with(&[("rows", "array<int>")]);

    // $rows[] = "s";
    session.check(
        &[Stmt::expr(Expr::assign(
            Expr::array_dim(Expr::var("rows", 1), None, 1),
            Expr::str_lit("s", 1),
            1,
        ))],
        &mut scope,
    );

    session.assert_clean();
    assert_eq!(ty(&scope, "rows"), "array<int|string>");
}

#[test]
fn first_element_replaces_the_empty_array_placeholder() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    // $rows = []; $rows[] = 1;
    let body = vec![
        Stmt::expr(Expr::assign_var("rows", Expr::new(ExprKind::Array(vec![]), 1), 1)),
        Stmt::expr(Expr::assign(
            Expr::array_dim(Expr::var("rows", 2), None, 2),
            Expr::int(1, 2),
            2,
        )),
    ];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "rows"), "array<int>");
}

#[test]
fn array_write_on_a_scalar_is_reported() {
    let session = Session::new();
    let mut scope = scope_with(&[("name", "string")]);

    session.check(
        &[Stmt::expr(Expr::assign(
            Expr::array_dim(Expr::var("name", 1), Some(Expr::int(0, 1)), 1),
            Expr::int(1, 1),
            1,
        ))],
        &mut scope,
    );

    assert_eq!(session.kinds(), vec![IssueKind::InvalidArrayAssignment]);
    assert_eq!(
        session.issues()[0].message,
        "Cannot assign value on variable $name of scalar type string"
    );
}

#[test]
fn array_write_on_null_is_a_null_reference() {
    let session = Session::new();
    let mut scope = scope_with(&[("rows", "null")]);

    session.check(
        &[Stmt::expr(Expr::assign(
            Expr::array_dim(Expr::var("rows", 1), None, 1),
            Expr::int(1, 1),
            1,
        ))],
        &mut scope,
    );

    assert_eq!(session.kinds(), vec![IssueKind::NullReference]);
}

#[test]
fn list_destructuring_binds_each_target_as_unknown() {
    let session = Session::new();
    let mut scope = scope_with(&[("pair", "array")]);

    // list($a, $b) = $pair;
    let target = Expr::new(
        ExprKind::List(vec![Some(Expr::var("a", 1)), Some(Expr::var("b", 1))]),
        1,
    );
    session.check(
        &[Stmt::expr(Expr::assign(target, Expr::var("pair", 1), 1))],
        &mut scope,
    );

    session.assert_clean();
    assert_eq!(ty(&scope, "a"), "mixed");
    assert_eq!(ty(&scope, "b"), "mixed");
}

#[test]
fn reference_assignment_degrades_to_unknown() {
    let session = Session::new();
    let mut scope = scope_with(&[("src", "int")]);

    // $alias = &$src;
    let stmt = Stmt::expr(Expr::new(
        ExprKind::AssignRef {
            target: Box::new(Expr::var("alias", 1)),
            value: Box::new(Expr::var("src", 1)),
        },
        1,
    ));
    session.check(&[stmt], &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "alias"), "mixed");
}

#[test]
fn this_property_assignment_registers_the_property() {
    let session = Session::in_method("Acme\\Counter", "bump", false);
    session
        .codebase
        .add_class(phlow_checker::ClassMeta::new("Acme\\Counter"));
    let mut scope = ScopeState::new();

    // $this->count = 1; echo $this->count;
    let body = vec![
        Stmt::expr(Expr::assign(
            Expr::prop("this", "count", 1),
            Expr::int(1, 1),
            1,
        )),
        Stmt::new(
            phlow_ast::StmtKind::Echo(vec![Expr::prop("this", "count", 2)]),
            2,
        ),
    ];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert!(session.registry.property_known("Acme\\Counter::count"));
    assert_eq!(ty(&scope, "this->count"), "int");
}
