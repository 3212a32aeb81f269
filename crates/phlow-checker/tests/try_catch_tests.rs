//! Exception paths: catch variables, rebinding across handlers, finally.

mod common;

use common::{scope_with, ty, Session};

use phlow_ast::{Catch, Expr, Name, Stmt, StmtKind};
use phlow_checker::{ClassMeta, MethodMeta, ScopeState};
use phlow_common::IssueKind;
use phlow_solver::Union;

fn try_catch(body: Vec<Stmt>, catches: Vec<Catch>, finally: Option<Vec<Stmt>>) -> Stmt {
    Stmt::new(
        StmtKind::TryCatch {
            body,
            catches,
            finally,
        },
        1,
    )
}

fn catch(class: Option<&str>, var: &str, body: Vec<Stmt>, line: u32) -> Catch {
    Catch {
        class: class.map(Name::new),
        var: var.to_owned(),
        body,
        line,
    }
}

#[test]
fn catch_variable_is_bound_to_the_caught_class() {
    let session = Session::new();
    session.codebase.add_class(
        ClassMeta::new("DbError")
            .with_method("getMessage", MethodMeta::public().returning(Union::string())),
    );
    let mut scope = ScopeState::new();

    // try { $x = 1; } catch (DbError $e) { $e->getMessage(); }
    let body = vec![try_catch(
        vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2))],
        vec![catch(
            Some("DbError"),
            "e",
            vec![Stmt::expr(Expr::method_call(
                Expr::var("e", 4),
                "getMessage",
                vec![],
                4,
            ))],
            3,
        )],
        None,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
}

#[test]
fn handler_rebinding_unions_back_into_the_continuation() {
    let session = Session::new();
    let mut scope = scope_with(&[("x", "bool")]);

    // try { $x = 1; } catch (DbError $e) { $x = "s"; }
    let body = vec![try_catch(
        vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2))],
        vec![catch(
            Some("DbError"),
            "e",
            vec![Stmt::expr(Expr::assign_var("x", Expr::str_lit("s", 4), 4))],
            3,
        )],
        None,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
    assert_eq!(ty(&scope, "x"), "int|string");
}

#[test]
fn catch_variable_is_only_possibly_defined_afterwards() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    // try { $x = 1; } catch (DbError $e) {}
    // echo $e;
    let body = vec![
        try_catch(
            vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2))],
            vec![catch(Some("DbError"), "e", vec![], 3)],
            None,
        ),
        Stmt::new(StmtKind::Echo(vec![Expr::var("e", 5)]), 5),
    ];
    session.check(&body, &mut scope);

    assert_eq!(session.kinds(), vec![IssueKind::PossiblyUndefinedVariable]);
    assert_eq!(
        session.issues()[0].message,
        "Possibly undefined variable $e, first seen on line 3"
    );
}

#[test]
fn classless_catch_binds_mixed() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    // catch ($e) { $kind = $e; }
    let body = vec![try_catch(
        vec![],
        vec![catch(
            None,
            "e",
            vec![Stmt::expr(Expr::assign_var("kind", Expr::var("e", 3), 3))],
            2,
        )],
        None,
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
}

#[test]
fn finally_sees_the_post_try_scope() {
    let session = Session::new();
    let mut scope = ScopeState::new();

    // try { $x = 1; } catch (DbError $e) {} finally { echo $x; }
    let body = vec![try_catch(
        vec![Stmt::expr(Expr::assign_var("x", Expr::int(1, 2), 2))],
        vec![catch(Some("DbError"), "e", vec![], 3)],
        Some(vec![Stmt::new(StmtKind::Echo(vec![Expr::var("x", 5)]), 5)]),
    )];
    session.check(&body, &mut scope);

    session.assert_clean();
}
