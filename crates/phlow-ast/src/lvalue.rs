//! Canonical identities for assignable expressions.

use phlow_common::VarId;

use crate::expr::{Expr, ExprKind, MemberName};

/// Computes the scope identity of an assignable expression.
///
/// Two shapes qualify: a bare variable (`$x`) and a fixed property fetch on
/// a bare variable (`$x->prop`, identity `x->prop`). Deeper chains, dynamic
/// member names, and everything else get no identity and are tracked
/// conservatively by callers.
pub fn var_id(expr: &Expr) -> Option<VarId> {
    match &expr.kind {
        ExprKind::Variable(name) => Some(VarId::new(name.clone())),
        ExprKind::PropertyFetch { target, name } => {
            let ExprKind::Variable(base) = &target.kind else {
                return None;
            };
            let MemberName::Fixed(property) = name else {
                return None;
            };
            Some(VarId::property(base, property))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_identity_is_its_name() {
        let expr = Expr::var("banana", 3);
        assert_eq!(var_id(&expr), Some(VarId::new("banana")));
    }

    #[test]
    fn property_identity_is_stable_across_occurrences() {
        let first = Expr::prop("this", "total", 4);
        let second = Expr::prop("this", "total", 90);
        assert_eq!(var_id(&first), var_id(&second));
        assert_eq!(var_id(&first), Some(VarId::property("this", "total")));
    }

    #[test]
    fn nested_and_dynamic_receivers_have_no_identity() {
        let deep = Expr::new(
            ExprKind::PropertyFetch {
                target: Box::new(Expr::prop("a", "b", 1)),
                name: MemberName::Fixed("c".to_owned()),
            },
            1,
        );
        assert_eq!(var_id(&deep), None);

        let dynamic = Expr::new(
            ExprKind::PropertyFetch {
                target: Box::new(Expr::var("a", 1)),
                name: MemberName::Dynamic(Box::new(Expr::var("field", 1))),
            },
            1,
        );
        assert_eq!(var_id(&dynamic), None);
    }
}
