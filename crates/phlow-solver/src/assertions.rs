//! Extracting type facts from conditions.
//!
//! `assertions_for` walks a condition expression and produces, per scoped
//! variable, the single strongest fact the condition establishes when it
//! evaluates truthy. The walk is shallow on purpose: one fact per variable,
//! disjunctions contribute nothing, and a conjunction is only flattened when
//! the caller can afford an unnegatable result.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use phlow_ast::{var_id, BinOp, Callee, ClassRef, Expr, ExprKind, Name};
use phlow_common::VarId;

use crate::types::Atomic;

/// A fact about one variable, established by a condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    /// The variable evaluated truthy, so `null` and `false` are gone.
    Truthy,
    Falsy,
    Is(Atomic),
    IsNot(Atomic),
}

impl Assertion {
    pub fn negate(&self) -> Assertion {
        match self {
            Assertion::Truthy => Assertion::Falsy,
            Assertion::Falsy => Assertion::Truthy,
            Assertion::Is(atomic) => Assertion::IsNot(atomic.clone()),
            Assertion::IsNot(atomic) => Assertion::Is(atomic.clone()),
        }
    }
}

/// Facts keyed by variable identity. Ordered so iteration, and therefore
/// diagnostic output, is deterministic.
pub type AssertionMap = BTreeMap<VarId, Assertion>;

/// Name-resolution inputs for conditions that mention classes.
#[derive(Debug, Clone, Copy)]
pub struct AssertionContext<'a> {
    pub namespace: Option<&'a str>,
    pub aliases: &'a FxHashMap<String, String>,
    /// Fully qualified enclosing class, for `self` and `static`.
    pub self_class: Option<&'a str>,
}

/// Negates every fact in a map. Only meaningful when the map's facts hold
/// jointly from a single negatable condition, which callers ensure.
pub fn negate_assertions(assertions: &AssertionMap) -> AssertionMap {
    assertions
        .iter()
        .map(|(id, assertion)| (id.clone(), assertion.negate()))
        .collect()
}

/// Extracts the facts a condition establishes when truthy.
///
/// With `is_negatable` set, `&&` merges the facts of both sides; callers
/// that negate the result guard against conjunctions themselves. Without
/// it conjunctions contribute nothing.
pub fn assertions_for(
    cond: &Expr,
    is_negatable: bool,
    ctx: &AssertionContext<'_>,
) -> AssertionMap {
    let mut assertions = AssertionMap::new();
    match &cond.kind {
        ExprKind::Instanceof { target, class } => {
            if let (Some(id), ClassRef::Name(name)) = (var_id(target), class) {
                if let Some(class_name) = resolve_class(name, ctx) {
                    assertions.insert(id, Assertion::Is(Atomic::Named(class_name)));
                }
            }
        }
        ExprKind::BooleanNot(inner) => {
            let inner_assertions = assertions_for(inner, false, ctx);
            // A multi-fact map cannot be negated one entry at a time.
            if inner_assertions.len() == 1 {
                return negate_assertions(&inner_assertions);
            }
        }
        ExprKind::Binary {
            op: BinOp::And,
            left,
            right,
        } => {
            if is_negatable {
                assertions.extend(assertions_for(left, true, ctx));
                assertions.extend(assertions_for(right, true, ctx));
            }
        }
        ExprKind::Binary { op: BinOp::Or, .. } => {}
        ExprKind::Binary {
            op: op @ (BinOp::Identical | BinOp::Equal | BinOp::NotIdentical | BinOp::NotEqual),
            left,
            right,
        } => {
            if let Some(id) = null_comparison_target(left, right) {
                let assertion = match op {
                    BinOp::Identical | BinOp::Equal => Assertion::Is(Atomic::Null),
                    _ => Assertion::IsNot(Atomic::Null),
                };
                assertions.insert(id, assertion);
            }
        }
        ExprKind::FuncCall {
            name: Callee::Name(name),
            args,
        } => {
            if let [arg] = args.as_slice() {
                if let Some(id) = var_id(arg) {
                    let function = name.text.to_ascii_lowercase();
                    if function == "is_null" {
                        assertions.insert(id, Assertion::Is(Atomic::Null));
                    } else if let Some(atomic) = type_check_target(&function) {
                        assertions.insert(id, Assertion::Is(atomic));
                    }
                }
            }
        }
        ExprKind::Isset(args) => {
            for arg in args {
                if let Some(id) = var_id(arg) {
                    assertions.insert(id, Assertion::IsNot(Atomic::Null));
                }
            }
        }
        ExprKind::Empty(inner) => {
            if let Some(id) = var_id(inner) {
                assertions.insert(id, Assertion::Falsy);
            }
        }
        _ => {
            if let Some(id) = var_id(cond) {
                assertions.insert(id, Assertion::Truthy);
            }
        }
    }
    assertions
}

fn resolve_class(name: &Name, ctx: &AssertionContext<'_>) -> Option<String> {
    if name.is_self() || name.is_static() {
        return ctx.self_class.map(str::to_owned);
    }
    if name.is_parent() {
        return None;
    }
    Some(name.qualify(ctx.namespace, ctx.aliases))
}

fn null_comparison_target(left: &Expr, right: &Expr) -> Option<VarId> {
    if is_null_const(right) {
        return var_id(left);
    }
    if is_null_const(left) {
        return var_id(right);
    }
    None
}

fn is_null_const(expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::ConstFetch(name) if name.text.eq_ignore_ascii_case("null"))
}

fn type_check_target(function: &str) -> Option<Atomic> {
    Some(match function {
        "is_string" => Atomic::String,
        "is_int" | "is_integer" | "is_long" => Atomic::Int,
        "is_float" | "is_double" => Atomic::Float,
        "is_bool" => Atomic::Bool,
        "is_array" => Atomic::Array,
        "is_object" => Atomic::Object,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(aliases: &FxHashMap<String, String>) -> AssertionContext<'_> {
        AssertionContext {
            namespace: None,
            aliases,
            self_class: None,
        }
    }

    #[test]
    fn bare_variable_asserts_truthy() {
        let aliases = FxHashMap::default();
        let assertions = assertions_for(&Expr::var("a", 1), true, &ctx(&aliases));
        assert_eq!(assertions.get("a"), Some(&Assertion::Truthy));
    }

    #[test]
    fn negated_isset_asserts_null() {
        let aliases = FxHashMap::default();
        let cond = Expr::not(Expr::isset(vec![Expr::var("a", 1)], 1), 1);
        let assertions = assertions_for(&cond, true, &ctx(&aliases));
        assert_eq!(assertions.get("a"), Some(&Assertion::Is(Atomic::Null)));
    }

    #[test]
    fn instanceof_asserts_qualified_class() {
        let aliases = FxHashMap::default();
        let cond = Expr::instance_of(Expr::var("a", 1), "B", 1);
        let assertions = assertions_for(
            &cond,
            true,
            &AssertionContext {
                namespace: Some("Acme"),
                aliases: &aliases,
                self_class: None,
            },
        );
        assert_eq!(
            assertions.get("a"),
            Some(&Assertion::Is(Atomic::Named("Acme\\B".to_owned())))
        );
    }

    #[test]
    fn conjunctions_flatten_for_first_arm_extraction() {
        let aliases = FxHashMap::default();
        let cond = Expr::binary(BinOp::And, Expr::var("a", 1), Expr::var("b", 1), 1);
        let flattened = assertions_for(&cond, true, &ctx(&aliases));
        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened.get("b"), Some(&Assertion::Truthy));

        assert!(assertions_for(&cond, false, &ctx(&aliases)).is_empty());
    }

    #[test]
    fn negated_conjunction_contributes_nothing() {
        let aliases = FxHashMap::default();
        let cond = Expr::not(
            Expr::binary(BinOp::And, Expr::var("a", 1), Expr::var("b", 1), 1),
            1,
        );
        assert!(assertions_for(&cond, true, &ctx(&aliases)).is_empty());
    }

    #[test]
    fn yoda_null_comparison_narrows() {
        let aliases = FxHashMap::default();
        let cond = Expr::binary(BinOp::NotIdentical, Expr::null(1), Expr::var("a", 1), 1);
        let assertions = assertions_for(&cond, true, &ctx(&aliases));
        assert_eq!(assertions.get("a"), Some(&Assertion::IsNot(Atomic::Null)));
    }
}
