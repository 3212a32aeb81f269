//! Applying assertions to known variable types.
//!
//! `reconcile_keyed_types` is the narrowing step: it takes the facts a
//! condition established and a snapshot of bound variable types, and returns
//! the types that hold inside the guarded block. An assertion that cannot
//! hold against the known type is a [`IssueKind::FailedTypeResolution`]
//! finding, after which the variable degrades to `mixed` rather than
//! poisoning the rest of the pass.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

use phlow_common::{Aborted, CheckResult, Diagnostic, DiagnosticSink, IssueKind, VarId};

use crate::assertions::{Assertion, AssertionMap};
use crate::types::{Atomic, Union};

/// Applies every assertion in `assertions` to a copy of `bound` and returns
/// the narrowed map. Variables the condition mentions but the scope does not
/// know come out as the asserted type, or `mixed` when the assertion names
/// no type.
pub fn reconcile_keyed_types(
    assertions: &AssertionMap,
    bound: &FxHashMap<VarId, Union>,
    file: &str,
    line: u32,
    sink: &dyn DiagnosticSink,
) -> CheckResult<FxHashMap<VarId, Union>> {
    trace!(facts = assertions.len(), line, "reconciling condition facts");
    let mut narrowed = bound.clone();
    for (id, assertion) in assertions {
        let existing = narrowed.get(id).cloned();
        let reconciled = reconcile_one(id, assertion, existing.as_ref(), file, line, sink)?;
        narrowed.insert(id.clone(), reconciled);
    }
    Ok(narrowed)
}

fn reconcile_one(
    id: &VarId,
    assertion: &Assertion,
    existing: Option<&Union>,
    file: &str,
    line: u32,
    sink: &dyn DiagnosticSink,
) -> CheckResult<Union> {
    let Some(existing) = existing else {
        return Ok(match assertion {
            Assertion::Is(atomic) => Union::of(atomic.clone()),
            _ => Union::mixed(),
        });
    };
    match assertion {
        Assertion::Truthy => {
            if existing.is_mixed() {
                return Ok(existing.clone());
            }
            let kept: SmallVec<[Atomic; 2]> = existing
                .types
                .iter()
                .filter(|part| !matches!(part, Atomic::Null | Atomic::False))
                .cloned()
                .collect();
            if kept.is_empty() {
                failed(id, format!("{existing} is never truthy"), file, line, sink)?;
                return Ok(Union::mixed());
            }
            Ok(Union { types: kept })
        }
        Assertion::Falsy => {
            // Most types have falsy values, so only a plain bool narrows.
            if existing.types.len() == 1 && matches!(existing.types[0], Atomic::Bool) {
                return Ok(Union::of(Atomic::False));
            }
            Ok(existing.clone())
        }
        Assertion::Is(atomic) => {
            if existing.is_mixed() {
                return Ok(Union::of(atomic.clone()));
            }
            let kept: SmallVec<[Atomic; 2]> = existing
                .types
                .iter()
                .filter(|part| atomic_matches(part, atomic))
                .cloned()
                .collect();
            if !kept.is_empty() {
                return Ok(Union { types: kept });
            }
            // A class assertion on a differently-typed variable is the
            // condition telling us something the scope did not know; only
            // the null case is a contradiction worth reporting.
            if matches!(atomic, Atomic::Null) {
                failed(
                    id,
                    format!("{existing} does not contain null"),
                    file,
                    line,
                    sink,
                )?;
            }
            Ok(Union::of(atomic.clone()))
        }
        Assertion::IsNot(atomic) => {
            if existing.is_mixed() {
                return Ok(Union::mixed());
            }
            let kept: SmallVec<[Atomic; 2]> = existing
                .types
                .iter()
                .filter(|part| !atomic_matches(part, atomic))
                .cloned()
                .collect();
            if kept.is_empty() {
                failed(
                    id,
                    format!("{existing} contains nothing but {atomic}"),
                    file,
                    line,
                    sink,
                )?;
                return Ok(Union::mixed());
            }
            Ok(Union { types: kept })
        }
    }
}

/// Whether a union part satisfies an asserted atomic type.
fn atomic_matches(part: &Atomic, asserted: &Atomic) -> bool {
    if part == asserted {
        return true;
    }
    match asserted {
        Atomic::Bool => matches!(part, Atomic::False),
        Atomic::Array => matches!(part, Atomic::Generic { name, .. } if name == "array"),
        Atomic::Object => matches!(part, Atomic::Named(_)),
        _ => false,
    }
}

/// Whether a union part is refuted outright by an assertion. Used to decide
/// if a branch body saw a different type than the surrounding scope.
pub fn is_negation_of(part: &Atomic, assertion: &Assertion) -> bool {
    match assertion {
        Assertion::Truthy => matches!(part, Atomic::Null | Atomic::False),
        Assertion::Falsy => match part {
            Atomic::Named(_) | Atomic::Object => true,
            Atomic::Generic { name, .. } => name != "array",
            _ => false,
        },
        Assertion::Is(atomic) => !atomic_matches(part, atomic),
        Assertion::IsNot(atomic) => atomic_matches(part, atomic),
    }
}

fn failed(
    id: &VarId,
    detail: String,
    file: &str,
    line: u32,
    sink: &dyn DiagnosticSink,
) -> CheckResult {
    let message = format!("Cannot resolve types for ${id} - {detail}");
    if sink.accept(Diagnostic::new(
        IssueKind::FailedTypeResolution,
        message,
        file,
        line,
    )) {
        return Err(Aborted);
    }
    Ok(())
}
