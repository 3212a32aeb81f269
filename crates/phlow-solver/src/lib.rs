//! Union type algebra and condition reasoning.
//!
//! This crate owns the value-type model of the analyzer: the [`Union`] /
//! [`Atomic`] representation of inferred types, the [`Assertion`] facts a
//! condition establishes about variables, and the reconciliation step that
//! applies those facts to a set of known variable types.
//!
//! Types are deliberately coarse. A union is a flat set of atomic parts,
//! `mixed` absorbs everything, and reconciliation never invents structure a
//! condition did not state. The checker built on top does a single forward
//! pass, so everything here is cheap and total: no constraint solving, no
//! fixed points.

pub mod assertions;
pub mod reconcile;
pub mod types;

pub use assertions::{
    assertions_for, negate_assertions, Assertion, AssertionContext, AssertionMap,
};
pub use reconcile::{is_negation_of, reconcile_keyed_types};
pub use types::{Atomic, Union};
