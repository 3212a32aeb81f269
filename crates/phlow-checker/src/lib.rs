//! Statement-level flow checking.
//!
//! [`StatementsChecker`] walks one function or file body in a single forward
//! pass, tracking per-variable union types in a [`ScopeState`], narrowing
//! them through conditions, and merging them back together at every branch
//! point. There is no fixed-point iteration: loops run their body once
//! against a snapshot and widen afterwards.
//!
//! The checker is deliberately thin on type theory. Everything it knows
//! about unions and assertions comes through the [`TypeOracle`] seam, and
//! everything it knows about classes, functions, and visibility comes
//! through [`SymbolResolver`]. Findings go to the host's `DiagnosticSink`;
//! a sink that answers "fatal" aborts the current body via the `?`-carried
//! [`phlow_common::Aborted`] value.
//!
//! Split by topic: statement dispatch in `statements`, variable scoping in
//! `variables`, branch merging in `branches`, loops in `loops`, and so on.
//! Most modules are `impl StatementsChecker` blocks.

pub mod codebase;
pub mod context;
pub mod oracle;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod settings;
pub mod statements;
pub mod termination;

mod assignments;
mod branches;
mod calls;
mod closures;
mod expressions;
mod loops;
mod properties;
mod switches;
mod variables;

pub use codebase::{ClassMeta, Codebase, FunctionMeta, MethodMeta};
pub use context::SourceContext;
pub use oracle::{SolverOracle, TypeOracle};
pub use registry::Registry;
pub use resolver::{FunctionParam, SymbolResolver, Visibility};
pub use scope::ScopeState;
pub use settings::CheckerSettings;
pub use statements::{Host, StatementsChecker};
pub use termination::{BlockTermination, TerminationOracle};
