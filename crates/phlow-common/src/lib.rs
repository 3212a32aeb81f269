//! Shared vocabulary for the phlow flow checker.
//!
//! This crate holds the types every other crate speaks: l-value identities,
//! the diagnostic taxonomy, the sink interface the host plugs into, and the
//! abort signal that short-circuits a check when the sink declares a finding
//! fatal.

pub mod diagnostics;
pub mod var_id;

pub use diagnostics::{
    Aborted, CheckResult, CollectingSink, Diagnostic, DiagnosticSink, IssueKind,
};
pub use var_id::VarId;
