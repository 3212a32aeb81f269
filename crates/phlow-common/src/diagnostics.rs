//! Diagnostics and the sink interface.
//!
//! The checker never throws for a finding: every issue becomes a
//! [`Diagnostic`] and is handed to the host's [`DiagnosticSink`]. The sink's
//! boolean answer is the only early-return path in the whole system - `true`
//! means "fatal, stop checking this body", which the checker surfaces as
//! [`Aborted`] and propagates with `?`.

use std::cell::RefCell;

use rustc_hash::FxHashSet;
use serde::Serialize;

/// Every diagnostic kind the checker can raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IssueKind {
    UndefinedVariable,
    PossiblyUndefinedVariable,
    UndefinedProperty,
    UndefinedConstant,
    UndefinedFunction,
    UndefinedMethod,
    InaccessibleMethod,
    InvalidStaticInvocation,
    InvalidStaticVariable,
    InvalidScope,
    NullReference,
    InvalidIterator,
    InvalidArgument,
    InvalidArrayAssignment,
    FailedTypeResolution,
    ForbiddenCode,
    InvalidNamespace,
    ParentNotFound,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::UndefinedVariable => "UndefinedVariable",
            IssueKind::PossiblyUndefinedVariable => "PossiblyUndefinedVariable",
            IssueKind::UndefinedProperty => "UndefinedProperty",
            IssueKind::UndefinedConstant => "UndefinedConstant",
            IssueKind::UndefinedFunction => "UndefinedFunction",
            IssueKind::UndefinedMethod => "UndefinedMethod",
            IssueKind::InaccessibleMethod => "InaccessibleMethod",
            IssueKind::InvalidStaticInvocation => "InvalidStaticInvocation",
            IssueKind::InvalidStaticVariable => "InvalidStaticVariable",
            IssueKind::InvalidScope => "InvalidScope",
            IssueKind::NullReference => "NullReference",
            IssueKind::InvalidIterator => "InvalidIterator",
            IssueKind::InvalidArgument => "InvalidArgument",
            IssueKind::InvalidArrayAssignment => "InvalidArrayAssignment",
            IssueKind::FailedTypeResolution => "FailedTypeResolution",
            IssueKind::ForbiddenCode => "ForbiddenCode",
            IssueKind::InvalidNamespace => "InvalidNamespace",
            IssueKind::ParentNotFound => "ParentNotFound",
        }
    }
}

/// One finding, located at a line of the checked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: IssueKind,
    pub message: String,
    pub file: String,
    pub line: u32,
}

impl Diagnostic {
    pub fn new(kind: IssueKind, message: impl Into<String>, file: &str, line: u32) -> Self {
        Diagnostic {
            kind,
            message: message.into(),
            file: file.to_string(),
            line,
        }
    }
}

/// Signal that a fatal finding aborted the current body.
///
/// Carried as the error half of [`CheckResult`]; it aborts one `check` call,
/// never the whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

/// Result alias used by every handler in the checker.
pub type CheckResult<T = ()> = Result<T, Aborted>;

/// Host-provided policy for findings.
///
/// Returning `true` marks the finding fatal: the checker stops walking the
/// current body. Returning `false` records-and-continues.
pub trait DiagnosticSink {
    fn accept(&self, diagnostic: Diagnostic) -> bool;
}

/// Sink that buffers findings, with a configurable set of fatal kinds.
///
/// The default configuration treats nothing as fatal, which is what most
/// tests and batch hosts want: one pass, every finding surfaced.
#[derive(Debug, Default)]
pub struct CollectingSink {
    issues: RefCell<Vec<Diagnostic>>,
    fatal: FxHashSet<IssueKind>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn with_fatal(kinds: impl IntoIterator<Item = IssueKind>) -> Self {
        CollectingSink {
            issues: RefCell::new(Vec::new()),
            fatal: kinds.into_iter().collect(),
        }
    }

    pub fn issues(&self) -> Vec<Diagnostic> {
        self.issues.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<IssueKind> {
        self.issues.borrow().iter().map(|d| d.kind).collect()
    }

    pub fn len(&self) -> usize {
        self.issues.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.borrow().is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn accept(&self, diagnostic: Diagnostic) -> bool {
        let fatal = self.fatal.contains(&diagnostic.kind);
        self.issues.borrow_mut().push(diagnostic);
        fatal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_records_and_reports_fatality() {
        let sink = CollectingSink::with_fatal([IssueKind::UndefinedVariable]);
        assert!(!sink.accept(Diagnostic::new(
            IssueKind::PossiblyUndefinedVariable,
            "Possibly undefined variable $a",
            "a.php",
            3,
        )));
        assert!(sink.accept(Diagnostic::new(
            IssueKind::UndefinedVariable,
            "Cannot find referenced variable $b",
            "a.php",
            4,
        )));
        assert_eq!(sink.len(), 2);
        assert_eq!(
            sink.kinds(),
            vec![
                IssueKind::PossiblyUndefinedVariable,
                IssueKind::UndefinedVariable
            ]
        );
    }

    #[test]
    fn diagnostics_serialize_for_host_emission() {
        let diag = Diagnostic::new(IssueKind::NullReference, "Cannot iterate over null", "x.php", 9);
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "NullReference");
        assert_eq!(json["line"], 9);
    }
}
