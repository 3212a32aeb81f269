//! Host-configurable checking toggles.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// What the checker is allowed to complain about.
///
/// The flags start all-on and are flipped off at runtime by the dynamic
/// escape hatches of the checked language: a call to the member-existence
/// builtin disables method checks for the rest of the body, the
/// symbol-table extraction builtin disables variable checks, and so on.
/// Each body gets its own copy, so a toggle never leaks past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerSettings {
    pub check_classes: bool,
    pub check_variables: bool,
    pub check_methods: bool,
    pub check_consts: bool,
    pub check_functions: bool,
    /// Classes whose method and argument checks are skipped entirely.
    pub mock_classes: FxHashSet<String>,
    /// Files analyzed as if included into a caller's scope: reads of
    /// unknown variables are not undefined there.
    pub inherit_variables_files: FxHashSet<String>,
}

impl Default for CheckerSettings {
    fn default() -> Self {
        CheckerSettings {
            check_classes: true,
            check_variables: true,
            check_methods: true,
            check_consts: true,
            check_functions: true,
            mock_classes: FxHashSet::default(),
            inherit_variables_files: FxHashSet::default(),
        }
    }
}
