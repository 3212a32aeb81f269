//! Canonical keys for trackable l-values.
//!
//! An identity exists only for a bare variable (`x`) or a one-level property
//! access whose receiver is itself a bare variable (`this->name`,
//! `user->email`). Two identities are equal iff their canonical strings are
//! equal; everything downstream (scope maps, assertion maps, the seen-variable
//! registry) is keyed by this type.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

/// Canonical key for a variable or one-level property path.
///
/// The string form never carries the `$` sigil; diagnostic messages add it
/// back for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(String);

impl VarId {
    pub fn new(name: impl Into<String>) -> Self {
        VarId(name.into())
    }

    /// Key for a one-level property path on a bare-variable receiver.
    pub fn property(receiver: &str, property: &str) -> Self {
        VarId(format!("{receiver}->{property}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `this` and `this->...` paths.
    pub fn is_this_path(&self) -> bool {
        self.0 == "this" || self.0.starts_with("this->")
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VarId {
    fn from(name: &str) -> Self {
        VarId(name.to_string())
    }
}

impl From<String> for VarId {
    fn from(name: String) -> Self {
        VarId(name)
    }
}

impl Borrow<str> for VarId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
