//! Possibly-qualified names for classes, interfaces, and functions.

use rustc_hash::FxHashMap;

/// A name as written in source: `Foo`, `Acme\Db\Conn`, or `\Acme\Conn`.
///
/// A leading backslash means fully-qualified. `self`, `static`, and `parent`
/// are ordinary names here; callers decide what they resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name {
    pub text: String,
}

impl Name {
    pub fn new(text: impl Into<String>) -> Self {
        Name { text: text.into() }
    }

    pub fn is_fully_qualified(&self) -> bool {
        self.text.starts_with('\\')
    }

    /// First segment, without any leading backslash.
    pub fn first_part(&self) -> &str {
        let text = self.text.strip_prefix('\\').unwrap_or(&self.text);
        text.split('\\').next().unwrap_or(text)
    }

    pub fn is_self(&self) -> bool {
        self.text == "self"
    }

    pub fn is_static(&self) -> bool {
        self.text == "static"
    }

    pub fn is_parent(&self) -> bool {
        self.text == "parent"
    }

    /// Resolve to an absolute class name relative to a namespace and a set of
    /// `use` aliases.
    ///
    /// A fully-qualified name is taken verbatim. Otherwise, if the first
    /// segment matches an alias the alias target replaces it; failing that
    /// the current namespace (when any) is prepended. Alias keys are stored
    /// lowercased, matching the language's case-insensitive imports.
    pub fn qualify(&self, namespace: Option<&str>, aliases: &FxHashMap<String, String>) -> String {
        if let Some(rest) = self.text.strip_prefix('\\') {
            return rest.to_string();
        }
        let first = self.first_part();
        if let Some(target) = aliases.get(&first.to_ascii_lowercase()) {
            let rest = &self.text[first.len()..];
            return format!("{target}{rest}");
        }
        match namespace {
            Some(ns) => format!("{ns}\\{}", self.text),
            None => self.text.clone(),
        }
    }
}

impl From<&str> for Name {
    fn from(text: &str) -> Self {
        Name::new(text)
    }
}
