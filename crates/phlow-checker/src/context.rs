//! Where a body being checked lives.

use rustc_hash::FxHashMap;

use phlow_ast::Name;
use phlow_solver::AssertionContext;

/// Location and name-resolution context for the body being checked.
///
/// A file-level body starts with [`SourceContext::file`]; hosts checking a
/// method body fill in the class fields so `$this`, `self`, and `parent`
/// resolve. The checker clones this freely: nested closures and declared
/// functions get their own adjusted copy.
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    pub file_name: String,
    pub namespace: Option<String>,
    /// Lowercased alias → fully qualified name, fed by `use` statements.
    pub aliased_classes: FxHashMap<String, String>,
    /// Unqualified name of the enclosing class.
    pub class_name: Option<String>,
    /// Fully qualified name of the enclosing class.
    pub absolute_class: Option<String>,
    pub parent_class: Option<String>,
    /// `Class::method` (method part lowercased) or a bare function id.
    pub method_id: Option<String>,
    pub is_static: bool,
}

impl SourceContext {
    pub fn file(file_name: impl Into<String>) -> Self {
        SourceContext {
            file_name: file_name.into(),
            ..SourceContext::default()
        }
    }

    /// Context for a method body of `class_name` in the current namespace.
    pub fn for_method(
        file_name: impl Into<String>,
        absolute_class: impl Into<String>,
        method_name: &str,
        is_static: bool,
    ) -> Self {
        let absolute_class = absolute_class.into();
        let class_name = absolute_class
            .rsplit('\\')
            .next()
            .unwrap_or(&absolute_class)
            .to_owned();
        let method_id = format!("{absolute_class}::{}", method_name.to_ascii_lowercase());
        SourceContext {
            file_name: file_name.into(),
            namespace: None,
            aliased_classes: FxHashMap::default(),
            class_name: Some(class_name),
            absolute_class: Some(absolute_class),
            parent_class: None,
            method_id: Some(method_id),
            is_static,
        }
    }

    pub fn with_parent_class(mut self, parent: impl Into<String>) -> Self {
        self.parent_class = Some(parent.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Resolves a source-level name against this context.
    pub fn qualify(&self, name: &Name) -> String {
        name.qualify(self.namespace.as_deref(), &self.aliased_classes)
    }

    pub fn assertion_context(&self) -> AssertionContext<'_> {
        AssertionContext {
            namespace: self.namespace.as_deref(),
            aliases: &self.aliased_classes,
            self_class: self.absolute_class.as_deref(),
        }
    }

    /// The id used as "caller" in the call graph: the enclosing method if
    /// any, the file otherwise.
    pub fn calling_id(&self) -> &str {
        self.method_id.as_deref().unwrap_or(&self.file_name)
    }
}
