//! The symbol-knowledge seam.

use phlow_solver::Union;

/// Member visibility as declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// A declared parameter as the resolver knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionParam {
    pub name: String,
    pub ty: Option<Union>,
    pub by_ref: bool,
}

impl FunctionParam {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionParam {
            name: name.into(),
            ty: None,
            by_ref: false,
        }
    }

    pub fn typed(name: impl Into<String>, ty: Union) -> Self {
        FunctionParam {
            name: name.into(),
            ty: Some(ty),
            by_ref: false,
        }
    }

    pub fn by_ref(name: impl Into<String>) -> Self {
        FunctionParam {
            name: name.into(),
            ty: None,
            by_ref: true,
        }
    }
}

/// Answers the checker's questions about classes, functions, and members.
///
/// Identifier shapes: classes are fully qualified without a leading
/// backslash; methods are `Class::method` with the method part lowercased;
/// properties are `Class::name`; static properties are `Class::$name`;
/// functions and constants are bare names, functions lowercased.
///
/// Implementations answer from whatever they have - reflection data, stubs,
/// a previously-scanned project. [`crate::Codebase`] is the in-memory one.
pub trait SymbolResolver {
    fn class_exists(&self, fq_class: &str) -> bool;

    /// Strict ancestry: `child` extends `parent` somewhere up the chain.
    fn is_subclass_of(&self, child: &str, parent: &str) -> bool;

    fn class_implements(&self, fq_class: &str, interface: &str) -> bool;

    fn parent_class(&self, fq_class: &str) -> Option<String>;

    /// Instance property names declared on the class or an ancestor.
    fn class_property_names(&self, fq_class: &str) -> Vec<String>;

    fn function_exists(&self, function_id: &str) -> bool;

    fn function_params(&self, function_id: &str) -> Option<Vec<FunctionParam>>;

    fn function_return_type(&self, function_id: &str) -> Option<Union>;

    fn method_exists(&self, method_id: &str) -> bool;

    fn method_is_static(&self, method_id: &str) -> bool;

    fn method_visibility(&self, method_id: &str) -> Option<Visibility>;

    fn method_params(&self, method_id: &str) -> Option<Vec<FunctionParam>>;

    fn method_return_type(&self, method_id: &str) -> Option<Union>;

    fn property_exists(&self, property_id: &str) -> bool;

    fn static_var_exists(&self, static_property_id: &str) -> bool;

    fn constant_exists(&self, constant_id: &str) -> bool;
}
