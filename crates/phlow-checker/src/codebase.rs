//! In-memory project knowledge.
//!
//! [`Codebase`] is the concrete [`SymbolResolver`] hosts populate before
//! checking: classes with their members, free functions, constants. Backed
//! by concurrent maps so one instance can serve parallel per-file checks
//! while a scanner is still filling it in.

use dashmap::{DashMap, DashSet};
use rustc_hash::{FxHashMap, FxHashSet};

use phlow_solver::Union;

use crate::resolver::{FunctionParam, SymbolResolver, Visibility};

/// A method as declared on a class.
#[derive(Debug, Clone)]
pub struct MethodMeta {
    pub visibility: Visibility,
    pub is_static: bool,
    pub params: Vec<FunctionParam>,
    pub return_type: Option<Union>,
}

impl MethodMeta {
    pub fn public() -> Self {
        MethodMeta {
            visibility: Visibility::Public,
            is_static: false,
            params: Vec::new(),
            return_type: None,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn params(mut self, params: Vec<FunctionParam>) -> Self {
        self.params = params;
        self
    }

    pub fn returning(mut self, ty: Union) -> Self {
        self.return_type = Some(ty);
        self
    }
}

/// A class, its ancestry, and its members. Method keys are lowercased.
#[derive(Debug, Clone, Default)]
pub struct ClassMeta {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub properties: FxHashSet<String>,
    pub static_properties: FxHashSet<String>,
    pub constants: FxHashSet<String>,
    pub methods: FxHashMap<String, MethodMeta>,
}

impl ClassMeta {
    pub fn new(name: impl Into<String>) -> Self {
        ClassMeta {
            name: name.into(),
            ..ClassMeta::default()
        }
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>) -> Self {
        self.properties.insert(name.into());
        self
    }

    pub fn with_static_property(mut self, name: impl Into<String>) -> Self {
        self.static_properties.insert(name.into());
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>) -> Self {
        self.constants.insert(name.into());
        self
    }

    pub fn with_method(mut self, name: &str, meta: MethodMeta) -> Self {
        self.methods.insert(name.to_ascii_lowercase(), meta);
        self
    }
}

/// A free function's signature.
#[derive(Debug, Clone, Default)]
pub struct FunctionMeta {
    pub params: Vec<FunctionParam>,
    pub return_type: Option<Union>,
}

impl FunctionMeta {
    pub fn new() -> Self {
        FunctionMeta::default()
    }

    pub fn params(mut self, params: Vec<FunctionParam>) -> Self {
        self.params = params;
        self
    }

    pub fn returning(mut self, ty: Union) -> Self {
        self.return_type = Some(ty);
        self
    }
}

#[derive(Debug, Default)]
pub struct Codebase {
    classes: DashMap<String, ClassMeta>,
    functions: DashMap<String, FunctionMeta>,
    constants: DashSet<String>,
}

impl Codebase {
    pub fn new() -> Self {
        Codebase::default()
    }

    pub fn add_class(&self, meta: ClassMeta) {
        self.classes.insert(meta.name.clone(), meta);
    }

    pub fn add_function(&self, name: &str, meta: FunctionMeta) {
        self.functions.insert(name.to_ascii_lowercase(), meta);
    }

    pub fn add_constant(&self, name: impl Into<String>) {
        self.constants.insert(name.into());
    }

    /// Walks the parent chain starting at `class`, calling `find` on each
    /// known class until it answers. Bounded in case of a parent cycle.
    fn walk_chain<T>(&self, class: &str, mut find: impl FnMut(&ClassMeta) -> Option<T>) -> Option<T> {
        let mut current = class.to_owned();
        for _ in 0..64 {
            let meta = self.classes.get(&current)?;
            if let Some(found) = find(&meta) {
                return Some(found);
            }
            current = meta.parent.clone()?;
        }
        None
    }

    fn find_method(&self, method_id: &str) -> Option<MethodMeta> {
        let (class, method) = method_id.split_once("::")?;
        self.walk_chain(class, |meta| meta.methods.get(method).cloned())
    }
}

impl SymbolResolver for Codebase {
    fn class_exists(&self, fq_class: &str) -> bool {
        self.classes.contains_key(fq_class)
    }

    fn is_subclass_of(&self, child: &str, parent: &str) -> bool {
        let mut current = self.parent_class(child);
        for _ in 0..64 {
            match current {
                Some(ancestor) if ancestor == parent => return true,
                Some(ancestor) => current = self.parent_class(&ancestor),
                None => return false,
            }
        }
        false
    }

    fn class_implements(&self, fq_class: &str, interface: &str) -> bool {
        self.walk_chain(fq_class, |meta| {
            meta.interfaces.iter().any(|i| i == interface).then_some(())
        })
        .is_some()
    }

    fn parent_class(&self, fq_class: &str) -> Option<String> {
        self.classes.get(fq_class)?.parent.clone()
    }

    fn class_property_names(&self, fq_class: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut seen = FxHashSet::default();
        let _ = self.walk_chain::<()>(fq_class, |meta| {
            for name in &meta.properties {
                if seen.insert(name.clone()) {
                    names.push(name.clone());
                }
            }
            None
        });
        names
    }

    fn function_exists(&self, function_id: &str) -> bool {
        self.functions.contains_key(&function_id.to_ascii_lowercase())
    }

    fn function_params(&self, function_id: &str) -> Option<Vec<FunctionParam>> {
        self.functions
            .get(&function_id.to_ascii_lowercase())
            .map(|meta| meta.params.clone())
    }

    fn function_return_type(&self, function_id: &str) -> Option<Union> {
        self.functions
            .get(&function_id.to_ascii_lowercase())?
            .return_type
            .clone()
    }

    fn method_exists(&self, method_id: &str) -> bool {
        self.find_method(method_id).is_some()
    }

    fn method_is_static(&self, method_id: &str) -> bool {
        self.find_method(method_id).is_some_and(|meta| meta.is_static)
    }

    fn method_visibility(&self, method_id: &str) -> Option<Visibility> {
        self.find_method(method_id).map(|meta| meta.visibility)
    }

    fn method_params(&self, method_id: &str) -> Option<Vec<FunctionParam>> {
        self.find_method(method_id).map(|meta| meta.params)
    }

    fn method_return_type(&self, method_id: &str) -> Option<Union> {
        self.find_method(method_id)?.return_type
    }

    fn property_exists(&self, property_id: &str) -> bool {
        let Some((class, property)) = property_id.split_once("::") else {
            return false;
        };
        self.walk_chain(class, |meta| meta.properties.contains(property).then_some(()))
            .is_some()
    }

    fn static_var_exists(&self, static_property_id: &str) -> bool {
        let Some((class, member)) = static_property_id.split_once("::") else {
            return false;
        };
        let member = member.strip_prefix('$').unwrap_or(member);
        self.walk_chain(class, |meta| {
            meta.static_properties.contains(member).then_some(())
        })
        .is_some()
    }

    fn constant_exists(&self, constant_id: &str) -> bool {
        match constant_id.split_once("::") {
            Some((class, constant)) => self
                .walk_chain(class, |meta| meta.constants.contains(constant).then_some(()))
                .is_some(),
            None => self.constants.contains(constant_id),
        }
    }
}
