//! Facts accumulated across bodies during one run.
//!
//! One [`Registry`] is shared by every checker of a run (hosts typically
//! check files in parallel), so everything here is a concurrent map. It
//! remembers who calls what, which properties methods assign on their
//! receiver, and which symbols were declared or already resolved, so later
//! bodies can reuse the answers.

use std::collections::VecDeque;

use dashmap::{DashMap, DashSet};
use rustc_hash::{FxHashMap, FxHashSet};

use phlow_solver::Union;

#[derive(Debug, Default)]
pub struct Registry {
    /// Callee method id → ids of bodies that call it.
    method_callers: DashMap<String, Vec<String>>,
    /// Method id → receiver properties it assigns, with their types.
    this_assignments: DashMap<String, FxHashMap<String, Union>>,
    /// Method id → method ids it calls on its own receiver.
    this_calls: DashMap<String, Vec<String>>,
    declared_functions: DashSet<String>,
    known_properties: DashSet<String>,
    known_static_vars: DashSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn record_call(&self, method_id: &str, calling_id: &str) {
        self.method_callers
            .entry(method_id.to_owned())
            .or_default()
            .push(calling_id.to_owned());
    }

    pub fn callers_of(&self, method_id: &str) -> Vec<String> {
        self.method_callers
            .get(method_id)
            .map(|callers| callers.clone())
            .unwrap_or_default()
    }

    /// Walks the caller graph upwards and returns the non-method bodies
    /// (files) from which `method_id` is transitively reachable.
    pub fn entry_points(&self, method_id: &str) -> Vec<String> {
        let mut queue = VecDeque::from([method_id.to_owned()]);
        let mut visited = FxHashSet::default();
        visited.insert(method_id.to_owned());
        let mut roots = Vec::new();
        while let Some(current) = queue.pop_front() {
            for caller in self.callers_of(&current) {
                if !visited.insert(caller.clone()) {
                    continue;
                }
                if caller.contains("::") {
                    queue.push_back(caller);
                } else {
                    roots.push(caller);
                }
            }
        }
        roots.sort();
        roots.dedup();
        roots
    }

    pub fn record_this_call(&self, method_id: &str, called_method_id: &str) {
        self.this_calls
            .entry(method_id.to_owned())
            .or_default()
            .push(called_method_id.to_owned());
    }

    pub fn record_this_assignment(&self, method_id: &str, property: &str, ty: Union) {
        let mut assignments = self.this_assignments.entry(method_id.to_owned()).or_default();
        let merged = match assignments.get(property) {
            Some(existing) => existing.combine(&ty),
            None => ty,
        };
        assignments.insert(property.to_owned(), merged);
    }

    /// Receiver properties `method_id` assigns, directly or through the
    /// receiver methods it calls. With `include_constructor`, what the
    /// class constructor assigns is folded in first.
    pub fn this_assignments_for(
        &self,
        method_id: &str,
        include_constructor: bool,
    ) -> FxHashMap<String, Union> {
        let mut merged = FxHashMap::default();
        if include_constructor {
            if let Some(class) = method_id.split("::").next() {
                self.merge_assignments_of(&format!("{class}::__construct"), &mut merged);
            }
        }
        let mut stack = vec![method_id.to_owned()];
        let mut visited = FxHashSet::default();
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            self.merge_assignments_of(&current, &mut merged);
            if let Some(calls) = self.this_calls.get(&current) {
                stack.extend(calls.iter().cloned());
            }
        }
        merged
    }

    fn merge_assignments_of(&self, method_id: &str, into: &mut FxHashMap<String, Union>) {
        let Some(assignments) = self.this_assignments.get(method_id) else {
            return;
        };
        for (property, ty) in assignments.iter() {
            let merged = match into.get(property) {
                Some(existing) => existing.combine(ty),
                None => ty.clone(),
            };
            into.insert(property.clone(), merged);
        }
    }

    pub fn register_function(&self, function_id: &str) {
        self.declared_functions.insert(function_id.to_ascii_lowercase());
    }

    pub fn function_registered(&self, function_id: &str) -> bool {
        self.declared_functions.contains(&function_id.to_ascii_lowercase())
    }

    /// Remembers that a property id resolved, either from a declaration
    /// walked in this run or from a resolver hit.
    pub fn note_property(&self, property_id: &str) {
        self.known_properties.insert(property_id.to_owned());
    }

    pub fn property_known(&self, property_id: &str) -> bool {
        self.known_properties.contains(property_id)
    }

    pub fn note_static_var(&self, static_property_id: &str) {
        self.known_static_vars.insert(static_property_id.to_owned());
    }

    pub fn static_var_known(&self, static_property_id: &str) -> bool {
        self.known_static_vars.contains(static_property_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_walk_past_intermediate_methods() {
        let registry = Registry::new();
        registry.record_call("A::leaf", "A::mid");
        registry.record_call("A::mid", "index.php");
        registry.record_call("A::leaf", "other.php");
        assert_eq!(registry.entry_points("A::leaf"), vec!["index.php", "other.php"]);
    }

    #[test]
    fn receiver_assignments_fold_in_called_methods_and_constructor() {
        let registry = Registry::new();
        registry.record_this_assignment("A::__construct", "db", Union::named("Db"));
        registry.record_this_assignment("A::setup", "count", Union::int());
        registry.record_this_assignment("A::helper", "count", Union::null());
        registry.record_this_call("A::setup", "A::helper");

        let merged = registry.this_assignments_for("A::setup", true);
        assert_eq!(merged["db"].to_string(), "Db");
        assert_eq!(merged["count"].to_string(), "int|null");
    }

    #[test]
    fn cyclic_receiver_calls_terminate() {
        let registry = Registry::new();
        registry.record_this_call("A::x", "A::y");
        registry.record_this_call("A::y", "A::x");
        registry.record_this_assignment("A::y", "flag", Union::bool());
        let merged = registry.this_assignments_for("A::x", false);
        assert_eq!(merged["flag"].to_string(), "bool");
    }
}
