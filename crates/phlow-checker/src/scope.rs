//! Per-variable state for one body.

use rustc_hash::{FxHashMap, FxHashSet};

use phlow_common::VarId;
use phlow_solver::Union;

/// The checker's view of variables at one program point.
///
/// `bound` holds variables with a known type on every path reaching this
/// point. `reachable` holds every variable bound on at least one path;
/// `bound ⊆ reachable` always. A variable in `reachable` but not `bound`
/// is the "possibly undefined" state.
///
/// Branch handling clones the whole state eagerly and merges explicit
/// copies back; nothing here is shared or interior-mutable.
#[derive(Debug, Clone, Default)]
pub struct ScopeState {
    pub bound: FxHashMap<VarId, Union>,
    pub reachable: FxHashSet<VarId>,
}

impl ScopeState {
    pub fn new() -> Self {
        ScopeState::default()
    }

    /// Binds a variable on this path, keeping it reachable.
    pub fn bind(&mut self, id: VarId, ty: Union) {
        self.reachable.insert(id.clone());
        self.bound.insert(id, ty);
    }

    pub fn mark_reachable(&mut self, id: VarId) {
        self.reachable.insert(id);
    }

    pub fn type_of(&self, id: &VarId) -> Option<&Union> {
        self.bound.get(id)
    }

    pub fn is_bound(&self, id: &VarId) -> bool {
        self.bound.contains_key(id)
    }

    pub fn is_reachable(&self, id: &VarId) -> bool {
        self.reachable.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_implies_reachability() {
        let mut scope = ScopeState::new();
        scope.bind(VarId::new("a"), Union::int());
        assert!(scope.is_bound(&VarId::new("a")));
        assert!(scope.is_reachable(&VarId::new("a")));
        assert_eq!(scope.type_of(&VarId::new("a")).map(ToString::to_string), Some("int".to_owned()));
    }
}
