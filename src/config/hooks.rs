//! Memoized descriptor lookups shared by every conversion on a config.
//!
//! Entries are inserted if absent; two threads racing on the same key may
//! both compute it, and the first insert wins. Misses are cached too.
use std::sync::Arc;

use dashmap::DashMap;

use super::plan::TypePlan;
use crate::describe::{FactoryHook, ToJsonHook};
use crate::types::TypeRef;
use crate::value::JsonKind;

#[derive(Clone, Default)]
pub struct HookCache {
    factories: DashMap<(TypeRef, JsonKind), Option<FactoryHook>>,
    to_json: DashMap<TypeRef, Option<ToJsonHook>>,
    plans: DashMap<TypeRef, Arc<TypePlan>>,
}

impl HookCache {
    pub fn factory(&self, ty: &TypeRef, kind: JsonKind, find: impl FnOnce() -> Option<FactoryHook>) -> Option<FactoryHook> {
        let key = (ty.non_null(), kind);
        if let Some(hit) = self.factories.get(&key) {
            return hit.clone();
        }
        let found = find();
        tracing::trace!(ty = %ty, kind = %kind, found = found.is_some(), "factory lookup");
        self.factories.entry(key).or_insert(found).clone()
    }

    pub fn to_json(&self, ty: &TypeRef, find: impl FnOnce() -> Option<ToJsonHook>) -> Option<ToJsonHook> {
        let key = ty.non_null();
        if let Some(hit) = self.to_json.get(&key) {
            return hit.clone();
        }
        let found = find();
        tracing::trace!(ty = %ty, found = found.is_some(), "to_json lookup");
        self.to_json.entry(key).or_insert(found).clone()
    }

    pub fn plan(&self, ty: &TypeRef, build: impl FnOnce() -> TypePlan) -> Arc<TypePlan> {
        let key = ty.raw();
        if let Some(hit) = self.plans.get(&key) {
            return Arc::clone(&hit);
        }
        let plan = Arc::new(build());
        Arc::clone(&self.plans.entry(key).or_insert(plan))
    }

    pub fn clear(&self) {
        self.factories.clear();
        self.to_json.clear();
        self.plans.clear();
    }

    pub fn len(&self) -> usize { self.factories.len() + self.to_json.len() + self.plans.len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misses_are_cached() {
        let cache = HookCache::default();
        let ty = TypeRef::named("X");
        let mut calls = 0;
        assert!(cache.factory(&ty, JsonKind::String, || { calls += 1; None }).is_none());
        assert!(cache.factory(&ty.clone().nullable(), JsonKind::String, || { calls += 1; None }).is_none());
        assert_eq!(calls, 1);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
