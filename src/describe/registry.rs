use std::collections::HashMap;
use std::sync::Arc;

use super::{Describe, TypeDescriptor, TypeIntrospector};
use crate::types::TypeRef;

/// Descriptors keyed by non-null type reference. Sealed variants are
/// registered alongside their family so they can be found by runtime type.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    types: HashMap<TypeRef, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self { Self::default() }

    pub fn register<T: Describe>(&mut self) { self.add(T::describe()) }

    pub fn add(&mut self, descriptor: TypeDescriptor) { self.insert(Arc::new(descriptor)) }

    fn insert(&mut self, descriptor: Arc<TypeDescriptor>) {
        for variant in descriptor.variants() {
            self.insert(Arc::clone(variant));
        }
        tracing::debug!(ty = %descriptor.type_ref(), "registered descriptor");
        self.types.insert(descriptor.type_ref().clone(), descriptor);
    }

    /// Exact (non-null) match first, then the bare classifier so that
    /// `Page<i32>` finds the descriptor registered for `Page`.
    pub fn get(&self, ty: &TypeRef) -> Option<&Arc<TypeDescriptor>> {
        self.types.get(&ty.non_null()).or_else(|| self.types.get(&ty.raw()))
    }

    pub fn contains(&self, ty: &TypeRef) -> bool { self.get(ty).is_some() }

    pub fn len(&self) -> usize { self.types.len() }

    pub fn is_empty(&self) -> bool { self.types.is_empty() }

    /// Copy in every descriptor of `other`; `other` wins on conflicts.
    pub fn merge(&mut self, other: &TypeRegistry) {
        for (k, v) in &other.types {
            self.types.insert(k.clone(), Arc::clone(v));
        }
    }
}

impl TypeIntrospector for TypeRegistry {
    fn descriptor(&self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>> { self.get(ty).cloned() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classifier;

    #[test]
    fn variants_are_reachable() {
        let mut reg = TypeRegistry::new();
        reg.add(
            TypeDescriptor::sealed(TypeRef::named("Expr"))
                .variant(TypeDescriptor::record(TypeRef::named("Expr::Const")))
                .variant(TypeDescriptor::record(TypeRef::named("Expr::NotANumber"))),
        );
        assert_eq!(reg.len(), 3);
        let c = reg.get(&TypeRef::named("Expr::Const")).unwrap();
        assert_eq!(c.sealed_parent(), Some(&TypeRef::named("Expr")));
        assert_eq!(reg.supertypes(&TypeRef::named("Expr::Const")), vec![TypeRef::named("Expr")]);
    }

    #[test]
    fn raw_fallback_and_nullability() {
        let mut reg = TypeRegistry::new();
        reg.add(TypeDescriptor::record(TypeRef::named("Page")));
        let page_of_int = TypeRef::named("Page").with_args(vec![TypeRef::new(Classifier::Int)]).nullable();
        assert!(reg.contains(&page_of_int));
        assert!(!reg.contains(&TypeRef::named("Other")));
    }
}
