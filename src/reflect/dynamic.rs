//! Containers the deserializer builds before the concrete collection type is
//! known. `FromReflect` impls for `Vec`, `HashMap`, tuples and friends drain
//! these element by element.
use super::{native_ref, Native, Reflect, ReflectRef};
use crate::types::{Classifier, TypeRef};

#[derive(Default)]
pub struct DynamicList {
    items: Vec<Native>,
}

impl DynamicList {
    pub fn new(items: Vec<Native>) -> Self { Self { items } }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn into_items(self) -> Vec<Native> { self.items }
}

impl Reflect for DynamicList {
    fn runtime_type(&self) -> TypeRef { TypeRef::generic(Classifier::List, vec![TypeRef::any().nullable()]) }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Iter(Box::new(self.items.iter().map(native_ref))) }
}

#[derive(Default)]
pub struct DynamicMap {
    entries: Vec<(Native, Native)>,
}

impl DynamicMap {
    pub fn new(entries: Vec<(Native, Native)>) -> Self { Self { entries } }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn into_entries(self) -> Vec<(Native, Native)> { self.entries }
}

impl Reflect for DynamicMap {
    fn runtime_type(&self) -> TypeRef {
        TypeRef::generic(Classifier::LinkedMap, vec![TypeRef::any(), TypeRef::any().nullable()])
    }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Map(Box::new(self.entries.iter().map(|(k, v)| (native_ref(k), native_ref(v)))))
    }
}

/// Fixed-arity product, two or three slots.
pub struct DynamicTuple {
    items: Vec<Native>,
}

impl DynamicTuple {
    pub fn new(items: Vec<Native>) -> Self { Self { items } }

    pub fn into_items(self) -> Vec<Native> { self.items }
}

impl Reflect for DynamicTuple {
    fn runtime_type(&self) -> TypeRef {
        let classifier = if self.items.len() == 3 { Classifier::Triple } else { Classifier::Pair };
        TypeRef::generic(classifier, vec![TypeRef::any().nullable(); self.items.len()])
    }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Tuple(self.items.iter().map(native_ref).collect()) }
}
