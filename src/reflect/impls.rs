//! Reflection for std, chrono and friends.
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use fixedbitset::FixedBitSet;
use indexmap::{IndexMap, IndexSet};
use num_bigint::BigInt;
use uuid::Uuid;

use super::{downcast_box, downcast_native, DynamicList, DynamicMap, DynamicTuple, FromReflect, Native, Reflect, ReflectRef};
use crate::native::{CharArray, Number, Sequence};
use crate::temporal::{self, Calendar, MonthDay, OffsetTime, Period, Year, YearMonth, ZonedDateTime};
use crate::types::{Classifier, TemporalKind, TypeRef, Typed};
use crate::value::JsonValue;

// ------------------------------- Scalars ---------------------------------- //

macro_rules! impl_scalar {
    ($ty:ty, $classifier:expr, |$v:ident| $view:expr) => {
        impl Typed for $ty {
            fn type_ref() -> TypeRef { TypeRef::new($classifier) }
        }

        impl Reflect for $ty {
            fn runtime_type(&self) -> TypeRef { <$ty as Typed>::type_ref() }

            fn reflect_ref(&self) -> ReflectRef<'_> {
                let $v = self;
                $view
            }
        }

        impl FromReflect for $ty {
            fn from_native(native: Native) -> Option<Self> { downcast_native(native) }
        }
    };
}

impl_scalar!(bool, Classifier::Bool, |v| ReflectRef::Bool(*v));
impl_scalar!(char, Classifier::Char, |v| ReflectRef::Char(*v));
impl_scalar!(i8, Classifier::Byte, |v| ReflectRef::Int(i32::from(*v)));
impl_scalar!(i16, Classifier::Short, |v| ReflectRef::Int(i32::from(*v)));
impl_scalar!(i32, Classifier::Int, |v| ReflectRef::Int(*v));
impl_scalar!(i64, Classifier::Long, |v| ReflectRef::Long(*v));
impl_scalar!(f32, Classifier::Float, |v| ReflectRef::Float(*v));
impl_scalar!(f64, Classifier::Double, |v| ReflectRef::Double(*v));
impl_scalar!(BigInt, Classifier::BigInteger, |v| ReflectRef::BigInt(v));
impl_scalar!(BigDecimal, Classifier::BigDecimal, |v| ReflectRef::Decimal(v));
impl_scalar!(String, Classifier::String, |v| ReflectRef::Str(v.as_str()));
impl_scalar!(JsonValue, Classifier::Json, |v| ReflectRef::Json(v));
impl_scalar!(CharArray, Classifier::CharArray, |v| ReflectRef::CharArray(&v.0));
impl_scalar!(Uuid, Classifier::Uuid, |v| ReflectRef::Text(v.hyphenated().to_string()));
impl_scalar!(FixedBitSet, Classifier::BitSet, |v| ReflectRef::BitSet(v));
impl_scalar!(Number, Classifier::Number, |v| match v {
    Number::Int(i) => ReflectRef::Int(*i),
    Number::Long(l) => ReflectRef::Long(*l),
    Number::Float(f) => ReflectRef::Float(*f),
    Number::Double(d) => ReflectRef::Double(*d),
    Number::Decimal(d) => ReflectRef::Decimal(d),
});

// ------------------------------- Temporal --------------------------------- //

macro_rules! impl_temporal {
    ($ty:ty, $kind:ident, |$v:ident| $view:expr) => {
        impl_scalar!($ty, Classifier::Temporal(TemporalKind::$kind), |$v| $view);
    };
}

impl_temporal!(DateTime<Utc>, Instant, |v| ReflectRef::Text(temporal::format_instant(v)));
impl_temporal!(NaiveDate, LocalDate, |v| ReflectRef::Text(temporal::format_local_date(v)));
impl_temporal!(NaiveDateTime, LocalDateTime, |v| ReflectRef::Text(temporal::format_local_date_time(v)));
impl_temporal!(NaiveTime, LocalTime, |v| ReflectRef::Text(v.format("%H:%M:%S%.f").to_string()));
impl_temporal!(OffsetTime, OffsetTime, |v| ReflectRef::Text(v.to_string()));
impl_temporal!(DateTime<FixedOffset>, OffsetDateTime, |v| ReflectRef::Text(temporal::format_offset_date_time(v)));
impl_temporal!(ZonedDateTime, ZonedDateTime, |v| ReflectRef::Text(v.to_string()));
impl_temporal!(Year, Year, |v| ReflectRef::Text(v.to_string()));
impl_temporal!(YearMonth, YearMonth, |v| ReflectRef::Text(v.to_string()));
impl_temporal!(MonthDay, MonthDay, |v| ReflectRef::Text(v.to_string()));
impl_temporal!(TimeDelta, Duration, |v| ReflectRef::Text(temporal::format_duration(v)));
impl_temporal!(Period, Period, |v| ReflectRef::Text(v.to_string()));
impl_temporal!(SystemTime, Date, |v| ReflectRef::Date(temporal::system_time_to_calendar(v)));
impl_temporal!(Calendar, Calendar, |v| ReflectRef::Date(v.0));

// ----------------------------- Transparent -------------------------------- //

impl<T: Typed> Typed for Option<T> {
    fn type_ref() -> TypeRef { T::type_ref().nullable() }
}

impl<T: Reflect + Typed> Reflect for Option<T> {
    fn runtime_type(&self) -> TypeRef {
        match self {
            Some(v) => v.runtime_type(),
            None => Self::type_ref(),
        }
    }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        match self {
            Some(v) => v.reflect_ref(),
            None => ReflectRef::Null,
        }
    }

    fn inner(&self) -> Option<&dyn Reflect> { self.as_ref().map(|v| v as &dyn Reflect) }
}

impl<T: FromReflect + Typed> FromReflect for Option<T> {
    fn from_native(native: Native) -> Option<Self> {
        match native {
            None => Some(None),
            some => T::from_native(some).map(Some),
        }
    }
}

/// Set-once cell; empty reflects as null. Lets a graph close a cycle after
/// construction.
impl<T: Typed> Typed for OnceLock<T> {
    fn type_ref() -> TypeRef { T::type_ref().nullable() }
}

impl<T: Reflect + Typed> Reflect for OnceLock<T> {
    fn runtime_type(&self) -> TypeRef { self.get().map_or_else(Self::type_ref, Reflect::runtime_type) }

    fn reflect_ref(&self) -> ReflectRef<'_> { self.get().map_or(ReflectRef::Null, Reflect::reflect_ref) }

    fn inner(&self) -> Option<&dyn Reflect> { self.get().map(|v| v as &dyn Reflect) }
}

impl<T: FromReflect + Typed> FromReflect for OnceLock<T> {
    fn from_native(native: Native) -> Option<Self> {
        match native {
            None => Some(OnceLock::new()),
            some => T::from_native(some).map(OnceLock::from),
        }
    }
}

macro_rules! impl_pointer {
    ($ptr:ident) => {
        impl<T: Typed> Typed for $ptr<T> {
            fn type_ref() -> TypeRef { T::type_ref() }
        }

        impl<T: Reflect> Reflect for $ptr<T> {
            fn runtime_type(&self) -> TypeRef { (**self).runtime_type() }

            fn reflect_ref(&self) -> ReflectRef<'_> { (**self).reflect_ref() }

            fn inner(&self) -> Option<&dyn Reflect> { Some(&**self) }
        }

        impl<T: FromReflect> FromReflect for $ptr<T> {
            fn from_native(native: Native) -> Option<Self> { T::from_native(native).map($ptr::new) }
        }
    };
}

impl_pointer!(Box);
impl_pointer!(Arc);

/// Untyped value: whatever the deserializer produced for an `Any` target.
impl Typed for Box<dyn Reflect> {
    fn type_ref() -> TypeRef { TypeRef::any() }
}

impl Reflect for Box<dyn Reflect> {
    fn runtime_type(&self) -> TypeRef { (**self).runtime_type() }

    fn reflect_ref(&self) -> ReflectRef<'_> { (**self).reflect_ref() }

    fn inner(&self) -> Option<&dyn Reflect> { Some(&**self) }
}

impl FromReflect for Box<dyn Reflect> {
    fn from_native(native: Native) -> Option<Self> { native }
}

// ------------------------------ Sequences --------------------------------- //

/// Either the concrete collection itself, or the items of a dynamic list.
fn list_items<C: Reflect>(native: Native) -> Option<Result<C, Vec<Native>>> {
    let boxed = native?;
    if (*boxed).as_any().is::<C>() {
        return downcast_box::<C>(boxed).map(Ok);
    }
    downcast_box::<DynamicList>(boxed).map(|list| Err(list.into_items()))
}

fn collect_items<T: FromReflect, C: FromIterator<T>>(items: Vec<Native>) -> Option<C> {
    items.into_iter().map(T::from_native).collect()
}

macro_rules! impl_sequence {
    ($coll:ident, $classifier:expr $(, $bound:path)*) => {
        impl<T: Typed> Typed for $coll<T> {
            fn type_ref() -> TypeRef { TypeRef::generic($classifier, vec![T::type_ref()]) }
        }

        impl<T: Reflect + Typed> Reflect for $coll<T> {
            fn runtime_type(&self) -> TypeRef { <Self as Typed>::type_ref() }

            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Iter(Box::new(self.iter().map(|item| item as &dyn Reflect)))
            }
        }

        impl<T: FromReflect + Typed $(+ $bound)*> FromReflect for $coll<T> {
            fn from_native(native: Native) -> Option<Self> {
                match list_items::<Self>(native)? {
                    Ok(same) => Some(same),
                    Err(items) => collect_items(items),
                }
            }
        }
    };
}

impl_sequence!(Vec, Classifier::List);
impl_sequence!(VecDeque, Classifier::LinkedList);
impl_sequence!(HashSet, Classifier::Set, Eq, Hash);
impl_sequence!(IndexSet, Classifier::LinkedSet, Eq, Hash);
impl_sequence!(Sequence, Classifier::Sequence);

impl<T: Typed> Typed for Box<[T]> {
    fn type_ref() -> TypeRef { TypeRef::generic(Classifier::Array, vec![T::type_ref()]) }
}

impl<T: Reflect + Typed> Reflect for Box<[T]> {
    fn runtime_type(&self) -> TypeRef { <Self as Typed>::type_ref() }

    fn reflect_ref(&self) -> ReflectRef<'_> {
        ReflectRef::Array(Box::new(self.iter().map(|item| item as &dyn Reflect)))
    }
}

impl<T: FromReflect + Typed> FromReflect for Box<[T]> {
    fn from_native(native: Native) -> Option<Self> {
        match list_items::<Self>(native)? {
            Ok(same) => Some(same),
            Err(items) => collect_items(items),
        }
    }
}

// -------------------------------- Tuples ---------------------------------- //

fn tuple_items(native: Native, arity: usize) -> Option<Vec<Native>> {
    let items = downcast_box::<DynamicTuple>(native?)?.into_items();
    (items.len() == arity).then_some(items)
}

impl<A: Typed, B: Typed> Typed for (A, B) {
    fn type_ref() -> TypeRef { TypeRef::generic(Classifier::Pair, vec![A::type_ref(), B::type_ref()]) }
}

impl<A: Reflect + Typed, B: Reflect + Typed> Reflect for (A, B) {
    fn runtime_type(&self) -> TypeRef { <Self as Typed>::type_ref() }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Tuple(vec![&self.0, &self.1]) }
}

impl<A: FromReflect + Typed, B: FromReflect + Typed> FromReflect for (A, B) {
    fn from_native(native: Native) -> Option<Self> {
        let mut items = tuple_items(native, 2)?.into_iter();
        Some((A::from_native(items.next()?)?, B::from_native(items.next()?)?))
    }
}

impl<A: Typed, B: Typed, C: Typed> Typed for (A, B, C) {
    fn type_ref() -> TypeRef {
        TypeRef::generic(Classifier::Triple, vec![A::type_ref(), B::type_ref(), C::type_ref()])
    }
}

impl<A: Reflect + Typed, B: Reflect + Typed, C: Reflect + Typed> Reflect for (A, B, C) {
    fn runtime_type(&self) -> TypeRef { <Self as Typed>::type_ref() }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Tuple(vec![&self.0, &self.1, &self.2]) }
}

impl<A: FromReflect + Typed, B: FromReflect + Typed, C: FromReflect + Typed> FromReflect for (A, B, C) {
    fn from_native(native: Native) -> Option<Self> {
        let mut items = tuple_items(native, 3)?.into_iter();
        Some((
            A::from_native(items.next()?)?,
            B::from_native(items.next()?)?,
            C::from_native(items.next()?)?,
        ))
    }
}

// --------------------------------- Maps ----------------------------------- //

fn map_entries<M: Reflect>(native: Native) -> Option<Result<M, Vec<(Native, Native)>>> {
    let boxed = native?;
    if (*boxed).as_any().is::<M>() {
        return downcast_box::<M>(boxed).map(Ok);
    }
    downcast_box::<DynamicMap>(boxed).map(|map| Err(map.into_entries()))
}

macro_rules! impl_map {
    ($map:ident, $classifier:expr $(, $bound:path)*) => {
        impl<K: Typed, V: Typed> Typed for $map<K, V> {
            fn type_ref() -> TypeRef { TypeRef::generic($classifier, vec![K::type_ref(), V::type_ref()]) }
        }

        impl<K: Reflect + Typed, V: Reflect + Typed> Reflect for $map<K, V> {
            fn runtime_type(&self) -> TypeRef { <Self as Typed>::type_ref() }

            fn reflect_ref(&self) -> ReflectRef<'_> {
                ReflectRef::Map(Box::new(self.iter().map(|(k, v)| (k as &dyn Reflect, v as &dyn Reflect))))
            }
        }

        impl<K: FromReflect + Typed $(+ $bound)*, V: FromReflect + Typed> FromReflect for $map<K, V> {
            fn from_native(native: Native) -> Option<Self> {
                match map_entries::<Self>(native)? {
                    Ok(same) => Some(same),
                    Err(entries) => entries
                        .into_iter()
                        .map(|(k, v)| Some((K::from_native(k)?, V::from_native(v)?)))
                        .collect(),
                }
            }
        }
    };
}

impl_map!(HashMap, Classifier::Map, Eq, Hash);
impl_map!(IndexMap, Classifier::LinkedMap, Eq, Hash);
impl_map!(BTreeMap, Classifier::SortedMap, Ord);
