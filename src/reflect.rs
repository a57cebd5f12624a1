//! Runtime views of Rust values.
//!
//! The serializer reads values through [`Reflect::reflect_ref`]; the
//! deserializer produces boxed [`Reflect`] values (concrete scalars or the
//! dynamic containers in [`dynamic`]) that [`FromReflect`] folds back into
//! the caller's concrete type.
pub mod dynamic;
pub mod impls;

use std::any::Any;

use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset};
use fixedbitset::FixedBitSet;
use num_bigint::BigInt;

use crate::types::TypeRef;
use crate::value::JsonValue;

pub use dynamic::{DynamicList, DynamicMap, DynamicTuple};

/// Upcast helpers. Blanket-implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    #[inline]
    fn as_any(&self) -> &dyn Any { self }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any { self }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> { self }
}

/// A value the serializer can walk.
pub trait Reflect: AsAny + Send + Sync {
    /// Type of this particular value. Sealed families answer with the
    /// variant's type, not the family's.
    fn runtime_type(&self) -> TypeRef;

    fn reflect_ref(&self) -> ReflectRef<'_>;

    /// The wrapped value, for transparent wrappers such as `Option`, `Box`
    /// and `Arc`. Leaves answer `None`.
    fn inner(&self) -> Option<&dyn Reflect> { None }
}

/// Strip transparent wrappers down to the value that carries the data.
pub fn peel(mut value: &dyn Reflect) -> &dyn Reflect {
    while let Some(inner) = value.inner() {
        value = inner;
    }
    value
}

pub type Elements<'a> = Box<dyn Iterator<Item = &'a dyn Reflect> + 'a>;
pub type Entries<'a> = Box<dyn Iterator<Item = (&'a dyn Reflect, &'a dyn Reflect)> + 'a>;

/// Structural view of a value.
pub enum ReflectRef<'a> {
    Null,
    Json(&'a JsonValue),
    Bool(bool),
    Char(char),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    BigInt(&'a BigInt),
    Decimal(&'a BigDecimal),
    Str(&'a str),
    CharArray(&'a [char]),
    /// Value whose canonical text is its JSON form (temporal values, UUIDs).
    Text(String),
    Enum(&'static str),
    /// Legacy date/calendar, written in the fixed ISO-8601 layout.
    Date(DateTime<FixedOffset>),
    Array(Elements<'a>),
    Tuple(Vec<&'a dyn Reflect>),
    Iter(Elements<'a>),
    Map(Entries<'a>),
    BitSet(&'a FixedBitSet),
    Record(&'a dyn Reflect),
}

/// Deserializer output: `None` is native null.
pub type Native = Option<Box<dyn Reflect>>;

/// Rebuild a concrete value from deserializer output.
pub trait FromReflect: Reflect + Sized {
    fn from_native(native: Native) -> Option<Self>;
}

/// Move a boxed value out as `T` when that is its concrete type.
pub fn downcast_box<T: Reflect>(boxed: Box<dyn Reflect>) -> Option<T> {
    boxed.into_any().downcast::<T>().ok().map(|b| *b)
}

pub fn downcast_native<T: Reflect>(native: Native) -> Option<T> { downcast_box(native?) }

/// Borrow a native slot as a reflected value, null included.
pub fn native_ref(native: &Native) -> &dyn Reflect {
    match native {
        Some(boxed) => &**boxed,
        None => &NULL,
    }
}

/// True when the slot holds a `T`.
pub fn native_is<T: Any>(native: &Native) -> bool {
    native.as_ref().is_some_and(|b| (**b).as_any().is::<T>())
}

// --------------------------------- Null ----------------------------------- //

/// Stand-in for null elements in dynamic containers.
pub struct Null;

pub static NULL: Null = Null;

impl Reflect for Null {
    fn runtime_type(&self) -> TypeRef { TypeRef::any().nullable() }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Null }
}

// -------------------------------- Macros ---------------------------------- //

/// Implement `Typed`, `Reflect` and `FromReflect` for a record type whose
/// descriptor is registered under `TypeRef::named(name)`.
#[macro_export]
macro_rules! reflect_record {
    ($ty:ident) => {
        $crate::reflect_record!($ty, stringify!($ty));
    };
    ($ty:ty, $name:expr) => {
        impl $crate::Typed for $ty {
            fn type_ref() -> $crate::TypeRef { $crate::TypeRef::named($name) }
        }

        impl $crate::Reflect for $ty {
            fn runtime_type(&self) -> $crate::TypeRef { <$ty as $crate::Typed>::type_ref() }

            fn reflect_ref(&self) -> $crate::ReflectRef<'_> { $crate::ReflectRef::Record(self) }
        }

        impl $crate::FromReflect for $ty {
            fn from_native(native: $crate::Native) -> Option<Self> {
                $crate::reflect::downcast_native(native)
            }
        }
    };
}

/// Implement the reflection traits plus `Describe` for a fieldless enum.
/// Members serialize as their names.
#[macro_export]
macro_rules! reflect_enum {
    ($ty:ident { $($member:ident),+ $(,)? }) => {
        impl $crate::Typed for $ty {
            fn type_ref() -> $crate::TypeRef { $crate::TypeRef::named(stringify!($ty)) }
        }

        impl $crate::Reflect for $ty {
            fn runtime_type(&self) -> $crate::TypeRef { <$ty as $crate::Typed>::type_ref() }

            fn reflect_ref(&self) -> $crate::ReflectRef<'_> {
                $crate::ReflectRef::Enum(match self {
                    $($ty::$member => stringify!($member),)+
                })
            }
        }

        impl $crate::FromReflect for $ty {
            fn from_native(native: $crate::Native) -> Option<Self> {
                $crate::reflect::downcast_native(native)
            }
        }

        impl $crate::Describe for $ty {
            fn describe() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::enumeration(
                    <$ty as $crate::Typed>::type_ref(),
                    vec![$((stringify!($member), $ty::$member)),+],
                )
            }
        }
    };
}
