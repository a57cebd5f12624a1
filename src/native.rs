//! Native helper types with no direct std counterpart.
use std::fmt;
use std::sync::Arc;

use bigdecimal::BigDecimal;

/// Any number, kind preserved. Target of the `Number` classifier.
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(BigDecimal),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{v}"),
            Number::Long(v) => write!(f, "{v}"),
            Number::Float(v) => write!(f, "{v}"),
            Number::Double(v) => write!(f, "{v}"),
            Number::Decimal(v) => write!(f, "{v}"),
        }
    }
}

/// Finite, restartable sequence: each `iter()` walks the same backing slice.
#[derive(Debug, PartialEq, Eq)]
pub struct Sequence<T> {
    items: Arc<[T]>,
}

impl<T> Sequence<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> { self.items.iter() }

    pub fn len(&self) -> usize { self.items.len() }

    pub fn is_empty(&self) -> bool { self.items.is_empty() }
}

impl<T> Clone for Sequence<T> {
    fn clone(&self) -> Self { Self { items: Arc::clone(&self.items) } }
}

impl<T> FromIterator<T> for Sequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self { Self { items: iter.into_iter().collect() } }
}

impl<T> From<Vec<T>> for Sequence<T> {
    fn from(items: Vec<T>) -> Self { Self { items: items.into() } }
}

impl<'a, T> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter { self.iter() }
}

/// Primitive character array; serializes as a single JSON string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharArray(pub Vec<char>);

impl From<&str> for CharArray {
    fn from(s: &str) -> Self { CharArray(s.chars().collect()) }
}

impl fmt::Display for CharArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0.iter().collect::<String>()) }
}
