//! String targets: text, characters, temporal values, UUIDs, big numbers,
//! enum members and string-delegate constructors. Also map keys.
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use super::{cannot, fail, Deserializer};
use crate::describe::{ConstructorShape, DescriptorKind};
use crate::error::{ErrorKind, JsonAutoError, Result};
use crate::native::CharArray;
use crate::pointer::JsonPointer;
use crate::reflect::{DynamicList, Native, Reflect};
use crate::temporal;
use crate::types::{Classifier, TypeRef};
use crate::value::JsonValue;

fn invalid(text: &str, target: &TypeRef, reason: impl ToString, pointer: &JsonPointer) -> JsonAutoError {
    let kind = ErrorKind::InvalidFormat { text: text.to_owned(), target: target.to_string(), reason: reason.to_string() };
    fail(kind, pointer)
}

fn boxed<T: Reflect>(value: T) -> Native { Some(Box::new(value)) }

pub(super) fn convert_string(de: &Deserializer<'_>, target: &TypeRef, text: &str, pointer: &JsonPointer) -> Result<Native> {
    match target.classifier() {
        Classifier::String | Classifier::Any => Ok(boxed(text.to_owned())),
        Classifier::Char => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(boxed(c)),
                _ => Err(invalid(text, target, "expected a single character", pointer)),
            }
        }
        Classifier::CharArray => Ok(boxed(CharArray::from(text))),
        Classifier::Array if target.arg(0).is_some_and(|a| a.classifier() == &Classifier::Char) => {
            Ok(boxed(DynamicList::new(text.chars().map(boxed).collect())))
        }
        Classifier::Temporal(kind) => {
            temporal::parse_text(*kind, text).map(Some).map_err(|e| invalid(text, target, e, pointer))
        }
        Classifier::Uuid => temporal::parse_uuid(text).map(boxed).map_err(|e| invalid(text, target, e, pointer)),
        Classifier::BigInteger => {
            BigInt::from_str(text).map(boxed).map_err(|e| invalid(text, target, e, pointer))
        }
        Classifier::BigDecimal => {
            BigDecimal::from_str(text).map(boxed).map_err(|e| invalid(text, target, e, pointer))
        }
        Classifier::Named(_) => convert_named(de, target, text, pointer),
        _ => Err(super::mismatch(&JsonValue::String(text.to_owned()), target, pointer)),
    }
}

fn convert_named(de: &Deserializer<'_>, target: &TypeRef, text: &str, pointer: &JsonPointer) -> Result<Native> {
    let descriptor = de
        .config()
        .descriptor(target)
        .ok_or_else(|| fail(ErrorKind::UnknownType { target: target.to_string() }, pointer))?;
    if let DescriptorKind::Enum { members } = descriptor.kind() {
        return match members.iter().find(|m| m.name() == text) {
            Some(member) => Ok(Some(member.instance())),
            None => Err(invalid(text, target, "no such member", pointer)),
        };
    }
    match descriptor.delegate(ConstructorShape::FromString) {
        Some(constructor) => {
            de.call_delegate(target, &descriptor, constructor, &JsonValue::String(text.to_owned()), pointer)
        }
        None => Err(cannot(target, format!("no string constructor for {:?}", text), pointer)),
    }
}

/// Map keys: string conversion, plus numbers and booleans parsed from the
/// key text.
pub(super) fn convert_key(de: &Deserializer<'_>, target: &TypeRef, key: &str, pointer: &JsonPointer) -> Result<Native> {
    fn parsed<T: FromStr + Reflect>(key: &str, target: &TypeRef, pointer: &JsonPointer) -> Result<Native>
    where
        T::Err: ToString,
    {
        key.parse::<T>().map(boxed).map_err(|e| invalid(key, target, e, pointer))
    }
    match target.classifier() {
        Classifier::Int => parsed::<i32>(key, target, pointer),
        Classifier::Long => parsed::<i64>(key, target, pointer),
        Classifier::Short => parsed::<i16>(key, target, pointer),
        Classifier::Byte => parsed::<i8>(key, target, pointer),
        Classifier::Float => parsed::<f32>(key, target, pointer),
        Classifier::Double => parsed::<f64>(key, target, pointer),
        Classifier::Bool => parsed::<bool>(key, target, pointer),
        _ => convert_string(de, target, key, pointer),
    }
}
