//! Serialization of native values into a [`JsonValue`] tree.
//!
//! [`shape`] decides what a value becomes: a finished scalar, or a
//! structure (sequence, tuple, map, record) whose parts still need walking.
//! The tree [`Serializer`] and the direct-text
//! [`Stringifier`](crate::stringify::Stringifier) both walk the same shapes,
//! which keeps their output identical.
pub mod props;

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::config::JsonConfig;
use crate::describe::TypeDescriptor;
use crate::error::{ErrorKind, JsonAutoError, Result};
use crate::reflect::{peel, Elements, Entries, Reflect, ReflectRef};
use crate::temporal::format_calendar;
use crate::types::{Classifier, TypeRef};
use crate::value::{JsonObject, JsonValue};

use props::Member;

pub(crate) enum Shape<'a> {
    Scalar(JsonValue),
    Sequence(Elements<'a>),
    Tuple(Vec<&'a dyn Reflect>),
    Map(Entries<'a>),
    Record(&'a dyn Reflect, Arc<TypeDescriptor>),
}

fn custom_failed(ty: &TypeRef, cause: anyhow::Error) -> JsonAutoError {
    JsonAutoError::new(ErrorKind::CustomMappingFailed { target: ty.to_string() }).caused_by(cause)
}

fn big_integer(config: &JsonConfig, value: &BigInt) -> JsonValue {
    if config.big_integer_string() {
        return JsonValue::String(value.to_string());
    }
    match i64::try_from(value) {
        Ok(l) => JsonValue::Long(l),
        Err(_) => JsonValue::Decimal(BigDecimal::from(value.clone())),
    }
}

fn big_decimal(config: &JsonConfig, value: &BigDecimal) -> JsonValue {
    if config.big_decimal_string() { JsonValue::String(value.to_plain_string()) } else { JsonValue::Decimal(value.clone()) }
}

/// Classify `value` for output, running custom mappings and hooks.
pub(crate) fn shape<'a>(config: &JsonConfig, value: &'a dyn Reflect) -> Result<Shape<'a>> {
    let value = peel(value);
    let view = value.reflect_ref();
    if matches!(view, ReflectRef::Null) {
        return Ok(Shape::Scalar(JsonValue::Null));
    }
    let runtime = value.runtime_type();
    if let Some(mapping) = config.find_to_json_mapping(&runtime) {
        tracing::trace!(%runtime, "custom to-JSON mapping");
        let out = mapping(value).map_err(|e| custom_failed(&runtime, e))?;
        return Ok(Shape::Scalar(out.unwrap_or(JsonValue::Null)));
    }
    if matches!(runtime.classifier(), Classifier::Named(_)) && !matches!(view, ReflectRef::Enum(_)) {
        if let Some(hook) = config.to_json_hook(&runtime) {
            return hook(value).map(Shape::Scalar).map_err(|e| custom_failed(&runtime, e));
        }
    }
    let scalar = match view {
        ReflectRef::Null => JsonValue::Null,
        ReflectRef::Json(json) => json.clone(),
        ReflectRef::Bool(b) => JsonValue::Bool(b),
        ReflectRef::Char(c) => JsonValue::String(c.to_string()),
        ReflectRef::Int(i) => JsonValue::from(i),
        ReflectRef::Long(l) => JsonValue::from(l),
        ReflectRef::Float(f) => JsonValue::from(f),
        ReflectRef::Double(d) => JsonValue::from(d),
        ReflectRef::BigInt(b) => big_integer(config, b),
        ReflectRef::Decimal(d) => big_decimal(config, d),
        ReflectRef::Str(s) => JsonValue::from(s),
        ReflectRef::CharArray(chars) => JsonValue::String(chars.iter().collect()),
        ReflectRef::Text(text) => JsonValue::String(text),
        ReflectRef::Enum(name) => JsonValue::from(name),
        ReflectRef::Date(dt) => JsonValue::String(format_calendar(&dt)),
        ReflectRef::BitSet(bits) => JsonValue::Array(
            bits.ones().map(|i| i32::try_from(i).map_or_else(|_| JsonValue::Long(i as i64), JsonValue::Int)).collect(),
        ),
        ReflectRef::Array(items) if runtime.arg(0).is_some_and(|a| a.classifier() == &Classifier::Char && !a.is_nullable()) => {
            JsonValue::String(
                items
                    .filter_map(|item| match item.reflect_ref() {
                        ReflectRef::Char(c) => Some(c),
                        _ => None,
                    })
                    .collect(),
            )
        }
        ReflectRef::Array(items) | ReflectRef::Iter(items) => return Ok(Shape::Sequence(items)),
        ReflectRef::Tuple(items) => return Ok(Shape::Tuple(items)),
        ReflectRef::Map(entries) => return Ok(Shape::Map(entries)),
        ReflectRef::Record(obj) => {
            let descriptor = config
                .descriptor(&runtime)
                .ok_or_else(|| JsonAutoError::new(ErrorKind::UnknownType { target: runtime.to_string() }))?;
            return Ok(Shape::Record(obj, descriptor));
        }
    };
    Ok(Shape::Scalar(scalar))
}

/// Map keys: strings as-is, everything else as its compact JSON text.
pub(crate) fn key_text(key: JsonValue) -> String {
    match key {
        JsonValue::String(s) => s,
        other => other.to_json_string(),
    }
}

// ------------------------------- Visiting --------------------------------- //

/// Records currently being written, by address and concrete type.
#[derive(Default)]
pub(crate) struct Visiting {
    active: HashSet<(usize, TypeId)>,
}

impl Visiting {
    fn key(obj: &dyn Reflect) -> (usize, TypeId) {
        (obj as *const dyn Reflect as *const () as usize, obj.as_any().type_id())
    }

    pub(crate) fn contains(&self, obj: &dyn Reflect) -> bool { self.active.contains(&Self::key(obj)) }

    pub(crate) fn enter(&mut self, obj: &dyn Reflect, ty: &TypeRef) -> Result<()> {
        if self.active.insert(Self::key(obj)) {
            Ok(())
        } else {
            Err(JsonAutoError::new(ErrorKind::CircularReference { property: None, target: ty.to_string() }))
        }
    }

    pub(crate) fn exit(&mut self, obj: &dyn Reflect) { self.active.remove(&Self::key(obj)); }

    /// Fail when `value` is a record already on the stack.
    pub(crate) fn check_property(&self, value: &dyn Reflect, raw: &str, owner: &TypeDescriptor) -> Result<()> {
        if self.contains(peel(value)) {
            let kind = ErrorKind::CircularReference { property: Some(raw.to_owned()), target: owner.name().to_owned() };
            return Err(JsonAutoError::new(kind));
        }
        Ok(())
    }
}

// ------------------------------ Serializer -------------------------------- //

#[derive(Clone, Copy)]
pub struct Serializer<'c> {
    config: &'c JsonConfig,
}

impl<'c> Serializer<'c> {
    pub fn new(config: &'c JsonConfig) -> Self { Self { config } }

    pub fn serialize(&self, value: &dyn Reflect) -> Result<JsonValue> { self.value(value, &mut Visiting::default()) }

    pub(crate) fn value(&self, value: &dyn Reflect, visiting: &mut Visiting) -> Result<JsonValue> {
        match shape(self.config, value)? {
            Shape::Scalar(json) => Ok(json),
            Shape::Sequence(items) => Ok(JsonValue::Array(items.map(|i| self.value(i, visiting)).collect::<Result<_>>()?)),
            Shape::Tuple(items) => {
                Ok(JsonValue::Array(items.into_iter().map(|i| self.value(i, visiting)).collect::<Result<_>>()?))
            }
            Shape::Map(entries) => {
                let mut object = JsonObject::new();
                for (k, v) in entries {
                    let key = key_text(self.value(k, visiting)?);
                    object.insert(key, self.value(v, visiting)?);
                }
                Ok(JsonValue::Object(object))
            }
            Shape::Record(obj, descriptor) => {
                visiting.enter(obj, descriptor.type_ref())?;
                let out = self.record(obj, &descriptor, visiting);
                visiting.exit(obj);
                out
            }
        }
    }

    fn record(&self, obj: &dyn Reflect, descriptor: &TypeDescriptor, visiting: &mut Visiting) -> Result<JsonValue> {
        let mut object = JsonObject::new();
        for (name, member) in props::members(self.config, obj, descriptor) {
            let json = match member {
                Member::Discriminator(variant) => JsonValue::String(variant),
                Member::Property { raw, value } => {
                    visiting.check_property(value.as_reflect(), &raw, descriptor)?;
                    self.value(value.as_reflect(), visiting)?
                }
            };
            object.insert(name, json);
        }
        Ok(JsonValue::Object(object))
    }
}

/// Serialize `value` to a tree with `config`.
#[tracing::instrument(skip_all)]
pub fn serialize(value: &dyn Reflect, config: &JsonConfig) -> Result<JsonValue> {
    tracing::debug!(ty = %value.runtime_type(), "serialize");
    Serializer::new(config).serialize(value)
}
