//! Type-directed conversion of a [`JsonValue`] tree into native values.
//!
//! Every call goes through [`Deserializer::convert`]: custom mappings first,
//! then null handling, passthrough and factory hooks, then a structural
//! dispatch on the JSON kind. Strings, arrays and objects each have their own
//! submodule.
pub mod array;
pub mod object;
pub mod string;

use bigdecimal::{BigDecimal, ToPrimitive};
use num_bigint::BigInt;
use ordered_float::OrderedFloat;

use crate::config::JsonConfig;
use crate::describe::{Args, Constructor, TypeDescriptor};
use crate::error::{ErrorKind, JsonAutoError, Result};
use crate::native::Number;
use crate::pointer::JsonPointer;
use crate::reflect::{FromReflect, Native, Reflect};
use crate::types::resolve::bind;
use crate::types::{Classifier, TypeRef, Typed};
use crate::value::JsonValue;

pub(crate) fn fail(kind: ErrorKind, pointer: &JsonPointer) -> JsonAutoError { JsonAutoError::new(kind).at(pointer) }

pub(crate) fn mismatch(json: &JsonValue, target: &TypeRef, pointer: &JsonPointer) -> JsonAutoError {
    fail(ErrorKind::TypeMismatch { found: json.kind().to_string(), target: target.to_string() }, pointer)
}

pub(crate) fn cannot(target: &TypeRef, reason: impl Into<String>, pointer: &JsonPointer) -> JsonAutoError {
    fail(ErrorKind::CannotDeserialize { target: target.to_string(), reason: reason.into() }, pointer)
}

pub(crate) fn custom_failed(target: &TypeRef, pointer: &JsonPointer, cause: anyhow::Error) -> JsonAutoError {
    fail(ErrorKind::CustomMappingFailed { target: target.to_string() }, pointer).caused_by(cause)
}

fn boxed<T: Reflect>(value: T) -> Native { Some(Box::new(value)) }

#[derive(Clone, Copy)]
pub struct Deserializer<'c> {
    config: &'c JsonConfig,
}

impl<'c> Deserializer<'c> {
    pub fn new(config: &'c JsonConfig) -> Self { Self { config } }

    pub fn config(&self) -> &'c JsonConfig { self.config }

    /// Convert a whole document; `None` stands for an absent value.
    pub fn deserialize(&self, target: &TypeRef, json: Option<&JsonValue>) -> Result<Native> {
        self.convert(target, json, &JsonPointer::root())
    }

    pub fn convert(&self, target: &TypeRef, json: Option<&JsonValue>, pointer: &JsonPointer) -> Result<Native> {
        if let Some(mapping) = self.config.find_from_json_mapping(target) {
            tracing::trace!(%target, %pointer, "custom from-JSON mapping");
            let out = mapping(json).map_err(|e| custom_failed(target, pointer, e))?;
            if out.is_none() && !target.is_nullable() {
                return Err(fail(ErrorKind::NullNotAllowed { target: target.to_string() }, pointer));
            }
            return Ok(out);
        }
        let json = match json {
            None | Some(JsonValue::Null) => {
                return if target.is_nullable() {
                    Ok(None)
                } else {
                    Err(fail(ErrorKind::NullNotAllowed { target: target.to_string() }, pointer))
                };
            }
            Some(json) => json,
        };
        match target.classifier() {
            Classifier::Json => return Ok(boxed(json.clone())),
            Classifier::Param(index) => {
                let kind = ErrorKind::UnresolvedTypeParameter { param: format!("T{index}"), target: target.to_string() };
                return Err(fail(kind, pointer));
            }
            Classifier::Named(_) => {
                if let Some(hook) = self.config.factory_hook(target, json.kind()) {
                    return hook.call(json).map(Some).map_err(|e| custom_failed(target, pointer, e));
                }
            }
            _ => {}
        }
        match json {
            JsonValue::Null => Err(fail(ErrorKind::NullNotAllowed { target: target.to_string() }, pointer)),
            JsonValue::Bool(b) => match target.classifier() {
                Classifier::Bool | Classifier::Any => Ok(boxed(*b)),
                _ => Err(mismatch(json, target, pointer)),
            },
            JsonValue::String(text) => string::convert_string(self, target, text, pointer),
            JsonValue::Array(items) => array::convert_array(self, target, items, pointer),
            JsonValue::Object(object) => object::convert_object(self, target, object, pointer),
            number => self.convert_number(target, number, pointer),
        }
    }

    fn convert_number(&self, target: &TypeRef, json: &JsonValue, pointer: &JsonPointer) -> Result<Native> {
        let out_of_range = || {
            let kind = ErrorKind::InvalidFormat {
                text: json.to_json_string(),
                target: target.to_string(),
                reason: "out of range".to_owned(),
            };
            fail(kind, pointer)
        };
        let converted: Option<Native> = match (target.classifier(), json) {
            (Classifier::Int, JsonValue::Int(i)) => Some(boxed(*i)),
            (Classifier::Short, JsonValue::Int(i)) => Some(boxed(i16::try_from(*i).map_err(|_| out_of_range())?)),
            (Classifier::Byte, JsonValue::Int(i)) => Some(boxed(i8::try_from(*i).map_err(|_| out_of_range())?)),
            (Classifier::Long, JsonValue::Int(i)) => Some(boxed(i64::from(*i))),
            (Classifier::Long, JsonValue::Long(l)) => Some(boxed(*l)),
            (Classifier::BigInteger, JsonValue::Int(i)) => Some(boxed(BigInt::from(*i))),
            (Classifier::BigInteger, JsonValue::Long(l)) => Some(boxed(BigInt::from(*l))),
            (Classifier::BigInteger, JsonValue::Decimal(d)) if d.is_integer() => {
                Some(boxed(d.with_scale(0).as_bigint_and_exponent().0))
            }
            (Classifier::Float, n) => as_f64(n).map(|f| boxed(f as f32)),
            (Classifier::Double, n) => as_f64(n).map(boxed),
            (Classifier::BigDecimal, n) => as_decimal(n).map(boxed),
            (Classifier::Number, n) => number_of(n).map(boxed),
            (Classifier::Any, n) => tagged(n),
            _ => None,
        };
        converted.ok_or_else(|| mismatch(json, target, pointer))
    }

    /// Bind `position` against `enclosing` and the descriptor's parameters.
    pub(crate) fn bind(
        &self,
        position: &TypeRef,
        enclosing: &TypeRef,
        descriptor: &TypeDescriptor,
        pointer: &JsonPointer,
    ) -> Result<TypeRef> {
        bind(position, enclosing, descriptor.type_params()).map_err(|param| {
            fail(ErrorKind::UnresolvedTypeParameter { param, target: enclosing.to_string() }, pointer)
        })
    }

    /// Element type `index` of a container target.
    pub(crate) fn type_arg(&self, target: &TypeRef, index: usize, pointer: &JsonPointer) -> Result<TypeRef> {
        match target.arg(index) {
            Some(arg) if !arg.has_params() => Ok(arg.clone()),
            _ => {
                let kind = ErrorKind::UnresolvedTypeParameter { param: format!("T{index}"), target: target.to_string() };
                Err(fail(kind, pointer))
            }
        }
    }

    /// Run a delegate constructor: `json` converted against its single
    /// parameter's type, then the build function.
    pub(crate) fn call_delegate(
        &self,
        target: &TypeRef,
        descriptor: &TypeDescriptor,
        constructor: &Constructor,
        json: &JsonValue,
        pointer: &JsonPointer,
    ) -> Result<Native> {
        let mut args = Args::new();
        if let Some(param) = constructor.params().first() {
            let ty = self.bind(param.ty(), target, descriptor, pointer)?;
            args.set(param.name(), self.convert(&ty, Some(json), pointer)?);
        }
        constructor.build(&mut args).map(Some).map_err(|e| custom_failed(target, pointer, e))
    }
}

fn as_f64(json: &JsonValue) -> Option<f64> {
    match json {
        JsonValue::Int(i) => Some(f64::from(*i)),
        JsonValue::Long(l) => Some(*l as f64),
        JsonValue::Float(OrderedFloat(f)) => Some(f64::from(*f)),
        JsonValue::Double(OrderedFloat(d)) => Some(*d),
        JsonValue::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

fn as_decimal(json: &JsonValue) -> Option<BigDecimal> {
    match json {
        JsonValue::Int(i) => Some(BigDecimal::from(*i)),
        JsonValue::Long(l) => Some(BigDecimal::from(*l)),
        JsonValue::Float(OrderedFloat(f)) => f.to_string().parse().ok(),
        JsonValue::Double(OrderedFloat(d)) => d.to_string().parse().ok(),
        JsonValue::Decimal(d) => Some(d.clone()),
        _ => None,
    }
}

fn number_of(json: &JsonValue) -> Option<Number> {
    match json {
        JsonValue::Int(i) => Some(Number::Int(*i)),
        JsonValue::Long(l) => Some(Number::Long(*l)),
        JsonValue::Float(OrderedFloat(f)) => Some(Number::Float(*f)),
        JsonValue::Double(OrderedFloat(d)) => Some(Number::Double(*d)),
        JsonValue::Decimal(d) => Some(Number::Decimal(d.clone())),
        _ => None,
    }
}

/// Numbers for an untyped target keep their tag.
fn tagged(json: &JsonValue) -> Option<Native> {
    match json {
        JsonValue::Int(i) => Some(boxed(*i)),
        JsonValue::Long(l) => Some(boxed(*l)),
        JsonValue::Float(OrderedFloat(f)) => Some(boxed(*f)),
        JsonValue::Double(OrderedFloat(d)) => Some(boxed(*d)),
        JsonValue::Decimal(d) => Some(boxed(d.clone())),
        _ => None,
    }
}

/// Convert `json` to `T` with `config`.
#[tracing::instrument(skip_all)]
pub fn deserialize<T: FromReflect + Typed>(json: &JsonValue, config: &JsonConfig) -> Result<T> {
    let target = T::type_ref();
    tracing::debug!(%target, kind = %json.kind(), "deserialize");
    let native = Deserializer::new(config).deserialize(&target, Some(json))?;
    rebuild(&target, native)
}

/// Fold converted output into `T`.
pub(crate) fn rebuild<T: FromReflect>(target: &TypeRef, native: Native) -> Result<T> {
    T::from_native(native).ok_or_else(|| {
        let reason = format!("converted value is not a {}", std::any::type_name::<T>());
        cannot(target, reason, &JsonPointer::root())
    })
}
