//! Object targets: maps, sealed families, singletons and records.
//!
//! Records are built with the best-matching named-parameter constructor;
//! members the constructor did not consume are then patched onto the new
//! instance through its properties.
use std::sync::Arc;

use super::{cannot, custom_failed, fail, string, Deserializer};
use crate::config::TypePlan;
use crate::describe::{Args, Constructor, ConstructorShape, DescriptorKind, PropertyAccess, TypeDescriptor};
use crate::error::{ConstructFailure, ErrorKind, Result};
use crate::pointer::JsonPointer;
use crate::reflect::{DynamicMap, Native, Reflect};
use crate::types::{Classifier, TypeRef};
use crate::value::{JsonKind, JsonObject, JsonValue};

fn object_mismatch(target: &TypeRef, pointer: &JsonPointer) -> crate::error::JsonAutoError {
    fail(ErrorKind::TypeMismatch { found: JsonKind::Object.to_string(), target: target.to_string() }, pointer)
}

pub(super) fn convert_object(
    de: &Deserializer<'_>,
    target: &TypeRef,
    object: &JsonObject,
    pointer: &JsonPointer,
) -> Result<Native> {
    match target.classifier() {
        Classifier::Map | Classifier::LinkedMap | Classifier::SortedMap => {
            let key_type = de.type_arg(target, 0, pointer)?;
            let value_type = de.type_arg(target, 1, pointer)?;
            let mut entries = Vec::with_capacity(object.len());
            for (key, value) in object {
                let child = pointer.child(key);
                let k = string::convert_key(de, &key_type, key, &child)?;
                entries.push((k, de.convert(&value_type, Some(value), &child)?));
            }
            Ok(Some(Box::new(DynamicMap::new(entries))))
        }
        Classifier::Any => {
            let value_type = TypeRef::any().nullable();
            let mut entries = Vec::with_capacity(object.len());
            for (key, value) in object {
                let k: Native = Some(Box::new(key.clone()));
                entries.push((k, de.convert(&value_type, Some(value), &pointer.child(key))?));
            }
            Ok(Some(Box::new(DynamicMap::new(entries))))
        }
        Classifier::Named(_) => {
            let descriptor = de
                .config()
                .descriptor(target)
                .ok_or_else(|| fail(ErrorKind::UnknownType { target: target.to_string() }, pointer))?;
            convert_described(de, target, &descriptor, object, pointer)
        }
        _ => Err(object_mismatch(target, pointer)),
    }
}

fn convert_described(
    de: &Deserializer<'_>,
    target: &TypeRef,
    descriptor: &Arc<TypeDescriptor>,
    object: &JsonObject,
    pointer: &JsonPointer,
) -> Result<Native> {
    if let Some(constructor) = descriptor.delegate(ConstructorShape::FromMap) {
        return de.call_delegate(target, descriptor, constructor, &JsonValue::Object(object.clone()), pointer);
    }
    match descriptor.kind() {
        DescriptorKind::Sealed { variants } => {
            let property = de.config().sealed_class_discriminator();
            let Some(JsonValue::String(name)) = object.get(property) else {
                let kind = ErrorKind::MissingDiscriminator { property: property.to_owned(), target: target.to_string() };
                return Err(fail(kind, pointer));
            };
            let Some(variant) = variants.iter().find(|v| v.name() == name) else {
                let kind = ErrorKind::UnknownSubtype { name: name.clone(), target: target.to_string() };
                return Err(fail(kind, pointer));
            };
            tracing::trace!(family = %target, variant = %variant.type_ref(), "sealed variant");
            let mut rest = object.clone();
            rest.shift_remove(property);
            let variant_type = variant.type_ref().with_args(target.args().to_vec());
            convert_described(de, &variant_type, variant, &rest, pointer)
        }
        DescriptorKind::Singleton { instance, .. } => {
            let plan = de.config().plan(descriptor);
            let mut value = instance();
            patch_fields(de, target, descriptor, &plan, &mut *value, object, pointer)?;
            Ok(Some(value))
        }
        DescriptorKind::Record { constructors, .. } => build_record(de, target, descriptor, constructors, object, pointer),
        DescriptorKind::Enum { .. } => Err(object_mismatch(target, pointer)),
    }
}

/// Score of a constructor against the object, `None` when a required
/// parameter is absent.
fn score(constructor: &Constructor, plan: &TypePlan, index: usize, object: &JsonObject) -> Option<usize> {
    let mut score = 0;
    for (param, planned) in constructor.params().iter().zip(plan.params(index)) {
        if !planned.ignored && object.contains_key(&planned.json_name) {
            score += 1;
        } else if !param.is_optional() && !param.is_nullable() {
            return None;
        }
    }
    Some(score)
}

fn build_record(
    de: &Deserializer<'_>,
    target: &TypeRef,
    descriptor: &TypeDescriptor,
    constructors: &[Constructor],
    object: &JsonObject,
    pointer: &JsonPointer,
) -> Result<Native> {
    let plan = de.config().plan(descriptor);

    let mut best: Option<(usize, usize)> = None;
    for (index, constructor) in constructors.iter().enumerate().filter(|(_, c)| c.is_named()) {
        if let Some(s) = score(constructor, &plan, index, object) {
            if best.is_none_or(|(_, top)| s > top) {
                best = Some((index, s));
            }
        }
    }

    let Some((index, _)) = best else {
        let named: Vec<(usize, &Constructor)> = constructors.iter().enumerate().filter(|(_, c)| c.is_named()).collect();
        let detail = match named.as_slice() {
            [(index, only)] => ConstructFailure::Missing(
                only.params()
                    .iter()
                    .zip(plan.params(*index))
                    .filter(|(p, planned)| {
                        !p.is_optional() && !p.is_nullable() && (planned.ignored || !object.contains_key(&planned.json_name))
                    })
                    .map(|(_, planned)| planned.json_name.clone())
                    .collect(),
            ),
            _ => ConstructFailure::Unmatched(object.keys().cloned().collect()),
        };
        return Err(fail(ErrorKind::CannotConstruct { target: target.to_string(), detail }, pointer));
    };

    let constructor = &constructors[index];
    let mut args = Args::new();
    let mut rest = object.clone();
    for (param, planned) in constructor.params().iter().zip(plan.params(index)) {
        let present = if planned.ignored { None } else { rest.shift_remove(&planned.json_name) };
        match present {
            Some(value) => {
                let child = pointer.child(&planned.json_name);
                let ty = de.bind(param.ty(), target, descriptor, &child)?;
                args.set(param.name(), de.convert(&ty, Some(&value), &child)?);
            }
            None if param.is_optional() => {}
            None if param.is_nullable() => args.set(param.name(), None),
            None => {
                let kind = ErrorKind::MissingProperty { name: planned.json_name.clone(), target: target.to_string() };
                return Err(fail(kind, pointer));
            }
        }
    }

    let mut value = constructor.build(&mut args).map_err(|e| custom_failed(target, pointer, e))?;
    patch_fields(de, target, descriptor, &plan, &mut *value, &rest, pointer)?;
    Ok(Some(value))
}

/// Apply remaining members through the type's properties.
fn patch_fields(
    de: &Deserializer<'_>,
    target: &TypeRef,
    descriptor: &TypeDescriptor,
    plan: &TypePlan,
    instance: &mut dyn Reflect,
    entries: &JsonObject,
    pointer: &JsonPointer,
) -> Result<()> {
    for (key, value) in entries {
        let Some(planned) = plan.find(key) else {
            if de.config().allow_extra() || plan.allow_extra() {
                continue;
            }
            return Err(fail(ErrorKind::UnknownProperty { name: key.clone(), target: target.to_string() }, pointer));
        };
        if planned.ignored {
            continue;
        }
        let property = &descriptor.properties()[planned.index];
        let child = pointer.child(key);
        let ty = de.bind(property.ty(), target, descriptor, &child)?;
        let native = de.convert(&ty, Some(value), &child)?;
        match property.access() {
            PropertyAccess::Mutable(set) => {
                set(&mut *instance, native).map_err(|e| custom_failed(target, &child, e.into()))?;
            }
            PropertyAccess::Immutable(matches) => {
                let same = matches(&*instance, native).map_err(|e| custom_failed(target, &child, e.into()))?;
                if !same {
                    let kind = ErrorKind::PropertyMismatch { name: key.clone(), target: target.to_string() };
                    return Err(fail(kind, pointer));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonConfig;
    use crate::de::deserialize;
    use crate::fixtures::*;
    use crate::value::text::parse;

    fn config() -> JsonConfig { fixture_config() }

    #[test]
    fn record_with_default() {
        let d: Dummy1 = deserialize(&parse(r#"{"field1":"abc"}"#).unwrap(), &config()).unwrap();
        assert_eq!(d, Dummy1 { field1: "abc".into(), field2: 999 });
    }

    #[test]
    fn missing_required_parameter() {
        let e = deserialize::<Dummy1>(&parse(r#"{"field2":1}"#).unwrap(), &config()).unwrap_err();
        assert!(e.to_string().contains("missing: field1"), "{e}");
    }

    #[test]
    fn unknown_property_unless_allowed() {
        let json = parse(r#"{"field1":"a","extra":1}"#).unwrap();
        let e = deserialize::<Dummy1>(&json, &config()).unwrap_err();
        assert_eq!(e.to_string(), "Can't find property extra in Dummy1");
        let mut lenient = config();
        lenient.set_allow_extra(true);
        assert!(deserialize::<Dummy1>(&json, &lenient).is_ok());
        assert!(deserialize::<Lenient>(&parse(r#"{"name":"x","junk":true}"#).unwrap(), &config()).is_ok());
    }

    #[test]
    fn immutable_property_must_agree() {
        let ok: Dummy1 = deserialize(&parse(r#"{"field1":"a","field2":5}"#).unwrap(), &config()).unwrap();
        assert_eq!(ok.field2, 5);
        let json = parse(r#"{"name":"a","upper":"nope"}"#).unwrap();
        let e = deserialize::<Derived>(&json, &config()).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::PropertyMismatch { name: "upper".into(), target: "Derived".into() });
        let same: Derived = deserialize(&parse(r#"{"name":"a","upper":"A"}"#).unwrap(), &config()).unwrap();
        assert_eq!(same.name, "a");
    }

    #[test]
    fn mutable_property_is_patched() {
        let d: Dummy = deserialize(&parse(r#"{"field1":"a","extra":"x"}"#).unwrap(), &config()).unwrap();
        assert_eq!(d.extra.as_deref(), Some("x"));
    }

    #[test]
    fn best_constructor_by_score() {
        let c = config();
        let m: Multi = deserialize(&parse(r#"{"a":1,"b":2}"#).unwrap(), &c).unwrap();
        assert_eq!(m, Multi { a: 1, b: 2, via: "ab" });
        let m: Multi = deserialize(&parse(r#"{"a":1}"#).unwrap(), &c).unwrap();
        assert_eq!(m.via, "a");
        let e = deserialize::<Multi>(&parse(r#"{"z":1}"#).unwrap(), &c).unwrap_err();
        assert_eq!(e.to_string(), "Can't create Multi; no constructor matches properties: z");
    }

    #[test]
    fn sealed_family() {
        let c = config();
        let e: Expr = deserialize(&parse(r#"{"class":"Const","number":2.0}"#).unwrap(), &c).unwrap();
        assert_eq!(e, Expr::Const { number: 2.0 });
        let n: Expr = deserialize(&parse(r#"{"class":"NotANumber"}"#).unwrap(), &c).unwrap();
        assert_eq!(n, Expr::NotANumber);
        let err = deserialize::<Expr>(&parse(r#"{"number":2.0}"#).unwrap(), &c).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::MissingDiscriminator { .. }));
        let err = deserialize::<Expr>(&parse(r#"{"class":"Plus"}"#).unwrap(), &c).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UnknownSubtype { name: "Plus".into(), target: "Expr".into() });
    }

    #[test]
    fn renamed_and_ignored() {
        let r: Renamed = deserialize(&parse(r#"{"fieldX":"a","hidden":"h"}"#).unwrap(), &config()).unwrap();
        assert_eq!(r, Renamed { field1: "a".into(), hidden: String::new() });
    }

    #[test]
    fn generic_record_binds_argument() {
        let page: Page<i32> = deserialize(&parse(r#"{"items":[1,2],"total":2}"#).unwrap(), &config()).unwrap();
        assert_eq!(page.items, vec![1, 2]);
        let e = deserialize::<Page<i32>>(&parse(r#"{"items":["x"],"total":1}"#).unwrap(), &config()).unwrap_err();
        assert_eq!(e.pointer().map(ToString::to_string).as_deref(), Some("/items/0"));
    }

    #[test]
    fn delegates() {
        let c = config();
        let tags: Tags = deserialize(&parse(r#"["a","b"]"#).unwrap(), &c).unwrap();
        assert_eq!(tags.0, ["a", "b"]);
        let code: Code = deserialize(&parse(r#""X1""#).unwrap(), &c).unwrap();
        assert_eq!(code.0, "X1");
        let bag: Bag = deserialize(&parse(r#"{"k":1}"#).unwrap(), &c).unwrap();
        assert_eq!(bag.0.get("k"), Some(&1));
        let e = deserialize::<Code>(&parse(r#"{"x":"y"}"#).unwrap(), &c).unwrap_err();
        assert_eq!(e.to_string(), "Can't create Code; no constructor matches properties: x");
    }

    #[test]
    fn enum_members() {
        let c = config();
        assert_eq!(deserialize::<DummyEnum>(&parse(r#""BETA""#).unwrap(), &c).unwrap(), DummyEnum::BETA);
        let e = deserialize::<DummyEnum>(&parse(r#""beta""#).unwrap(), &c).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::InvalidFormat { .. }));
        let e = deserialize::<DummyEnum>(&parse("{}").unwrap(), &c).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::TypeMismatch { .. }));
    }

    #[test]
    fn factory_hook() {
        let d: DummyFromJson = deserialize(&parse(r#"{"dec":"49","hex":"31"}"#).unwrap(), &config()).unwrap();
        assert_eq!(d.x, 49);
        let e = deserialize::<DummyFromJson>(&parse(r#"{"dec":"x"}"#).unwrap(), &config()).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::CustomMappingFailed { .. }));
    }
}
