//! Array targets: sequences, sets, tuples, bit sets, character arrays and
//! list-delegate constructors.
use std::collections::HashSet;
use std::fmt::Write as _;

use fixedbitset::FixedBitSet;

use super::{cannot, fail, Deserializer};
use crate::describe::ConstructorShape;
use crate::error::{ErrorKind, Result};
use crate::native::CharArray;
use crate::pointer::JsonPointer;
use crate::reflect::{downcast_native, native_ref, peel, DynamicList, DynamicTuple, Native, Reflect, ReflectRef};
use crate::types::{Classifier, TypeRef};
use crate::value::text::{write_string, write_value};
use crate::value::JsonValue;

pub(super) fn convert_array(
    de: &Deserializer<'_>,
    target: &TypeRef,
    items: &[JsonValue],
    pointer: &JsonPointer,
) -> Result<Native> {
    match target.classifier() {
        Classifier::CharArray => {
            let char_type = TypeRef::new(Classifier::Char);
            let mut chars = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let native = de.convert(&char_type, Some(item), &pointer.child_index(i))?;
                chars.extend(downcast_native::<char>(native));
            }
            Ok(Some(Box::new(CharArray(chars))))
        }
        Classifier::Array | Classifier::List | Classifier::LinkedList | Classifier::Sequence => {
            let element = de.type_arg(target, 0, pointer)?;
            Ok(Some(Box::new(DynamicList::new(elements(de, &element, items, pointer)?))))
        }
        Classifier::Set | Classifier::LinkedSet => {
            let element = de.type_arg(target, 0, pointer)?;
            let converted = elements(de, &element, items, pointer)?;
            let mut seen = HashSet::with_capacity(converted.len());
            for (i, native) in converted.iter().enumerate() {
                let mut key = String::new();
                canonical(de, native_ref(native), &mut key);
                if !seen.insert(key) {
                    return Err(fail(ErrorKind::DuplicateNotAllowed, &pointer.child_index(i)));
                }
            }
            Ok(Some(Box::new(DynamicList::new(converted))))
        }
        Classifier::Pair | Classifier::Triple => {
            let arity = if target.classifier() == &Classifier::Pair { 2 } else { 3 };
            if items.len() != arity {
                return Err(cannot(target, format!("expected {arity} elements, found {}", items.len()), pointer));
            }
            let mut slots = Vec::with_capacity(arity);
            for (i, item) in items.iter().enumerate() {
                let ty = de.type_arg(target, i, pointer)?;
                slots.push(de.convert(&ty, Some(item), &pointer.child_index(i))?);
            }
            Ok(Some(Box::new(DynamicTuple::new(slots))))
        }
        Classifier::BitSet => {
            let mut indices = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                match item {
                    JsonValue::Int(n) if *n >= 0 => indices.push(*n as usize),
                    other => {
                        let kind = ErrorKind::InvalidFormat {
                            text: other.to_json_string(),
                            target: target.to_string(),
                            reason: "bit index must be a non-negative int".to_owned(),
                        };
                        return Err(fail(kind, &pointer.child_index(i)));
                    }
                }
            }
            let mut bits = FixedBitSet::with_capacity(indices.iter().max().map_or(0, |m| m + 1));
            bits.extend(indices);
            Ok(Some(Box::new(bits)))
        }
        Classifier::Any => {
            let element = TypeRef::any().nullable();
            Ok(Some(Box::new(DynamicList::new(elements(de, &element, items, pointer)?))))
        }
        Classifier::Named(_) => {
            let descriptor = de
                .config()
                .descriptor(target)
                .ok_or_else(|| fail(ErrorKind::UnknownType { target: target.to_string() }, pointer))?;
            match descriptor.delegate(ConstructorShape::FromList) {
                Some(constructor) => {
                    de.call_delegate(target, &descriptor, constructor, &JsonValue::Array(items.to_vec()), pointer)
                }
                None => Err(cannot(target, "no list constructor", pointer)),
            }
        }
        _ => Err(cannot(target, "not an array type", pointer)),
    }
}

fn elements(de: &Deserializer<'_>, element: &TypeRef, items: &[JsonValue], pointer: &JsonPointer) -> Result<Vec<Native>> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| de.convert(element, Some(item), &pointer.child_index(i)))
        .collect()
}

// ------------------------------ Duplicates -------------------------------- //

/// Identity of a converted set element. Map entries, object members and
/// record properties are sorted, so insertion order does not matter.
fn canonical(de: &Deserializer<'_>, value: &dyn Reflect, out: &mut String) {
    let value = peel(value);
    match value.reflect_ref() {
        ReflectRef::Null => out.push('n'),
        ReflectRef::Json(json) => canonical_json(json, out),
        ReflectRef::Bool(b) => out.push(if b { 't' } else { 'f' }),
        ReflectRef::Int(i) => {
            let _ = write!(out, "i{i}");
        }
        ReflectRef::Long(l) => {
            let _ = write!(out, "i{l}");
        }
        ReflectRef::BigInt(b) => {
            let _ = write!(out, "i{b}");
        }
        ReflectRef::Float(f) => {
            let _ = write!(out, "r{f}");
        }
        ReflectRef::Double(d) => {
            let _ = write!(out, "r{d}");
        }
        ReflectRef::Decimal(d) => {
            let _ = write!(out, "m{}", d.normalized());
        }
        ReflectRef::Char(c) => {
            out.push('s');
            write_string(out, c.encode_utf8(&mut [0; 4]));
        }
        ReflectRef::Str(s) => {
            out.push('s');
            write_string(out, s);
        }
        ReflectRef::CharArray(chars) => {
            out.push('s');
            write_string(out, &chars.iter().collect::<String>());
        }
        ReflectRef::Text(text) => {
            out.push('s');
            write_string(out, &text);
        }
        ReflectRef::Enum(name) => {
            let _ = write!(out, "e{name}");
        }
        ReflectRef::Date(dt) => {
            let _ = write!(out, "D{}", dt.to_rfc3339());
        }
        ReflectRef::Array(items) | ReflectRef::Iter(items) => {
            out.push('[');
            for item in items {
                canonical(de, item, out);
                out.push(',');
            }
            out.push(']');
        }
        ReflectRef::Tuple(items) => {
            out.push('(');
            for item in items {
                canonical(de, item, out);
                out.push(',');
            }
            out.push(')');
        }
        ReflectRef::Map(entries) => {
            let mut pairs: Vec<(String, String)> = entries
                .map(|(k, v)| {
                    let (mut key, mut val) = (String::new(), String::new());
                    canonical(de, k, &mut key);
                    canonical(de, v, &mut val);
                    (key, val)
                })
                .collect();
            pairs.sort();
            out.push('{');
            for (k, v) in pairs {
                let _ = write!(out, "{k}:{v},");
            }
            out.push('}');
        }
        ReflectRef::BitSet(bits) => {
            out.push('b');
            for i in bits.ones() {
                let _ = write!(out, "{i},");
            }
        }
        ReflectRef::Record(obj) => match de.config().descriptor(&obj.runtime_type()) {
            Some(descriptor) => {
                let mut props: Vec<(&str, String)> = descriptor
                    .properties()
                    .iter()
                    .filter_map(|p| {
                        let v = p.get(obj)?;
                        let mut text = String::new();
                        canonical(de, v.as_reflect(), &mut text);
                        Some((p.name(), text))
                    })
                    .collect();
                props.sort();
                let _ = write!(out, "<{}", obj.runtime_type());
                for (name, text) in props {
                    let _ = write!(out, " {name}={text}");
                }
                out.push('>');
            }
            // Without a descriptor only identity is known.
            None => {
                let _ = write!(out, "@{:p}", obj as *const dyn Reflect as *const ());
            }
        },
    }
}

fn canonical_json(json: &JsonValue, out: &mut String) {
    match json {
        JsonValue::Object(members) => {
            let mut keys: Vec<&String> = members.keys().collect();
            keys.sort();
            out.push('{');
            for key in keys {
                write_string(out, key);
                out.push(':');
                canonical_json(&members[key], out);
                out.push(',');
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for item in items {
                canonical_json(item, out);
                out.push(',');
            }
            out.push(']');
        }
        other => write_value(out, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JsonConfig;
    use crate::value::text::parse;

    fn conv(target: TypeRef, src: &str) -> Result<Native> {
        let config = JsonConfig::new();
        let json = parse(src).unwrap();
        Deserializer::new(&config).deserialize(&target, Some(&json))
    }

    #[test]
    fn bit_set() {
        let bits = downcast_native::<FixedBitSet>(conv(TypeRef::new(Classifier::BitSet), "[1,3]").unwrap()).unwrap();
        assert_eq!(bits.ones().collect::<Vec<_>>(), [1, 3]);
        let e = conv(TypeRef::new(Classifier::BitSet), "[1,-3]").err().unwrap();
        assert_eq!(e.pointer().map(ToString::to_string).as_deref(), Some("/1"));
    }

    #[test]
    fn tuple_arity() {
        let pair = TypeRef::generic(Classifier::Pair, vec![TypeRef::new(Classifier::Int), TypeRef::new(Classifier::Int)]);
        let e = conv(pair, "[1,2,3]").err().unwrap();
        assert!(matches!(e.kind(), ErrorKind::CannotDeserialize { .. }));
    }

    #[test]
    fn list_needs_element_type() {
        let e = conv(TypeRef::new(Classifier::List), "[1]").err().unwrap();
        assert!(matches!(e.kind(), ErrorKind::UnresolvedTypeParameter { .. }));
    }

    #[test]
    fn char_array_from_elements() {
        let chars = downcast_native::<CharArray>(conv(TypeRef::new(Classifier::CharArray), r#"["a","b"]"#).unwrap());
        assert_eq!(chars, Some(CharArray::from("ab")));
    }

    #[test]
    fn set_of_maps_ignores_key_order() {
        let string = TypeRef::new(Classifier::String);
        let int = TypeRef::new(Classifier::Int);
        let set = TypeRef::generic(Classifier::Set, vec![TypeRef::generic(Classifier::Map, vec![string, int])]);
        let e = conv(set.clone(), r#"[{"a":1,"b":2},{"b":2,"a":1}]"#).err().unwrap();
        assert_eq!(e.kind(), &ErrorKind::DuplicateNotAllowed);
        assert_eq!(e.pointer().map(ToString::to_string).as_deref(), Some("/1"));
        assert!(conv(set, r#"[{"a":1,"b":2},{"a":2,"b":1}]"#).is_ok());
    }

    #[test]
    fn set_check_ignores_output_mappings() {
        let mut config = JsonConfig::new();
        config.to_json(|_: &i32| -> anyhow::Result<JsonValue> { anyhow::bail!("never written") });
        let set = TypeRef::generic(Classifier::Set, vec![TypeRef::new(Classifier::Int)]);
        let json = parse("[1,2]").unwrap();
        assert!(Deserializer::new(&config).deserialize(&set, Some(&json)).is_ok());
        let json = parse("[1,2,1]").unwrap();
        let e = Deserializer::new(&config).deserialize(&set, Some(&json)).err().unwrap();
        assert_eq!(e.pointer().map(ToString::to_string).as_deref(), Some("/2"));
    }

    #[test]
    fn strings_are_not_arrays() {
        let e = conv(TypeRef::new(Classifier::String), "[1]").err().unwrap();
        assert!(matches!(e.kind(), ErrorKind::CannotDeserialize { .. }));
    }
}
