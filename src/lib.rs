//! Configurable conversion between JSON and Rust values.
//!
//! Types take part by implementing [`Typed`], [`Reflect`] and
//! [`FromReflect`] (the [`reflect_record!`] and [`reflect_enum!`] macros cover
//! the usual cases) and by registering a [`TypeDescriptor`] with the
//! [`JsonConfig`]. Built-in scalars, temporal types, collections and tuples
//! need no registration.
//!
//! ```ignore
//! let mut config = JsonConfig::new();
//! config.register::<Dummy1>();
//! let d: Dummy1 = json_auto::parse(r#"{"field1":"abc"}"#, &config)?;
//! assert_eq!(json_auto::stringify(&d, &config)?, r#"{"field1":"abc","field2":999}"#);
//! ```
pub mod config;
pub mod de;
pub mod deferred;
pub mod describe;
pub mod error;
pub mod native;
pub mod pointer;
pub mod reflect;
pub mod ser;
pub mod stringify;
pub mod temporal;
pub mod types;
pub mod value;

#[cfg(test)]
mod fixtures;

pub use config::{ConfigSettings, JsonConfig};
pub use de::{deserialize, Deserializer};
pub use deferred::Deferred;
pub use describe::{
    Annotation, Args, Constructor, Describe, Param, Property, TypeDescriptor, TypeIntrospector, TypeRegistry,
};
pub use error::{ConfigError, ErrorKind, JsonAutoError, Result};
pub use pointer::JsonPointer;
pub use reflect::{FromReflect, Native, Reflect, ReflectRef};
pub use ser::{serialize, Serializer};
pub use stringify::{stringify, Stringifier};
pub use types::{Classifier, TypeRef, Typed};
pub use value::{JsonKind, JsonObject, JsonValue};

/// Convert against a runtime type reference instead of a Rust type.
pub fn deserialize_type(target: &TypeRef, json: &JsonValue, config: &JsonConfig) -> Result<Native> {
    Deserializer::new(config).deserialize(target, Some(json))
}

/// Parse JSON text and convert it to `T`.
pub fn parse<T: FromReflect + Typed>(text: &str, config: &JsonConfig) -> Result<T> {
    let json = value::text::parse(text).map_err(|e| JsonAutoError::new(ErrorKind::InvalidJson).caused_by(e))?;
    deserialize(&json, config)
}

/// JSON text of `value`, built directly when the config asks for streamed
/// output and through a tree otherwise. Both give the same text.
pub fn to_json_string(value: &dyn Reflect, config: &JsonConfig) -> Result<String> {
    if config.stream_output() {
        stringify(value, config)
    } else {
        Ok(serialize(value, config)?.to_json_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use std::collections::{HashMap, HashSet, VecDeque};

    fn round_trip<T: FromReflect + Typed + PartialEq + std::fmt::Debug>(value: T, config: &JsonConfig) {
        let text = to_json_string(&value, config).unwrap();
        let back: T = parse(&text, config).unwrap_or_else(|e| panic!("{text}: {e}"));
        assert_eq!(back, value, "{text}");
    }

    #[test]
    fn round_trips() {
        let c = fixture_config();
        round_trip(Dummy1 { field1: "abc".into(), field2: 123 }, &c);
        round_trip(Expr::Const { number: 2.5 }, &c);
        round_trip(Expr::NotANumber, &c);
        round_trip(DummyEnum::BETA, &c);
        round_trip(vec![Some(1_i64), None], &c);
        round_trip(VecDeque::from(vec!['a', 'b']), &c);
        round_trip(HashSet::from(["x".to_owned()]), &c);
        round_trip(HashMap::from([(3_i16, "three".to_owned())]), &c);
        round_trip(("a".to_owned(), 1_i32, true), &c);
        round_trip(Multi { a: 1, b: 2, via: "ab" }, &c);
        round_trip(DummyFromJson { x: 255 }, &c);
        round_trip(chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), &c);
        round_trip(uuid::Uuid::nil(), &c);
    }

    #[test]
    fn streamed_output_matches_tree() {
        let mut c = fixture_config();
        let value = Dummy1 { field1: "abc".into(), field2: 999 };
        let tree = to_json_string(&value, &c).unwrap();
        c.set_stream_output(true);
        assert_eq!(to_json_string(&value, &c).unwrap(), tree);
        assert_eq!(tree, r#"{"field1":"abc","field2":999}"#);
    }

    #[test]
    fn invalid_text() {
        let e = parse::<i32>("{", &JsonConfig::new()).unwrap_err();
        assert_eq!(e.kind(), &ErrorKind::InvalidJson);
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn untyped_target() {
        let json = value::text::parse(r#"{"a":[1,"x"]}"#).unwrap();
        let native = deserialize_type(&TypeRef::any(), &json, &JsonConfig::new()).unwrap();
        let back = serialize(reflect::native_ref(&native), &JsonConfig::new()).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn string_mappings() {
        let mut c = JsonConfig::new();
        c.from_json_string::<uuid::Uuid>().to_json_string::<uuid::Uuid>();
        let id: uuid::Uuid = parse(r#""936da01f-9abd-4d9d-80c7-02af85c822a8""#, &c).unwrap();
        assert_eq!(to_json_string(&id, &c).unwrap(), r#""936da01f-9abd-4d9d-80c7-02af85c822a8""#);
        let e = parse::<uuid::Uuid>("12", &c).unwrap_err();
        assert!(matches!(e.kind(), ErrorKind::CustomMappingFailed { .. }));
    }
}
