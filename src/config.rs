//! Conversion settings, custom mappings and annotation registries.
//!
//! A [`JsonConfig`] is built up with `&mut self` setters and then shared
//! read-only by any number of conversions. Everything that customizes the
//! engines lives here: the discriminator name, inclusion flags, per-type
//! from/to JSON mappings, which annotations mean "rename", "ignore" and so on,
//! and the registry of type descriptors.
pub mod hooks;
pub mod plan;
pub mod settings;

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::describe::{
    Annotation, Describe, FactoryHook, ToJsonHook, TypeDescriptor, TypeRegistry, JSON_ALLOW_EXTRA,
    JSON_IGNORE, JSON_INCLUDE_ALL_PROPERTIES, JSON_INCLUDE_IF_NULL, JSON_NAME, TRANSIENT,
};
use crate::error::ConfigError;
use crate::reflect::{Native, Reflect};
use crate::types::resolve::is_subtype;
use crate::types::{TypeRef, Typed};
use crate::value::{JsonKind, JsonValue};

pub use hooks::HookCache;
pub use plan::{PlannedParam, PlannedProperty, TypePlan};
pub use settings::{ConfigSettings, NameAnnotationSetting};

/// Custom conversion from JSON; receives `None` for JSON null.
pub type FromJsonMapping = Arc<dyn Fn(Option<&JsonValue>) -> anyhow::Result<Native> + Send + Sync>;

/// Custom conversion to JSON; `None` means JSON null.
pub type ToJsonMapping = Arc<dyn Fn(&dyn Reflect) -> anyhow::Result<Option<JsonValue>> + Send + Sync>;

pub const DEFAULT_DISCRIMINATOR: &str = "class";
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8192;
pub const MAX_READ_BUFFER_SIZE: usize = 256 * 1024;
pub const DEFAULT_STRINGIFY_INITIAL_SIZE: usize = 1024;
pub const DEFAULT_CHARSET: &str = "UTF-8";

#[derive(Clone)]
pub struct JsonConfig {
    sealed_class_discriminator: String,
    read_buffer_size: usize,
    stringify_initial_size: usize,
    charset: String,
    big_integer_string: bool,
    big_decimal_string: bool,
    include_nulls: bool,
    allow_extra: bool,
    stream_output: bool,

    from_json_map: IndexMap<TypeRef, FromJsonMapping>,
    to_json_map: IndexMap<TypeRef, ToJsonMapping>,

    /// (annotation name, argument holding the serialized name)
    name_annotations: Vec<(String, String)>,
    ignore_annotations: Vec<String>,
    include_if_null_annotations: Vec<String>,
    include_all_properties_annotations: Vec<String>,
    allow_extra_properties_annotations: Vec<String>,

    types: TypeRegistry,
    hooks: HookCache,
}

impl Default for JsonConfig {
    fn default() -> Self {
        Self {
            sealed_class_discriminator: DEFAULT_DISCRIMINATOR.to_owned(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            stringify_initial_size: DEFAULT_STRINGIFY_INITIAL_SIZE,
            charset: DEFAULT_CHARSET.to_owned(),
            big_integer_string: false,
            big_decimal_string: false,
            include_nulls: false,
            allow_extra: false,
            stream_output: false,
            from_json_map: IndexMap::new(),
            to_json_map: IndexMap::new(),
            name_annotations: vec![(JSON_NAME.to_owned(), "name".to_owned())],
            ignore_annotations: vec![JSON_IGNORE.to_owned(), TRANSIENT.to_owned()],
            include_if_null_annotations: vec![JSON_INCLUDE_IF_NULL.to_owned()],
            include_all_properties_annotations: vec![JSON_INCLUDE_ALL_PROPERTIES.to_owned()],
            allow_extra_properties_annotations: vec![JSON_ALLOW_EXTRA.to_owned()],
            types: TypeRegistry::new(),
            hooks: HookCache::default(),
        }
    }
}

fn has_any(annotations: &[Annotation], names: &[String]) -> bool {
    annotations.iter().any(|a| names.iter().any(|n| n == a.name()))
}

impl JsonConfig {
    pub fn new() -> Self { Self::default() }

    // ---- scalar settings ---- //

    pub fn sealed_class_discriminator(&self) -> &str { &self.sealed_class_discriminator }

    pub fn set_sealed_class_discriminator(&mut self, name: impl Into<String>) -> Result<&mut Self, ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::InvalidDiscriminator(name));
        }
        self.sealed_class_discriminator = name;
        Ok(self)
    }

    pub fn read_buffer_size(&self) -> usize { self.read_buffer_size }

    pub fn set_read_buffer_size(&mut self, size: usize) -> Result<&mut Self, ConfigError> {
        if size == 0 || size % 16 != 0 || size > MAX_READ_BUFFER_SIZE {
            return Err(ConfigError::InvalidBufferSize(size));
        }
        self.read_buffer_size = size;
        Ok(self)
    }

    pub fn stringify_initial_size(&self) -> usize { self.stringify_initial_size }

    pub fn set_stringify_initial_size(&mut self, size: usize) -> Result<&mut Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::InvalidInitialSize(size));
        }
        self.stringify_initial_size = size;
        Ok(self)
    }

    pub fn charset(&self) -> &str { &self.charset }

    pub fn set_charset(&mut self, charset: impl Into<String>) -> &mut Self {
        self.charset = charset.into();
        self
    }

    pub fn big_integer_string(&self) -> bool { self.big_integer_string }

    pub fn set_big_integer_string(&mut self, on: bool) -> &mut Self {
        self.big_integer_string = on;
        self
    }

    pub fn big_decimal_string(&self) -> bool { self.big_decimal_string }

    pub fn set_big_decimal_string(&mut self, on: bool) -> &mut Self {
        self.big_decimal_string = on;
        self
    }

    pub fn include_nulls(&self) -> bool { self.include_nulls }

    pub fn set_include_nulls(&mut self, on: bool) -> &mut Self {
        self.include_nulls = on;
        self
    }

    pub fn allow_extra(&self) -> bool { self.allow_extra }

    pub fn set_allow_extra(&mut self, on: bool) -> &mut Self {
        self.allow_extra = on;
        self
    }

    pub fn stream_output(&self) -> bool { self.stream_output }

    pub fn set_stream_output(&mut self, on: bool) -> &mut Self {
        self.stream_output = on;
        self
    }

    // ---- types ---- //

    pub fn types(&self) -> &TypeRegistry { &self.types }

    pub fn register<T: Describe>(&mut self) -> &mut Self {
        self.types.register::<T>();
        self.hooks.clear();
        self
    }

    pub fn add_descriptor(&mut self, descriptor: TypeDescriptor) -> &mut Self {
        self.types.add(descriptor);
        self.hooks.clear();
        self
    }

    pub fn descriptor(&self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>> { self.types.get(ty).cloned() }

    pub(crate) fn hooks(&self) -> &HookCache { &self.hooks }

    /// Factory hook of `ty`'s descriptor accepting `kind`, memoized.
    pub(crate) fn factory_hook(&self, ty: &TypeRef, kind: JsonKind) -> Option<FactoryHook> {
        self.hooks.factory(ty, kind, || self.types.get(ty)?.find_factory(kind).cloned())
    }

    /// `to_json` hook of `ty`'s descriptor, memoized.
    pub(crate) fn to_json_hook(&self, ty: &TypeRef) -> Option<ToJsonHook> {
        self.hooks.to_json(ty, || self.types.get(ty)?.to_json_hook().cloned())
    }

    pub(crate) fn plan(&self, descriptor: &TypeDescriptor) -> Arc<TypePlan> {
        self.hooks.plan(descriptor.type_ref(), || TypePlan::build(self, descriptor))
    }

    // ---- from-JSON mappings ---- //

    pub fn from_json_mapping(&mut self, ty: TypeRef, mapping: FromJsonMapping) -> &mut Self {
        self.from_json_map.insert(ty, mapping);
        self
    }

    /// Map non-null JSON with `f`; JSON null stays null.
    pub fn from_json<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Reflect + Typed,
        F: Fn(&JsonValue) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let mapping: FromJsonMapping = Arc::new(move |json: Option<&JsonValue>| -> anyhow::Result<Native> {
            match json {
                None | Some(JsonValue::Null) => Ok(None),
                Some(json) => Ok(Some(Box::new(f(json)?))),
            }
        });
        self.from_json_mapping(T::type_ref().non_null(), mapping)
    }

    /// Build `T` from a JSON string through its `FromStr`.
    pub fn from_json_string<T>(&mut self) -> &mut Self
    where
        T: Reflect + Typed + FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.from_json(|json: &JsonValue| -> anyhow::Result<T> {
            match json.as_str() {
                Some(s) => Ok(s.parse::<T>()?),
                None => anyhow::bail!("expected a string for {}, found {}", T::type_ref(), json.kind()),
            }
        })
    }

    /// Most general registered key `K` with `K ⊑ target`; ties keep the first.
    pub fn find_from_json_mapping(&self, target: &TypeRef) -> Option<&FromJsonMapping> {
        let mut best: Option<(&TypeRef, &FromJsonMapping)> = None;
        for (key, mapping) in &self.from_json_map {
            if !is_subtype(&self.types, key, target) {
                continue;
            }
            match best {
                Some((b, _)) if !(is_subtype(&self.types, b, key) && b != key) => {}
                _ => best = Some((key, mapping)),
            }
        }
        best.map(|(_, m)| m)
    }

    // ---- to-JSON mappings ---- //

    pub fn to_json_mapping(&mut self, ty: TypeRef, mapping: ToJsonMapping) -> &mut Self {
        self.to_json_map.insert(ty, mapping);
        self
    }

    pub fn to_json<T, F>(&mut self, f: F) -> &mut Self
    where
        T: Reflect + Typed,
        F: Fn(&T) -> anyhow::Result<JsonValue> + Send + Sync + 'static,
    {
        let mapping: ToJsonMapping = Arc::new(move |obj: &dyn Reflect| -> anyhow::Result<Option<JsonValue>> {
            match obj.as_any().downcast_ref::<T>() {
                Some(t) => Ok(Some(f(t)?)),
                None => anyhow::bail!("to_json mapping for {} applied to {}", T::type_ref(), obj.runtime_type()),
            }
        });
        self.to_json_mapping(T::type_ref().non_null(), mapping)
    }

    /// Write `T` as a JSON string of its `Display` text.
    pub fn to_json_string<T>(&mut self) -> &mut Self
    where
        T: Reflect + Typed + Display,
    {
        self.to_json(|t: &T| -> anyhow::Result<JsonValue> { Ok(JsonValue::String(t.to_string())) })
    }

    /// Most specific registered key `K` with `source ⊑ K`; ties keep the first.
    pub fn find_to_json_mapping(&self, source: &TypeRef) -> Option<&ToJsonMapping> {
        let mut best: Option<(&TypeRef, &ToJsonMapping)> = None;
        for (key, mapping) in &self.to_json_map {
            if !is_subtype(&self.types, source, key) {
                continue;
            }
            match best {
                Some((b, _)) if !(is_subtype(&self.types, key, b) && b != key) => {}
                _ => best = Some((key, mapping)),
            }
        }
        best.map(|(_, m)| m)
    }

    pub fn has_mappings(&self) -> bool { !self.from_json_map.is_empty() || !self.to_json_map.is_empty() }

    // ---- annotations ---- //

    pub fn add_name_annotation(&mut self, annotation: impl Into<String>, argument: impl Into<String>) -> &mut Self {
        self.name_annotations.push((annotation.into(), argument.into()));
        self.hooks.clear();
        self
    }

    pub fn add_ignore_annotation(&mut self, annotation: impl Into<String>) -> &mut Self {
        self.ignore_annotations.push(annotation.into());
        self.hooks.clear();
        self
    }

    pub fn add_include_if_null_annotation(&mut self, annotation: impl Into<String>) -> &mut Self {
        self.include_if_null_annotations.push(annotation.into());
        self.hooks.clear();
        self
    }

    pub fn add_include_all_properties_annotation(&mut self, annotation: impl Into<String>) -> &mut Self {
        self.include_all_properties_annotations.push(annotation.into());
        self.hooks.clear();
        self
    }

    pub fn add_allow_extra_properties_annotation(&mut self, annotation: impl Into<String>) -> &mut Self {
        self.allow_extra_properties_annotations.push(annotation.into());
        self.hooks.clear();
        self
    }

    /// Serialized name from the first matching name annotation.
    pub fn find_name(&self, annotations: &[Annotation]) -> Option<String> {
        self.name_annotations.iter().find_map(|(name, arg)| {
            annotations.iter().find(|a| a.name() == name).and_then(|a| a.get(arg)).map(str::to_owned)
        })
    }

    pub fn has_ignore(&self, annotations: &[Annotation]) -> bool { has_any(annotations, &self.ignore_annotations) }

    pub fn has_include_if_null(&self, annotations: &[Annotation]) -> bool {
        has_any(annotations, &self.include_if_null_annotations)
    }

    pub fn has_include_all_properties(&self, annotations: &[Annotation]) -> bool {
        has_any(annotations, &self.include_all_properties_annotations)
    }

    pub fn has_allow_extra(&self, annotations: &[Annotation]) -> bool {
        has_any(annotations, &self.allow_extra_properties_annotations)
    }

    // ---- merging ---- //

    /// Take every setting, mapping, annotation and type of `other`.
    pub fn combine_all(&mut self, other: &JsonConfig) -> &mut Self {
        self.sealed_class_discriminator = other.sealed_class_discriminator.clone();
        self.read_buffer_size = other.read_buffer_size;
        self.stringify_initial_size = other.stringify_initial_size;
        self.charset = other.charset.clone();
        self.big_integer_string = other.big_integer_string;
        self.big_decimal_string = other.big_decimal_string;
        self.include_nulls = other.include_nulls;
        self.allow_extra = other.allow_extra;
        self.stream_output = other.stream_output;
        extend_unique(&mut self.name_annotations, &other.name_annotations);
        extend_unique(&mut self.ignore_annotations, &other.ignore_annotations);
        extend_unique(&mut self.include_if_null_annotations, &other.include_if_null_annotations);
        extend_unique(&mut self.include_all_properties_annotations, &other.include_all_properties_annotations);
        extend_unique(&mut self.allow_extra_properties_annotations, &other.allow_extra_properties_annotations);
        self.types.merge(&other.types);
        self.combine_mappings(other)
    }

    /// Take only the from/to JSON mappings of `other`.
    pub fn combine_mappings(&mut self, other: &JsonConfig) -> &mut Self {
        for (k, v) in &other.from_json_map {
            self.from_json_map.insert(k.clone(), Arc::clone(v));
        }
        for (k, v) in &other.to_json_map {
            self.to_json_map.insert(k.clone(), Arc::clone(v));
        }
        self.hooks.clear();
        tracing::debug!(
            from_json = self.from_json_map.len(),
            to_json = self.to_json_map.len(),
            "combined mappings"
        );
        self
    }

    // ---- settings ---- //

    pub fn apply_settings(&mut self, settings: &ConfigSettings) -> Result<&mut Self, ConfigError> {
        if let Some(name) = &settings.sealed_class_discriminator {
            self.set_sealed_class_discriminator(name.clone())?;
        }
        if let Some(size) = settings.read_buffer_size {
            self.set_read_buffer_size(size)?;
        }
        if let Some(size) = settings.stringify_initial_size {
            self.set_stringify_initial_size(size)?;
        }
        if let Some(charset) = &settings.charset {
            self.set_charset(charset.clone());
        }
        if let Some(on) = settings.big_integer_string {
            self.big_integer_string = on;
        }
        if let Some(on) = settings.big_decimal_string {
            self.big_decimal_string = on;
        }
        if let Some(on) = settings.include_nulls {
            self.include_nulls = on;
        }
        if let Some(on) = settings.allow_extra {
            self.allow_extra = on;
        }
        if let Some(on) = settings.stream_output {
            self.stream_output = on;
        }
        for setting in &settings.name_annotations {
            self.add_name_annotation(setting.annotation.clone(), setting.argument.clone());
        }
        for name in &settings.ignore_annotations {
            self.add_ignore_annotation(name.clone());
        }
        for name in &settings.include_if_null_annotations {
            self.add_include_if_null_annotation(name.clone());
        }
        for name in &settings.include_all_properties_annotations {
            self.add_include_all_properties_annotation(name.clone());
        }
        for name in &settings.allow_extra_properties_annotations {
            self.add_allow_extra_properties_annotation(name.clone());
        }
        Ok(self)
    }

    /// Default config with a JSON settings document applied.
    pub fn from_settings_str(src: &str) -> Result<Self, ConfigError> {
        let settings = ConfigSettings::from_str_with_path(src)?;
        let mut config = Self::new();
        config.apply_settings(&settings)?;
        tracing::debug!(discriminator = %config.sealed_class_discriminator, "loaded settings");
        Ok(config)
    }

    /// Current scalar settings; annotation lists beyond the defaults included.
    pub fn settings(&self) -> ConfigSettings {
        let defaults = Self::default();
        let extra = |mine: &[String], base: &[String]| -> Vec<String> {
            mine.iter().filter(|n| !base.contains(n)).cloned().collect()
        };
        ConfigSettings {
            sealed_class_discriminator: Some(self.sealed_class_discriminator.clone()),
            read_buffer_size: Some(self.read_buffer_size),
            stringify_initial_size: Some(self.stringify_initial_size),
            charset: Some(self.charset.clone()),
            big_integer_string: Some(self.big_integer_string),
            big_decimal_string: Some(self.big_decimal_string),
            include_nulls: Some(self.include_nulls),
            allow_extra: Some(self.allow_extra),
            stream_output: Some(self.stream_output),
            name_annotations: self
                .name_annotations
                .iter()
                .filter(|pair| !defaults.name_annotations.contains(pair))
                .map(|(annotation, argument)| NameAnnotationSetting {
                    annotation: annotation.clone(),
                    argument: argument.clone(),
                })
                .collect(),
            ignore_annotations: extra(&self.ignore_annotations, &defaults.ignore_annotations),
            include_if_null_annotations: extra(&self.include_if_null_annotations, &defaults.include_if_null_annotations),
            include_all_properties_annotations: extra(
                &self.include_all_properties_annotations,
                &defaults.include_all_properties_annotations,
            ),
            allow_extra_properties_annotations: extra(
                &self.allow_extra_properties_annotations,
                &defaults.allow_extra_properties_annotations,
            ),
        }
    }
}

fn extend_unique<T: Clone + PartialEq>(into: &mut Vec<T>, from: &[T]) {
    for item in from {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classifier;

    #[test]
    fn validation() {
        let mut c = JsonConfig::new();
        assert!(matches!(c.set_sealed_class_discriminator(""), Err(ConfigError::InvalidDiscriminator(_))));
        assert!(matches!(c.set_read_buffer_size(100), Err(ConfigError::InvalidBufferSize(100))));
        assert!(matches!(c.set_read_buffer_size(512 * 1024), Err(ConfigError::InvalidBufferSize(_))));
        assert!(c.set_read_buffer_size(4096).is_ok());
        assert!(matches!(c.set_stringify_initial_size(0), Err(ConfigError::InvalidInitialSize(0))));
        assert_eq!(c.read_buffer_size(), 4096);
        assert_eq!(c.sealed_class_discriminator(), "class");
    }

    #[test]
    fn custom_annotations_are_recognized() {
        let mut c = JsonConfig::new();
        c.add_name_annotation("Rename", "to").add_ignore_annotation("Skip");
        let renamed = [Annotation::new("Rename").arg("to", "alias")];
        assert_eq!(c.find_name(&renamed).as_deref(), Some("alias"));
        assert_eq!(c.find_name(&[Annotation::json_name("x")]).as_deref(), Some("x"));
        assert!(c.has_ignore(&[Annotation::new("Skip")]));
        assert!(c.has_ignore(&[Annotation::transient()]));
        assert!(!c.has_ignore(&[Annotation::new("Other")]));
    }

    fn tag(label: &'static str) -> ToJsonMapping {
        Arc::new(move |_: &dyn Reflect| -> anyhow::Result<Option<JsonValue>> { Ok(Some(label.into())) })
    }

    #[test]
    fn to_json_prefers_most_specific() {
        let mut c = JsonConfig::new();
        c.to_json_mapping(TypeRef::new(Classifier::Number), tag("number"));
        c.to_json_mapping(TypeRef::new(Classifier::Int), tag("int"));
        let found = c.find_to_json_mapping(&TypeRef::new(Classifier::Int)).unwrap();
        assert_eq!(found(&1_i32).unwrap(), Some(JsonValue::from("int")));
        let found = c.find_to_json_mapping(&TypeRef::new(Classifier::Long)).unwrap();
        assert_eq!(found(&1_i64).unwrap(), Some(JsonValue::from("number")));
        assert!(c.find_to_json_mapping(&TypeRef::new(Classifier::String)).is_none());
    }

    #[test]
    fn from_json_prefers_most_general() {
        let mut c = JsonConfig::new();
        c.add_descriptor(TypeDescriptor::record(TypeRef::named("A")));
        c.add_descriptor(TypeDescriptor::record(TypeRef::named("B")).extends(TypeRef::named("A")));
        c.add_descriptor(TypeDescriptor::record(TypeRef::named("C")).extends(TypeRef::named("B")));
        let make = |label: &'static str| -> FromJsonMapping {
            Arc::new(move |_: Option<&JsonValue>| -> anyhow::Result<Native> { Ok(Some(Box::new(label.to_owned()))) })
        };
        c.from_json_mapping(TypeRef::named("C"), make("c"));
        c.from_json_mapping(TypeRef::named("B"), make("b"));
        let found = c.find_from_json_mapping(&TypeRef::named("A")).unwrap();
        let out = crate::reflect::downcast_native::<String>(found(None).unwrap());
        assert_eq!(out.as_deref(), Some("b"));
        assert!(c.find_from_json_mapping(&TypeRef::named("D")).is_none());
    }

    #[test]
    fn settings_apply_and_report() {
        let c = JsonConfig::from_settings_str(r#"{"includeNulls":true,"ignoreAnnotations":["Skip"]}"#).unwrap();
        assert!(c.include_nulls());
        assert!(c.has_ignore(&[Annotation::new("Skip")]));
        let s = c.settings();
        assert_eq!(s.ignore_annotations, ["Skip"]);
        assert_eq!(s.sealed_class_discriminator.as_deref(), Some("class"));

        let err = JsonConfig::from_settings_str(r#"{"readBufferSize":"big"}"#).err().unwrap();
        assert!(err.to_string().starts_with("at settings path readBufferSize"));
        let err = JsonConfig::from_settings_str(r#"{"readBufferSize":100}"#).err().unwrap();
        assert!(matches!(err, ConfigError::InvalidBufferSize(100)));
    }

    #[test]
    fn combine() {
        let mut base = JsonConfig::new();
        let mut other = JsonConfig::new();
        other.set_include_nulls(true).add_ignore_annotation("Skip").to_json_string::<i32>();
        base.combine_mappings(&other);
        assert!(!base.include_nulls());
        assert!(base.find_to_json_mapping(&TypeRef::new(Classifier::Int)).is_some());
        base.combine_all(&other);
        assert!(base.include_nulls());
        assert!(base.has_ignore(&[Annotation::new("Skip")]));
    }
}
