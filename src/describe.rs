//! Type descriptors: the metadata both engines consult for user types.
//!
//! A descriptor lists how a type is built (constructors with named, typed,
//! possibly optional parameters), how it is read back (properties with
//! getters and either a setter or an equality check), its annotations,
//! and for sealed families the variants. Descriptors are assembled with a
//! small builder API, usually inside a [`Describe`] impl, and registered in
//! a [`TypeRegistry`].
pub mod registry;

use std::any::type_name;
use std::sync::Arc;

use crate::error::ArgError;
use crate::reflect::{FromReflect, Native, Reflect};
use crate::types::{Classifier, TypeParam, TypeRef, Typed};
use crate::value::{JsonKind, JsonValue};

pub use registry::TypeRegistry;

/// Types with a descriptor.
pub trait Describe: Typed {
    fn describe() -> TypeDescriptor;
}

/// Metadata queries the engines need. Implemented by [`TypeRegistry`].
pub trait TypeIntrospector {
    fn descriptor(&self, ty: &TypeRef) -> Option<Arc<TypeDescriptor>>;

    /// Declared supertypes, sealed parent included.
    fn supertypes(&self, ty: &TypeRef) -> Vec<TypeRef> {
        self.descriptor(ty).map(|d| d.supertypes()).unwrap_or_default()
    }
}

// ------------------------------ Annotations ------------------------------- //

pub const JSON_NAME: &str = "JSONName";
pub const JSON_IGNORE: &str = "JSONIgnore";
pub const TRANSIENT: &str = "Transient";
pub const JSON_INCLUDE_IF_NULL: &str = "JSONIncludeIfNull";
pub const JSON_INCLUDE_ALL_PROPERTIES: &str = "JSONIncludeAllProperties";
pub const JSON_ALLOW_EXTRA: &str = "JSONAllowExtra";

/// Named marker with string arguments, attached to types, params and properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    name: String,
    args: Vec<(String, String)>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), args: Vec::new() } }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn json_name(name: impl Into<String>) -> Self { Self::new(JSON_NAME).arg("name", name) }
    pub fn json_ignore() -> Self { Self::new(JSON_IGNORE) }
    pub fn transient() -> Self { Self::new(TRANSIENT) }
    pub fn include_if_null() -> Self { Self::new(JSON_INCLUDE_IF_NULL) }
    pub fn include_all_properties() -> Self { Self::new(JSON_INCLUDE_ALL_PROPERTIES) }
    pub fn allow_extra() -> Self { Self::new(JSON_ALLOW_EXTRA) }
}

// ------------------------------ Constructors ------------------------------ //

#[derive(Clone, Debug)]
pub struct Param {
    name: String,
    ty: TypeRef,
    optional: bool,
    annotations: Vec<Annotation>,
}

impl Param {
    pub fn of<T: Typed>(name: impl Into<String>) -> Self { Self::typed(name, T::type_ref()) }

    /// Parameter whose type mentions the descriptor's type parameters.
    pub fn typed(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, optional: false, annotations: Vec::new() }
    }

    /// Has a default; may be left unset.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn ty(&self) -> &TypeRef { &self.ty }
    pub fn is_optional(&self) -> bool { self.optional }
    pub fn is_nullable(&self) -> bool { self.ty.is_nullable() }
    pub fn annotations(&self) -> &[Annotation] { &self.annotations }
}

/// How the JSON reaches a constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstructorShape {
    /// Object members matched to parameters by name.
    Named,
    /// Whole JSON string as the single argument.
    FromString,
    /// Whole JSON array, converted to the parameter's list type.
    FromList,
    /// Whole JSON object, converted to the parameter's map type.
    FromMap,
}

pub type BuildFn = Arc<dyn Fn(&mut Args) -> anyhow::Result<Box<dyn Reflect>> + Send + Sync>;

#[derive(Clone)]
pub struct Constructor {
    params: Vec<Param>,
    shape: ConstructorShape,
    build: BuildFn,
}

pub const DELEGATE_PARAM: &str = "value";

impl Constructor {
    /// Named-parameter constructor; add parameters with [`Constructor::param`].
    pub fn new<T, F>(build: F) -> Self
    where
        T: Reflect,
        F: Fn(&mut Args) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            params: Vec::new(),
            shape: ConstructorShape::Named,
            build: Arc::new(move |args: &mut Args| -> anyhow::Result<Box<dyn Reflect>> { Ok(Box::new(build(args)?)) }),
        }
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn from_string<T, F>(build: F) -> Self
    where
        T: Reflect,
        F: Fn(String) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::delegate(ConstructorShape::FromString, build)
    }

    /// Single list argument; `V` is the list type the JSON array converts to.
    pub fn from_list<T, V, F>(build: F) -> Self
    where
        T: Reflect,
        V: FromReflect + Typed,
        F: Fn(V) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::delegate(ConstructorShape::FromList, build)
    }

    pub fn from_map<T, V, F>(build: F) -> Self
    where
        T: Reflect,
        V: FromReflect + Typed,
        F: Fn(V) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::delegate(ConstructorShape::FromMap, build)
    }

    fn delegate<T, V, F>(shape: ConstructorShape, build: F) -> Self
    where
        T: Reflect,
        V: FromReflect + Typed,
        F: Fn(V) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            params: vec![Param::of::<V>(DELEGATE_PARAM)],
            shape,
            build: Arc::new(move |args: &mut Args| -> anyhow::Result<Box<dyn Reflect>> {
                Ok(Box::new(build(args.take::<V>(DELEGATE_PARAM)?)?))
            }),
        }
    }

    pub fn params(&self) -> &[Param] { &self.params }
    pub fn shape(&self) -> ConstructorShape { self.shape }
    pub fn is_named(&self) -> bool { self.shape == ConstructorShape::Named }

    pub fn build(&self, args: &mut Args) -> anyhow::Result<Box<dyn Reflect>> { (self.build)(args) }
}

/// Sparse argument list handed to a constructor's build function. Unset
/// slots mean "use your default".
#[derive(Default)]
pub struct Args {
    slots: Vec<(String, Native)>,
}

impl Args {
    pub fn new() -> Self { Self::default() }

    pub fn set(&mut self, name: &str, value: Native) {
        self.slots.retain(|(n, _)| n != name);
        self.slots.push((name.to_owned(), value));
    }

    pub fn is_set(&self, name: &str) -> bool { self.slots.iter().any(|(n, _)| n == name) }

    fn remove(&mut self, name: &str) -> Option<Native> {
        let index = self.slots.iter().position(|(n, _)| n == name)?;
        Some(self.slots.swap_remove(index).1)
    }

    /// Required argument.
    pub fn take<T: FromReflect>(&mut self, name: &str) -> Result<T, ArgError> {
        let native = self.remove(name).ok_or_else(|| ArgError::Unset(name.to_owned()))?;
        T::from_native(native)
            .ok_or_else(|| ArgError::Mismatch { name: name.to_owned(), expected: type_name::<T>().to_owned() })
    }

    pub fn take_or<T: FromReflect>(&mut self, name: &str, default: T) -> Result<T, ArgError> {
        self.take_or_else(name, || default)
    }

    pub fn take_or_else<T: FromReflect>(&mut self, name: &str, default: impl FnOnce() -> T) -> Result<T, ArgError> {
        if self.is_set(name) { self.take(name) } else { Ok(default()) }
    }
}

// ------------------------------- Properties ------------------------------- //

/// Value read from a property: borrowed from the instance or computed.
pub enum PropertyValue<'a> {
    Borrowed(&'a dyn Reflect),
    Owned(Box<dyn Reflect>),
}

impl PropertyValue<'_> {
    pub fn as_reflect(&self) -> &dyn Reflect {
        match self {
            PropertyValue::Borrowed(r) => *r,
            PropertyValue::Owned(b) => &**b,
        }
    }
}

pub type Getter = Arc<dyn for<'a> Fn(&'a dyn Reflect) -> Option<PropertyValue<'a>> + Send + Sync>;
pub type Setter = Arc<dyn Fn(&mut dyn Reflect, Native) -> Result<(), ArgError> + Send + Sync>;
pub type Matcher = Arc<dyn Fn(&dyn Reflect, Native) -> Result<bool, ArgError> + Send + Sync>;

#[derive(Clone)]
pub enum PropertyAccess {
    /// Patched by assignment.
    Mutable(Setter),
    /// Patched only when the JSON agrees with the current value.
    Immutable(Matcher),
}

#[derive(Clone)]
pub struct Property {
    name: String,
    ty: TypeRef,
    annotations: Vec<Annotation>,
    getter: Getter,
    access: PropertyAccess,
}

fn getter<F>(f: F) -> Getter
where
    F: for<'a> Fn(&'a dyn Reflect) -> Option<PropertyValue<'a>> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn receiver<T: Reflect>(obj: &dyn Reflect) -> Result<&T, ArgError> {
    obj.as_any().downcast_ref::<T>().ok_or(ArgError::WrongReceiver(type_name::<T>()))
}

fn converted<F: FromReflect>(name: &str, native: Native) -> Result<F, ArgError> {
    F::from_native(native).ok_or_else(|| ArgError::Mismatch { name: name.to_owned(), expected: type_name::<F>().to_owned() })
}

impl Property {
    /// Read-only field.
    pub fn of<T, F, G>(name: impl Into<String>, get: G) -> Self
    where
        T: Reflect,
        F: FromReflect + Typed + PartialEq,
        G: Fn(&T) -> &F + Send + Sync + 'static,
    {
        let name = name.into();
        let get = Arc::new(get);
        let read = Arc::clone(&get);
        let label = name.clone();
        Self {
            ty: F::type_ref(),
            annotations: Vec::new(),
            getter: getter(move |obj| {
                obj.as_any().downcast_ref::<T>().map(|t| PropertyValue::Borrowed((*read)(t) as &dyn Reflect))
            }),
            access: PropertyAccess::Immutable(Arc::new(move |obj: &dyn Reflect, native: Native| -> Result<bool, ArgError> {
                let t = receiver::<T>(obj)?;
                Ok(*(*get)(t) == converted::<F>(&label, native)?)
            })),
            name,
        }
    }

    /// Field with a setter, patched after construction.
    pub fn mutable<T, F, G, S>(name: impl Into<String>, get: G, set: S) -> Self
    where
        T: Reflect,
        F: FromReflect + Typed,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        Self {
            ty: F::type_ref(),
            annotations: Vec::new(),
            getter: getter(move |obj| {
                obj.as_any().downcast_ref::<T>().map(|t| PropertyValue::Borrowed(get(t) as &dyn Reflect))
            }),
            access: PropertyAccess::Mutable(Arc::new(move |obj: &mut dyn Reflect, native: Native| -> Result<(), ArgError> {
                let t = obj.as_any_mut().downcast_mut::<T>().ok_or(ArgError::WrongReceiver(type_name::<T>()))?;
                set(t, converted::<F>(&label, native)?);
                Ok(())
            })),
            name,
        }
    }

    /// Field that exists only on some values, e.g. one enum variant. The
    /// getter answers `None` where it does not apply.
    pub fn when<T, F, G>(name: impl Into<String>, get: G) -> Self
    where
        T: Reflect,
        F: FromReflect + Typed + PartialEq,
        G: Fn(&T) -> Option<&F> + Send + Sync + 'static,
    {
        let name = name.into();
        let get = Arc::new(get);
        let read = Arc::clone(&get);
        let label = name.clone();
        Self {
            ty: F::type_ref(),
            annotations: Vec::new(),
            getter: getter(move |obj| {
                let t = obj.as_any().downcast_ref::<T>()?;
                (*read)(t).map(|f| PropertyValue::Borrowed(f as &dyn Reflect))
            }),
            access: PropertyAccess::Immutable(Arc::new(move |obj: &dyn Reflect, native: Native| -> Result<bool, ArgError> {
                let t = receiver::<T>(obj)?;
                let value = converted::<F>(&label, native)?;
                Ok((*get)(t).is_some_and(|current| *current == value))
            })),
            name,
        }
    }

    /// Derived value, recomputed on every read.
    pub fn computed<T, F, G>(name: impl Into<String>, compute: G) -> Self
    where
        T: Reflect,
        F: FromReflect + Typed + PartialEq,
        G: Fn(&T) -> F + Send + Sync + 'static,
    {
        let name = name.into();
        let compute = Arc::new(compute);
        let read = Arc::clone(&compute);
        let label = name.clone();
        Self {
            ty: F::type_ref(),
            annotations: Vec::new(),
            getter: getter(move |obj| {
                let t = obj.as_any().downcast_ref::<T>()?;
                Some(PropertyValue::Owned(Box::new((*read)(t))))
            }),
            access: PropertyAccess::Immutable(Arc::new(move |obj: &dyn Reflect, native: Native| -> Result<bool, ArgError> {
                let t = receiver::<T>(obj)?;
                Ok((*compute)(t) == converted::<F>(&label, native)?)
            })),
            name,
        }
    }

    /// Replace the declared type, for properties typed by a type parameter.
    pub fn typed(mut self, ty: TypeRef) -> Self {
        self.ty = ty;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn ty(&self) -> &TypeRef { &self.ty }
    pub fn annotations(&self) -> &[Annotation] { &self.annotations }
    pub fn access(&self) -> &PropertyAccess { &self.access }

    pub fn get<'a>(&self, obj: &'a dyn Reflect) -> Option<PropertyValue<'a>> { (self.getter)(obj) }
}

// --------------------------------- Hooks ---------------------------------- //

pub type MakeFn = Arc<dyn Fn(&JsonValue) -> anyhow::Result<Box<dyn Reflect>> + Send + Sync>;
pub type ToJsonHook = Arc<dyn Fn(&dyn Reflect) -> anyhow::Result<JsonValue> + Send + Sync>;
pub type InstanceFn = Arc<dyn Fn() -> Box<dyn Reflect> + Send + Sync>;

/// Type-level factory taking the raw JSON value.
#[derive(Clone)]
pub struct FactoryHook {
    accepts: Option<JsonKind>,
    make: MakeFn,
}

impl FactoryHook {
    pub fn accepts(&self, kind: JsonKind) -> bool { self.accepts.is_none_or(|k| k == kind) }

    pub fn call(&self, json: &JsonValue) -> anyhow::Result<Box<dyn Reflect>> { (self.make)(json) }
}

#[derive(Clone)]
pub struct EnumMember {
    name: &'static str,
    make: InstanceFn,
}

impl EnumMember {
    pub fn name(&self) -> &'static str { self.name }

    pub fn instance(&self) -> Box<dyn Reflect> { (self.make)() }
}

// ------------------------------ Descriptors ------------------------------- //

#[derive(Clone)]
pub enum DescriptorKind {
    Record { constructors: Vec<Constructor>, properties: Vec<Property> },
    Sealed { variants: Vec<Arc<TypeDescriptor>> },
    Singleton { instance: InstanceFn, properties: Vec<Property> },
    Enum { members: Vec<EnumMember> },
}

#[derive(Clone)]
pub struct TypeDescriptor {
    type_ref: TypeRef,
    simple_name: String,
    kind: DescriptorKind,
    type_params: Vec<TypeParam>,
    supertypes: Vec<TypeRef>,
    sealed_parent: Option<TypeRef>,
    annotations: Vec<Annotation>,
    factories: Vec<FactoryHook>,
    to_json: Option<ToJsonHook>,
}

fn simple_name_of(ty: &TypeRef) -> String {
    let full = ty.classifier().name();
    match full.rsplit_once("::") {
        Some((_, last)) => last.to_owned(),
        None => full,
    }
}

impl TypeDescriptor {
    fn with_kind(type_ref: TypeRef, kind: DescriptorKind) -> Self {
        Self {
            simple_name: simple_name_of(&type_ref),
            type_ref: type_ref.non_null(),
            kind,
            type_params: Vec::new(),
            supertypes: Vec::new(),
            sealed_parent: None,
            annotations: Vec::new(),
            factories: Vec::new(),
            to_json: None,
        }
    }

    pub fn record(type_ref: TypeRef) -> Self {
        Self::with_kind(type_ref, DescriptorKind::Record { constructors: Vec::new(), properties: Vec::new() })
    }

    pub fn sealed(type_ref: TypeRef) -> Self {
        Self::with_kind(type_ref, DescriptorKind::Sealed { variants: Vec::new() })
    }

    /// Type with exactly one value; JSON members are patched onto a copy of it.
    pub fn singleton<T: Reflect + Clone>(type_ref: TypeRef, instance: T) -> Self {
        let instance: InstanceFn = Arc::new(move || Box::new(instance.clone()));
        Self::with_kind(type_ref, DescriptorKind::Singleton { instance, properties: Vec::new() })
    }

    pub fn enumeration<T: Reflect + Clone>(type_ref: TypeRef, members: Vec<(&'static str, T)>) -> Self {
        let members = members
            .into_iter()
            .map(|(name, value)| EnumMember { name, make: Arc::new(move || Box::new(value.clone())) })
            .collect();
        Self::with_kind(type_ref, DescriptorKind::Enum { members })
    }

    // ---- builder ----

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        if let DescriptorKind::Record { constructors, .. } = &mut self.kind {
            constructors.push(constructor);
        }
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        match &mut self.kind {
            DescriptorKind::Record { properties, .. } | DescriptorKind::Singleton { properties, .. } => {
                properties.push(property)
            }
            _ => {}
        }
        self
    }

    /// Add a variant to a sealed family.
    pub fn variant(mut self, mut variant: TypeDescriptor) -> Self {
        variant.sealed_parent = Some(self.type_ref.clone());
        if let DescriptorKind::Sealed { variants } = &mut self.kind {
            variants.push(Arc::new(variant));
        }
        self
    }

    pub fn type_param(mut self, param: TypeParam) -> Self {
        self.type_params.push(param);
        self
    }

    pub fn extends(mut self, supertype: TypeRef) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Name written as the discriminator value.
    pub fn simple_name(mut self, name: impl Into<String>) -> Self {
        self.simple_name = name.into();
        self
    }

    /// Factory used for any JSON value.
    pub fn from_json<T, F>(self, make: F) -> Self
    where
        T: Reflect,
        F: Fn(&JsonValue) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.factory(None, make)
    }

    /// Factory used only when the JSON value has `kind`.
    pub fn from_json_kind<T, F>(self, kind: JsonKind, make: F) -> Self
    where
        T: Reflect,
        F: Fn(&JsonValue) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.factory(Some(kind), make)
    }

    fn factory<T, F>(mut self, accepts: Option<JsonKind>, make: F) -> Self
    where
        T: Reflect,
        F: Fn(&JsonValue) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.factories.push(FactoryHook {
            accepts,
            make: Arc::new(move |json: &JsonValue| -> anyhow::Result<Box<dyn Reflect>> { Ok(Box::new(make(json)?)) }),
        });
        self
    }

    pub fn to_json<T, F>(mut self, write: F) -> Self
    where
        T: Reflect,
        F: Fn(&T) -> anyhow::Result<JsonValue> + Send + Sync + 'static,
    {
        self.to_json = Some(Arc::new(move |obj: &dyn Reflect| -> anyhow::Result<JsonValue> {
            let t = receiver::<T>(obj)?;
            write(t)
        }));
        self
    }

    // ---- queries ----

    pub fn type_ref(&self) -> &TypeRef { &self.type_ref }
    pub fn name(&self) -> &str { &self.simple_name }
    pub fn kind(&self) -> &DescriptorKind { &self.kind }
    pub fn type_params(&self) -> &[TypeParam] { &self.type_params }
    pub fn sealed_parent(&self) -> Option<&TypeRef> { self.sealed_parent.as_ref() }
    pub fn annotations(&self) -> &[Annotation] { &self.annotations }
    pub fn to_json_hook(&self) -> Option<&ToJsonHook> { self.to_json.as_ref() }

    pub fn supertypes(&self) -> Vec<TypeRef> {
        self.supertypes.iter().chain(self.sealed_parent.iter()).cloned().collect()
    }

    pub fn constructors(&self) -> &[Constructor] {
        match &self.kind {
            DescriptorKind::Record { constructors, .. } => constructors,
            _ => &[],
        }
    }

    pub fn properties(&self) -> &[Property] {
        match &self.kind {
            DescriptorKind::Record { properties, .. } | DescriptorKind::Singleton { properties, .. } => properties,
            _ => &[],
        }
    }

    pub fn variants(&self) -> &[Arc<TypeDescriptor>] {
        match &self.kind {
            DescriptorKind::Sealed { variants } => variants,
            _ => &[],
        }
    }

    pub fn find_factory(&self, kind: JsonKind) -> Option<&FactoryHook> { self.factories.iter().find(|f| f.accepts(kind)) }

    /// First named-parameter constructor; defines property output order.
    pub fn primary_constructor(&self) -> Option<&Constructor> { self.constructors().iter().find(|c| c.is_named()) }

    /// Delegate constructor of `shape`, if any.
    pub fn delegate(&self, shape: ConstructorShape) -> Option<&Constructor> {
        self.constructors().iter().find(|c| c.shape() == shape)
    }

    pub fn is_named(&self) -> bool { matches!(self.type_ref.classifier(), Classifier::Named(_)) }
}
