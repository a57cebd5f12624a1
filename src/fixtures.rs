//! Types shared by the unit tests.
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::config::JsonConfig;
use crate::describe::{Annotation, Args, Constructor, Describe, Param, Property, TypeDescriptor};
use crate::reflect::{downcast_native, FromReflect, Native, Reflect, ReflectRef};
use crate::types::{Classifier, TypeParam, TypeRef, Typed};
use crate::value::JsonValue;
use crate::{reflect_enum, reflect_record};

/// Config with every fixture registered.
pub fn fixture_config() -> JsonConfig {
    let mut config = JsonConfig::new();
    config
        .register::<Dummy1>()
        .register::<Dummy>()
        .register::<Derived>()
        .register::<Lenient>()
        .register::<Renamed>()
        .register::<Tagged>()
        .register::<Nullable>()
        .register::<Expr>()
        .register::<DummyEnum>()
        .register::<DummyFromJson>()
        .register::<Multi>()
        .register::<Page<i32>>()
        .register::<Node>()
        .register::<Tags>()
        .register::<Code>()
        .register::<Bag>();
    config
}

// ------------------------------- Records ---------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub struct Dummy1 {
    pub field1: String,
    pub field2: i32,
}
reflect_record!(Dummy1);

impl Describe for Dummy1 {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| {
                    Ok(Dummy1 { field1: args.take("field1")?, field2: args.take_or("field2", 999)? })
                })
                .param(Param::of::<String>("field1"))
                .param(Param::of::<i32>("field2").optional()),
            )
            .property(Property::of("field1", |d: &Dummy1| &d.field1))
            .property(Property::of("field2", |d: &Dummy1| &d.field2))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Dummy {
    pub field1: String,
    pub extra: Option<String>,
}
reflect_record!(Dummy);

impl Describe for Dummy {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Dummy { field1: args.take("field1")?, extra: None }))
                    .param(Param::of::<String>("field1")),
            )
            .property(Property::of("field1", |d: &Dummy| &d.field1))
            .property(Property::mutable("extra", |d: &Dummy| &d.extra, |d: &mut Dummy, v| d.extra = v))
    }
}

/// Has a computed property that input may only repeat.
#[derive(Clone, Debug, PartialEq)]
pub struct Derived {
    pub name: String,
}
reflect_record!(Derived);

impl Describe for Derived {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Derived { name: args.take("name")? }))
                    .param(Param::of::<String>("name")),
            )
            .property(Property::of("name", |d: &Derived| &d.name))
            .property(Property::computed("upper", |d: &Derived| d.name.to_uppercase()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Lenient {
    pub name: String,
}
reflect_record!(Lenient);

impl Describe for Lenient {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .annotate(Annotation::allow_extra())
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Lenient { name: args.take("name")? }))
                    .param(Param::of::<String>("name")),
            )
            .property(Property::of("name", |l: &Lenient| &l.name))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Renamed {
    pub field1: String,
    pub hidden: String,
}
reflect_record!(Renamed);

impl Describe for Renamed {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| {
                    Ok(Renamed { field1: args.take("field1")?, hidden: args.take_or_else("hidden", String::new)? })
                })
                .param(Param::of::<String>("field1").annotate(Annotation::json_name("fieldX")))
                .param(Param::of::<String>("hidden").optional()),
            )
            .property(Property::of("field1", |r: &Renamed| &r.field1))
            .property(Property::of("hidden", |r: &Renamed| &r.hidden).annotate(Annotation::json_ignore()))
    }
}

/// Carries annotations the config knows nothing about until told.
#[derive(Clone, Debug, PartialEq)]
pub struct Tagged {
    pub alpha: String,
    pub secret: String,
}
reflect_record!(Tagged);

impl Describe for Tagged {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| {
                    Ok(Tagged { alpha: args.take("alpha")?, secret: args.take_or_else("secret", String::new)? })
                })
                .param(Param::of::<String>("alpha"))
                .param(Param::of::<String>("secret").optional()),
            )
            .property(Property::of("alpha", |t: &Tagged| &t.alpha).annotate(Annotation::new("Rename").arg("to", "first")))
            .property(Property::of("secret", |t: &Tagged| &t.secret).annotate(Annotation::new("Skip")))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Nullable {
    pub a: Option<String>,
    pub b: Option<String>,
}
reflect_record!(Nullable);

impl Describe for Nullable {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Nullable { a: args.take_or("a", None)?, b: args.take_or("b", None)? }))
                    .param(Param::of::<Option<String>>("a").optional())
                    .param(Param::of::<Option<String>>("b").optional()),
            )
            .property(Property::of("a", |n: &Nullable| &n.a))
            .property(Property::of("b", |n: &Nullable| &n.b).annotate(Annotation::include_if_null()))
    }
}

/// Two constructors; the one matching the most members wins.
#[derive(Clone, Debug, PartialEq)]
pub struct Multi {
    pub a: i32,
    pub b: i32,
    pub via: &'static str,
}
reflect_record!(Multi);

impl Describe for Multi {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Multi { a: args.take("a")?, b: 0, via: "a" }))
                    .param(Param::of::<i32>("a")),
            )
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Multi { a: args.take("a")?, b: args.take("b")?, via: "ab" }))
                    .param(Param::of::<i32>("a"))
                    .param(Param::of::<i32>("b")),
            )
            .property(Property::of("a", |m: &Multi| &m.a))
            .property(Property::of("b", |m: &Multi| &m.b))
    }
}

// ----------------------------- Sealed family ------------------------------ //

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const { number: f64 },
    NotANumber,
}

impl Typed for Expr {
    fn type_ref() -> TypeRef { TypeRef::named("Expr") }
}

impl Reflect for Expr {
    fn runtime_type(&self) -> TypeRef {
        match self {
            Expr::Const { .. } => TypeRef::named("Expr::Const"),
            Expr::NotANumber => TypeRef::named("Expr::NotANumber"),
        }
    }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Record(self) }
}

impl FromReflect for Expr {
    fn from_native(native: Native) -> Option<Self> { downcast_native(native) }
}

impl Describe for Expr {
    fn describe() -> TypeDescriptor {
        let constant = TypeDescriptor::record(TypeRef::named("Expr::Const"))
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Expr::Const { number: args.take("number")? }))
                    .param(Param::of::<f64>("number")),
            )
            .property(Property::when("number", |e: &Expr| match e {
                Expr::Const { number } => Some(number),
                Expr::NotANumber => None,
            }));
        TypeDescriptor::sealed(Self::type_ref())
            .variant(constant)
            .variant(TypeDescriptor::singleton(TypeRef::named("Expr::NotANumber"), Expr::NotANumber))
    }
}

// --------------------------------- Enums ---------------------------------- //

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DummyEnum {
    ALPHA,
    BETA,
    GAMMA,
}
reflect_enum!(DummyEnum { ALPHA, BETA, GAMMA });

// -------------------------------- Hooks ----------------------------------- //

/// Reads itself from `{"dec": "..."}` and writes both radixes.
#[derive(Clone, Debug, PartialEq)]
pub struct DummyFromJson {
    pub x: i32,
}
reflect_record!(DummyFromJson);

impl Describe for DummyFromJson {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .from_json(|json: &JsonValue| -> anyhow::Result<DummyFromJson> {
                let dec = json.get("dec").and_then(JsonValue::as_str).ok_or_else(|| anyhow::anyhow!("dec missing"))?;
                Ok(DummyFromJson { x: dec.parse()? })
            })
            .to_json(|d: &DummyFromJson| -> anyhow::Result<JsonValue> {
                Ok(JsonValue::object([
                    ("dec", JsonValue::from(d.x.to_string())),
                    ("hex", JsonValue::from(format!("{:X}", d.x))),
                ]))
            })
    }
}

// ------------------------------- Generics --------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i32,
}

impl<T: Typed> Typed for Page<T> {
    fn type_ref() -> TypeRef { TypeRef::named("Page").with_args(vec![T::type_ref()]) }
}

impl<T: Reflect + Typed> Reflect for Page<T> {
    fn runtime_type(&self) -> TypeRef { Self::type_ref() }

    fn reflect_ref(&self) -> ReflectRef<'_> { ReflectRef::Record(self) }
}

impl<T: Reflect + Typed> FromReflect for Page<T> {
    fn from_native(native: Native) -> Option<Self> { downcast_native(native) }
}

impl<T: FromReflect + Typed + PartialEq> Describe for Page<T> {
    fn describe() -> TypeDescriptor {
        let items = TypeRef::generic(Classifier::List, vec![TypeRef::param(0)]);
        TypeDescriptor::record(TypeRef::named("Page"))
            .type_param(TypeParam::new("T"))
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Page::<T> { items: args.take("items")?, total: args.take("total")? }))
                    .param(Param::typed("items", items.clone()))
                    .param(Param::of::<i32>("total")),
            )
            .property(Property::of("items", |p: &Page<T>| &p.items).typed(items))
            .property(Property::of("total", |p: &Page<T>| &p.total))
    }
}

// -------------------------------- Graphs ---------------------------------- //

#[derive(Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub next: OnceLock<Arc<Node>>,
}
reflect_record!(Node);

impl Node {
    pub fn new(name: &str) -> Self { Self { name: name.to_owned(), next: OnceLock::new() } }
}

impl Describe for Node {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(
                Constructor::new(|args: &mut Args| Ok(Node::new(&args.take::<String>("name")?)))
                    .param(Param::of::<String>("name")),
            )
            .property(Property::of("name", |n: &Node| &n.name))
            .property(Property::of("next", |n: &Node| &n.next))
    }
}

/// Two nodes pointing at each other.
pub fn node_cycle() -> (Arc<Node>, Arc<Node>) {
    let a = Arc::new(Node::new("a"));
    let b = Arc::new(Node::new("b"));
    let _ = a.next.set(Arc::clone(&b));
    let _ = b.next.set(Arc::clone(&a));
    (a, b)
}

// ------------------------------- Delegates -------------------------------- //

#[derive(Clone, Debug, PartialEq)]
pub struct Tags(pub Vec<String>);
reflect_record!(Tags);

impl Describe for Tags {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref()).constructor(Constructor::from_list(|v: Vec<String>| Ok(Tags(v))))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Code(pub String);
reflect_record!(Code);

impl Describe for Code {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref()).constructor(Constructor::from_string(|s: String| Ok(Code(s))))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Bag(pub HashMap<String, i32>);
reflect_record!(Bag);

impl Describe for Bag {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::record(Self::type_ref())
            .constructor(Constructor::from_map(|m: HashMap<String, i32>| Ok(Bag(m))))
    }
}
