//! Type references: what the engines convert *to*.
//!
//! A [`TypeRef`] is a classifier plus bound type arguments plus a nullability
//! flag. Built-in shapes have dedicated classifiers; user types registered
//! through a descriptor are `Named`. `Param(i)` stands for the i-th type
//! parameter of the enclosing descriptor and must be bound before use.
pub mod resolve;

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemporalKind {
    Instant,
    LocalDate,
    LocalDateTime,
    LocalTime,
    OffsetTime,
    OffsetDateTime,
    ZonedDateTime,
    Year,
    YearMonth,
    MonthDay,
    Duration,
    Period,
    /// `std::time::SystemTime`, written with the legacy calendar format.
    Date,
    Calendar,
}

impl TemporalKind {
    pub fn name(self) -> &'static str {
        match self {
            TemporalKind::Instant => "Instant",
            TemporalKind::LocalDate => "LocalDate",
            TemporalKind::LocalDateTime => "LocalDateTime",
            TemporalKind::LocalTime => "LocalTime",
            TemporalKind::OffsetTime => "OffsetTime",
            TemporalKind::OffsetDateTime => "OffsetDateTime",
            TemporalKind::ZonedDateTime => "ZonedDateTime",
            TemporalKind::Year => "Year",
            TemporalKind::YearMonth => "YearMonth",
            TemporalKind::MonthDay => "MonthDay",
            TemporalKind::Duration => "Duration",
            TemporalKind::Period => "Period",
            TemporalKind::Date => "Date",
            TemporalKind::Calendar => "Calendar",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Classifier {
    Any,
    Json,
    Bool,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
    Number,
    String,
    Uuid,
    Temporal(TemporalKind),
    CharArray,
    Array,
    List,
    LinkedList,
    Set,
    LinkedSet,
    Sequence,
    Pair,
    Triple,
    BitSet,
    Map,
    LinkedMap,
    SortedMap,
    Named(&'static str),
    Param(usize),
}

impl Classifier {
    pub fn name(&self) -> String {
        let s = match self {
            Classifier::Any => "Any",
            Classifier::Json => "JsonValue",
            Classifier::Bool => "bool",
            Classifier::Char => "char",
            Classifier::Byte => "i8",
            Classifier::Short => "i16",
            Classifier::Int => "i32",
            Classifier::Long => "i64",
            Classifier::Float => "f32",
            Classifier::Double => "f64",
            Classifier::BigInteger => "BigInt",
            Classifier::BigDecimal => "BigDecimal",
            Classifier::Number => "Number",
            Classifier::String => "String",
            Classifier::Uuid => "Uuid",
            Classifier::Temporal(kind) => kind.name(),
            Classifier::CharArray => "CharArray",
            Classifier::Array => "Array",
            Classifier::List => "Vec",
            Classifier::LinkedList => "VecDeque",
            Classifier::Set => "HashSet",
            Classifier::LinkedSet => "IndexSet",
            Classifier::Sequence => "Sequence",
            Classifier::Pair => "Pair",
            Classifier::Triple => "Triple",
            Classifier::BitSet => "BitSet",
            Classifier::Map => "HashMap",
            Classifier::LinkedMap => "IndexMap",
            Classifier::SortedMap => "BTreeMap",
            Classifier::Named(name) => *name,
            Classifier::Param(i) => return format!("T{i}"),
        };
        s.to_owned()
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Classifier::Byte
                | Classifier::Short
                | Classifier::Int
                | Classifier::Long
                | Classifier::Float
                | Classifier::Double
                | Classifier::BigInteger
                | Classifier::BigDecimal
                | Classifier::Number
        )
    }

    pub fn is_list_like(&self) -> bool {
        matches!(
            self,
            Classifier::Array
                | Classifier::List
                | Classifier::LinkedList
                | Classifier::Set
                | Classifier::LinkedSet
                | Classifier::Sequence
        )
    }

    pub fn is_map_like(&self) -> bool {
        matches!(self, Classifier::Map | Classifier::LinkedMap | Classifier::SortedMap)
    }
}

/// Classifier + type arguments + nullability.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeRef {
    classifier: Classifier,
    args: Vec<TypeRef>,
    nullable: bool,
}

impl TypeRef {
    pub fn new(classifier: Classifier) -> Self { Self { classifier, args: Vec::new(), nullable: false } }

    pub fn of<T: Typed + ?Sized>() -> Self { T::type_ref() }

    pub fn named(name: &'static str) -> Self { Self::new(Classifier::Named(name)) }

    pub fn param(index: usize) -> Self { Self::new(Classifier::Param(index)) }

    pub fn any() -> Self { Self::new(Classifier::Any) }

    pub fn generic(classifier: Classifier, args: Vec<TypeRef>) -> Self {
        Self { classifier, args, nullable: false }
    }

    pub fn with_args(&self, args: Vec<TypeRef>) -> Self {
        Self { classifier: self.classifier.clone(), args, nullable: self.nullable }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Same type without the nullability flag.
    pub fn non_null(&self) -> Self {
        Self { classifier: self.classifier.clone(), args: self.args.clone(), nullable: false }
    }

    /// Classifier alone, no arguments, not nullable: the registry's fallback key.
    pub fn raw(&self) -> Self { Self::new(self.classifier.clone()) }

    pub fn classifier(&self) -> &Classifier { &self.classifier }

    pub fn args(&self) -> &[TypeRef] { &self.args }

    pub fn arg(&self, index: usize) -> Option<&TypeRef> { self.args.get(index) }

    pub fn is_nullable(&self) -> bool { self.nullable }

    /// True when a type parameter occurs anywhere inside.
    pub fn has_params(&self) -> bool {
        matches!(self.classifier, Classifier::Param(_)) || self.args.iter().any(TypeRef::has_params)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.classifier.name())?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, a) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{a}")?;
            }
            f.write_str(">")?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

/// Static type reference of a Rust type.
pub trait Typed {
    fn type_ref() -> TypeRef;
}

/// A declared type parameter with an optional upper bound.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParam {
    name: String,
    bound: Option<TypeRef>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), bound: None } }

    pub fn bounded(name: impl Into<String>, bound: TypeRef) -> Self {
        Self { name: name.into(), bound: Some(bound) }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn bound(&self) -> Option<&TypeRef> { self.bound.as_ref() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let t = TypeRef::generic(
            Classifier::Map,
            vec![TypeRef::new(Classifier::String), TypeRef::new(Classifier::Int).nullable()],
        );
        assert_eq!(t.to_string(), "HashMap<String, i32?>");
        assert_eq!(TypeRef::named("Expr::Const").nullable().to_string(), "Expr::Const?");
    }

    #[test]
    fn non_null_and_raw() {
        let t = TypeRef::generic(Classifier::List, vec![TypeRef::param(0)]).nullable();
        assert!(t.is_nullable());
        assert!(!t.non_null().is_nullable());
        assert_eq!(t.raw(), TypeRef::new(Classifier::List));
        assert!(t.has_params());
        assert!(!t.raw().has_params());
    }
}
