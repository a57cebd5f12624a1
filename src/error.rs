//! Error taxonomy shared by both engines.
use std::fmt;

use thiserror::Error;

use crate::pointer::JsonPointer;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = JsonAutoError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("Can't deserialize null as {target}")]
    NullNotAllowed { target: String },
    #[error("Can't deserialize {found} as {target}")]
    TypeMismatch { found: String, target: String },
    #[error("Can't deserialize {text:?} as {target}: {reason}")]
    InvalidFormat { text: String, target: String, reason: String },
    #[error("Can't deserialize {target}: {reason}")]
    CannotDeserialize { target: String, reason: String },
    #[error("Duplicate not allowed")]
    DuplicateNotAllowed,
    #[error("No discriminator property {property:?} for sealed type {target}")]
    MissingDiscriminator { property: String, target: String },
    #[error("Can't find variant {name:?} of sealed type {target}")]
    UnknownSubtype { name: String, target: String },
    #[error("Can't create {target}; missing property {name}")]
    MissingProperty { name: String, target: String },
    #[error("Can't create {target}; {detail}")]
    CannotConstruct { target: String, detail: ConstructFailure },
    #[error("Can't find property {name} in {target}")]
    UnknownProperty { name: String, target: String },
    #[error("Can't set property {name} in {target}; value differs")]
    PropertyMismatch { name: String, target: String },
    #[error("Can't resolve type parameter {param} of {target}")]
    UnresolvedTypeParameter { param: String, target: String },
    #[error("Circular reference: {}", circular(.property, .target))]
    CircularReference { property: Option<String>, target: String },
    #[error("Error in custom mapping for {target}")]
    CustomMappingFailed { target: String },
    #[error("No descriptor registered for {target}")]
    UnknownType { target: String },
    #[error("Invalid JSON")]
    InvalidJson,
}

fn circular(property: &Option<String>, target: &str) -> String {
    match property {
        Some(p) => format!("property {p} in {target}"),
        None => format!("{target} contains itself"),
    }
}

/// Why no constructor could be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructFailure {
    /// The only constructor lacks these required parameters.
    Missing(Vec<String>),
    /// Several constructors exist and none fits these properties.
    Unmatched(Vec<String>),
}

impl fmt::Display for ConstructFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructFailure::Missing(names) => write!(f, "missing: {}", names.join(", ")),
            ConstructFailure::Unmatched(names) => {
                write!(f, "no constructor matches properties: {}", names.join(", "))
            }
        }
    }
}

/// A conversion failure with the path at which it happened.
#[derive(Debug)]
pub struct JsonAutoError {
    kind: ErrorKind,
    pointer: Option<JsonPointer>,
    cause: Option<BoxError>,
}

impl JsonAutoError {
    pub fn new(kind: ErrorKind) -> Self { Self { kind, pointer: None, cause: None } }

    pub fn at(mut self, pointer: &JsonPointer) -> Self {
        self.pointer = Some(pointer.clone());
        self
    }

    pub fn caused_by(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn kind(&self) -> &ErrorKind { &self.kind }

    pub fn pointer(&self) -> Option<&JsonPointer> { self.pointer.as_ref() }

    /// Message without the pointer suffix.
    pub fn reason(&self) -> String { self.kind.to_string() }
}

impl From<ErrorKind> for JsonAutoError {
    fn from(kind: ErrorKind) -> Self { Self::new(kind) }
}

impl fmt::Display for JsonAutoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        match &self.pointer {
            Some(p) if !p.is_root() => write!(f, " at {p}"),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for JsonAutoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Rejected configuration values and settings files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Sealed class discriminator invalid: {0:?}")]
    InvalidDiscriminator(String),
    #[error("Read buffer size invalid - {0}")]
    InvalidBufferSize(usize),
    #[error("Stringify initial size invalid - {0}")]
    InvalidInitialSize(usize),
    #[error("at settings path {path} → {message}")]
    Settings { path: String, message: String },
}

/// Failures taking constructor arguments or applying property accessors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgError {
    #[error("argument {0} not supplied")]
    Unset(String),
    #[error("argument {name} is not a {expected}")]
    Mismatch { name: String, expected: String },
    #[error("accessor applied to wrong type, expected {0}")]
    WrongReceiver(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_suffix_only_when_not_root() {
        let kind = ErrorKind::DuplicateNotAllowed;
        let e = JsonAutoError::new(kind.clone()).at(&JsonPointer::root().child_index(2));
        assert_eq!(e.to_string(), "Duplicate not allowed at /2");
        let e = JsonAutoError::new(kind).at(&JsonPointer::root());
        assert_eq!(e.to_string(), "Duplicate not allowed");
    }

    #[test]
    fn construct_failure_lists_names() {
        let e = JsonAutoError::new(ErrorKind::CannotConstruct {
            target: "Dummy1".into(),
            detail: ConstructFailure::Missing(vec!["field1".into()]),
        });
        assert_eq!(e.to_string(), "Can't create Dummy1; missing: field1");
    }

    #[test]
    fn cause_is_exposed_as_source() {
        use std::error::Error as _;
        let e = JsonAutoError::new(ErrorKind::CustomMappingFailed { target: "X".into() })
            .caused_by(anyhow::anyhow!("boom"));
        assert_eq!(e.source().map(|s| s.to_string()), Some("boom".to_owned()));
    }

    #[test]
    fn circular_message_forms() {
        let with = ErrorKind::CircularReference { property: Some("parent".into()), target: "Node".into() };
        assert_eq!(with.to_string(), "Circular reference: property parent in Node");
        let without = ErrorKind::CircularReference { property: None, target: "Node".into() };
        assert_eq!(without.to_string(), "Circular reference: Node contains itself");
    }
}
