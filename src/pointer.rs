//! JSON-Pointer style paths used for diagnostics.
use std::fmt;

use crate::value::JsonValue;

/// Immutable root-to-node path. `child` returns a new pointer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct JsonPointer {
    tokens: Vec<String>,
}

impl JsonPointer {
    pub fn root() -> Self { Self::default() }

    pub fn is_root(&self) -> bool { self.tokens.is_empty() }

    pub fn child(&self, key: &str) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(key.to_owned());
        Self { tokens }
    }

    pub fn child_index(&self, index: usize) -> Self { self.child(&index.to_string()) }

    pub fn tokens(&self) -> &[String] { &self.tokens }

    /// Parse `/a/0/b~1c`; the empty string is the root.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return Some(Self::root());
        }
        let rest = text.strip_prefix('/')?;
        let tokens = rest.split('/').map(|t| t.replace("~1", "/").replace("~0", "~")).collect();
        Some(Self { tokens })
    }

    /// Resolve against a value tree.
    pub fn find<'a>(&self, root: &'a JsonValue) -> Option<&'a JsonValue> {
        let mut node = root;
        for token in &self.tokens {
            node = match node {
                JsonValue::Object(map) => map.get(token)?,
                JsonValue::Array(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", token.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}
