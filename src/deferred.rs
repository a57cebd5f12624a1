//! JSON text held as-is and converted on first access.
use once_cell::sync::OnceCell;

use crate::config::JsonConfig;
use crate::error::Result;
use crate::reflect::FromReflect;
use crate::types::Typed;

/// A value whose JSON source is parsed lazily, at most once. A failed
/// conversion is not cached; the next access tries again.
pub struct Deferred<T> {
    text: String,
    value: OnceCell<T>,
}

impl<T: FromReflect + Typed> Deferred<T> {
    pub fn new(text: impl Into<String>) -> Self { Self { text: text.into(), value: OnceCell::new() } }

    pub fn text(&self) -> &str { &self.text }

    pub fn is_parsed(&self) -> bool { self.value.get().is_some() }

    pub fn get(&self, config: &JsonConfig) -> Result<&T> {
        self.value.get_or_try_init(|| {
            tracing::trace!(len = self.text.len(), "parsing deferred value");
            crate::parse::<T>(&self.text, config)
        })
    }

    pub fn into_inner(self, config: &JsonConfig) -> Result<T> {
        match self.value.into_inner() {
            Some(value) => Ok(value),
            None => crate::parse::<T>(&self.text, config),
        }
    }
}

impl<T> std::fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred").field("text", &self.text).field("parsed", &self.value.get().is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn parses_once() {
        let config = JsonConfig::new();
        let d: Deferred<Vec<i32>> = Deferred::new("[1,2]");
        assert!(!d.is_parsed());
        assert_eq!(d.get(&config).unwrap(), &vec![1, 2]);
        assert!(d.is_parsed());
        assert_eq!(d.into_inner(&config).unwrap(), vec![1, 2]);
    }

    #[test]
    fn bad_text_is_reported_each_time() {
        let config = JsonConfig::new();
        let d: Deferred<i32> = Deferred::new("[1,");
        assert_eq!(d.get(&config).unwrap_err().kind(), &ErrorKind::InvalidJson);
        assert!(d.get(&config).is_err());
        assert_eq!(d.text(), "[1,");
    }
}
