//! File-based configuration.
//!
//! Settings are plain JSON with camelCase keys. Unknown keys are rejected, and
//! a bad value is reported with the path of the offending setting.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ConfigSettings {
    pub sealed_class_discriminator: Option<String>,
    pub read_buffer_size: Option<usize>,
    pub stringify_initial_size: Option<usize>,
    pub charset: Option<String>,
    pub big_integer_string: Option<bool>,
    pub big_decimal_string: Option<bool>,
    pub include_nulls: Option<bool>,
    pub allow_extra: Option<bool>,
    pub stream_output: Option<bool>,
    /// Added to the default `JSONName`/`name` pair.
    pub name_annotations: Vec<NameAnnotationSetting>,
    pub ignore_annotations: Vec<String>,
    pub include_if_null_annotations: Vec<String>,
    pub include_all_properties_annotations: Vec<String>,
    pub allow_extra_properties_annotations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NameAnnotationSetting {
    pub annotation: String,
    pub argument: String,
}

impl ConfigSettings {
    pub fn from_str_with_path(src: &str) -> Result<Self, ConfigError> { from_str_with_path(src) }

    pub fn from_slice_with_path(bytes: &[u8]) -> Result<Self, ConfigError> { from_slice_with_path(bytes) }
}

fn settings_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> ConfigError {
    let path = err.path().to_string();
    ConfigError::Settings { path, message: err.into_inner().to_string() }
}

/// Deserialize with settings-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(settings_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ConfigError> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(settings_error)
}
