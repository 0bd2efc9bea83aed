//! Account metadata: an ordered string map whose first entry is the name.

use serde::{Deserialize, Serialize};

use crate::error::{KeystoneError, Result};

const NAME_KEY: &str = "name";

/// Ordered key/value metadata attached to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    inner: Vec<(String, String)>,
}

impl Metadata {
    /// Empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build metadata from parallel key and value lists.
    ///
    /// Non-empty metadata must start with a non-empty `name` entry.
    pub fn from_keys_values(keys: Vec<String>, values: Vec<String>) -> Result<Self> {
        if keys.len() != values.len() {
            return Err(KeystoneError::MetadataNotSameLength);
        }

        let mut metadata = Self::new();
        if keys.is_empty() {
            return Ok(metadata);
        }
        if keys[0] != NAME_KEY {
            return Err(KeystoneError::MetadataNameMissing);
        }
        if values[0].trim().is_empty() {
            return Err(KeystoneError::NameCannotBeEmpty);
        }

        for (key, value) in keys.into_iter().zip(values) {
            if metadata.contains(&key) {
                return Err(KeystoneError::MetadataKeyAlreadyExists(key));
            }
            metadata.inner.push((key, value));
        }
        Ok(metadata)
    }

    /// Get a value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The account name, if set.
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_KEY)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Export as a JSON object, preserving entry order.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .inner
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::Value::Object(map)
    }
}
