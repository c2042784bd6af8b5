//! Free-form properties attached to a storage handle.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value of a storage property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

/// Name to value map. Setting an existing name overwrites it.
#[derive(Debug, Default)]
pub struct PropertyBag {
    values: RwLock<HashMap<String, PropertyValue>>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: &str, value: PropertyValue) {
        self.values.write().insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        self.values.read().get(name).cloned()
    }

    pub fn remove(&self, name: &str) -> Option<PropertyValue> {
        self.values.write().remove(name)
    }

    /// Sorted property names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites() {
        let bag = PropertyBag::new();
        assert_eq!(bag.get("MediaType"), None);
        bag.set("MediaType", "application/xml".into());
        bag.set("MediaType", "text/plain".into());
        assert_eq!(bag.get("MediaType"), Some(PropertyValue::String("text/plain".into())));

        bag.set("Version", 2i64.into());
        assert_eq!(bag.names(), vec!["MediaType", "Version"]);
        assert_eq!(bag.remove("Version"), Some(PropertyValue::Int(2)));
    }
}
