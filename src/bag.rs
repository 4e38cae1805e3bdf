use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat string-keyed value bag used for scene arguments and persisted state.
///
/// Values are `serde_json::Value`, so anything the host can serialize fits;
/// typed accessors cover the common cases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateBag {
    entries: Map<String, Value>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), Value::String(value.into()));
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) {
        self.entries.insert(key.into(), Value::Bool(value));
    }

    pub fn put_i64(&mut self, key: impl Into<String>, value: i64) {
        self.entries.insert(key.into(), Value::from(value));
    }

    pub fn put_f64(&mut self, key: impl Into<String>, value: f64) {
        self.entries.insert(key.into(), Value::from(value));
    }

    pub fn put_bag(&mut self, key: impl Into<String>, value: StateBag) {
        self.entries
            .insert(key.into(), Value::Object(value.entries));
    }

    pub fn put_value(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.entries.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.entries.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.entries.get(key).and_then(Value::as_f64)
    }

    pub fn get_bag(&self, key: &str) -> Option<StateBag> {
        match self.entries.get(key) {
            Some(Value::Object(map)) => Some(StateBag {
                entries: map.clone(),
            }),
            _ => None,
        }
    }

    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
