use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Immutable notification delivered to subscribers.
///
/// Carries a name and a key→value payload. The registry never looks inside
/// the payload; only subscribers interpret it.
///
/// ```
/// use observable::Event;
///
/// let event = Event::new("Adding Expenses").with("expenses", 1);
/// assert_eq!(event.get_i64("expenses"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    name: String,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: BTreeMap::new(),
        }
    }

    /// Adds a payload entry, replacing any previous value under `key`
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Integer payload under `key`, if present and integral
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(Value::as_i64)
    }
}
