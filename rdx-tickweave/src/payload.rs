//! The opaque payload a host attaches to an async completion.

use crate::common::{AsyncCategory, AsyncId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A key/value map describing a finished host operation.
///
/// The scheduler only ever reads the `"id"` field; everything else is passed
/// through untouched to the resolved task's callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsyncPayload(Map<String, Value>);

impl AsyncPayload {
    /// The field that correlates a payload with the operation that produced it.
    pub const ID_FIELD: &'static str = "id";

    pub fn new() -> Self {
        Self::default()
    }

    /// A payload carrying only the given operation id.
    pub fn with_id(id: impl Into<AsyncId>) -> Self {
        let mut payload = Self::new();
        payload.insert(Self::ID_FIELD, id.into().0);
        payload
    }

    /// Builder-style insert.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Reads the operation id. Integer ids and integer strings are accepted.
    pub fn id(&self) -> Option<AsyncId> {
        match self.0.get(Self::ID_FIELD)? {
            Value::Number(number) => number.as_i64().map(AsyncId),
            Value::String(text) => text.trim().parse().ok().map(AsyncId),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for AsyncPayload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A completion reported by the host: which kind of operation, and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncCompletion {
    pub category: AsyncCategory,
    pub payload: AsyncPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn id_is_read_from_numbers_and_strings() {
        assert_eq!(AsyncPayload::with_id(9).id(), Some(AsyncId(9)));
        let payload = AsyncPayload::new().field("id", "17");
        assert_eq!(payload.id(), Some(AsyncId(17)));
    }

    #[test]
    fn missing_or_malformed_id_reads_as_none() {
        assert_eq!(AsyncPayload::new().id(), None);
        assert_eq!(AsyncPayload::new().field("id", json!({"nested": 1})).id(), None);
        assert_eq!(AsyncPayload::new().field("id", 1.5).id(), None);
    }

    #[test]
    fn deserializes_from_a_json_object() {
        let payload: AsyncPayload =
            serde_json::from_value(json!({"id": 3, "status": 200, "result": "ok"})).unwrap();
        assert_eq!(payload.id(), Some(AsyncId(3)));
        assert_eq!(payload.get("status"), Some(&json!(200)));
    }
}
