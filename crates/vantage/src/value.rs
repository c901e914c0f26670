//! The tagged value model.
//!
//! A host REPL hands each evaluation result to the pipeline as a
//! [`ReplValue`]: the value's runtime type name as an explicit string tag,
//! a structured payload formatters consume, and optionally the host's own
//! inspect text. Type identity is the tag and nothing else; the pipeline
//! never reflects over host language types.

use serde::Serialize;
use serde_json::Value;

use crate::error::ViewError;

/// A value produced by the host's evaluation loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplValue {
    tag: String,
    data: Value,
    inspect: Option<String>,
}

impl ReplValue {
    /// Create a value from its type tag and structured payload.
    pub fn new(tag: impl Into<String>, data: Value) -> Self {
        Self {
            tag: tag.into(),
            data,
            inspect: None,
        }
    }

    /// Create a value by serializing any `Serialize` payload.
    pub fn from_serialize<T: Serialize>(
        tag: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ViewError> {
        Ok(Self::new(tag, serde_json::to_value(payload)?))
    }

    /// Attach the host's own inspect text (its default debug printing).
    pub fn with_inspect(mut self, inspect: impl Into<String>) -> Self {
        self.inspect = Some(inspect.into());
        self
    }

    /// The value's runtime type name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The structured payload.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// The plain inspect text.
    ///
    /// Host-provided when present, otherwise derived from the payload as
    /// pretty-printed JSON. This is what session fallback measures and
    /// pages when no formatter applies.
    pub fn inspect(&self) -> String {
        match &self.inspect {
            Some(text) => text.clone(),
            None => serde_json::to_string_pretty(&self.data)
                .unwrap_or_else(|_| self.data.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_keeps_tag_and_data() {
        let value = ReplValue::new("Table", json!({"rows": 3}));
        assert_eq!(value.tag(), "Table");
        assert_eq!(value.data()["rows"], 3);
    }

    #[test]
    fn from_serialize_round_trips() {
        #[derive(Serialize)]
        struct Row {
            name: String,
            count: usize,
        }

        let value = ReplValue::from_serialize(
            "Row",
            &Row {
                name: "ada".into(),
                count: 2,
            },
        )
        .unwrap();

        assert_eq!(value.data()["name"], "ada");
        assert_eq!(value.data()["count"], 2);
    }

    #[test]
    fn host_inspect_wins() {
        let value = ReplValue::new("Num", json!(42)).with_inspect("#<Num 42>");
        assert_eq!(value.inspect(), "#<Num 42>");
    }

    #[test]
    fn derived_inspect_is_pretty_json() {
        let value = ReplValue::new("Pair", json!({"a": 1}));
        let inspect = value.inspect();
        assert!(inspect.contains("\"a\": 1"));
    }
}
