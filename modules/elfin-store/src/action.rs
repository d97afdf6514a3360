//! A generic, declarative action record.
//!
//! Typed action families are usually enums implementing `ActionLike`.
//! `Action` covers configuration that arrives as data: a `type` plus an
//! arbitrary JSON payload, serialized flat (`{"type": "SET", "val": 5}`).

use anyhow::{anyhow, Context};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::traits::ActionLike;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Raw payload field, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Deserialize a payload field into `T`. Missing fields are an error.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .payload
            .get(key)
            .ok_or_else(|| anyhow!("action '{}' has no '{}' field", self.kind, key))?;
        serde_json::from_value(value.clone())
            .with_context(|| format!("action '{}' field '{}' has the wrong shape", self.kind, key))
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

impl ActionLike for Action {
    fn action_type(&self) -> &str {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_is_flattened_next_to_type() {
        let action = Action::new("SET").with("val", 5);
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "SET", "val": 5})
        );
    }

    #[test]
    fn deserializes_from_flat_record() {
        let action: Action =
            serde_json::from_value(json!({"type": "COMMON", "account": "1234567"})).unwrap();
        assert_eq!(action.action_type(), "COMMON");
        assert_eq!(action.field::<String>("account").unwrap(), "1234567");
    }

    #[test]
    fn missing_field_names_the_action() {
        let action = Action::new("SET");
        let err = action.field::<i64>("val").unwrap_err();
        assert!(err.to_string().contains("'SET'"));
        assert!(err.to_string().contains("'val'"));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let action = Action::new("SET").with("val", "five");
        assert!(action.field::<i64>("val").is_err());
    }
}
