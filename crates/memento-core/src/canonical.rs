//! Tagged-variant value representation shared by the diff engine and
//! snapshot serialization.
//!
//! Plain `serde_json::Value` cannot distinguish a JS `Map`/`Set` from a
//! plain object/array once round-tripped through JSON, and loses key
//! order for maps built from non-string keys. `CanonicalValue` keeps an
//! explicit tag for those cases so a diff or snapshot restore can recover
//! the original shape rather than guessing from JSON's object/array
//! duality.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A self-describing value used anywhere the diff engine or snapshot store
/// needs to walk arbitrary entity/relationship data without losing type
/// information to JSON's object/array collapse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "__type", content = "data")]
pub enum CanonicalValue {
    /// A JSON-style object with ordered keys.
    Object(IndexMap<String, CanonicalValue>),
    /// An ordered list.
    Array(Vec<CanonicalValue>),
    /// A UTF-8 string.
    String(String),
    /// A number, stored as the widest precision serde_json can carry.
    Number(serde_json::Number),
    /// A boolean.
    Bool(bool),
    /// The JSON null value.
    Null,
    /// An RFC 3339 timestamp, distinct from an ordinary string.
    Timestamp(chrono::DateTime<chrono::Utc>),
    /// An order-preserving key/value map, distinct from `Object` so a
    /// restore can reconstruct a source-language `Map` rather than a plain
    /// object.
    Map(IndexMap<String, CanonicalValue>),
    /// An order-preserving set of distinct values, distinct from `Array`
    /// so a restore can reconstruct a source-language `Set`.
    Set(Vec<CanonicalValue>),
}

impl CanonicalValue {
    /// A short, stable name for this variant's kind, used in diff
    /// type-mismatch messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Object(_) => "Object",
            Self::Array(_) => "Array",
            Self::String(_) => "String",
            Self::Number(_) => "Number",
            Self::Bool(_) => "Bool",
            Self::Null => "Null",
            Self::Timestamp(_) => "Timestamp",
            Self::Map(_) => "Map",
            Self::Set(_) => "Set",
        }
    }

    /// Whether this value is structurally a container (`Object`, `Array`,
    /// `Map`, or `Set`) the diff engine should recurse into rather than
    /// compare atomically.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Object(_) | Self::Array(_) | Self::Map(_) | Self::Set(_))
    }

    /// Converts a plain `serde_json::Value` into a `CanonicalValue`,
    /// treating every JSON object as `Object` and every JSON array as
    /// `Array` (i.e. without recovering `Map`/`Set` shape — callers that
    /// need that distinction must build it explicitly).
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => Self::Number(n.clone()),
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts back to a plain `serde_json::Value`, lowering `Map` to
    /// `Object` and `Set` to `Array`. This loses the `Map`/`Set`
    /// distinction; use the tagged serialization directly when it must be
    /// preserved.
    #[must_use]
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(b),
            Self::Number(n) => serde_json::Value::Number(n),
            Self::String(s) => serde_json::Value::String(s),
            Self::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
            Self::Array(items) | Self::Set(items) => {
                serde_json::Value::Array(items.into_iter().map(Self::into_json).collect())
            }
            Self::Object(map) | Self::Map(map) => serde_json::Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, v.into_json()))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_round_trips_through_object_and_array() {
        let value = json!({"a": 1, "b": [1, 2, "three"]});
        let canonical = CanonicalValue::from_json(&value);
        assert_eq!(canonical.clone().into_json(), value);
        assert_eq!(canonical.kind_name(), "Object");
    }

    #[test]
    fn map_and_set_are_distinct_from_object_and_array() {
        let map = CanonicalValue::Map(IndexMap::from([(
            "k".to_string(),
            CanonicalValue::String("v".to_string()),
        )]));
        let object = CanonicalValue::Object(IndexMap::from([(
            "k".to_string(),
            CanonicalValue::String("v".to_string()),
        )]));
        assert_ne!(map, object);
        assert_eq!(map.kind_name(), "Map");
        assert_eq!(object.kind_name(), "Object");
        // Both lower to the same plain JSON shape.
        assert_eq!(map.into_json(), object.into_json());
    }

    #[test]
    fn serialization_round_trips_with_type_tag() {
        let value = CanonicalValue::Set(vec![CanonicalValue::Number(1.into())]);
        let serialized = serde_json::to_string(&value).unwrap_or_default();
        assert!(serialized.contains("\"__type\":\"Set\""));
        let deserialized: CanonicalValue =
            serde_json::from_str(&serialized).expect("round trip");
        assert_eq!(deserialized, value);
    }

    #[test]
    fn is_container_distinguishes_scalars_from_containers() {
        assert!(CanonicalValue::Object(IndexMap::new()).is_container());
        assert!(CanonicalValue::Set(Vec::new()).is_container());
        assert!(!CanonicalValue::String("x".into()).is_container());
        assert!(!CanonicalValue::Null.is_container());
    }
}
