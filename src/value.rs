//! Dynamic values consumed and produced by the parser.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Number, Value};

use crate::operation::{OpTag, Operation, Reference};

/// Ordered attribute map.
pub type AttrMap = IndexMap<String, AttrValue>;

/// A value flowing through the parser.
///
/// Absence ("undefined") is never a value: it is modelled as `Option::None`
/// wherever an attribute may be missing. Set-typed attributes carry their
/// members as a [`AttrValue::List`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<AttrValue>),
    Map(AttrMap),
    /// Update operation wrapper, only meaningful in update mode.
    Op(Box<Operation>),
}

impl AttrValue {
    /// Returns the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttrValue::Null => "null",
            AttrValue::Bool(_) => "boolean",
            AttrValue::Number(_) => "number",
            AttrValue::String(_) => "string",
            AttrValue::List(_) => "list",
            AttrValue::Map(_) => "map",
            AttrValue::Op(op) => op.tag().type_name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttrMap> {
        match self {
            AttrValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            AttrValue::Op(op) => Some(op),
            _ => None,
        }
    }

    /// Value equality where numbers compare by magnitude, so `1` and `1.0`
    /// are the same value.
    pub fn same_as(&self, other: &AttrValue) -> bool {
        match (self, other) {
            (AttrValue::Number(a), AttrValue::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            },
            (AttrValue::List(a), AttrValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_as(b))
            }
            (AttrValue::Map(a), AttrValue::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(key, value)| b.get(key).is_some_and(|other| value.same_as(other)))
            }
            _ => self == other,
        }
    }

    /// Build a map value from `(name, value)` pairs, keeping their order.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AttrValue)>,
    {
        AttrValue::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a list value.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<AttrValue>,
    {
        AttrValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Convert to JSON, writing operations in their `{"$TAG": payload}` form.
    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Null => Value::Null,
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Number(n) => Value::Number(n.clone()),
            AttrValue::String(s) => Value::String(s.clone()),
            AttrValue::List(items) => Value::Array(items.iter().map(AttrValue::to_json).collect()),
            AttrValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            AttrValue::Op(op) => {
                let mut wrapper = serde_json::Map::new();
                wrapper.insert(op.tag().json_key().to_string(), operation_payload_json(op));
                Value::Object(wrapper)
            }
        }
    }

    /// Convert from JSON, recognising the reserved operation notation.
    ///
    /// An object with exactly one key among `$ADD`, `$DELETE`, `$REMOVE`,
    /// `$SET` and `$GET` becomes an [`AttrValue::Op`]. `$GET` takes
    /// `["attribute"]` or `["attribute", fallback]`; anything else under
    /// `$GET` is kept as a plain map so the parser reports it.
    pub fn from_json_with_operations(value: Value) -> Self {
        match value {
            Value::Array(items) => AttrValue::List(
                items
                    .into_iter()
                    .map(AttrValue::from_json_with_operations)
                    .collect(),
            ),
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some((key, payload)) = map.iter().next() {
                        if let Some(op) = operation_from_json(key, payload) {
                            return AttrValue::Op(Box::new(op));
                        }
                    }
                }
                AttrValue::Map(
                    map.into_iter()
                        .map(|(k, v)| (k, AttrValue::from_json_with_operations(v)))
                        .collect(),
                )
            }
            other => AttrValue::from(other),
        }
    }
}

fn operation_payload_json(op: &Operation) -> Value {
    match op {
        Operation::Add(v) | Operation::Delete(v) | Operation::Set(v) => v.to_json(),
        Operation::Remove => Value::Null,
        Operation::Get(reference) => {
            let mut parts = vec![Value::String(reference.attribute.clone())];
            if let Some(fallback) = &reference.fallback {
                parts.push(fallback.to_json());
            }
            Value::Array(parts)
        }
    }
}

fn operation_from_json(key: &str, payload: &Value) -> Option<Operation> {
    let tag = OpTag::from_json_key(key)?;
    let parse_payload = || AttrValue::from_json_with_operations(payload.clone());
    match tag {
        OpTag::Add => Some(Operation::Add(parse_payload())),
        OpTag::Delete => Some(Operation::Delete(parse_payload())),
        OpTag::Set => Some(Operation::Set(parse_payload())),
        OpTag::Remove => Some(Operation::Remove),
        OpTag::Get => match payload.as_array().map(Vec::as_slice) {
            Some([Value::String(attribute)]) => Some(Operation::Get(Reference::new(attribute))),
            Some([Value::String(attribute), fallback]) => Some(Operation::Get(
                Reference::new(attribute)
                    .with_fallback(AttrValue::from_json_with_operations(fallback.clone())),
            )),
            _ => None,
        },
    }
}

impl From<Value> for AttrValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(b),
            Value::Number(n) => AttrValue::Number(n),
            Value::String(s) => AttrValue::String(s),
            Value::Array(items) => {
                AttrValue::List(items.into_iter().map(AttrValue::from).collect())
            }
            Value::Object(map) => {
                AttrValue::Map(map.into_iter().map(|(k, v)| (k, AttrValue::from(v))).collect())
            }
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n.into())
    }
}

impl From<u64> for AttrValue {
    fn from(n: u64) -> Self {
        AttrValue::Number(n.into())
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Number(n.into())
    }
}

impl From<Operation> for AttrValue {
    fn from(op: Operation) -> Self {
        AttrValue::Op(Box::new(op))
    }
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AttrValue::Null => serializer.serialize_unit(),
            AttrValue::Bool(b) => serializer.serialize_bool(*b),
            AttrValue::Number(n) => n.serialize(serializer),
            AttrValue::String(s) => serializer.serialize_str(s),
            AttrValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            AttrValue::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            AttrValue::Op(op) => {
                let mut out = serializer.serialize_map(Some(1))?;
                out.serialize_entry(op.tag().json_key(), &operation_payload_json(op))?;
                out.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_names() {
        assert_eq!(AttrValue::Null.type_name(), "null");
        assert_eq!(AttrValue::from(1).type_name(), "number");
        assert_eq!(AttrValue::from("a").type_name(), "string");
        assert_eq!(AttrValue::list(["a"]).type_name(), "list");
        assert_eq!(
            AttrValue::from(Operation::Add(AttrValue::from(1))).type_name(),
            "ADD operation"
        );
    }

    #[test]
    fn plain_json_conversion_ignores_operation_notation() {
        let value = AttrValue::from(json!({ "$ADD": [1] }));
        assert!(matches!(value, AttrValue::Map(_)));
    }

    #[test]
    fn operation_notation_is_recognised() {
        let value = AttrValue::from_json_with_operations(json!({
            "tags": { "$ADD": ["a"] },
            "old": { "$REMOVE": null },
            "count": { "$GET": ["total", 0] }
        }));
        let map = value.as_map().unwrap();
        assert_eq!(
            map["tags"],
            AttrValue::from(Operation::Add(AttrValue::list(["a"])))
        );
        assert_eq!(map["old"], AttrValue::from(Operation::Remove));
        assert_eq!(
            map["count"],
            AttrValue::from(Operation::Get(
                Reference::new("total").with_fallback(AttrValue::from(0))
            ))
        );
    }

    #[test]
    fn object_with_extra_keys_is_not_an_operation() {
        let value = AttrValue::from_json_with_operations(json!({ "$ADD": 1, "other": 2 }));
        assert!(matches!(value, AttrValue::Map(_)));
    }

    #[test]
    fn to_json_and_serialize_agree() {
        let value = AttrValue::map([
            ("name", AttrValue::from("x")),
            ("tags", AttrValue::from(Operation::Delete(AttrValue::list(["a"])))),
        ]);
        let expected = json!({ "name": "x", "tags": { "$DELETE": ["a"] } });
        assert_eq!(value.to_json(), expected);
        assert_eq!(serde_json::to_value(&value).unwrap(), expected);
    }

    #[test]
    fn same_as_compares_numbers_by_magnitude() {
        let int = AttrValue::from(json!(1));
        let float = AttrValue::from(json!(1.0));
        assert_ne!(int, float);
        assert!(int.same_as(&float));
        let nested = AttrValue::from(json!({ "a": [1, 2] }));
        assert!(nested.same_as(&AttrValue::from(json!({ "a": [1.0, 2] }))));
        assert!(!AttrValue::from(json!([1, 2])).same_as(&AttrValue::from(json!([2, 1]))));
        assert!(!AttrValue::from(json!(1)).same_as(&AttrValue::from(json!("1"))));
    }
}
