//! Decoding of JSON schema definitions into [`AttributeSchema`]s.
//!
//! A definition is a JSON object describing one attribute:
//!
//! ```json
//! {
//!   "type": "item",
//!   "attributes": {
//!     "id":   { "type": "string", "key": true, "savedAs": "pk",
//!               "transform": { "prefix": "USER" } },
//!     "tags": { "type": "set", "elements": { "type": "string" },
//!               "required": "never" },
//!     "qty":  { "type": "number", "default": { "put": 0 },
//!               "validate": { "put": { "minimum": 0 } } }
//!   }
//! }
//! ```
//!
//! Unknown keywords are ignored here; the linter reports them.

use serde_json::{Map, Value};

use crate::error::{ConstructionError, LoadError};
use crate::schema::{AttributeSchema, DefaultValue, Prefix, Suffix};
use crate::types::{Mode, Required, ScalarKind, VALID_MODES};
use crate::validator;
use crate::value::AttrValue;

/// Keywords understood by the decoder.
pub const KNOWN_KEYWORDS: &[&str] = &[
    "type",
    "required",
    "hidden",
    "key",
    "savedAs",
    "enum",
    "default",
    "validate",
    "transform",
    "elements",
    "attributes",
    "keys",
    "members",
    "description",
];

/// Valid values of the `type` keyword.
pub const VALID_TYPES: &[&str] = &[
    "any", "null", "boolean", "number", "string", "set", "list", "map", "record", "anyOf", "item",
];

/// Decode a definition.
///
/// # Errors
///
/// Returns `LoadError::InvalidDefinition` for malformed keywords and
/// `LoadError::Construction` for invalid compositions, both carrying the
/// JSON pointer of the offending definition.
pub fn decode(definition: &Value) -> Result<AttributeSchema, LoadError> {
    decode_at(definition, "")
}

/// JSON pointer of `key` under `pointer`.
pub(crate) fn pointer_child(pointer: &str, key: &str) -> String {
    format!("{}/{}", pointer, key.replace('~', "~0").replace('/', "~1"))
}

fn display_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

fn invalid(pointer: &str, message: impl Into<String>) -> LoadError {
    LoadError::InvalidDefinition {
        path: display_pointer(pointer),
        message: message.into(),
    }
}

fn construction(pointer: &str) -> impl FnOnce(ConstructionError) -> LoadError + '_ {
    move |source| LoadError::Construction {
        path: display_pointer(pointer),
        source,
    }
}

fn decode_at(definition: &Value, pointer: &str) -> Result<AttributeSchema, LoadError> {
    let Value::Object(obj) = definition else {
        return Err(invalid(pointer, "definition must be an object"));
    };

    let type_name = match obj.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(_) => return Err(invalid(pointer, "\"type\" must be a string")),
        None => return Err(invalid(pointer, "missing \"type\"")),
    };

    let schema = decode_kind(type_name, obj, pointer)?;
    decode_props(schema, obj, pointer)
}

fn decode_kind(
    type_name: &str,
    obj: &Map<String, Value>,
    pointer: &str,
) -> Result<AttributeSchema, LoadError> {
    let schema = match type_name {
        "any" => AttributeSchema::scalar(ScalarKind::Any),
        "null" => AttributeSchema::scalar(ScalarKind::Null),
        "boolean" => AttributeSchema::scalar(ScalarKind::Boolean),
        "number" => AttributeSchema::scalar(ScalarKind::Number),
        "string" => AttributeSchema::scalar(ScalarKind::String),
        "set" => {
            let elements = child(obj, "elements", pointer)?;
            AttributeSchema::set(elements).map_err(construction(pointer))?
        }
        "list" => {
            let elements = child(obj, "elements", pointer)?;
            AttributeSchema::list(elements).map_err(construction(pointer))?
        }
        "record" => {
            let keys = match obj.get("keys") {
                Some(keys) => decode_at(keys, &pointer_child(pointer, "keys"))?,
                None => AttributeSchema::string(),
            };
            let elements = child(obj, "elements", pointer)?;
            AttributeSchema::record(keys, elements).map_err(construction(pointer))?
        }
        "map" => AttributeSchema::map(attributes(obj, pointer)?).map_err(construction(pointer))?,
        "item" => {
            AttributeSchema::item(attributes(obj, pointer)?).map_err(construction(pointer))?
        }
        "anyOf" => {
            let members_pointer = pointer_child(pointer, "members");
            let Some(Value::Array(members)) = obj.get("members") else {
                return Err(invalid(pointer, "anyOf needs a \"members\" array"));
            };
            let members = members
                .iter()
                .enumerate()
                .map(|(i, m)| decode_at(m, &pointer_child(&members_pointer, &i.to_string())))
                .collect::<Result<Vec<_>, _>>()?;
            AttributeSchema::any_of(members).map_err(construction(pointer))?
        }
        other => {
            return Err(invalid(
                pointer,
                format!(
                    "unknown type \"{}\" (expected one of: {})",
                    other,
                    VALID_TYPES.join(", ")
                ),
            ))
        }
    };
    Ok(schema)
}

fn child(
    obj: &Map<String, Value>,
    keyword: &str,
    pointer: &str,
) -> Result<AttributeSchema, LoadError> {
    match obj.get(keyword) {
        Some(def) => decode_at(def, &pointer_child(pointer, keyword)),
        None => Err(invalid(pointer, format!("missing \"{}\"", keyword))),
    }
}

fn attributes(
    obj: &Map<String, Value>,
    pointer: &str,
) -> Result<Vec<(String, AttributeSchema)>, LoadError> {
    let attributes_pointer = pointer_child(pointer, "attributes");
    let Some(Value::Object(defs)) = obj.get("attributes") else {
        return Err(invalid(pointer, "missing \"attributes\" object"));
    };
    defs.iter()
        .map(|(name, def)| {
            let schema = decode_at(def, &pointer_child(&attributes_pointer, name))?;
            Ok((name.clone(), schema))
        })
        .collect()
}

fn decode_props(
    mut schema: AttributeSchema,
    obj: &Map<String, Value>,
    pointer: &str,
) -> Result<AttributeSchema, LoadError> {
    if let Some(required) = obj.get("required") {
        let parsed = required.as_str().and_then(Required::parse).ok_or_else(|| {
            invalid(
                pointer,
                "\"required\" must be one of: atLeastOnce, always, never",
            )
        })?;
        schema = schema.required(parsed);
    }

    if flag(obj, "key", pointer)? {
        schema = schema.key();
    }
    if flag(obj, "hidden", pointer)? {
        schema = schema.hidden();
    }

    if let Some(saved_as) = obj.get("savedAs") {
        match saved_as.as_str() {
            Some(name) if !name.is_empty() => schema = schema.saved_as(name),
            _ => return Err(invalid(pointer, "\"savedAs\" must be a non-empty string")),
        }
    }

    if let Some(values) = obj.get("enum") {
        let Value::Array(values) = values else {
            return Err(invalid(pointer, "\"enum\" must be an array"));
        };
        schema = schema.enumerated(values.iter().cloned().map(AttrValue::from));
    }

    if let Some(default) = obj.get("default") {
        match per_mode(default) {
            Some(defaults) => {
                for (mode, value) in defaults {
                    let value = DefaultValue::from(AttrValue::from(value.clone()));
                    schema = schema.default_in(mode, value);
                }
            }
            None => schema = schema.default(AttrValue::from(default.clone())),
        }
    }

    if let Some(validate) = obj.get("validate") {
        let Value::Object(fragments) = validate else {
            return Err(invalid(pointer, "\"validate\" must map modes to JSON Schemas"));
        };
        let validate_pointer = pointer_child(pointer, "validate");
        for (mode_name, fragment) in fragments {
            let Some(mode) = mode_key(mode_name) else {
                continue;
            };
            let check = validator::compile(fragment).map_err(|message| {
                invalid(&pointer_child(&validate_pointer, mode_name), message)
            })?;
            schema = schema.validate_in(mode, move |value: &AttrValue| check(value));
        }
    }

    if let Some(transform) = obj.get("transform") {
        schema = decode_transform(schema, transform, &pointer_child(pointer, "transform"))?;
    }

    Ok(schema)
}

fn flag(obj: &Map<String, Value>, keyword: &str, pointer: &str) -> Result<bool, LoadError> {
    match obj.get(keyword) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(invalid(pointer, format!("\"{}\" must be a boolean", keyword))),
    }
}

/// Mode named by a key of a per-mode object. Only the exact lowercase names
/// are accepted.
pub(crate) fn mode_key(name: &str) -> Option<Mode> {
    if VALID_MODES.contains(&name) {
        Mode::parse(name)
    } else {
        None
    }
}

/// Per-mode form of a `default`: a non-empty object whose keys are all modes.
fn per_mode(value: &Value) -> Option<Vec<(Mode, &Value)>> {
    let Value::Object(obj) = value else {
        return None;
    };
    if obj.is_empty() {
        return None;
    }
    obj.iter()
        .map(|(name, value)| mode_key(name).map(|mode| (mode, value)))
        .collect()
}

fn decode_transform(
    schema: AttributeSchema,
    transform: &Value,
    pointer: &str,
) -> Result<AttributeSchema, LoadError> {
    let Value::Object(obj) = transform else {
        return Err(invalid(pointer, "\"transform\" must be an object"));
    };
    let delimiter = match obj.get("delimiter") {
        None => None,
        Some(Value::String(d)) => Some(d.clone()),
        Some(_) => return Err(invalid(pointer, "\"delimiter\" must be a string")),
    };
    match (obj.get("prefix"), obj.get("suffix")) {
        (Some(Value::String(prefix)), None) => {
            let mut prefix = Prefix::new(prefix.clone());
            if let Some(d) = delimiter {
                prefix = prefix.delimiter(d);
            }
            Ok(schema.transform(prefix))
        }
        (None, Some(Value::String(suffix))) => {
            let mut suffix = Suffix::new(suffix.clone());
            if let Some(d) = delimiter {
                suffix = suffix.delimiter(d);
            }
            Ok(schema.transform(suffix))
        }
        _ => Err(invalid(
            pointer,
            "expected exactly one string \"prefix\" or \"suffix\"",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeKind;
    use serde_json::json;

    #[test]
    fn decode_scalar_with_props() {
        let schema = decode(&json!({
            "type": "string",
            "key": true,
            "savedAs": "pk",
            "transform": { "prefix": "USER", "delimiter": ":" }
        }))
        .unwrap();
        assert!(schema.is_key());
        assert!(schema.is_required(Mode::Update));
        assert_eq!(schema.stored_name("id"), "pk");
        let encoded = schema.transformer().unwrap().encode(&AttrValue::from("1"));
        assert_eq!(encoded, AttrValue::from("USER:1"));
    }

    #[test]
    fn decode_item_keeps_declaration_order() {
        let schema = decode(&json!({
            "type": "item",
            "attributes": {
                "b": { "type": "number" },
                "a": { "type": "string" }
            }
        }))
        .unwrap();
        let names: Vec<&String> = schema.attributes().unwrap().keys().collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn per_mode_and_literal_defaults() {
        let schema = decode(&json!({ "type": "number", "default": { "put": 0, "update": 1 } }))
            .unwrap();
        assert_eq!(
            schema.default_for(Mode::Put).map(DefaultValue::resolve),
            Some(AttrValue::from(0))
        );
        assert_eq!(
            schema.default_for(Mode::Update).map(DefaultValue::resolve),
            Some(AttrValue::from(1))
        );

        // Not every key is a mode: a literal map default.
        let schema = decode(&json!({
            "type": "map",
            "attributes": { "put": { "type": "number" }, "x": { "type": "number" } },
            "default": { "put": 1, "x": 2 }
        }))
        .unwrap();
        assert!(schema.default_for(Mode::Put).is_some());
        assert!(schema.default_for(Mode::Update).is_none());
    }

    #[test]
    fn record_keys_default_to_strings() {
        let schema =
            decode(&json!({ "type": "record", "elements": { "type": "number" } })).unwrap();
        match schema.kind() {
            AttributeKind::Record { keys, .. } => {
                assert!(matches!(keys.kind(), AttributeKind::Scalar(ScalarKind::String)))
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn unknown_type_reports_pointer() {
        let err = decode(&json!({
            "type": "item",
            "attributes": { "id": { "type": "uuid" } }
        }))
        .unwrap_err();
        match err {
            LoadError::InvalidDefinition { path, message } => {
                assert_eq!(path, "/attributes/id");
                assert!(message.contains("uuid"));
            }
            other => panic!("expected invalid definition, got {:?}", other),
        }
    }

    #[test]
    fn construction_errors_report_pointer() {
        let err = decode(&json!({
            "type": "map",
            "attributes": {
                "tags": {
                    "type": "set",
                    "elements": { "type": "string", "required": "never" }
                }
            }
        }))
        .unwrap_err();
        match err {
            LoadError::Construction { path, source } => {
                assert_eq!(path, "/attributes/tags");
                assert_eq!(source, ConstructionError::OptionalElement { container: "set" });
            }
            other => panic!("expected construction error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_validate_fragment_is_rejected() {
        let err = decode(&json!({ "type": "number", "validate": { "put": { "type": 3 } } }))
            .unwrap_err();
        match err {
            LoadError::InvalidDefinition { path, .. } => assert_eq!(path, "/validate/put"),
            other => panic!("expected invalid definition, got {:?}", other),
        }
    }

    #[test]
    fn transform_needs_one_of_prefix_or_suffix() {
        let err = decode(&json!({
            "type": "string",
            "transform": { "prefix": "a", "suffix": "b" }
        }))
        .unwrap_err();
        assert!(matches!(err, LoadError::InvalidDefinition { .. }));
    }

    #[test]
    fn pointer_escaping() {
        assert_eq!(pointer_child("", "a/b"), "/a~1b");
        assert_eq!(pointer_child("/x", "m~n"), "/x/m~0n");
    }
}
