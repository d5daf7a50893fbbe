//! Formatting of stored values back into their declared shape.
//!
//! The formatter reverses the transform phase: children are read under
//! their stored name and reported under their declared one, scalars are
//! decoded, hidden attributes are dropped and stored attributes the schema
//! does not declare are ignored.

use tracing::trace;

use crate::error::SchemaError;
use crate::parser::scalar_matches;
use crate::path::ValuePath;
use crate::schema::{AttributeKind, AttributeSchema, Attributes};
use crate::value::{AttrMap, AttrValue};

/// Format a stored value against `schema`.
///
/// # Errors
///
/// Returns `SchemaError` with `TypeMismatch` when a stored value does not
/// match its declared kind.
pub fn format(schema: &AttributeSchema, stored: &AttrValue) -> Result<AttrValue, SchemaError> {
    format_at(schema, stored, &ValuePath::root())
}

fn format_at(
    schema: &AttributeSchema,
    stored: &AttrValue,
    path: &ValuePath,
) -> Result<AttrValue, SchemaError> {
    trace!(path = %path, kind = schema.kind().name(), "formatting attribute");

    match schema.kind() {
        AttributeKind::Scalar(kind) => {
            let value = match schema.transformer() {
                Some(transformer) => transformer.decode(stored),
                None => stored.clone(),
            };
            if !scalar_matches(*kind, &value) {
                return Err(SchemaError::mismatch(path, kind.name(), value.type_name()));
            }
            Ok(value)
        }

        AttributeKind::List(elements) => {
            let AttrValue::List(items) = stored else {
                return Err(SchemaError::mismatch(path, "list", stored.type_name()));
            };
            items
                .iter()
                .enumerate()
                .map(|(i, item)| format_at(elements, item, &path.extend(i)))
                .collect::<Result<Vec<_>, _>>()
                .map(AttrValue::List)
        }

        AttributeKind::Set(elements) => {
            let AttrValue::List(members) = stored else {
                return Err(SchemaError::mismatch(path, "set", stored.type_name()));
            };
            members
                .iter()
                .map(|member| format_at(elements, member, path))
                .collect::<Result<Vec<_>, _>>()
                .map(AttrValue::List)
        }

        AttributeKind::Map(attributes) | AttributeKind::Item(attributes) => {
            let AttrValue::Map(stored) = stored else {
                return Err(SchemaError::mismatch(
                    path,
                    schema.kind().name(),
                    stored.type_name(),
                ));
            };
            format_attributes(attributes, stored, path).map(AttrValue::Map)
        }

        AttributeKind::Record { keys, elements } => {
            let AttrValue::Map(stored) = stored else {
                return Err(SchemaError::mismatch(path, "record", stored.type_name()));
            };
            let mut out = AttrMap::with_capacity(stored.len());
            for (stored_key, element) in stored {
                let key = match keys.transformer() {
                    Some(transformer) => {
                        match transformer.decode(&AttrValue::String(stored_key.clone())) {
                            AttrValue::String(key) => key,
                            other => {
                                return Err(SchemaError::mismatch(
                                    &path.extend(stored_key.as_str()),
                                    "string key",
                                    other.type_name(),
                                ))
                            }
                        }
                    }
                    None => stored_key.clone(),
                };
                let value = format_at(elements, element, &path.extend(key.as_str()))?;
                out.insert(key, value);
            }
            Ok(AttrValue::Map(out))
        }

        AttributeKind::AnyOf(members) => {
            for member in members {
                if let Ok(value) = format_at(member, stored, path) {
                    return Ok(value);
                }
            }
            let expected = members
                .iter()
                .map(|m| m.kind().name())
                .collect::<Vec<_>>()
                .join(" | ");
            Err(SchemaError::mismatch(path, expected, stored.type_name()))
        }
    }
}

fn format_attributes(
    attributes: &Attributes,
    stored: &AttrMap,
    path: &ValuePath,
) -> Result<AttrMap, SchemaError> {
    let mut out = AttrMap::with_capacity(attributes.len());
    for (name, schema) in attributes {
        if schema.is_hidden() {
            continue;
        }
        let Some(value) = stored.get(schema.stored_name(name)) else {
            continue;
        };
        let value = format_at(schema, value, &path.extend(name.as_str()))?;
        out.insert(name.clone(), value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReason;
    use crate::parser::parse;
    use crate::schema::{Prefix, Suffix, Transformer};
    use crate::types::{Mode, ParseOptions};

    fn user() -> AttributeSchema {
        AttributeSchema::item([
            (
                "id",
                AttributeSchema::string()
                    .key()
                    .saved_as("pk")
                    .transform(Prefix::new("USER")),
            ),
            ("name", AttributeSchema::string()),
            ("secret", AttributeSchema::string().optional().hidden()),
        ])
        .unwrap()
    }

    #[test]
    fn renamed_and_encoded_attributes_are_restored() {
        let stored = AttrValue::map([
            ("pk", AttrValue::from("USER#1")),
            ("name", AttrValue::from("Ada")),
        ]);
        assert_eq!(
            format(&user(), &stored).unwrap(),
            AttrValue::map([("id", AttrValue::from("1")), ("name", AttrValue::from("Ada"))])
        );
    }

    #[test]
    fn hidden_and_undeclared_attributes_are_dropped() {
        let stored = AttrValue::map([
            ("pk", AttrValue::from("USER#1")),
            ("name", AttrValue::from("Ada")),
            ("secret", AttrValue::from("s3cr3t")),
            ("_et", AttrValue::from("User")),
        ]);
        let formatted = format(&user(), &stored).unwrap();
        let map = formatted.as_map().unwrap();
        assert_eq!(map.len(), 2);
        assert!(!map.contains_key("secret"));
        assert!(!map.contains_key("_et"));
    }

    #[test]
    fn type_mismatch_reports_declared_path() {
        let stored = AttrValue::map([("pk", AttrValue::from(1))]);
        let err = format(&user(), &stored).unwrap_err();
        assert_eq!(err.path.to_string(), "/id");
        assert!(matches!(err.reason, ErrorReason::TypeMismatch { .. }));
    }

    #[test]
    fn record_keys_are_decoded() {
        let schema = AttributeSchema::record(
            AttributeSchema::string().transform(Suffix::new("v")),
            AttributeSchema::number(),
        )
        .unwrap();
        let stored = AttrValue::map([("a#v", AttrValue::from(1))]);
        assert_eq!(
            format(&schema, &stored).unwrap(),
            AttrValue::map([("a", AttrValue::from(1))])
        );
    }

    #[derive(Debug)]
    struct Numbered;

    impl Transformer for Numbered {
        fn encode(&self, value: &AttrValue) -> AttrValue {
            value.clone()
        }

        fn decode(&self, _value: &AttrValue) -> AttrValue {
            AttrValue::from(1)
        }
    }

    #[test]
    fn record_keys_decoding_to_non_strings_are_rejected() {
        let schema = AttributeSchema::record(
            AttributeSchema::string().transform(Numbered),
            AttributeSchema::number(),
        )
        .unwrap();
        let stored = AttrValue::map([("a", AttrValue::from(1))]);
        let err = format(&schema, &stored).unwrap_err();
        assert_eq!(err.path.to_string(), "/a");
        assert_eq!(
            err.reason,
            ErrorReason::TypeMismatch {
                expected: "string key".into(),
                actual: "number".into(),
            }
        );
    }

    #[test]
    fn formatting_a_transformed_value_yields_the_filled_value() {
        let schema = user();
        let input = AttrValue::map([("id", AttrValue::from("7")), ("name", AttrValue::from("Bo"))]);
        let options = ParseOptions::new(Mode::Put);
        let stored = parse(&schema, Some(input.clone()), options).unwrap().unwrap();
        assert_eq!(format(&schema, &stored).unwrap(), input);
    }
}
