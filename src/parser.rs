//! Parser engine: fills, validates and transforms values against a schema.
//!
//! Parsing runs in two phases driven by the caller through a [`Parser`]:
//!
//! 1. **fill**: links and defaults are resolved for absent values, every
//!    value is type-checked and validated. The parser yields the filled
//!    value.
//! 2. **transform**: children are renamed to their stored names and scalars
//!    are encoded. The parser yields the transformed value.
//!
//! The fill phase keeps an intermediate tree between the two steps, so the
//! transform phase never re-validates and a caller that only needs the
//! filled value (to compute a key, say) never pays for encoding.

use std::fmt;
use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::error::SchemaError;
use crate::extension::ExtensionResult;
use crate::path::ValuePath;
use crate::schema::{
    AttributeKind, AttributeSchema, Attributes, Check, DefaultValue, LinkContext,
};
use crate::types::{Mode, ParseOptions, ScalarKind};
use crate::value::{AttrMap, AttrValue};

/// The two steps of a parser.
///
/// `fill` is called exactly once; `transform` at most once, after a
/// successful `fill`.
pub trait Stages<'a> {
    fn fill(&mut self) -> Result<Option<AttrValue>, SchemaError>;
    fn transform(self: Box<Self>) -> Result<Option<AttrValue>, SchemaError>;
}

enum Phase<'a> {
    Fill(Box<dyn Stages<'a> + 'a>),
    Transform(Box<dyn Stages<'a> + 'a>),
    Exhausted,
}

/// Two-step producer of parsed values.
///
/// The first `next()` yields the filled value, the second (only when the
/// transform phase was requested) the transformed value. `None` is returned
/// once the parser is exhausted, including after an error. A `None` inside
/// `Ok` means the value is absent.
pub struct Parser<'a> {
    phase: Phase<'a>,
    transform: bool,
}

impl<'a> Parser<'a> {
    pub fn new(stages: Box<dyn Stages<'a> + 'a>, transform: bool) -> Self {
        Self {
            phase: Phase::Fill(stages),
            transform,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.phase, Phase::Exhausted)
    }
}

impl<'a> Iterator for Parser<'a> {
    type Item = Result<Option<AttrValue>, SchemaError>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.phase, Phase::Exhausted) {
            Phase::Fill(mut stages) => {
                let filled = stages.fill();
                if filled.is_ok() && self.transform {
                    self.phase = Phase::Transform(stages);
                }
                Some(filled)
            }
            Phase::Transform(stages) => Some(stages.transform()),
            Phase::Exhausted => None,
        }
    }
}

impl FusedIterator for Parser<'_> {}

impl fmt::Debug for Parser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Fill(_) => "fill",
            Phase::Transform(_) => "transform",
            Phase::Exhausted => "exhausted",
        };
        f.debug_struct("Parser")
            .field("phase", &phase)
            .field("transform", &self.transform)
            .finish()
    }
}

/// Start parsing `input` (absent when `None`) against `schema`.
///
/// Nothing runs until the first call to `next()`.
pub fn start<'a>(
    schema: &'a AttributeSchema,
    input: Option<AttrValue>,
    options: ParseOptions,
) -> Parser<'a> {
    let transform = options.transform;
    let stages = NodeStages {
        schema,
        input,
        options,
        filled: None,
    };
    Parser::new(Box::new(stages), transform)
}

/// Run every requested phase and return the last value.
///
/// # Errors
///
/// Returns the first `SchemaError` met in depth-first order.
pub fn parse(
    schema: &AttributeSchema,
    input: Option<AttrValue>,
    options: ParseOptions,
) -> Result<Option<AttrValue>, SchemaError> {
    let mut output = None;
    for step in start(schema, input, options) {
        output = step?;
    }
    Ok(output)
}

struct NodeStages<'a> {
    schema: &'a AttributeSchema,
    input: Option<AttrValue>,
    options: ParseOptions,
    filled: Option<Filled<'a>>,
}

impl<'a> Stages<'a> for NodeStages<'a> {
    fn fill(&mut self) -> Result<Option<AttrValue>, SchemaError> {
        debug!(
            path = %self.options.value_path,
            mode = self.options.mode.as_str(),
            fill = self.options.fill,
            "fill phase"
        );
        let filled = fill_node(self.schema, self.input.take(), &self.options, None)?;
        let value = filled.value();
        self.filled = Some(filled);
        Ok(value)
    }

    fn transform(self: Box<Self>) -> Result<Option<AttrValue>, SchemaError> {
        debug!(path = %self.options.value_path, "transform phase");
        match self.filled {
            Some(filled) => transform_filled(filled, &self.options.value_path),
            None => Ok(None),
        }
    }
}

/// Intermediate result of the fill phase.
///
/// Every node keeps the schema it needs for the transform phase.
enum Filled<'a> {
    Absent,
    Scalar {
        schema: &'a AttributeSchema,
        value: AttrValue,
    },
    List(Vec<Filled<'a>>),
    Set(Vec<Filled<'a>>),
    Map(Vec<Entry<'a>>),
    Record {
        keys: &'a AttributeSchema,
        entries: Vec<(String, Filled<'a>)>,
    },
    /// Subtree owned by an extension, suspended after its first step.
    Extended {
        filled: Option<AttrValue>,
        parser: Parser<'a>,
    },
}

struct Entry<'a> {
    name: &'a str,
    schema: &'a AttributeSchema,
    value: Filled<'a>,
}

impl Filled<'_> {
    fn value(&self) -> Option<AttrValue> {
        match self {
            Filled::Absent => None,
            Filled::Scalar { value, .. } => Some(value.clone()),
            Filled::List(items) | Filled::Set(items) => {
                Some(AttrValue::List(items.iter().filter_map(Filled::value).collect()))
            }
            Filled::Map(entries) => Some(AttrValue::Map(
                entries
                    .iter()
                    .filter_map(|e| e.value.value().map(|v| (e.name.to_string(), v)))
                    .collect(),
            )),
            Filled::Record { entries, .. } => Some(AttrValue::Map(
                entries
                    .iter()
                    .filter_map(|(k, f)| f.value().map(|v| (k.clone(), v)))
                    .collect(),
            )),
            Filled::Extended { filled, .. } => filled.clone(),
        }
    }
}

// --- Fill phase ---

/// `scope` holds the already-filled siblings and ancestors of the node.
fn fill_node<'a>(
    schema: &'a AttributeSchema,
    input: Option<AttrValue>,
    options: &ParseOptions,
    scope: Option<&LinkContext<'_>>,
) -> Result<Filled<'a>, SchemaError> {
    let path = &options.value_path;
    trace!(path = %path, kind = schema.kind().name(), "parsing attribute");

    let input = match &options.extension {
        Some(extension) => match extension.parse(schema, input, options) {
            ExtensionResult::Extended(mut parser) => {
                trace!(path = %path, "handled by extension");
                let filled = parser.next().unwrap_or(Ok(None))?;
                return Ok(Filled::Extended { filled, parser });
            }
            ExtensionResult::Unextended(input) => input,
        },
        None => input,
    };

    let value = match input {
        Some(value) => Some(value),
        None if options.fill => resolve_missing(schema, options.mode, scope),
        None => None,
    };

    let Some(value) = value else {
        if schema.is_required(options.mode) {
            return Err(SchemaError::missing(path));
        }
        return Ok(Filled::Absent);
    };

    let filled = fill_kind(schema, value, options, scope)?;
    check_value(schema, &filled, options)?;
    Ok(filled)
}

/// Link first, then default.
fn resolve_missing(
    schema: &AttributeSchema,
    mode: Mode,
    scope: Option<&LinkContext<'_>>,
) -> Option<AttrValue> {
    if let (Some(link), Some(context)) = (schema.link_for(mode), scope) {
        if let Some(value) = link(context) {
            return Some(value);
        }
    }
    schema.default_for(mode).map(DefaultValue::resolve)
}

fn fill_kind<'a>(
    schema: &'a AttributeSchema,
    value: AttrValue,
    options: &ParseOptions,
    scope: Option<&LinkContext<'_>>,
) -> Result<Filled<'a>, SchemaError> {
    let path = &options.value_path;

    match schema.kind() {
        AttributeKind::Scalar(kind) => {
            if !scalar_matches(*kind, &value) {
                return Err(SchemaError::mismatch(path, kind.name(), value.type_name()));
            }
            Ok(Filled::Scalar { schema, value })
        }

        AttributeKind::List(elements) => {
            let AttrValue::List(items) = value else {
                return Err(SchemaError::mismatch(path, "list", value.type_name()));
            };
            let mut filled = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                let item_options = options.at(path.extend(i));
                filled.push(fill_node(elements, Some(item), &item_options, scope)?);
            }
            Ok(Filled::List(filled))
        }

        AttributeKind::Set(elements) => {
            let AttrValue::List(members) = value else {
                return Err(SchemaError::mismatch(path, "set", value.type_name()));
            };
            if has_duplicates(&members) {
                return Err(SchemaError::mismatch(
                    path,
                    "set of unique members",
                    "duplicate members",
                ));
            }
            // Members have no position; errors point at the set itself.
            let member_options = ParseOptions {
                extension: None,
                ..options.clone()
            };
            let mut filled = Vec::with_capacity(members.len());
            for member in members {
                filled.push(fill_node(elements, Some(member), &member_options, scope)?);
            }
            Ok(Filled::Set(filled))
        }

        AttributeKind::Map(attributes) => {
            let AttrValue::Map(input) = value else {
                return Err(SchemaError::mismatch(path, "map", value.type_name()));
            };
            fill_attributes(attributes, input, options, scope, false)
        }

        AttributeKind::Item(attributes) => {
            let AttrValue::Map(input) = value else {
                return Err(SchemaError::mismatch(path, "item", value.type_name()));
            };
            fill_attributes(attributes, input, options, scope, true)
        }

        AttributeKind::Record { keys, elements } => {
            let AttrValue::Map(input) = value else {
                return Err(SchemaError::mismatch(path, "record", value.type_name()));
            };
            let mut entries = Vec::with_capacity(input.len());
            for (key, element) in input {
                let entry_path = path.extend(key.as_str());
                let key_options = ParseOptions {
                    extension: None,
                    ..options.at(entry_path.clone())
                };
                fill_node(keys, Some(AttrValue::String(key.clone())), &key_options, None)?;
                let filled = fill_node(elements, Some(element), &options.at(entry_path), scope)?;
                entries.push((key, filled));
            }
            Ok(Filled::Record { keys, entries })
        }

        AttributeKind::AnyOf(members) => {
            for (i, member) in members.iter().enumerate() {
                match fill_node(member, Some(value.clone()), options, scope) {
                    Ok(filled) => {
                        trace!(path = %path, member = i, "anyOf member matched");
                        return Ok(filled);
                    }
                    Err(err) => {
                        trace!(path = %path, member = i, error = %err, "anyOf member rejected")
                    }
                }
            }
            let expected = members
                .iter()
                .map(|m| m.kind().name())
                .collect::<Vec<_>>()
                .join(" | ");
            Err(SchemaError::mismatch(path, expected, value.type_name()))
        }
    }
}

fn fill_attributes<'a>(
    attributes: &'a Attributes,
    mut input: AttrMap,
    options: &ParseOptions,
    scope: Option<&LinkContext<'_>>,
    is_item: bool,
) -> Result<Filled<'a>, SchemaError> {
    let path = &options.value_path;
    let mode = options.mode;

    if let Some(unknown) = input.keys().find(|k| !attributes.contains_key(k.as_str())) {
        return Err(SchemaError::mismatch(
            &path.extend(unknown.as_str()),
            "declared attribute",
            "undeclared attribute",
        ));
    }

    // Key computation only parses the key attributes of an item.
    let key_only = is_item && mode == Mode::Key;
    // Links anywhere below may read these members.
    let track = options.fill;

    let mut slots: Vec<Option<Entry<'a>>> = Vec::with_capacity(attributes.len());
    let mut siblings = AttrMap::new();
    let mut deferred = Vec::new();
    let mut first_error: Option<(usize, SchemaError)> = None;

    for (name, schema) in attributes {
        let slot = slots.len();
        slots.push(None);
        let raw = input.shift_remove(name.as_str());
        if key_only && !schema.is_key() {
            if let (true, Some(raw)) = (track, raw) {
                siblings.insert(name.clone(), raw);
            }
            continue;
        }
        if raw.is_none() && options.fill && schema.link_for(mode).is_some() {
            deferred.push((slot, name, schema));
            continue;
        }
        let context = nested_scope(scope, &siblings);
        let attribute_options = options.at(path.extend(name.as_str()));
        match fill_node(schema, raw, &attribute_options, Some(&context)) {
            Ok(value) => {
                if let (true, Some(filled)) = (track, value.value()) {
                    siblings.insert(name.clone(), filled);
                }
                slots[slot] = Some(Entry {
                    name: name.as_str(),
                    schema,
                    value,
                });
            }
            // Kept until the linked attributes declared before it are resolved.
            Err(err) => {
                if first_error.is_none() {
                    first_error = Some((slot, err));
                }
            }
        }
    }

    // Linked attributes see every sibling filled before them.
    for (slot, name, schema) in deferred {
        if matches!(&first_error, Some((failed, _)) if *failed < slot) {
            break;
        }
        let context = nested_scope(scope, &siblings);
        let value = fill_node(
            schema,
            None,
            &options.at(path.extend(name.as_str())),
            Some(&context),
        )?;
        if let Some(filled) = value.value() {
            siblings.insert(name.clone(), filled);
        }
        slots[slot] = Some(Entry {
            name: name.as_str(),
            schema,
            value,
        });
    }

    if let Some((_, err)) = first_error {
        return Err(err);
    }
    Ok(Filled::Map(slots.into_iter().flatten().collect()))
}

fn nested_scope<'s>(scope: Option<&'s LinkContext<'_>>, siblings: &'s AttrMap) -> LinkContext<'s> {
    match scope {
        Some(parent) => parent.nested(siblings),
        None => LinkContext::new(siblings),
    }
}

pub(crate) fn scalar_matches(kind: ScalarKind, value: &AttrValue) -> bool {
    match kind {
        ScalarKind::Any => !matches!(value, AttrValue::Op(_)),
        ScalarKind::Null => matches!(value, AttrValue::Null),
        ScalarKind::Boolean => matches!(value, AttrValue::Bool(_)),
        ScalarKind::Number => matches!(value, AttrValue::Number(_)),
        ScalarKind::String => matches!(value, AttrValue::String(_)),
    }
}

fn has_duplicates(members: &[AttrValue]) -> bool {
    members
        .iter()
        .enumerate()
        .any(|(i, member)| members[..i].iter().any(|seen| seen.same_as(member)))
}

/// Enumeration and validator checks, run once all children are valid.
fn check_value(
    schema: &AttributeSchema,
    filled: &Filled<'_>,
    options: &ParseOptions,
) -> Result<(), SchemaError> {
    let path = &options.value_path;
    let enumerated = schema.props().enumerated.as_deref();
    let validator = schema.validator_for(options.mode);
    if enumerated.is_none() && validator.is_none() {
        return Ok(());
    }
    let Some(value) = filled.value() else {
        return Ok(());
    };

    if let Some(allowed) = enumerated {
        if !allowed.iter().any(|candidate| candidate.same_as(&value)) {
            let expected = allowed
                .iter()
                .map(|v| v.to_json().to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SchemaError::mismatch(
                path,
                format!("one of {}", expected),
                &value.to_json().to_string(),
            ));
        }
    }

    if let Some(validator) = validator {
        if let Check::Invalid(message) = validator(&value) {
            let message = message.unwrap_or_else(|| {
                format!("{} value rejected by validator", schema.kind().name())
            });
            return Err(SchemaError::invalid(path, message));
        }
    }

    Ok(())
}

// --- Transform phase ---

fn transform_filled(
    filled: Filled<'_>,
    path: &ValuePath,
) -> Result<Option<AttrValue>, SchemaError> {
    let value = match filled {
        Filled::Absent => return Ok(None),

        Filled::Extended { filled, mut parser } => {
            return parser.next().unwrap_or(Ok(filled));
        }

        Filled::Scalar { schema, value } => match schema.transformer() {
            Some(transformer) => transformer.encode(&value),
            None => value,
        },

        Filled::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                if let Some(value) = transform_filled(item, &path.extend(i))? {
                    out.push(value);
                }
            }
            AttrValue::List(out)
        }

        Filled::Set(members) => {
            let mut out = Vec::with_capacity(members.len());
            for member in members {
                if let Some(value) = transform_filled(member, path)? {
                    out.push(value);
                }
            }
            AttrValue::List(out)
        }

        Filled::Map(entries) => {
            let mut out = AttrMap::with_capacity(entries.len());
            for Entry {
                name,
                schema,
                value,
            } in entries
            {
                let Some(value) = transform_filled(value, &path.extend(name))? else {
                    continue;
                };
                let stored = schema.stored_name(name);
                if out.contains_key(stored) {
                    return Err(SchemaError::conflict(path, stored));
                }
                out.insert(stored.to_string(), value);
            }
            AttrValue::Map(out)
        }

        Filled::Record { keys, entries } => {
            let mut out = AttrMap::with_capacity(entries.len());
            for (key, element) in entries {
                let entry_path = path.extend(key.as_str());
                let Some(value) = transform_filled(element, &entry_path)? else {
                    continue;
                };
                let stored = match keys.transformer() {
                    Some(transformer) => match transformer.encode(&AttrValue::String(key)) {
                        AttrValue::String(encoded) => encoded,
                        other => {
                            return Err(SchemaError::mismatch(
                                &entry_path,
                                "string key",
                                other.type_name(),
                            ))
                        }
                    },
                    None => key,
                };
                if out.contains_key(&stored) {
                    return Err(SchemaError::conflict(path, stored));
                }
                out.insert(stored, value);
            }
            AttrValue::Map(out)
        }
    };
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReason;
    use crate::schema::{LinkContext, Prefix, Transformer};
    use crate::types::Required;
    use serde_json::Number;

    fn put() -> ParseOptions {
        ParseOptions::new(Mode::Put)
    }

    #[test]
    fn parser_yields_filled_then_transformed() {
        let schema = AttributeSchema::item([(
            "pk",
            AttributeSchema::string().transform(Prefix::new("USER")),
        )])
        .unwrap();
        let input = AttrValue::map([("pk", AttrValue::from("1"))]);

        let mut parser = start(&schema, Some(input.clone()), put());
        assert_eq!(parser.next().unwrap().unwrap(), Some(input));
        assert_eq!(
            parser.next().unwrap().unwrap(),
            Some(AttrValue::map([("pk", AttrValue::from("USER#1"))]))
        );
        assert!(parser.next().is_none());
        assert!(parser.is_exhausted());
    }

    #[test]
    fn parser_without_transform_stops_after_fill() {
        let schema = AttributeSchema::string();
        let mut parser = start(&schema, Some(AttrValue::from("a")), put().transform(false));
        assert_eq!(parser.next().unwrap().unwrap(), Some(AttrValue::from("a")));
        assert!(parser.next().is_none());
    }

    #[test]
    fn parser_is_exhausted_after_error() {
        let schema = AttributeSchema::string();
        let mut parser = start(&schema, Some(AttrValue::from(1)), put());
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn absent_optional_root_is_absent() {
        let schema = AttributeSchema::string().optional();
        assert_eq!(parse(&schema, None, put()).unwrap(), None);
    }

    #[test]
    fn set_duplicates_are_rejected() {
        let schema = AttributeSchema::set(AttributeSchema::string()).unwrap();
        let err = parse(&schema, Some(AttrValue::list(["a", "a"])), put()).unwrap_err();
        assert!(matches!(err.reason, ErrorReason::TypeMismatch { .. }));
    }

    #[test]
    fn set_duplicates_compare_numbers_by_magnitude() {
        let schema = AttributeSchema::set(AttributeSchema::number()).unwrap();
        let float = Number::from_f64(1.0).unwrap();
        let input = AttrValue::List(vec![AttrValue::from(1), AttrValue::Number(float)]);
        let err = parse(&schema, Some(input), put()).unwrap_err();
        assert!(matches!(err.reason, ErrorReason::TypeMismatch { .. }));
    }

    #[test]
    fn enumerated_numbers_compare_by_magnitude() {
        let schema = AttributeSchema::number().enumerated([AttrValue::from(1)]);
        let float = AttrValue::Number(Number::from_f64(1.0).unwrap());
        assert_eq!(parse(&schema, Some(float.clone()), put()).unwrap(), Some(float));
    }

    #[test]
    fn list_errors_carry_index() {
        let schema = AttributeSchema::list(AttributeSchema::number()).unwrap();
        let input = AttrValue::List(vec![AttrValue::from(1), AttrValue::from("x")]);
        let err = parse(&schema, Some(input), put()).unwrap_err();
        assert_eq!(err.path.to_string(), "/1");
    }

    #[test]
    fn undeclared_attributes_are_rejected() {
        let schema = AttributeSchema::map([("a", AttributeSchema::string())]).unwrap();
        let input = AttrValue::map([("a", AttrValue::from("x")), ("b", AttrValue::from(1))]);
        let err = parse(&schema, Some(input), put()).unwrap_err();
        assert_eq!(err.path.to_string(), "/b");
    }

    #[test]
    fn enumerated_values_are_enforced() {
        let schema = AttributeSchema::string().enumerated(["red", "blue"]);
        assert!(parse(&schema, Some(AttrValue::from("red")), put()).is_ok());
        let err = parse(&schema, Some(AttrValue::from("green")), put()).unwrap_err();
        assert_eq!(
            err.reason,
            ErrorReason::TypeMismatch {
                expected: "one of \"red\", \"blue\"".into(),
                actual: "\"green\"".into(),
            }
        );
    }

    #[test]
    fn any_of_takes_first_matching_member() {
        let schema = AttributeSchema::any_of([
            AttributeSchema::number(),
            AttributeSchema::string().transform(Prefix::new("S")),
        ])
        .unwrap();
        assert_eq!(
            parse(&schema, Some(AttrValue::from("x")), put()).unwrap(),
            Some(AttrValue::from("S#x"))
        );
        let err = parse(&schema, Some(AttrValue::Bool(true)), put()).unwrap_err();
        assert_eq!(
            err.reason,
            ErrorReason::TypeMismatch {
                expected: "number | string".into(),
                actual: "boolean".into(),
            }
        );
    }

    #[test]
    fn record_keys_are_encoded() {
        let schema = AttributeSchema::record(
            AttributeSchema::string().transform(Prefix::new("k")),
            AttributeSchema::number(),
        )
        .unwrap();
        let input = AttrValue::map([("a", AttrValue::from(1))]);
        assert_eq!(
            parse(&schema, Some(input), put()).unwrap(),
            Some(AttrValue::map([("k#a", AttrValue::from(1))]))
        );
    }

    #[derive(Debug)]
    struct Numbered;

    impl Transformer for Numbered {
        fn encode(&self, _value: &AttrValue) -> AttrValue {
            AttrValue::from(1)
        }

        fn decode(&self, value: &AttrValue) -> AttrValue {
            value.clone()
        }
    }

    #[test]
    fn record_keys_encoding_to_non_strings_are_rejected() {
        let schema = AttributeSchema::record(
            AttributeSchema::string().transform(Numbered),
            AttributeSchema::number(),
        )
        .unwrap();
        let input = AttrValue::map([("a", AttrValue::from(1))]);
        let err = parse(&schema, Some(input), put()).unwrap_err();
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
    fn links_read_enclosing_maps() {
        let schema = AttributeSchema::item([
            ("a", AttributeSchema::string()),
            (
                "inner",
                AttributeSchema::map([(
                    "b",
                    AttributeSchema::string().put_link(|ctx: &LinkContext<'_>| {
                        assert_eq!(ctx.ancestors().count(), 1);
                        ctx.lookup("a").cloned()
                    }),
                )])
                .unwrap(),
            ),
        ])
        .unwrap();
        let input = AttrValue::map([
            ("a", AttrValue::from("x")),
            ("inner", AttrValue::map(Vec::<(String, AttrValue)>::new())),
        ]);
        assert_eq!(
            parse(&schema, Some(input), put().transform(false)).unwrap(),
            Some(AttrValue::map([
                ("a", AttrValue::from("x")),
                ("inner", AttrValue::map([("b", AttrValue::from("x"))])),
            ]))
        );
    }

    #[test]
    fn rename_conflicts_are_reported() {
        let schema = AttributeSchema::map([
            ("a", AttributeSchema::string().saved_as("x")),
            ("b", AttributeSchema::string().saved_as("x")),
        ])
        .unwrap();
        let input = AttrValue::map([("a", AttrValue::from("1")), ("b", AttrValue::from("2"))]);
        let err = parse(&schema, Some(input), put()).unwrap_err();
        assert_eq!(err.reason, ErrorReason::RenameConflict { stored: "x".into() });
        assert!(err.path.is_root());
    }

    #[test]
    fn never_required_attributes_stay_absent() {
        let schema =
            AttributeSchema::map([("a", AttributeSchema::string().required(Required::Never))])
                .unwrap();
        assert_eq!(
            parse(&schema, Some(AttrValue::map(Vec::<(String, AttrValue)>::new())), put()).unwrap(),
            Some(AttrValue::map(Vec::<(String, AttrValue)>::new()))
        );
    }
}
