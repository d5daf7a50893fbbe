//! Extensions: per-mode hooks that take over parsing of recognised inputs.
//!
//! The parser consults the extension of its options at every node, before
//! any generic handling. An extension either hands the input back
//! untouched ([`ExtensionResult::Unextended`]) or returns a [`Parser`] that
//! owns the whole subtree and follows the same two-step contract as the
//! top-level parser.

use std::fmt;

use tracing::debug;

use crate::error::SchemaError;
use crate::operation::{OpTag, Operation, Reference};
use crate::parser::{start, Parser, Stages};
use crate::path::ValuePath;
use crate::schema::{AttributeKind, AttributeSchema};
use crate::types::{Mode, ParseOptions, ScalarKind};
use crate::value::AttrValue;

/// Outcome of consulting an extension.
pub enum ExtensionResult<'a> {
    /// Input not recognised; continue with generic handling.
    Unextended(Option<AttrValue>),
    /// Input recognised; the parser yields the filled then the transformed
    /// value of the subtree.
    Extended(Parser<'a>),
}

impl fmt::Debug for ExtensionResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionResult::Unextended(input) => {
                f.debug_tuple("Unextended").field(input).finish()
            }
            ExtensionResult::Extended(parser) => f.debug_tuple("Extended").field(parser).finish(),
        }
    }
}

/// Hook letting a write mode divert parsing of some inputs.
pub trait Extension: fmt::Debug + Send + Sync {
    fn parse<'a>(
        &self,
        schema: &'a AttributeSchema,
        input: Option<AttrValue>,
        options: &ParseOptions,
    ) -> ExtensionResult<'a>;
}

/// Update-mode extension recognising [`Operation`] wrappers.
///
/// | Operation | Accepted on | Operand parsed against |
/// |-----------|-------------|------------------------|
/// | `ADD` | set | set element schema |
/// | `ADD` | number | the number schema |
/// | `DELETE` | set | set element schema |
/// | `SET` | map, record, list | the attribute schema |
/// | `REMOVE` | attributes not required in update mode | - |
/// | `GET` | any attribute | the attribute schema (fallback) |
///
/// Operands are never filled. A list operand of `ADD`/`DELETE` on a set is
/// parsed member by member; any other operand is parsed as one member.
/// Operations used anywhere else fall through to generic handling, which
/// rejects them.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateExtension;

impl Extension for UpdateExtension {
    fn parse<'a>(
        &self,
        schema: &'a AttributeSchema,
        input: Option<AttrValue>,
        options: &ParseOptions,
    ) -> ExtensionResult<'a> {
        match input {
            Some(AttrValue::Op(op)) => parse_operation(schema, *op, options),
            other => ExtensionResult::Unextended(other),
        }
    }
}

fn parse_operation<'a>(
    schema: &'a AttributeSchema,
    op: Operation,
    options: &ParseOptions,
) -> ExtensionResult<'a> {
    let tag = op.tag();
    let action = match (op, schema.kind()) {
        (Operation::Add(operand), AttributeKind::Set(elements)) => {
            Action::Wrap(Operation::Add, set_operand(elements, operand, options, tag))
        }
        (Operation::Delete(operand), AttributeKind::Set(elements)) => {
            Action::Wrap(Operation::Delete, set_operand(elements, operand, options, tag))
        }
        (Operation::Add(operand), AttributeKind::Scalar(ScalarKind::Number)) => Action::Wrap(
            Operation::Add,
            Operand::One(start(schema, Some(operand), operand_options(options, tag))),
        ),
        (
            Operation::Set(payload),
            AttributeKind::Map(_) | AttributeKind::Record { .. } | AttributeKind::List(_),
        ) => Action::Wrap(
            Operation::Set,
            Operand::One(start(schema, Some(payload), operand_options(options, tag))),
        ),
        (Operation::Remove, _) => Action::Remove {
            required: schema.is_required(Mode::Update),
        },
        (Operation::Get(reference), _) => {
            let Reference {
                attribute,
                fallback,
            } = reference;
            let fallback = match fallback {
                Some(fallback) => Operand::One(start(
                    schema,
                    Some(*fallback),
                    operand_options(options, tag),
                )),
                None => Operand::None,
            };
            Action::Get {
                attribute,
                fallback,
            }
        }
        (op, _) => return ExtensionResult::Unextended(Some(AttrValue::from(op))),
    };

    debug!(path = %options.value_path, operation = %tag, "update operation");
    let stages = OperationStages {
        path: options.value_path.clone(),
        action,
    };
    ExtensionResult::Extended(Parser::new(Box::new(stages), options.transform))
}

/// Options of an operand: unfilled, no nested operations, path extended by
/// the operation tag.
fn operand_options(options: &ParseOptions, tag: OpTag) -> ParseOptions {
    ParseOptions {
        mode: options.mode,
        fill: false,
        transform: options.transform,
        value_path: options.value_path.extend(tag),
        extension: None,
    }
}

fn set_operand<'a>(
    elements: &'a AttributeSchema,
    operand: AttrValue,
    options: &ParseOptions,
    tag: OpTag,
) -> Operand<'a> {
    let member_options = operand_options(options, tag);
    match operand {
        AttrValue::List(members) => Operand::Many(
            members
                .into_iter()
                .map(|member| start(elements, Some(member), member_options.clone()))
                .collect(),
        ),
        member => Operand::One(start(elements, Some(member), member_options)),
    }
}

enum Operand<'a> {
    None,
    One(Parser<'a>),
    Many(Vec<Parser<'a>>),
}

impl<'a> Operand<'a> {
    /// Advance every operand parser by one step.
    fn resume(&mut self) -> Result<Option<AttrValue>, SchemaError> {
        match self {
            Operand::None => Ok(None),
            Operand::One(parser) => step(parser),
            Operand::Many(parsers) => {
                let mut members = Vec::with_capacity(parsers.len());
                for parser in parsers.iter_mut() {
                    if let Some(member) = step(parser)? {
                        members.push(member);
                    }
                }
                Ok(Some(AttrValue::List(members)))
            }
        }
    }
}

fn step(parser: &mut Parser<'_>) -> Result<Option<AttrValue>, SchemaError> {
    parser.next().unwrap_or(Ok(None))
}

enum Action<'a> {
    /// Re-wrap the parsed operand with the operation constructor.
    Wrap(fn(AttrValue) -> Operation, Operand<'a>),
    Remove {
        required: bool,
    },
    Get {
        attribute: String,
        fallback: Operand<'a>,
    },
}

struct OperationStages<'a> {
    path: ValuePath,
    action: Action<'a>,
}

impl<'a> OperationStages<'a> {
    /// Rebuild the operation from the next step of its operands.
    fn build(&mut self) -> Result<Option<AttrValue>, SchemaError> {
        let op = match &mut self.action {
            Action::Wrap(wrap, operand) => (*wrap)(operand.resume()?.unwrap_or(AttrValue::Null)),
            Action::Remove { required } => {
                if *required {
                    return Err(SchemaError::missing(&self.path));
                }
                Operation::Remove
            }
            Action::Get {
                attribute,
                fallback,
            } => {
                if attribute.is_empty() {
                    return Err(SchemaError::mismatch(
                        &self.path.extend(OpTag::Get),
                        "attribute reference",
                        "empty string",
                    ));
                }
                let mut reference = Reference::new(attribute.clone());
                if let Some(fallback) = fallback.resume()? {
                    reference = reference.with_fallback(fallback);
                }
                Operation::Get(reference)
            }
        };
        Ok(Some(AttrValue::from(op)))
    }
}

impl<'a> Stages<'a> for OperationStages<'a> {
    fn fill(&mut self) -> Result<Option<AttrValue>, SchemaError> {
        self.build()
    }

    fn transform(mut self: Box<Self>) -> Result<Option<AttrValue>, SchemaError> {
        self.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorReason;

    fn tags() -> AttributeSchema {
        AttributeSchema::set(AttributeSchema::string()).unwrap()
    }

    fn update(path: &str) -> ParseOptions {
        ParseOptions::new(Mode::Update).value_path(ValuePath::root().extend(path))
    }

    #[test]
    fn plain_values_are_not_extended() {
        let schema = tags();
        let input = Some(AttrValue::list(["a"]));
        match UpdateExtension.parse(&schema, input.clone(), &update("tags")) {
            ExtensionResult::Unextended(returned) => assert_eq!(returned, input),
            other => panic!("expected unextended, got {:?}", other),
        };
    }

    #[test]
    fn absent_values_are_not_extended() {
        let schema = tags();
        assert!(matches!(
            UpdateExtension.parse(&schema, None, &update("tags")),
            ExtensionResult::Unextended(None)
        ));
    }

    #[test]
    fn add_on_set_yields_filled_then_transformed() {
        let schema = tags();
        let input = AttrValue::from(Operation::Add(AttrValue::list(["a"])));
        let ExtensionResult::Extended(mut parser) =
            UpdateExtension.parse(&schema, Some(input.clone()), &update("tags"))
        else {
            panic!("expected extension");
        };
        assert_eq!(parser.next().unwrap().unwrap(), Some(input.clone()));
        assert_eq!(parser.next().unwrap().unwrap(), Some(input));
        assert!(parser.next().is_none());
    }

    #[test]
    fn delete_reports_errors_under_operation_segment() {
        let schema = tags();
        let input = AttrValue::from(Operation::Delete(AttrValue::from(3)));
        let ExtensionResult::Extended(mut parser) =
            UpdateExtension.parse(&schema, Some(input), &update("tags"))
        else {
            panic!("expected extension");
        };
        let err = parser.next().unwrap().unwrap_err();
        assert_eq!(err.path.to_string(), "/tags/DELETE");
        assert!(matches!(err.reason, ErrorReason::TypeMismatch { .. }));
        assert!(parser.next().is_none());
    }

    #[test]
    fn add_on_string_falls_through() {
        let schema = AttributeSchema::string();
        let input = AttrValue::from(Operation::Add(AttrValue::from("x")));
        match UpdateExtension.parse(&schema, Some(input.clone()), &update("name")) {
            ExtensionResult::Unextended(returned) => assert_eq!(returned, Some(input)),
            other => panic!("expected unextended, got {:?}", other),
        };
    }

    #[test]
    fn remove_of_required_attribute_fails() {
        let schema = AttributeSchema::string().key();
        let ExtensionResult::Extended(mut parser) = UpdateExtension.parse(
            &schema,
            Some(AttrValue::from(Operation::Remove)),
            &update("pk"),
        ) else {
            panic!("expected extension");
        };
        let err = parser.next().unwrap().unwrap_err();
        assert_eq!(err.reason, ErrorReason::RequiredAttributeMissing);
        assert_eq!(err.path.to_string(), "/pk");
    }

    #[test]
    fn get_with_empty_reference_fails() {
        let schema = AttributeSchema::number();
        let ExtensionResult::Extended(mut parser) = UpdateExtension.parse(
            &schema,
            Some(AttrValue::from(Operation::Get(Reference::new("")))),
            &update("count"),
        ) else {
            panic!("expected extension");
        };
        let err = parser.next().unwrap().unwrap_err();
        assert_eq!(err.path.to_string(), "/count/GET");
    }
}
