//! Item Schema
//!
//! Schema-driven parsing of item values for key-value stores.
//!
//! A schema describes the attributes of an item: their types, whether they
//! are required, their defaults, links and validators per write mode, the
//! name they are stored under and how their scalar values are encoded.
//! Parsing runs in two phases: **fill** (defaults, links, type checks and
//! validators) then **transform** (renaming and encoding for storage).
//!
//! # Example
//!
//! ```
//! use item_schema::{parse, AttrValue, AttributeSchema, Mode, ParseOptions, Prefix};
//!
//! let schema = AttributeSchema::item([
//!     (
//!         "id",
//!         AttributeSchema::string().key().saved_as("pk").transform(Prefix::new("USER")),
//!     ),
//!     ("visits", AttributeSchema::number().put_default(AttrValue::from(0))),
//! ])
//! .unwrap();
//!
//! let input = AttrValue::map([("id", AttrValue::from("42"))]);
//! let stored = parse(&schema, Some(input), ParseOptions::new(Mode::Put)).unwrap();
//!
//! assert_eq!(
//!     stored,
//!     Some(AttrValue::map([
//!         ("pk", AttrValue::from("USER#42")),
//!         ("visits", AttrValue::from(0)),
//!     ]))
//! );
//! ```
//!
//! # Requirement Rules
//!
//! | Required | key | put | update |
//! |----------|-----|-----|--------|
//! | `AtLeastOnce` (default) | optional | required | optional |
//! | `Always` (set by `key()`) | required | required | required |
//! | `Never` | optional | optional | optional |
//!
//! # Update Operations
//!
//! In update mode, values may be wrapped in an [`Operation`]. In JSON they
//! are written as single-key objects:
//! ```json
//! { "tags": { "$ADD": ["a", "b"] }, "nickname": { "$REMOVE": null } }
//! ```

mod definition;
mod error;
mod extension;
mod formatter;
mod linter;
mod loader;
mod operation;
mod parser;
mod path;
mod schema;
mod types;
mod validator;
mod value;

pub use definition::{decode, KNOWN_KEYWORDS, VALID_TYPES};
pub use error::{ConstructionError, ErrorReason, LoadError, SchemaError};
pub use extension::{Extension, ExtensionResult, UpdateExtension};
pub use formatter::format;
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{load_definition, load_definition_str, load_json, load_json_str};
pub use operation::{
    is_addition, is_deletion, is_reference, is_removal, is_setting, OpTag, Operation, Reference,
};
pub use parser::{parse, start, Parser, Stages};
pub use path::{Segment, ValuePath};
pub use schema::{
    AttributeKind, AttributeProps, AttributeSchema, Attributes, Check, DefaultValue, Link,
    LinkContext, PerMode, Prefix, Producer, Suffix, Transformer, Validator,
};
pub use types::{Mode, ParseOptions, Required, ScalarKind, VALID_MODES};
pub use validator::compile as compile_validator;
pub use value::{AttrMap, AttrValue};
