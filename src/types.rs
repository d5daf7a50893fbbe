//! Core types for item parsing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::extension::{Extension, UpdateExtension};
use crate::path::ValuePath;

/// Valid keys of per-mode definition objects.
pub const VALID_MODES: &[&str] = &["key", "put", "update"];

/// Write mode of a parse call.
///
/// Determines which defaults, links and validators apply and which
/// attributes are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Computing the primary key of an item.
    Key,
    /// Creating (or fully replacing) an item.
    Put,
    /// Partially updating an item.
    Update,
}

impl Mode {
    /// Parse a mode name. `create` is accepted as an alias of `put`.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "key" => Some(Mode::Key),
            "put" | "create" => Some(Mode::Put),
            "update" => Some(Mode::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Key => "key",
            Mode::Put => "put",
            Mode::Update => "update",
        }
    }

    /// Extension consulted by default when parsing in this mode.
    pub fn default_extension(&self) -> Option<Arc<dyn Extension>> {
        match self {
            Mode::Update => Some(Arc::new(UpdateExtension)),
            Mode::Key | Mode::Put => None,
        }
    }
}

/// When an attribute must be present after the fill phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Required {
    /// Required when creating an item, optional otherwise.
    #[default]
    AtLeastOnce,
    /// Required in every mode.
    Always,
    /// Never required.
    Never,
}

impl Required {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "atLeastOnce" => Some(Required::AtLeastOnce),
            "always" => Some(Required::Always),
            "never" => Some(Required::Never),
            _ => None,
        }
    }

    /// Whether an attribute with this setting must be present in `mode`.
    pub fn is_required(&self, mode: Mode) -> bool {
        match self {
            Required::AtLeastOnce => mode == Mode::Put,
            Required::Always => true,
            Required::Never => false,
        }
    }
}

/// Scalar attribute types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Any,
    Null,
    Boolean,
    Number,
    String,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Any => "any",
            ScalarKind::Null => "null",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Number => "number",
            ScalarKind::String => "string",
        }
    }
}

/// Options for a parse call.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Write mode.
    pub mode: Mode,
    /// Resolve links and defaults for absent values.
    pub fill: bool,
    /// Run the transform phase after the fill phase.
    pub transform: bool,
    /// Path of the parsed value, prefixed to every error path.
    pub value_path: ValuePath,
    /// Extension consulted at every node before generic handling.
    pub extension: Option<Arc<dyn Extension>>,
}

impl ParseOptions {
    /// Create options for `mode` with fill and transform enabled.
    ///
    /// The extension is the mode's default one, see [`Mode::default_extension`].
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            fill: true,
            transform: true,
            value_path: ValuePath::root(),
            extension: mode.default_extension(),
        }
    }

    pub fn fill(mut self, fill: bool) -> Self {
        self.fill = fill;
        self
    }

    pub fn transform(mut self, transform: bool) -> Self {
        self.transform = transform;
        self
    }

    pub fn value_path(mut self, value_path: ValuePath) -> Self {
        self.value_path = value_path;
        self
    }

    pub fn extension(mut self, extension: Option<Arc<dyn Extension>>) -> Self {
        self.extension = extension;
        self
    }

    /// Same options, located at `path`.
    pub(crate) fn at(&self, path: ValuePath) -> Self {
        Self {
            value_path: path,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parse_valid() {
        assert_eq!(Mode::parse("key"), Some(Mode::Key));
        assert_eq!(Mode::parse("put"), Some(Mode::Put));
        assert_eq!(Mode::parse("create"), Some(Mode::Put));
        assert_eq!(Mode::parse("Update"), Some(Mode::Update));
    }

    #[test]
    fn mode_parse_invalid() {
        assert_eq!(Mode::parse("delete"), None);
        assert_eq!(Mode::parse(""), None);
    }

    #[test]
    fn required_per_mode() {
        assert!(Required::AtLeastOnce.is_required(Mode::Put));
        assert!(!Required::AtLeastOnce.is_required(Mode::Update));
        assert!(!Required::AtLeastOnce.is_required(Mode::Key));
        for mode in [Mode::Key, Mode::Put, Mode::Update] {
            assert!(Required::Always.is_required(mode));
            assert!(!Required::Never.is_required(mode));
        }
    }

    #[test]
    fn parse_options_defaults() {
        let opts = ParseOptions::new(Mode::Put);
        assert!(opts.fill);
        assert!(opts.transform);
        assert!(opts.value_path.is_root());
        assert!(opts.extension.is_none());

        let opts = ParseOptions::new(Mode::Update).fill(false).transform(false);
        assert!(!opts.fill);
        assert!(!opts.transform);
        assert!(opts.extension.is_some());
    }
}
