//! Error types for schema construction, loading and parsing.

use std::path::PathBuf;
use thiserror::Error;

use crate::path::ValuePath;

/// Invalid schema composition, raised when a schema is built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("{container} elements must be required")]
    OptionalElement { container: &'static str },

    #[error("{container} elements cannot be hidden")]
    HiddenElement { container: &'static str },

    #[error("{container} elements cannot be renamed (savedAs \"{saved_as}\")")]
    RenamedElement {
        container: &'static str,
        saved_as: String,
    },

    #[error("{container} elements cannot have a default or a link")]
    DefaultedElement { container: &'static str },

    #[error("set elements must be scalars, got {kind}")]
    NonScalarSetElement { kind: &'static str },

    #[error("record keys must be strings, got {kind}")]
    NonStringRecordKey { kind: &'static str },

    #[error("an item schema cannot be nested inside {container}")]
    NestedItem { container: &'static str },

    #[error("anyOf needs at least one member")]
    EmptyAnyOf,
}

/// Why a parse call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorReason {
    #[error("required attribute is missing")]
    RequiredAttributeMissing,

    #[error("expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("more than one attribute is stored as \"{stored}\"")]
    RenameConflict { stored: String },
}

/// A parse or format failure at a specific value path.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
#[error("{path}: {reason}")]
pub struct SchemaError {
    pub path: ValuePath,
    #[serde(serialize_with = "serialize_display")]
    pub reason: ErrorReason,
}

impl SchemaError {
    pub fn new(path: ValuePath, reason: ErrorReason) -> Self {
        Self { path, reason }
    }

    pub(crate) fn missing(path: &ValuePath) -> Self {
        Self::new(path.clone(), ErrorReason::RequiredAttributeMissing)
    }

    pub(crate) fn mismatch(path: &ValuePath, expected: impl Into<String>, actual: &str) -> Self {
        Self::new(
            path.clone(),
            ErrorReason::TypeMismatch {
                expected: expected.into(),
                actual: actual.to_string(),
            },
        )
    }

    pub(crate) fn invalid(path: &ValuePath, message: impl Into<String>) -> Self {
        Self::new(path.clone(), ErrorReason::ValidationFailed(message.into()))
    }

    pub(crate) fn conflict(path: &ValuePath, stored: impl Into<String>) -> Self {
        Self::new(
            path.clone(),
            ErrorReason::RenameConflict {
                stored: stored.into(),
            },
        )
    }
}

fn serialize_display<S: serde::Serializer>(
    reason: &ErrorReason,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Errors while loading definitions and values from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Definition errors (exit code 2)
    #[error("invalid definition at {path}: {message}")]
    InvalidDefinition { path: String, message: String },

    #[error("invalid schema at {path}: {source}")]
    Construction {
        path: String,
        #[source]
        source: ConstructionError,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}
