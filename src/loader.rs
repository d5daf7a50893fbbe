//! Loading of definitions and values from files and strings.

use std::path::Path;

use serde_json::Value;

use crate::definition;
use crate::error::LoadError;
use crate::schema::AttributeSchema;

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson` if the file isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_json_str(&content)
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load and decode a schema definition file.
///
/// # Errors
///
/// Returns the IO and JSON errors of [`load_json`], or the decoding errors
/// of [`definition::decode`].
pub fn load_definition(path: &Path) -> Result<AttributeSchema, LoadError> {
    let value = load_json(path)?;
    definition::decode(&value)
}

/// Decode a schema definition from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or a decoding error.
pub fn load_definition_str(content: &str) -> Result<AttributeSchema, LoadError> {
    let value = load_json_str(content)?;
    definition::decode(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_json_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type": "string"}}"#).unwrap();

        let value = load_json(file.path()).unwrap();
        assert_eq!(value["type"], "string");
    }

    #[test]
    fn load_json_file_not_found() {
        let result = load_json(Path::new("/nonexistent/path.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_json_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_json(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_json_str_invalid() {
        let result = load_json_str("not json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_definition_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"type": "item", "attributes": {{"id": {{"type": "string", "key": true}}}}}}"#
        )
        .unwrap();

        let schema = load_definition(file.path()).unwrap();
        assert!(schema.attributes().unwrap()["id"].is_key());
    }

    #[test]
    fn load_definition_str_invalid_definition() {
        let result = load_definition_str(r#"{"type": "tuple"}"#);
        assert!(matches!(result, Err(LoadError::InvalidDefinition { .. })));
    }
}
