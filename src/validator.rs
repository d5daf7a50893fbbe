//! Attribute validators backed by JSON Schema fragments.

use std::sync::Arc;

use serde_json::Value;

use crate::schema::{Check, Validator};
use crate::value::AttrValue;

/// Compile a JSON Schema fragment into an attribute validator.
///
/// The validator checks the JSON form of the filled value and reports the
/// first error of the fragment, if any.
///
/// # Errors
///
/// Returns the compiler message if the fragment isn't a valid schema.
pub fn compile(fragment: &Value) -> Result<Validator, String> {
    let compiled = jsonschema::validator_for(fragment).map_err(|e| e.to_string())?;
    Ok(Arc::new(move |value: &AttrValue| -> Check {
        validate_against_schema(&compiled, value)
    }))
}

/// Validate a value against an already-compiled schema.
pub fn validate_against_schema(compiled: &jsonschema::Validator, value: &AttrValue) -> Check {
    let instance = value.to_json();
    let first = compiled.iter_errors(&instance).next();
    match first {
        Some(error) => {
            let location = error.instance_path.to_string();
            if location.is_empty() {
                Check::Invalid(Some(error.to_string()))
            } else {
                Check::Invalid(Some(format!("{} at {}", error, location)))
            }
        }
        None => Check::Valid,
    }
}
