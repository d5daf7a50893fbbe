//! Definition linting - static analysis of schema definition files.
//!
//! Checks definition files for:
//! - JSON syntax errors
//! - Definitions that cannot be decoded or composed
//! - Unknown keywords and unknown modes in per-mode objects

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::definition::{decode, pointer_child, KNOWN_KEYWORDS};
use crate::error::LoadError;
use crate::loader::load_json;
use crate::types::VALID_MODES;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// JSON path to the issue (e.g., "/attributes/id/savedAs")
    pub path: String,
    pub message: String,
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .json files.
/// If `strict` is true, warnings are treated as errors.
/// Returns aggregated results for all files.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let files = collect_definition_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single definition file.
pub fn lint_file(file: &Path, base_path: &Path) -> FileResult {
    let mut diagnostics = Vec::new();

    // Try to load the file (checks syntax)
    match load_json(file) {
        Ok(definition) => {
            if let Err(e) = decode(&definition) {
                let path = match &e {
                    LoadError::InvalidDefinition { path, .. }
                    | LoadError::Construction { path, .. } => path.clone(),
                    _ => "/".to_string(),
                };
                diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    code: "E002".to_string(),
                    file: file.to_path_buf(),
                    path,
                    message: e.to_string(),
                });
            }
            check_keywords(&definition, file, "", &mut diagnostics);
        }
        Err(e) => {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                file: file.to_path_buf(),
                path: "/".to_string(),
                message: format!("syntax error: {}", e),
            });
        }
    }

    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Recursively check keywords of a definition and its children.
fn check_keywords(value: &Value, file: &Path, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let Value::Object(map) = value else {
        return;
    };

    for key in map.keys() {
        if !KNOWN_KEYWORDS.contains(&key.as_str()) {
            diagnostics.push(Diagnostic {
                severity: Severity::Warning,
                code: "W001".to_string(),
                file: file.to_path_buf(),
                path: pointer_child(path, key),
                message: format!("unknown keyword \"{}\" is ignored", key),
            });
        }
    }

    // Per-mode objects: { "put": ..., "update": ... }
    if let Some(Value::Object(modes)) = map.get("validate") {
        let validate_path = pointer_child(path, "validate");
        for mode in modes.keys() {
            if !VALID_MODES.contains(&mode.as_str()) {
                diagnostics.push(Diagnostic {
                    severity: Severity::Warning,
                    code: "W002".to_string(),
                    file: file.to_path_buf(),
                    path: pointer_child(&validate_path, mode),
                    message: format!(
                        "unknown mode \"{}\": expected {}",
                        mode,
                        VALID_MODES.join(", ")
                    ),
                });
            }
        }
    }

    // Recurse into child definitions
    for keyword in ["elements", "keys"] {
        if let Some(child) = map.get(keyword) {
            check_keywords(child, file, &pointer_child(path, keyword), diagnostics);
        }
    }
    if let Some(Value::Object(attributes)) = map.get("attributes") {
        let attributes_path = pointer_child(path, "attributes");
        for (name, child) in attributes {
            check_keywords(child, file, &pointer_child(&attributes_path, name), diagnostics);
        }
    }
    if let Some(Value::Array(members)) = map.get("members") {
        let members_path = pointer_child(path, "members");
        for (i, child) in members.iter().enumerate() {
            check_keywords(child, file, &pointer_child(&members_path, &i.to_string()), diagnostics);
        }
    }
}

/// Collect all .json files in a path (file or directory).
fn collect_definition_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if path.extension().map(|e| e == "json").unwrap_or(false) {
            files.push(path);
        }
    }
}
