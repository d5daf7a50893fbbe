//! Item Schema CLI
//!
//! Command-line interface for parsing, formatting and linting items against
//! schema definitions.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use item_schema::{
    format, lint, load_definition, load_json, parse, AttrValue, FileStatus, Mode, ParseOptions,
    Severity, VALID_MODES,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "item-schema")]
#[command(about = "Parse, format and lint items against schema definitions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an input value for a write mode
    Parse {
        /// Schema definition file
        definition: PathBuf,

        /// Input value file (JSON, operations as {"$ADD": ...})
        input: PathBuf,

        /// Write mode: key, put (alias: create) or update
        #[arg(long, short)]
        mode: String,

        /// Skip links and defaults for absent values
        #[arg(long)]
        no_fill: bool,

        /// Stop after the fill phase (no renaming or encoding)
        #[arg(long)]
        no_transform: bool,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Format a stored value back into its declared shape
    Format {
        /// Schema definition file
        definition: PathBuf,

        /// Stored value file
        stored: PathBuf,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint definition files for errors (syntax, invalid definitions, unknown keywords)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

struct ParseArgs {
    definition: PathBuf,
    input: PathBuf,
    mode: String,
    fill: bool,
    transform: bool,
    output: Option<PathBuf>,
    pretty: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            definition,
            input,
            mode,
            no_fill,
            no_transform,
            output,
            pretty,
        } => run_parse(ParseArgs {
            definition,
            input,
            mode,
            fill: !no_fill,
            transform: !no_transform,
            output,
            pretty,
        }),

        Commands::Format {
            definition,
            stored,
            pretty,
        } => run_format(&definition, &stored, pretty),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn run_parse(args: ParseArgs) -> Result<(), u8> {
    let ParseArgs {
        definition,
        input,
        mode,
        fill,
        transform,
        output,
        pretty,
    } = args;

    let Some(mode) = Mode::parse(&mode) else {
        eprintln!(
            "Error: invalid mode \"{}\": expected {} or create",
            mode,
            VALID_MODES.join(", ")
        );
        return Err(2);
    };

    let schema = load_definition(&definition).map_err(|e| {
        eprintln!("Error: loading definition: {}", e);
        e.exit_code() as u8
    })?;

    let value = load_json(&input).map_err(|e| {
        eprintln!("Error: loading input: {}", e);
        e.exit_code() as u8
    })?;

    tracing::debug!(mode = mode.as_str(), fill, transform, "parsing input");
    let options = ParseOptions::new(mode).fill(fill).transform(transform);
    let parsed = parse(
        &schema,
        Some(AttrValue::from_json_with_operations(value)),
        options,
    )
    .map_err(|e| {
        eprintln!("Parse failed: {}", e);
        1u8
    })?;

    let json = parsed
        .map(|value| value.to_json())
        .unwrap_or(serde_json::Value::Null);
    write_output(&json, pretty, output.as_deref())
}

fn run_format(definition: &Path, stored: &Path, pretty: bool) -> Result<(), u8> {
    let schema = load_definition(definition).map_err(|e| {
        eprintln!("Error: loading definition: {}", e);
        e.exit_code() as u8
    })?;

    let value = load_json(stored).map_err(|e| {
        eprintln!("Error: loading stored value: {}", e);
        e.exit_code() as u8
    })?;

    let formatted = format(&schema, &AttrValue::from(value)).map_err(|e| {
        eprintln!("Format failed: {}", e);
        1u8
    })?;

    write_output(&formatted.to_json(), pretty, None)
}

fn write_output(json: &serde_json::Value, pretty: bool, output: Option<&Path>) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(json)
    } else {
        serde_json::to_string(json)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let json = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json);
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
