//! Call Schema CLI
//!
//! Command-line interface for validating call arguments, projecting
//! returned fields and inspecting schema snapshots.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use call_schema::{
    json_type_name, lint, load_json, load_snapshot_auto, prepare_call, project,
    reduce_branches, reduce_shallow, validate_call, Arguments, CheckOptions, FileStatus,
    LintResult, ReturnRequest, SchemaTree, Severity, Snapshot,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "call-schema")]
#[command(about = "Validate call arguments and project returned fields against schema snapshots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ElementArgs {
    /// Snapshot source: file path or URL (http:// or https://)
    snapshot: String,

    /// Schema element to check against (e.g., addPhone)
    #[arg(long, short)]
    element: String,
}

#[derive(clap::Args)]
struct TagArgs {
    /// Tag to return (repeat or comma-separate; none means every tag)
    #[arg(long = "tag", short, value_delimiter = ',')]
    tags: Vec<String>,

    /// Dotted path to scope the tags under (e.g., lines.line)
    #[arg(long)]
    drill: Option<String>,

    /// Only return the identifier field when asked for explicitly
    #[arg(long)]
    no_auto_identifier: bool,

    /// Pass tags through without checking them
    #[arg(long)]
    skip_return_check: bool,
}

impl TagArgs {
    fn request(&self) -> ReturnRequest {
        let drill = self
            .drill
            .as_deref()
            .map(|d| d.split('.').filter(|hop| !hop.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();
        ReturnRequest::new().tags(self.tags.clone()).drill(drill)
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Reduction {
    /// Full tree
    None,
    /// Required children of the root, one hop into choices
    Shallow,
    /// Every branch leading to a required field
    Branch,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate call arguments against an element
    Validate {
        #[command(flatten)]
        target: ElementArgs,

        /// JSON file holding the arguments (object = named, array = positional)
        #[arg(long)]
        args: PathBuf,

        /// Accept any argument shape
        #[arg(long)]
        skip_argument_check: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Project wanted tags into a returnedTags structure
    Project {
        #[command(flatten)]
        target: ElementArgs,

        #[command(flatten)]
        tags: TagArgs,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Validate arguments and project tags, printing the prepared call
    Prepare {
        #[command(flatten)]
        target: ElementArgs,

        /// JSON file holding the arguments (empty arguments if omitted)
        #[arg(long)]
        args: Option<PathBuf>,

        #[command(flatten)]
        tags: TagArgs,

        /// Skip projection entirely (call returns no field selection)
        #[arg(long, conflicts_with_all = ["tags", "drill"])]
        no_tags: bool,

        /// Accept any argument shape
        #[arg(long)]
        skip_argument_check: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show the accepted argument surface of an element
    Shape {
        #[command(flatten)]
        target: ElementArgs,

        /// Reduce the tree before rendering
        #[arg(long, value_enum, default_value = "none")]
        reduce: Reduction,

        /// Only list required fields
        #[arg(long)]
        required_only: bool,

        /// Print display names instead of the nested shape
        #[arg(long)]
        names: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Lint snapshot files for errors (syntax, structure, duplicate names)
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

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate {
            target,
            args,
            skip_argument_check,
            json,
        } => run_validate(&target, &args, skip_argument_check, json),

        Commands::Project {
            target,
            tags,
            pretty,
        } => run_project(&target, &tags, pretty),

        Commands::Prepare {
            target,
            args,
            tags,
            no_tags,
            skip_argument_check,
            pretty,
        } => run_prepare(PrepareArgs {
            target,
            args,
            tags,
            no_tags,
            skip_argument_check,
            pretty,
        }),

        Commands::Shape {
            target,
            reduce,
            required_only,
            names,
            pretty,
        } => run_shape(&target, reduce, required_only, names, pretty),

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

fn load(source: &str) -> Result<Snapshot, u8> {
    load_snapshot_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn build(target: &ElementArgs) -> Result<SchemaTree, u8> {
    let snapshot = load(&target.snapshot)?;
    SchemaTree::build(&snapshot, &target.element).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn load_arguments(path: &Path) -> Result<Arguments, u8> {
    let value = load_json(path).map_err(|e| {
        eprintln!("Error loading arguments: {}", e);
        e.exit_code() as u8
    })?;
    if !matches!(value, Value::Object(_) | Value::Array(_)) {
        eprintln!(
            "Error loading arguments: expected object or array, got {}",
            json_type_name(&value)
        );
        return Err(2);
    }
    Ok(Arguments::from_value(value))
}

fn print_json(value: &impl serde::Serialize, pretty: bool) -> Result<(), u8> {
    let output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_validate(
    target: &ElementArgs,
    args_path: &Path,
    skip_argument_check: bool,
    json_output: bool,
) -> Result<(), u8> {
    let tree = build(target)?;
    let args = load_arguments(args_path)?;
    let options = CheckOptions::new().skip_argument_check(skip_argument_check);

    match validate_call(&tree, &args, &options) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(e) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "path": e.path(),
                    "error": e.to_string(),
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                eprintln!("  {}", e);
            }
            Err(1)
        }
    }
}

fn run_project(target: &ElementArgs, tags: &TagArgs, pretty: bool) -> Result<(), u8> {
    let tree = build(target)?;
    let options = CheckOptions::new()
        .auto_include_identifier(!tags.no_auto_identifier)
        .skip_return_check(tags.skip_return_check);

    let projected = project(tree.root(), &tags.request(), &options).map_err(|e| {
        eprintln!("Error: {}", e);
        1u8
    })?;
    print_json(&Value::Object(projected), pretty)
}

struct PrepareArgs {
    target: ElementArgs,
    args: Option<PathBuf>,
    tags: TagArgs,
    no_tags: bool,
    skip_argument_check: bool,
    pretty: bool,
}

fn run_prepare(prepare: PrepareArgs) -> Result<(), u8> {
    let PrepareArgs {
        target,
        args,
        tags,
        no_tags,
        skip_argument_check,
        pretty,
    } = prepare;

    let snapshot = load(&target.snapshot)?;
    let args = match args {
        Some(path) => load_arguments(&path)?,
        None => Arguments::default(),
    };
    let options = CheckOptions::new()
        .skip_argument_check(skip_argument_check)
        .skip_return_check(tags.skip_return_check)
        .auto_include_identifier(!tags.no_auto_identifier);
    let request = (!no_tags).then(|| tags.request());

    match prepare_call(&snapshot, &target.element, args, request.as_ref(), &options) {
        Ok(prepared) => print_json(&prepared, pretty),
        Err(e) => {
            eprintln!("Error: {}", e);
            Err(e.exit_code() as u8)
        }
    }
}

fn run_shape(
    target: &ElementArgs,
    reduce: Reduction,
    required_only: bool,
    names: bool,
    pretty: bool,
) -> Result<(), u8> {
    let tree = build(target)?;
    let tree = match reduce {
        Reduction::None => tree,
        Reduction::Shallow => reduce_shallow(&tree),
        Reduction::Branch => reduce_branches(&tree),
    };

    if names {
        print_json(&tree.root().children_names(), pretty)
    } else {
        print_json(&Value::Object(tree.root().children_shape(required_only)), pretty)
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    if format == "json" {
        print_json(&result, true)?;
    } else {
        print_lint_text(&result, quiet);
    }

    if result.is_ok() {
        Ok(())
    } else {
        Err(1)
    }
}

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

fn print_lint_text(result: &LintResult, quiet: bool) {
    if !quiet {
        println!("Checking snapshots in {}\n", result.path.display());
    }

    for file in &result.results {
        let (color, mark) = match file.status {
            FileStatus::Ok => (GREEN, "ok"),
            FileStatus::Warning => (YELLOW, "warn"),
            FileStatus::Error => (RED, "FAIL"),
        };
        if !quiet || file.status != FileStatus::Ok {
            println!("{}{:>5}{} {}", color, mark, RESET, file.file.display());
        }

        for diag in &file.diagnostics {
            if quiet && diag.severity == Severity::Warning {
                continue;
            }
            let color = match diag.severity {
                Severity::Error => RED,
                Severity::Warning => YELLOW,
            };
            println!(
                "      {}{}{} {} {}",
                color, diag.code, RESET, diag.path, diag.message
            );
        }
    }

    println!();
    if result.is_ok() {
        println!(
            "{}{} snapshot file(s) clean{}",
            GREEN, result.files_checked, RESET
        );
    } else {
        println!(
            "{}{} of {} snapshot file(s) failed: {} error(s), {} warning(s){}",
            RED, result.failed, result.files_checked, result.errors, result.warnings, RESET
        );
    }
}
