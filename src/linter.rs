//! Snapshot linting.
//!
//! Static checks over snapshot files, before anything builds trees from them:
//!
//! | Code | Severity | Meaning |
//! |------|----------|---------|
//! | E001 | error | file is not valid JSON |
//! | E002 | error | document breaks the snapshot format |
//! | E003 | error | two siblings share a name |
//! | E004 | error | choice without branches |
//! | W001 | warning | leaf has children but is not marked complex |
//! | W002 | warning | leaf is marked complex but has no children |
//! | W003 | warning | name repeats once wrappers are flattened, shadowing lookups |

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::loader::{check_snapshot, load_json};
use crate::types::{RawKind, RawNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding inside a snapshot file.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// Element the finding belongs to; empty for file-level findings.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub element: String,
    /// JSON Pointer into the file (e.g., "/getPhone/children/0").
    pub path: String,
    pub message: String,
}

/// Outcome for one file, ordered by badness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Warning,
    Error,
}

impl FileStatus {
    fn of(diagnostics: &[Diagnostic]) -> Self {
        diagnostics
            .iter()
            .map(|d| match d.severity {
                Severity::Error => FileStatus::Error,
                Severity::Warning => FileStatus::Warning,
            })
            .max()
            .unwrap_or(FileStatus::Ok)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Whether this file fails the run.
    fn fails(&self, strict: bool) -> bool {
        match self.status {
            FileStatus::Ok => false,
            FileStatus::Warning => strict,
            FileStatus::Error => true,
        }
    }
}

/// Totals over every file linted in one run.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub strict: bool,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// True when no file failed; in strict mode warnings fail too.
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Lint one snapshot file, or every `.json` file below a directory.
pub fn lint(path: &Path, strict: bool) -> LintResult {
    let results: Vec<FileResult> = snapshot_files(path)
        .iter()
        .map(|file| lint_file(file, path))
        .collect();

    let failed = results.iter().filter(|r| r.fails(strict)).count();
    let summary = LintResult {
        path: path.to_path_buf(),
        strict,
        files_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors: results.iter().map(|r| r.count(Severity::Error)).sum(),
        warnings: results.iter().map(|r| r.count(Severity::Warning)).sum(),
        results,
    };
    debug!(
        path = %path.display(),
        files = summary.files_checked,
        failed = summary.failed,
        "lint finished"
    );
    summary
}

/// Lint a single snapshot file; `base` only shortens the reported file name.
pub fn lint_file(file: &Path, base: &Path) -> FileResult {
    let mut checker = Checker::default();

    match load_json(file) {
        Err(e) => checker.error("E001", "", "/", format!("syntax error: {}", e)),
        Ok(document) => checker.document(&document),
    }

    let shown = file
        .strip_prefix(base)
        .ok()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(file);
    FileResult {
        file: shown.to_path_buf(),
        status: FileStatus::of(&checker.diagnostics),
        diagnostics: checker.diagnostics,
    }
}

#[derive(Default)]
struct Checker {
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    fn error(&mut self, code: &'static str, element: &str, path: &str, message: String) {
        self.push(Severity::Error, code, element, path, message);
    }

    fn warning(&mut self, code: &'static str, element: &str, path: &str, message: String) {
        self.push(Severity::Warning, code, element, path, message);
    }

    fn push(
        &mut self,
        severity: Severity,
        code: &'static str,
        element: &str,
        path: &str,
        message: String,
    ) {
        self.diagnostics.push(Diagnostic {
            severity,
            code,
            element: element.to_string(),
            path: path.to_string(),
            message,
        });
    }

    fn document(&mut self, document: &Value) {
        let issues = check_snapshot(document);
        if !issues.is_empty() {
            for issue in issues {
                self.error("E002", "", &issue.path, issue.message);
            }
            return;
        }

        // Structure is sound here, so every element deserializes.
        let Value::Object(elements) = document else {
            return;
        };
        for (element, node) in elements {
            if let Ok(raw) = serde_json::from_value::<RawNode>(node.clone()) {
                let path = format!("/{}", escape(element));
                if raw.kind != RawKind::Leaf {
                    self.shadowing(element, &raw, &path);
                }
                self.node(element, &raw, &path);
            }
        }
    }

    fn node(&mut self, element: &str, node: &RawNode, path: &str) {
        match node.kind {
            RawKind::Choice if node.children.is_empty() => {
                self.error("E004", element, path, "choice has no branches".to_string());
            }
            RawKind::Leaf if !node.complex && !node.children.is_empty() => self.warning(
                "W001",
                element,
                path,
                format!("leaf '{}' has children but is not marked complex", node.name),
            ),
            RawKind::Leaf if node.complex && node.children.is_empty() => self.warning(
                "W002",
                element,
                path,
                format!("leaf '{}' is marked complex but has no children", node.name),
            ),
            _ => {}
        }
        if node.kind == RawKind::Leaf {
            self.shadowing(element, node, path);
        }

        let mut names = HashSet::new();
        for (i, child) in node.children.iter().enumerate() {
            let child_path = format!("{}/children/{}", path, i);
            if !child.name.is_empty() && !names.insert(child.name.as_str()) {
                self.error(
                    "E003",
                    element,
                    &child_path,
                    format!("duplicate sibling name '{}'", child.name),
                );
            }
            self.node(element, child, &child_path);
        }
    }

    /// Names that meet once wrapper children are flattened into `container`.
    ///
    /// Duplicates under the same parent are already E003.
    fn shadowing(&mut self, element: &str, container: &RawNode, path: &str) {
        let mut reachable = Vec::new();
        flatten(container, path, &mut reachable);

        let mut first: HashMap<&str, &str> = HashMap::new();
        for entry in &reachable {
            match first.get(entry.name) {
                None => {
                    first.insert(entry.name, &entry.parent);
                }
                Some(parent) if *parent == entry.parent => {}
                Some(_) => self.warning(
                    "W003",
                    element,
                    &entry.pointer,
                    format!(
                        "'{}' is shadowed by an earlier field of the same name",
                        entry.name
                    ),
                ),
            }
        }
    }
}

struct Reachable<'a> {
    name: &'a str,
    parent: String,
    pointer: String,
}

/// Named children of `node`, looking through wrapper children.
fn flatten<'a>(node: &'a RawNode, path: &str, out: &mut Vec<Reachable<'a>>) {
    for (i, child) in node.children.iter().enumerate() {
        let pointer = format!("{}/children/{}", path, i);
        if !child.name.is_empty() {
            out.push(Reachable {
                name: &child.name,
                parent: path.to_string(),
                pointer: pointer.clone(),
            });
        }
        if child.kind != RawKind::Leaf {
            flatten(child, &pointer, out);
        }
    }
}

/// JSON Pointer escaping for element names.
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

/// `.json` files at or below `path`, sorted.
fn snapshot_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_json(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let entry = entry.path();
            if entry.is_dir() {
                pending.push(entry);
            } else if is_json(&entry) {
                files.push(entry);
            }
        }
    }
    files.sort();
    files
}
