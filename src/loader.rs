//! Schema snapshot loading from various sources.
//!
//! A snapshot is a JSON object mapping element names to raw node
//! descriptions. It is the bundled [`SchemaProvider`] used by the CLI.
//! Snapshots are checked against an embedded JSON Schema before they are
//! deserialized so that every structural problem is reported with its path.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{LoadError, SnapshotIssue};
use crate::tree::SchemaProvider;
use crate::types::RawNode;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// In-memory set of raw element descriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    elements: BTreeMap<String, RawNode>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the description of `element`.
    pub fn insert(&mut self, element: impl Into<String>, node: RawNode) -> Option<RawNode> {
        self.elements.insert(element.into(), node)
    }

    /// Element names in sorted order.
    pub fn element_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl SchemaProvider for Snapshot {
    fn lookup(&self, element: &str) -> Option<&RawNode> {
        self.elements.get(element)
    }
}

/// JSON Schema every snapshot document must satisfy.
pub fn snapshot_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "additionalProperties": { "$ref": "#/$defs/node" },
        "$defs": {
            "node": {
                "type": "object",
                "required": ["kind"],
                "properties": {
                    "kind": { "enum": ["leaf", "group", "choice"] },
                    "name": { "type": "string" },
                    "required": { "type": "boolean" },
                    "complex": { "type": "boolean" },
                    "children": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/node" }
                    }
                },
                "additionalProperties": false,
                "if": { "properties": { "kind": { "const": "leaf" } } },
                "then": {
                    "required": ["name"],
                    "properties": { "name": { "minLength": 1 } }
                }
            }
        }
    })
}

/// Check a parsed document against [`snapshot_schema`].
///
/// Returns every violation found; an empty list means the document is a
/// well-formed snapshot.
pub fn check_snapshot(document: &Value) -> Vec<SnapshotIssue> {
    let validator = match jsonschema::validator_for(&snapshot_schema()) {
        Ok(v) => v,
        Err(e) => {
            return vec![SnapshotIssue {
                path: "/".to_string(),
                message: format!("snapshot schema unusable: {}", e),
            }]
        }
    };

    validator
        .iter_errors(document)
        .map(|e| SnapshotIssue {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect()
}

/// Turn a parsed document into a snapshot.
///
/// # Errors
///
/// Returns `LoadError::InvalidSnapshot` listing every structural problem.
pub fn snapshot_from_value(document: Value) -> Result<Snapshot, LoadError> {
    let issues = check_snapshot(&document);
    if !issues.is_empty() {
        return Err(LoadError::InvalidSnapshot { issues });
    }
    let snapshot: Snapshot =
        serde_json::from_value(document).map_err(|source| LoadError::InvalidJson { source })?;
    debug!(elements = snapshot.len(), "loaded schema snapshot");
    Ok(snapshot)
}

/// Load a snapshot from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::InvalidJson` if the file isn't valid JSON, or
/// `LoadError::InvalidSnapshot` if it isn't a well-formed snapshot.
pub fn load_snapshot(path: &Path) -> Result<Snapshot, LoadError> {
    snapshot_from_value(load_json(path)?)
}

/// Read and parse a JSON file without any snapshot checks.
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

    serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
}

/// Load a snapshot from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't valid JSON, or
/// `LoadError::InvalidSnapshot` if it isn't a well-formed snapshot.
pub fn load_snapshot_str(content: &str) -> Result<Snapshot, LoadError> {
    let document: Value =
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })?;
    snapshot_from_value(document)
}

/// Load a snapshot from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or the same
/// parse errors as [`load_snapshot_str`].
#[cfg(feature = "remote")]
pub fn load_snapshot_url(url: &str) -> Result<Snapshot, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let document: Value = response.json().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;
    snapshot_from_value(document)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a snapshot from a file path or URL.
///
/// URL loading requires the `remote` feature.
pub fn load_snapshot_auto(source: &str) -> Result<Snapshot, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_snapshot_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_snapshot(Path::new(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PHONE: &str = r#"{
        "getPhone": {
            "kind": "leaf",
            "name": "getPhone",
            "complex": true,
            "children": [
                { "kind": "choice", "children": [
                    { "kind": "leaf", "name": "name" },
                    { "kind": "leaf", "name": "uuid" }
                ]}
            ]
        }
    }"#;

    #[test]
    fn load_snapshot_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", PHONE).unwrap();

        let snapshot = load_snapshot(file.path()).unwrap();
        assert!(snapshot.lookup("getPhone").is_some());
        assert!(snapshot.lookup("addPhone").is_none());
    }

    #[test]
    fn load_snapshot_file_not_found() {
        let result = load_snapshot(Path::new("/nonexistent/snapshot.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_snapshot_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let result = load_snapshot(file.path());
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_snapshot_str_valid() {
        let snapshot = load_snapshot_str(PHONE).unwrap();
        assert_eq!(snapshot.element_names().collect::<Vec<_>>(), vec!["getPhone"]);
    }

    #[test]
    fn unknown_kind_is_reported_with_path() {
        let result = load_snapshot_str(r#"{"getPhone": {"kind": "widget", "name": "getPhone"}}"#);
        match result {
            Err(LoadError::InvalidSnapshot { issues }) => {
                assert!(issues.iter().any(|i| i.path == "/getPhone/kind"));
            }
            other => panic!("expected InvalidSnapshot, got {:?}", other),
        }
    }

    #[test]
    fn leaf_without_name_is_rejected() {
        let issues = check_snapshot(&json!({
            "getPhone": { "kind": "leaf", "name": "getPhone", "children": [{ "kind": "leaf" }] }
        }));
        assert!(issues.iter().any(|i| i.path == "/getPhone/children/0"));
    }

    #[test]
    fn anonymous_wrappers_are_accepted() {
        let issues = check_snapshot(&json!({
            "x": { "kind": "group", "children": [{ "kind": "choice", "required": false }] }
        }));
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/snapshot.json"));
        assert!(is_url("http://example.com/snapshot.json"));
        assert!(!is_url("./snapshot.json"));
    }

    #[test]
    fn load_snapshot_auto_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", PHONE).unwrap();

        let snapshot = load_snapshot_auto(file.path().to_str().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_snapshot_url_valid() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/snapshot.json")
                .with_status(200)
                .with_header("content-type", "application/json")
                .with_body(PHONE)
                .create();

            let snapshot = load_snapshot_url(&format!("{}/snapshot.json", server.url())).unwrap();
            assert!(snapshot.lookup("getPhone").is_some());
            mock.assert();
        }

        #[test]
        fn load_snapshot_url_404() {
            let mut server = mockito::Server::new();
            let _mock = server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_snapshot_url(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
        }
    }
}
