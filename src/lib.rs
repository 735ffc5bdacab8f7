//! Call Schema
//!
//! Structural argument validation and returned-field projection against
//! nested schema trees made of leaves, ordered groups and choices.
//!
//! A calling layer builds a [`SchemaTree`] for the element it is about to
//! call, validates the caller's named arguments, projects the caller's wanted
//! fields into the nested `returnedTags` shape, and hands both to its
//! transport. [`prepare_call`] does all three in one step.
//!
//! # Example
//!
//! ```
//! use call_schema::{project, validate, CheckOptions, RawNode, ReturnRequest, SchemaTree};
//! use serde_json::json;
//!
//! let raw = RawNode::complex(
//!     "getPhone",
//!     vec![
//!         RawNode::choice(vec![RawNode::leaf("name"), RawNode::leaf("uuid")]),
//!         RawNode::complex(
//!             "returnedTags",
//!             vec![RawNode::leaf("name"), RawNode::leaf("model").optional()],
//!         ),
//!     ],
//! );
//! let tree = SchemaTree::from_raw("getPhone", &raw);
//!
//! let args = json!({ "name": "SEP001122334455" });
//! validate(tree.root(), args.as_object().unwrap()).unwrap();
//!
//! let both = json!({ "name": "SEP001122334455", "uuid": "{...}" });
//! assert!(validate(tree.root(), both.as_object().unwrap()).is_err());
//!
//! let request = ReturnRequest::new().tags(["model"]);
//! let tags = project(tree.root(), &request, &CheckOptions::new()).unwrap();
//! assert_eq!(serde_json::Value::Object(tags), json!({ "uuid": "", "model": "" }));
//! ```
//!
//! # Node kinds
//!
//! | Kind | Arguments | Projection |
//! |------|-----------|------------|
//! | Leaf (scalar) | scalar or list | `""` marker |
//! | Leaf (complex) | nested object or list of objects | full nested shape |
//! | Group | members looked up transparently | members projected transparently |
//! | Choice | exactly one branch | one branch; first alternative by default |

mod call;
mod error;
mod linter;
mod loader;
mod projector;
mod reducer;
mod tree;
mod types;
mod validator;

pub use call::{prepare_call, PreparedCall};
pub use error::{ArgumentError, CallError, LoadError, ProjectionError, SnapshotIssue, TreeError};
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity};
pub use loader::{
    check_snapshot, load_json, load_snapshot, load_snapshot_auto, load_snapshot_str,
    snapshot_from_value, snapshot_schema, Snapshot,
};
pub use projector::project;
pub use reducer::{first_alternative, has_required_descendant, reduce_branches, reduce_shallow};
pub use tree::{NodeId, NodeKind, NodeRef, SchemaProvider, SchemaTree};
pub use types::{
    json_type_name, Arguments, CheckOptions, RawKind, RawNode, ReturnRequest, IDENTIFIER_FIELD,
    RETURNED_TAGS_FIELD,
};
pub use validator::{validate, validate_call};

#[cfg(feature = "remote")]
pub use loader::load_snapshot_url;
