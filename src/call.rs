//! Call preparation: build, validate and project in one explicit step.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CallError;
use crate::projector::project;
use crate::tree::{SchemaProvider, SchemaTree};
use crate::types::{Arguments, CheckOptions, ReturnRequest};
use crate::validator::validate_call;

/// Validated arguments and projected returned fields for one call.
///
/// The arguments are passed through unchanged; a transport embeds both parts
/// into its outgoing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedCall {
    pub element: String,
    pub arguments: Map<String, Value>,
    #[serde(rename = "returnedTags", skip_serializing_if = "Option::is_none")]
    pub returned_tags: Option<Map<String, Value>>,
}

/// Prepare a call to `element`.
///
/// `request` is `None` for calls that return no field selection.
///
/// # Errors
///
/// Returns `CallError` wrapping the first lookup, argument or projection failure.
pub fn prepare_call<P>(
    provider: &P,
    element: &str,
    args: Arguments,
    request: Option<&ReturnRequest>,
    options: &CheckOptions,
) -> Result<PreparedCall, CallError>
where
    P: SchemaProvider + ?Sized,
{
    let tree = SchemaTree::build(provider, element)?;
    validate_call(&tree, &args, options)?;

    let returned_tags = request
        .map(|r| project(tree.root(), r, options))
        .transpose()?;

    debug!(element, with_tags = returned_tags.is_some(), "prepared call");
    Ok(PreparedCall {
        element: element.to_string(),
        arguments: args.named,
        returned_tags,
    })
}
