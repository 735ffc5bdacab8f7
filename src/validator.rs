//! Argument validation against a schema tree.
//!
//! Only structure is checked: unknown names, scalar vs nested vs list shape,
//! and choice exclusivity. Leaf value types and omitted required leaves are
//! left to the remote side.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::ArgumentError;
use crate::tree::{NodeKind, NodeRef, SchemaTree};
use crate::types::{Arguments, CheckOptions};

/// Validate the arguments of one call against `tree`.
///
/// Honours `options.skip_argument_check`. Positional arguments are always
/// rejected when checking is on.
///
/// # Errors
///
/// Returns the first `ArgumentError` encountered.
pub fn validate_call(
    tree: &SchemaTree,
    args: &Arguments,
    options: &CheckOptions,
) -> Result<(), ArgumentError> {
    if options.skip_argument_check {
        debug!(element = tree.element(), "argument check skipped");
        return Ok(());
    }
    if !args.positional.is_empty() {
        return Err(ArgumentError::UnsupportedPositionalArgument { index: 0 });
    }
    validate(tree.root(), &args.named)
}

/// Validate named arguments supplied at `node`.
///
/// # Errors
///
/// Returns the first `ArgumentError` encountered; validation never batches.
pub fn validate(node: NodeRef<'_>, args: &Map<String, Value>) -> Result<(), ArgumentError> {
    trace!(path = %node.path(), fields = args.len(), "validating arguments");
    validate_entries(node, args)?;
    match node.kind() {
        NodeKind::Choice => check_choice(node, args),
        NodeKind::Group | NodeKind::Leaf { .. } => check_choices(node, args),
    }
}

fn validate_entries(container: NodeRef<'_>, args: &Map<String, Value>) -> Result<(), ArgumentError> {
    for (name, value) in args {
        let Some(child) = container.get(name) else {
            return Err(ArgumentError::UnknownField {
                path: container.field_path(name),
                field: name.clone(),
                accepted: container.children_names(),
            });
        };

        match value {
            Value::Object(nested) => validate_nested(child, nested)?,
            Value::Array(items) => {
                // Non-object items (and empty lists) fall back to defaults.
                for item in items {
                    if let Value::Object(nested) = item {
                        validate_nested(child, nested)?;
                    }
                }
            }
            _ => {
                if child.is_complex() {
                    return Err(ArgumentError::DrillDownRequired {
                        path: child.path(),
                        accepted: child.children_names(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn validate_nested(child: NodeRef<'_>, nested: &Map<String, Value>) -> Result<(), ArgumentError> {
    if !child.is_complex() {
        return Err(ArgumentError::ScalarExpected { path: child.path() });
    }
    validate(child, nested)
}

/// Check every choice reachable from `container` through group wrappers.
///
/// An optional group the caller left untouched is skipped with everything in it.
fn check_choices(container: NodeRef<'_>, args: &Map<String, Value>) -> Result<(), ArgumentError> {
    for child in container.children() {
        match child.kind() {
            NodeKind::Choice => check_choice(child, args)?,
            NodeKind::Group if !child.is_required() && !branch_selected(child, args) => {}
            NodeKind::Group => check_choices(child, args)?,
            NodeKind::Leaf { .. } => {}
        }
    }
    Ok(())
}

/// Exactly one branch of `choice` must be touched by the supplied names.
///
/// A branch counts once however many of its members are supplied. An
/// optional choice may also be left untouched.
fn check_choice(choice: NodeRef<'_>, args: &Map<String, Value>) -> Result<(), ArgumentError> {
    let selected: Vec<NodeRef<'_>> = choice
        .children()
        .filter(|branch| branch_selected(*branch, args))
        .collect();

    match selected.as_slice() {
        [branch] => match branch.kind() {
            NodeKind::Group => check_choices(*branch, args),
            NodeKind::Choice => check_choice(*branch, args),
            NodeKind::Leaf { .. } => Ok(()),
        },
        [] if !choice.is_required() => Ok(()),
        _ => Err(ArgumentError::AmbiguousChoice {
            path: choice.path(),
            options: choice.children_names(),
        }),
    }
}

fn branch_selected(branch: NodeRef<'_>, args: &Map<String, Value>) -> bool {
    if args.contains_key(branch.name()) {
        return true;
    }
    branch.is_wrapper()
        && branch
            .member_names()
            .into_iter()
            .any(|name| args.contains_key(name))
}
