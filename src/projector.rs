//! Returned-field projection.
//!
//! Turns a flat list of wanted tags into the nested `returnedTags` shape a
//! call expects: scalar fields map to `""`, complex fields expand to their
//! full default shape with every descendant leaf set to `true`.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::ProjectionError;
use crate::reducer::first_alternative;
use crate::tree::{NodeKind, NodeRef};
use crate::types::{CheckOptions, ReturnRequest, IDENTIFIER_FIELD, RETURNED_TAGS_FIELD};

/// Project `request` against the returned-fields tree below `node`.
///
/// An empty tag list requests every field at the (drilled) level, choosing
/// the first alternative at each choice point.
///
/// # Errors
///
/// Returns `ProjectionError` for unknown tags, conflicting choice tags, a
/// missing drill-down hop, or an element without returnable fields.
pub fn project(
    node: NodeRef<'_>,
    request: &ReturnRequest,
    options: &CheckOptions,
) -> Result<Map<String, Value>, ProjectionError> {
    let tags: Vec<&str> = request
        .tags
        .iter()
        .map(String::as_str)
        .filter(|t| *t != IDENTIFIER_FIELD)
        .collect();

    let mut fields: Map<String, Value> = if options.skip_return_check {
        debug!(element = %node.path(), "return-field check skipped");
        tags.iter()
            .map(|t| (t.to_string(), Value::String(String::new())))
            .collect()
    } else {
        let returned = node
            .find(RETURNED_TAGS_FIELD)
            .ok_or_else(|| ProjectionError::NoReturnableFields {
                element: node.path(),
            })?;

        let mut level = returned;
        for hop in &request.drill {
            level = level
                .get(hop)
                .ok_or_else(|| ProjectionError::DrillDownMissing {
                    hop: hop.clone(),
                    path: level.path(),
                })?;
        }
        if request.tags.is_empty() {
            project_all(level)
        } else {
            project_tags(level, &tags)?
        }
    };

    for hop in request.drill.iter().rev() {
        let mut outer = Map::new();
        outer.insert(hop.clone(), Value::Object(fields));
        fields = outer;
    }

    if options.auto_include_identifier || request.wants_identifier() {
        let mut with_id = Map::new();
        with_id.insert(IDENTIFIER_FIELD.to_string(), Value::String(String::new()));
        with_id.extend(fields);
        fields = with_id;
    }
    Ok(fields)
}

fn project_all(level: NodeRef<'_>) -> Map<String, Value> {
    default_members(level)
        .into_iter()
        .map(|member| (member.name().to_string(), marker(member)))
        .collect()
}

fn project_tags(level: NodeRef<'_>, tags: &[&str]) -> Result<Map<String, Value>, ProjectionError> {
    let mut fields = Map::new();
    for &tag in tags {
        trace!(tag, level = %level.path(), "projecting tag");
        if let Some(found) = find_direct(level, tag) {
            fields.insert(tag.to_string(), marker(found));
            continue;
        }

        let Some(found) = find_in_choices(level, tag) else {
            return Err(ProjectionError::UnknownTag {
                tag: tag.to_string(),
                path: level.path(),
                valid: level.leaf_names().into_iter().map(String::from).collect(),
            });
        };

        let rivals = rival_names(level, found);
        let conflicts: Vec<String> = tags
            .iter()
            .filter(|t| rivals.contains(*t))
            .map(|t| t.to_string())
            .collect();
        if !conflicts.is_empty() {
            let mut named = vec![tag.to_string()];
            named.extend(conflicts);
            return Err(ProjectionError::ChoiceTagConflict {
                path: level.path(),
                tags: named,
            });
        }
        fields.insert(tag.to_string(), marker(found));
    }
    Ok(fields)
}

/// Field named `tag` at this level, looking through group wrappers only.
fn find_direct<'a>(container: NodeRef<'a>, tag: &str) -> Option<NodeRef<'a>> {
    for child in container.children() {
        match child.kind() {
            NodeKind::Leaf { .. } if child.name() == tag => return Some(child),
            NodeKind::Group => {
                if let Some(found) = find_direct(child, tag) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

/// Locate `tag` inside a choice branch at this level.
fn find_in_choices<'a>(container: NodeRef<'a>, tag: &str) -> Option<NodeRef<'a>> {
    for child in container.children() {
        match child.kind() {
            NodeKind::Choice => {
                if let Some(found) = child.get(tag) {
                    return Some(found);
                }
            }
            NodeKind::Group => {
                if let Some(found) = find_in_choices(child, tag) {
                    return Some(found);
                }
            }
            NodeKind::Leaf { .. } => {}
        }
    }
    None
}

/// Names from every branch competing with `found`, at each choice between
/// `found` and `level`.
fn rival_names<'a>(level: NodeRef<'a>, found: NodeRef<'a>) -> Vec<&'a str> {
    let mut rivals = Vec::new();
    let mut branch = found;
    while let Some(parent) = branch.parent() {
        if parent == level {
            break;
        }
        if parent.kind() == NodeKind::Choice {
            rivals.extend(
                parent
                    .children()
                    .filter(|other| *other != branch)
                    .flat_map(branch_names),
            );
        }
        branch = parent;
    }
    rivals
}

fn branch_names(branch: NodeRef<'_>) -> Vec<&str> {
    if branch.is_wrapper() {
        branch.leaf_names()
    } else {
        vec![branch.name()]
    }
}

/// Fields projected when nothing specific is asked for.
fn default_members(container: NodeRef<'_>) -> Vec<NodeRef<'_>> {
    let mut members = Vec::new();
    for child in container.children() {
        match child.kind() {
            NodeKind::Leaf { .. } => members.push(child),
            NodeKind::Group => members.extend(default_members(child)),
            NodeKind::Choice => match first_alternative(child) {
                Some(branch) if branch.is_wrapper() => members.extend(default_members(branch)),
                Some(branch) => members.push(branch),
                None => {}
            },
        }
    }
    members
}

fn marker(node: NodeRef<'_>) -> Value {
    if node.is_complex() {
        Value::Object(full_shape(node))
    } else {
        Value::String(String::new())
    }
}

fn full_shape(node: NodeRef<'_>) -> Map<String, Value> {
    default_members(node)
        .into_iter()
        .map(|member| {
            let value = if member.is_complex() {
                Value::Object(full_shape(member))
            } else {
                Value::Bool(true)
            };
            (member.name().to_string(), value)
        })
        .collect()
}
