//! Required-subset reduction for introspection output.
//!
//! Both passes return a pruned copy; the input tree is never touched.

use tracing::debug;

use crate::tree::{NodeKind, NodeRef, SchemaTree};

/// Keep only the root's required children.
///
/// Group wrappers at the root are looked through. Inside a kept choice every
/// branch survives, and one hop into group branches only required members
/// do. Kept leaves keep their whole subtree.
pub fn reduce_shallow(tree: &SchemaTree) -> SchemaTree {
    let mut keep = vec![true; tree.len()];
    shallow_filter(tree.root(), &mut keep);
    let reduced = tree.retain(&keep);
    debug!(
        element = tree.element(),
        before = tree.len(),
        after = reduced.len(),
        "shallow reduction"
    );
    reduced
}

fn shallow_filter(container: NodeRef<'_>, keep: &mut [bool]) {
    for child in container.children() {
        if !child.is_required() {
            keep[child.id().index()] = false;
            continue;
        }
        match child.kind() {
            NodeKind::Group => shallow_filter(child, keep),
            NodeKind::Choice => {
                for branch in child.children() {
                    if branch.kind() == NodeKind::Group {
                        for member in branch.children() {
                            keep[member.id().index()] = member.is_required();
                        }
                    }
                }
            }
            NodeKind::Leaf { .. } => {}
        }
    }
}

/// Prune everything that neither is required nor leads to something required.
///
/// Wrappers are always kept so the skeleton still shows where choices sit.
pub fn reduce_branches(tree: &SchemaTree) -> SchemaTree {
    let mut keep = vec![true; tree.len()];
    prune(tree.root(), &mut keep);
    let reduced = tree.retain(&keep);
    debug!(
        element = tree.element(),
        before = tree.len(),
        after = reduced.len(),
        "branch reduction"
    );
    reduced
}

/// Mark children to keep; returns whether a required leaf survives below `node`.
fn prune(node: NodeRef<'_>, keep: &mut [bool]) -> bool {
    let mut retained = false;
    for child in node.children() {
        let below = prune(child, keep);
        let required_leaf = child.is_required() && !child.is_wrapper();
        let kept = child.is_required() || child.is_wrapper() || below;
        keep[child.id().index()] = kept;
        retained |= kept && (below || required_leaf);
    }
    retained
}

/// Whether any descendant leaf of `node` is required.
pub fn has_required_descendant(node: NodeRef<'_>) -> bool {
    node.children().any(|child| {
        (child.is_required() && !child.is_wrapper()) || has_required_descendant(child)
    })
}

/// Deterministic default branch of a choice.
///
/// Prefers the first branch when it is a leaf and resolves a leading choice
/// recursively. A leading group gives way to the first later branch that is
/// not a group, falling back to the group itself.
pub fn first_alternative(choice: NodeRef<'_>) -> Option<NodeRef<'_>> {
    let mut branches = choice.children();
    let first = branches.next()?;
    match first.kind() {
        NodeKind::Leaf { .. } => Some(first),
        NodeKind::Choice => first_alternative(first),
        NodeKind::Group => match branches.find(|b| b.kind() != NodeKind::Group) {
            Some(other) if other.kind() == NodeKind::Choice => {
                first_alternative(other).or(Some(first))
            }
            Some(other) => Some(other),
            None => Some(first),
        },
    }
}
