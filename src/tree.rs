//! Schema tree - immutable arena of leaf, group and choice nodes.
//!
//! A tree is built once per named schema element from the raw description a
//! [`SchemaProvider`] hands over. Children are owned top-down by the arena;
//! parent links are plain [`NodeId`] indices used for path reconstruction.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::TreeError;
use crate::types::{RawKind, RawNode, CHOICE_LABEL, GROUP_LABEL};

/// Source of raw schema descriptions, keyed by element name.
pub trait SchemaProvider {
    /// Raw description of `element`, or `None` if the provider has no such element.
    fn lookup(&self, element: &str) -> Option<&RawNode>;
}

/// Index of a node inside its [`SchemaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Named field; `complex` when it carries nested structure.
    Leaf { complex: bool },
    /// Ordered collection of independently required children.
    Group,
    /// Mutually exclusive branches; exactly one must be picked.
    Choice,
}

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    kind: NodeKind,
    required: bool,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

/// Immutable schema tree for one element.
#[derive(Debug, Clone)]
pub struct SchemaTree {
    element: String,
    nodes: Vec<NodeData>,
}

impl SchemaTree {
    /// Build the tree for `element` from `provider`.
    ///
    /// # Errors
    ///
    /// Returns `TreeError::SchemaLookupFailure` if the provider doesn't know the element.
    pub fn build<P>(provider: &P, element: &str) -> Result<Self, TreeError>
    where
        P: SchemaProvider + ?Sized,
    {
        let raw = provider
            .lookup(element)
            .ok_or_else(|| TreeError::SchemaLookupFailure {
                element: element.to_string(),
            })?;
        let tree = Self::from_raw(element, raw);
        debug!(element, nodes = tree.len(), "built schema tree");
        Ok(tree)
    }

    /// Build a tree directly from a raw root description.
    ///
    /// The root takes its declared name, or `element` if it has none.
    pub fn from_raw(element: &str, raw: &RawNode) -> Self {
        let mut tree = Self {
            element: element.to_string(),
            nodes: Vec::new(),
        };
        let name = if raw.name.is_empty() {
            element.to_string()
        } else {
            raw.name.clone()
        };
        tree.insert(raw, name, None);
        tree
    }

    fn insert(&mut self, raw: &RawNode, name: String, parent: Option<NodeId>) -> NodeId {
        let under_choice = parent
            .map(|p| self.nodes[p.0].kind == NodeKind::Choice)
            .unwrap_or(false);
        let kind = match raw.kind {
            RawKind::Leaf => NodeKind::Leaf {
                complex: raw.complex || !raw.children.is_empty(),
            },
            RawKind::Group => NodeKind::Group,
            RawKind::Choice => NodeKind::Choice,
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name,
            kind,
            required: raw.required && !under_choice,
            children: Vec::with_capacity(raw.children.len()),
            parent,
        });

        for (child, child_name) in raw.children.iter().zip(sibling_names(&raw.children)) {
            let child_id = self.insert(child, child_name, Some(id));
            self.nodes[id.0].children.push(child_id);
        }
        id
    }

    /// Copy the tree, keeping only nodes whose `keep` flag is set.
    ///
    /// A dropped node takes its whole subtree with it. The root is always kept.
    pub(crate) fn retain(&self, keep: &[bool]) -> Self {
        let mut out = Self {
            element: self.element.clone(),
            nodes: Vec::with_capacity(self.nodes.len()),
        };
        out.copy_from(self, NodeId(0), None, keep);
        out
    }

    fn copy_from(
        &mut self,
        src: &SchemaTree,
        id: NodeId,
        parent: Option<NodeId>,
        keep: &[bool],
    ) -> NodeId {
        let data = &src.nodes[id.0];
        let new_id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            name: data.name.clone(),
            kind: data.kind,
            required: data.required,
            children: Vec::new(),
            parent,
        });
        for &child in &data.children {
            if keep[child.0] {
                let copied = self.copy_from(src, child, Some(new_id), keep);
                self.nodes[new_id.0].children.push(copied);
            }
        }
        new_id
    }

    /// Element name this tree was built for.
    pub fn element(&self) -> &str {
        &self.element
    }

    /// The element's own node.
    pub fn root(&self) -> NodeRef<'_> {
        self.node(NodeId(0))
    }

    /// View of the node at `id`; panics if `id` comes from another tree.
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    /// Number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Display names for one sibling list.
///
/// Anonymous wrappers are labelled `[group]`/`[choice]`, numbered in
/// encounter order when several of the same kind share a level.
fn sibling_names(children: &[RawNode]) -> Vec<String> {
    let anonymous = |kind: RawKind| {
        children
            .iter()
            .filter(|c| c.kind == kind && c.name.is_empty())
            .count()
    };
    let groups = anonymous(RawKind::Group);
    let choices = anonymous(RawKind::Choice);

    let mut group_seq = 0;
    let mut choice_seq = 0;
    children
        .iter()
        .map(|child| {
            if !child.name.is_empty() || child.kind == RawKind::Leaf {
                return child.name.clone();
            }
            let (label, total, seq) = match child.kind {
                RawKind::Choice => (CHOICE_LABEL, choices, &mut choice_seq),
                _ => (GROUP_LABEL, groups, &mut group_seq),
            };
            *seq += 1;
            if total > 1 {
                format!("[{}{}]", label, seq)
            } else {
                format!("[{}]", label)
            }
        })
        .collect()
}

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a SchemaTree,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'a> NodeRef<'a> {
    fn data(&self) -> &'a NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a SchemaTree {
        self.tree
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn kind(&self) -> NodeKind {
        self.data().kind
    }

    /// Effective required flag (always false directly under a choice).
    pub fn is_required(&self) -> bool {
        self.data().required
    }

    /// True for group and choice wrappers.
    pub fn is_wrapper(&self) -> bool {
        matches!(self.kind(), NodeKind::Group | NodeKind::Choice)
    }

    /// True when the node accepts nested values: complex leaves and wrappers.
    pub fn is_complex(&self) -> bool {
        match self.kind() {
            NodeKind::Leaf { complex } => complex,
            NodeKind::Group | NodeKind::Choice => true,
        }
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| tree.node(id))
    }

    /// Dotted path from the root, skipping wrapper names.
    pub fn path(&self) -> String {
        let mut names = Vec::new();
        let mut current = Some(*self);
        while let Some(node) = current {
            if !node.is_wrapper() || node.parent().is_none() {
                names.push(node.name());
            }
            current = node.parent();
        }
        names.reverse();
        names.join(".")
    }

    /// Dotted path of a named field directly below this node.
    pub fn field_path(&self, field: &str) -> String {
        format!("{}.{}", self.path(), field)
    }

    /// First descendant named `name`, depth first.
    pub fn find(&self, name: &str) -> Option<NodeRef<'a>> {
        for child in self.children() {
            if child.name() == name {
                return Some(child);
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Child named `name`, looking through wrapper children but never into
    /// a leaf's own structure.
    pub fn get(&self, name: &str) -> Option<NodeRef<'a>> {
        for child in self.children() {
            if child.name() == name {
                return Some(child);
            }
            if child.is_wrapper() {
                if let Some(found) = child.get(name) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Display names of the children; choices as `(a | b)`, groups as `[a + b]`.
    pub fn children_names(&self) -> Vec<String> {
        self.children().map(|c| c.display_name()).collect()
    }

    /// Name as shown in diagnostics, with wrappers expanded.
    pub fn display_name(&self) -> String {
        match self.kind() {
            NodeKind::Leaf { .. } => self.name().to_string(),
            NodeKind::Choice => format!("({})", self.children_names().join(" | ")),
            NodeKind::Group => format!("[{}]", self.children_names().join(" + ")),
        }
    }

    /// Every name reachable through wrapper children, wrapper names included.
    pub fn member_names(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        for child in self.children() {
            names.push(child.name());
            if child.is_wrapper() {
                names.extend(child.member_names());
            }
        }
        names
    }

    /// Leaf names reachable through wrapper children, across every branch.
    pub fn leaf_names(&self) -> Vec<&'a str> {
        let mut names = Vec::new();
        for child in self.children() {
            if child.is_wrapper() {
                names.extend(child.leaf_names());
            } else {
                names.push(child.name());
            }
        }
        names
    }

    /// Accepted argument surface as a nested mapping.
    ///
    /// Scalar leaves map to `"(required)"` or `""`, complex leaves to their
    /// own shape. Wrappers are flattened into the enclosing level.
    pub fn children_shape(&self, required_only: bool) -> Map<String, Value> {
        let mut shape = Map::new();
        self.fill_shape(&mut shape, required_only);
        shape
    }

    fn fill_shape(&self, shape: &mut Map<String, Value>, required_only: bool) {
        for child in self.children() {
            match child.kind() {
                NodeKind::Group | NodeKind::Choice => child.fill_shape(shape, required_only),
                NodeKind::Leaf { complex } => {
                    if required_only && !child.is_required() {
                        continue;
                    }
                    let value = if complex {
                        Value::Object(child.children_shape(required_only))
                    } else if child.is_required() {
                        Value::String("(required)".to_string())
                    } else {
                        Value::String(String::new())
                    };
                    shape.insert(child.name().to_string(), value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phone() -> RawNode {
        RawNode::complex(
            "addPhone",
            vec![
                RawNode::leaf("name"),
                RawNode::leaf("description").optional(),
                RawNode::choice(vec![RawNode::leaf("product"), RawNode::leaf("model")]),
                RawNode::complex(
                    "lines",
                    vec![RawNode::complex(
                        "line",
                        vec![RawNode::leaf("index"), RawNode::leaf("label").optional()],
                    )
                    .optional()],
                )
                .optional(),
            ],
        )
    }

    #[test]
    fn build_unknown_element_fails() {
        let provider = crate::loader::Snapshot::new();
        let result = SchemaTree::build(&provider, "addPhone");
        assert!(matches!(
            result,
            Err(TreeError::SchemaLookupFailure { element }) if element == "addPhone"
        ));
    }

    #[test]
    fn root_has_no_parent() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        assert!(tree.root().parent().is_none());
        assert_eq!(tree.root().name(), "addPhone");
        assert_eq!(tree.element(), "addPhone");
    }

    #[test]
    fn node_ids_index_the_arena() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        assert_eq!(tree.root().id().index(), 0);
        for child in tree.root().children() {
            assert!(child.id().index() < tree.len());
            assert_eq!(tree.node(child.id()), child);
        }
    }

    #[test]
    fn unnamed_root_takes_element_name() {
        let tree = SchemaTree::from_raw("listPhone", &RawNode::group(vec![RawNode::leaf("a")]));
        assert_eq!(tree.root().name(), "listPhone");
        assert_eq!(tree.root().path(), "listPhone");
    }

    #[test]
    fn choice_children_are_never_required() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        let product = tree.root().get("product").unwrap();
        assert!(!product.is_required());
        assert!(tree.root().get("name").unwrap().is_required());
        assert!(tree.root().get("[choice]").unwrap().is_required());
    }

    #[test]
    fn group_inside_choice_keeps_member_flags() {
        let raw = RawNode::group(vec![RawNode::choice(vec![
            RawNode::group(vec![RawNode::leaf("a"), RawNode::leaf("b").optional()]),
            RawNode::leaf("c"),
        ])]);
        let tree = SchemaTree::from_raw("x", &raw);
        let group = tree.root().get("[group]").unwrap();
        assert!(!group.is_required());
        assert!(tree.root().get("a").unwrap().is_required());
        assert!(!tree.root().get("b").unwrap().is_required());
    }

    #[test]
    fn wrapper_siblings_are_numbered() {
        let raw = RawNode::group(vec![
            RawNode::choice(vec![RawNode::leaf("a"), RawNode::leaf("b")]),
            RawNode::group(vec![RawNode::leaf("c")]),
            RawNode::choice(vec![RawNode::leaf("d"), RawNode::leaf("e")]),
        ]);
        let tree = SchemaTree::from_raw("x", &raw);
        let names: Vec<_> = tree.root().children().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["[choice1]", "[group]", "[choice2]"]);
    }

    #[test]
    fn find_searches_depth_first() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        let index = tree.root().find("index").unwrap();
        assert_eq!(index.path(), "addPhone.lines.line.index");
        assert!(tree.root().find("missing").is_none());
    }

    #[test]
    fn get_is_shallow_but_sees_through_wrappers() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        let root = tree.root();
        assert!(root.get("model").is_some());
        assert!(root.get("lines").is_some());
        assert!(root.get("line").is_none());
        assert!(root.get("index").is_none());
    }

    #[test]
    fn children_names_render_wrappers() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        assert_eq!(
            tree.root().children_names(),
            vec!["name", "description", "(product | model)", "lines"]
        );

        let raw = RawNode::group(vec![RawNode::choice(vec![
            RawNode::group(vec![RawNode::leaf("a"), RawNode::leaf("b")]),
            RawNode::leaf("c"),
        ])]);
        let tree = SchemaTree::from_raw("x", &raw);
        assert_eq!(tree.root().children_names(), vec!["([a + b] | c)"]);
    }

    #[test]
    fn children_shape_full_and_required() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        assert_eq!(
            Value::Object(tree.root().children_shape(false)),
            json!({
                "name": "(required)",
                "description": "",
                "product": "",
                "model": "",
                "lines": { "line": { "index": "(required)", "label": "" } }
            })
        );
        assert_eq!(
            Value::Object(tree.root().children_shape(true)),
            json!({ "name": "(required)" })
        );
    }

    #[test]
    fn path_skips_wrappers() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        let model = tree.root().get("model").unwrap();
        assert_eq!(model.path(), "addPhone.model");
        assert_eq!(model.parent().unwrap().name(), "[choice]");
    }

    #[test]
    fn leaf_and_member_names() {
        let tree = SchemaTree::from_raw("addPhone", &phone());
        assert_eq!(
            tree.root().leaf_names(),
            vec!["name", "description", "product", "model", "lines"]
        );
        assert!(tree.root().member_names().contains(&"[choice]"));
    }
}
