//! Core types shared by the tree builder, validator and projector.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the sub-element listing the fields a call can return.
pub const RETURNED_TAGS_FIELD: &str = "returnedTags";

/// Identifier field handled outside the returned-fields tree.
pub const IDENTIFIER_FIELD: &str = "uuid";

/// Display name for anonymous group wrappers.
pub const GROUP_LABEL: &str = "group";

/// Display name for anonymous choice wrappers.
pub const CHOICE_LABEL: &str = "choice";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Kind discriminant of a raw provider node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawKind {
    Leaf,
    Group,
    Choice,
}

/// Raw schema description as handed over by a schema provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    pub kind: RawKind,
    /// Declared name. Anonymous group/choice wrappers leave this empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Declared required flag (minimum occurrence of one or more).
    #[serde(default = "default_required")]
    pub required: bool,
    /// Whether a leaf has further structure.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub complex: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RawNode>,
}

fn default_required() -> bool {
    true
}

impl RawNode {
    /// Required scalar leaf.
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            kind: RawKind::Leaf,
            name: name.into(),
            required: true,
            complex: false,
            children: Vec::new(),
        }
    }

    /// Required complex leaf with the given children.
    pub fn complex(name: impl Into<String>, children: Vec<RawNode>) -> Self {
        Self {
            complex: true,
            children,
            ..Self::leaf(name)
        }
    }

    /// Anonymous required group wrapper.
    pub fn group(children: Vec<RawNode>) -> Self {
        Self {
            kind: RawKind::Group,
            name: String::new(),
            required: true,
            complex: false,
            children,
        }
    }

    /// Anonymous required choice wrapper.
    pub fn choice(children: Vec<RawNode>) -> Self {
        Self {
            kind: RawKind::Choice,
            ..Self::group(children)
        }
    }

    /// Mark this node optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Per-call checking switches.
///
/// Passed explicitly into every validate/project call so that toggling
/// them between calls never leaks into a call already in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOptions {
    /// Accept any argument shape without walking the schema tree.
    pub skip_argument_check: bool,
    /// Pass requested tags through without walking the schema tree.
    pub skip_return_check: bool,
    /// Add the identifier field to every projection.
    pub auto_include_identifier: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            skip_argument_check: false,
            skip_return_check: false,
            auto_include_identifier: true,
        }
    }
}

impl CheckOptions {
    /// Create options with both checks enabled and identifier auto-inclusion on.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_argument_check(mut self, skip: bool) -> Self {
        self.skip_argument_check = skip;
        self
    }

    pub fn skip_return_check(mut self, skip: bool) -> Self {
        self.skip_return_check = skip;
        self
    }

    pub fn auto_include_identifier(mut self, include: bool) -> Self {
        self.auto_include_identifier = include;
        self
    }
}

/// Arguments of one call, as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub named: Map<String, Value>,
}

impl Arguments {
    /// Named arguments only.
    pub fn named(named: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            named,
        }
    }

    /// Append a positional argument.
    pub fn with_positional(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    /// Split a JSON value into arguments.
    ///
    /// Objects become named arguments, arrays become positional arguments and
    /// any other value becomes a single positional argument. `null` means no
    /// arguments at all.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(named) => Self::named(named),
            Value::Array(positional) => Self {
                positional,
                named: Map::new(),
            },
            Value::Null => Self::default(),
            other => Self::default().with_positional(other),
        }
    }
}

/// Requested output fields, optionally scoped below a drill-down path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnRequest {
    pub tags: Vec<String>,
    pub drill: Vec<String>,
}

impl ReturnRequest {
    /// Request everything at the top of the returned-fields tree.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn drill<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drill = path.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the caller listed the identifier field explicitly.
    pub fn wants_identifier(&self) -> bool {
        self.tags.iter().any(|t| t == IDENTIFIER_FIELD)
    }
}
