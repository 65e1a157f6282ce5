//! # Node and Mark Specs
//!
//! Serializable declarations contributed by features. A merged set of specs
//! forms a [`SchemaDescriptor`](crate::SchemaDescriptor), which the
//! [`Schema`](crate::Schema) compiles into node types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute values carried by nodes and marks
pub type Attrs = IndexMap<String, Value>;

/// Declaration of a single attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttrSpec {
    /// Value used when the attribute is not supplied. `None` makes the
    /// attribute required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl AttrSpec {
    /// An attribute that must be supplied
    pub fn required() -> Self {
        Self { default: None }
    }

    /// An attribute with a default value
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: Some(value.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Declaration of a node type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSpec {
    /// Content expression, e.g. `"inline*"` or `"section_header block+"`.
    /// `None` declares a leaf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Space-separated groups this type belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Marks allowed inside this node: `"_"` for all, `""` for none, or a
    /// space-separated list of mark names and groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<String>,

    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, AttrSpec>,

    #[serde(skip_serializing_if = "is_false")]
    pub inline: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub atom: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub draggable: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub code: bool,

    #[serde(skip_serializing_if = "is_false")]
    pub defining: bool,
}

impl NodeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_marks(mut self, marks: impl Into<String>) -> Self {
        self.marks = Some(marks.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn code(mut self) -> Self {
        self.code = true;
        self
    }

    pub fn defining(mut self) -> Self {
        self.defining = true;
        self
    }

    /// Groups as individual names
    pub fn groups(&self) -> Vec<&str> {
        self.group
            .as_deref()
            .map(|g| g.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Declaration of a mark type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkSpec {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, AttrSpec>,

    /// Whether the mark extends to text typed at its end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inclusive: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl MarkSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attr(mut self, name: impl Into<String>, spec: AttrSpec) -> Self {
        self.attrs.insert(name.into(), spec);
        self
    }

    pub fn with_inclusive(mut self, inclusive: bool) -> Self {
        self.inclusive = Some(inclusive);
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}
