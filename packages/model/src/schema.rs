//! # Schema
//!
//! Compiles a [`SchemaDescriptor`] into node types with parsed content
//! expressions, and validates nodes against them.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::content_expr::ContentExpr;
use crate::error::{ModelError, ModelResult};
use crate::node::{Fragment, Mark, Node, TEXT_TYPE};
use crate::spec::{AttrSpec, Attrs, MarkSpec, NodeSpec};

/// Name of the conventional top-level node type
pub const DOC_TYPE: &str = "doc";

/// Ordered node and mark declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDescriptor {
    pub top_node: String,
    pub nodes: IndexMap<String, NodeSpec>,
    #[serde(default)]
    pub marks: IndexMap<String, MarkSpec>,
}

impl SchemaDescriptor {
    pub fn new(nodes: IndexMap<String, NodeSpec>, marks: IndexMap<String, MarkSpec>) -> Self {
        Self {
            top_node: DOC_TYPE.to_string(),
            nodes,
            marks,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AllowedMarks {
    All,
    None,
    Only(BTreeSet<String>),
}

/// A compiled node type
#[derive(Debug, Clone)]
pub struct NodeType {
    name: String,
    spec: NodeSpec,
    content: ContentExpr,
    inline_content: bool,
    allowed_marks: AllowedMarks,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn is_text(&self) -> bool {
        self.name == TEXT_TYPE
    }

    pub fn is_inline(&self) -> bool {
        self.is_text() || self.spec.inline
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    /// Whether this node's content is inline
    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn allows_mark(&self, mark_type: &str) -> bool {
        match &self.allowed_marks {
            AllowedMarks::All => true,
            AllowedMarks::None => false,
            AllowedMarks::Only(set) => set.contains(mark_type),
        }
    }

    /// Whether a sequence of child type names is valid content
    pub fn valid_content_types(&self, types: &[&str]) -> bool {
        self.content.matches(types)
    }
}

/// A compiled schema
#[derive(Debug, Clone)]
pub struct Schema {
    descriptor: SchemaDescriptor,
    types: IndexMap<String, NodeType>,
}

impl Schema {
    pub fn new(descriptor: SchemaDescriptor) -> ModelResult<Self> {
        if !descriptor.nodes.contains_key(&descriptor.top_node) {
            return Err(ModelError::UnknownNodeType(descriptor.top_node.clone()));
        }
        if !descriptor.nodes.contains_key(TEXT_TYPE) {
            return Err(ModelError::UnknownNodeType(TEXT_TYPE.to_string()));
        }

        let nodes = &descriptor.nodes;
        let resolve_node = |name: &str| -> BTreeSet<String> {
            nodes
                .iter()
                .filter(|(type_name, spec)| *type_name == name || spec.groups().contains(&name))
                .map(|(type_name, _)| type_name.clone())
                .collect()
        };

        let mut types = IndexMap::new();
        for (name, spec) in nodes {
            let content = ContentExpr::parse(spec.content.as_deref().unwrap_or(""), &resolve_node)
                .map_err(|reason| ModelError::InvalidContentExpression {
                    node: name.clone(),
                    reason,
                })?;

            let inline_content = content.referenced_types().iter().any(|child| {
                child == TEXT_TYPE || nodes.get(child).map(|s| s.inline).unwrap_or(false)
            });

            let allowed_marks = match spec.marks.as_deref() {
                None if inline_content => AllowedMarks::All,
                None => AllowedMarks::None,
                Some("_") => AllowedMarks::All,
                Some(list) => {
                    let mut set = BTreeSet::new();
                    for word in list.split_whitespace() {
                        let matched: Vec<&String> = descriptor
                            .marks
                            .iter()
                            .filter(|(mark, mark_spec)| {
                                *mark == word
                                    || mark_spec
                                        .group
                                        .as_deref()
                                        .map(|g| g.split_whitespace().any(|g| g == word))
                                        .unwrap_or(false)
                            })
                            .map(|(mark, _)| mark)
                            .collect();
                        if matched.is_empty() {
                            return Err(ModelError::UnknownMarkType(word.to_string()));
                        }
                        set.extend(matched.into_iter().cloned());
                    }
                    if set.is_empty() {
                        AllowedMarks::None
                    } else {
                        AllowedMarks::Only(set)
                    }
                }
            };

            types.insert(
                name.clone(),
                NodeType {
                    name: name.clone(),
                    spec: spec.clone(),
                    content,
                    inline_content,
                    allowed_marks,
                },
            );
        }

        debug!(
            nodes = types.len(),
            marks = descriptor.marks.len(),
            "Compiled schema"
        );

        Ok(Self { descriptor, types })
    }

    pub fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    pub fn top_node_type(&self) -> &NodeType {
        &self.types[&self.descriptor.top_node]
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    pub fn mark_spec(&self, name: &str) -> Option<&MarkSpec> {
        self.descriptor.marks.get(name)
    }

    fn expect_type(&self, name: &str) -> ModelResult<&NodeType> {
        self.node_type(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))
    }

    /// Fill in defaults and reject missing required attributes
    pub fn compute_attrs(
        &self,
        owner: &str,
        specs: &IndexMap<String, AttrSpec>,
        given: &Attrs,
    ) -> ModelResult<Attrs> {
        let mut attrs = Attrs::new();
        for (name, spec) in specs {
            let value = match given.get(name) {
                Some(value) => value.clone(),
                None => spec.default.clone().ok_or_else(|| ModelError::MissingAttribute {
                    node: owner.to_string(),
                    attr: name.clone(),
                })?,
            };
            attrs.insert(name.clone(), value);
        }
        Ok(attrs)
    }

    /// Create a node, checking its attributes and content
    pub fn node(&self, type_name: &str, attrs: Attrs, content: Fragment) -> ModelResult<Node> {
        let node_type = self.expect_type(type_name)?;
        if node_type.is_text() {
            return Ok(Node::text_node(content.text_content(), Vec::new()));
        }
        let attrs = self.compute_attrs(type_name, &node_type.spec.attrs, &attrs)?;
        let node = Node::new_unchecked(type_name, attrs, content, Vec::new(), node_type.is_leaf());
        self.check_content(&node)?;
        Ok(node)
    }

    /// Create a text node
    pub fn text(&self, text: impl Into<String>, marks: Vec<Mark>) -> Node {
        Node::text_node(text, marks)
    }

    pub fn mark(&self, type_name: &str, attrs: Attrs) -> ModelResult<Mark> {
        let spec = self
            .mark_spec(type_name)
            .ok_or_else(|| ModelError::UnknownMarkType(type_name.to_string()))?;
        let attrs = self.compute_attrs(type_name, &spec.attrs, &attrs)?;
        Ok(Mark::new_unchecked(type_name, attrs))
    }

    fn mark_rank(&self, type_name: &str) -> usize {
        self.descriptor
            .marks
            .get_index_of(type_name)
            .unwrap_or(usize::MAX)
    }

    /// Add a mark to a set, replacing any mark of the same type and keeping
    /// schema order
    pub fn add_mark_to_set(&self, set: &[Mark], mark: &Mark) -> Vec<Mark> {
        let mut out: Vec<Mark> = set
            .iter()
            .filter(|m| m.type_name() != mark.type_name())
            .cloned()
            .collect();
        let rank = self.mark_rank(mark.type_name());
        let at = out
            .iter()
            .position(|m| self.mark_rank(m.type_name()) > rank)
            .unwrap_or(out.len());
        out.insert(at, mark.clone());
        out
    }

    pub fn remove_mark_from_set(&self, set: &[Mark], mark_type: &str) -> Vec<Mark> {
        set.iter()
            .filter(|m| m.type_name() != mark_type)
            .cloned()
            .collect()
    }

    /// Check a node's direct content against its content expression and its
    /// children's marks against what it allows
    pub fn check_content(&self, node: &Node) -> ModelResult<()> {
        let node_type = self.expect_type(node.type_name())?;
        if node.is_text() {
            return Ok(());
        }

        let child_types: Vec<&str> = node.content().iter().map(Node::type_name).collect();
        if !node_type.valid_content_types(&child_types) {
            let found = if child_types.is_empty() {
                "no children".to_string()
            } else {
                child_types.join(", ")
            };
            return Err(ModelError::InvalidContent {
                node: node.type_name().to_string(),
                reason: format!(
                    "children [{}] do not match \"{}\"",
                    found,
                    node_type.spec.content.as_deref().unwrap_or("")
                ),
            });
        }

        for child in node.content() {
            for mark in child.marks() {
                if !node_type.allows_mark(mark.type_name()) {
                    return Err(ModelError::MarkNotAllowed {
                        node: node.type_name().to_string(),
                        mark: mark.type_name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Check a node and all of its descendants
    pub fn check(&self, node: &Node) -> ModelResult<()> {
        let node_type = self.expect_type(node.type_name())?;
        if !node_type.is_text() {
            for (name, spec) in &node_type.spec.attrs {
                if spec.is_required() && node.attr(name).is_none() {
                    return Err(ModelError::MissingAttribute {
                        node: node.type_name().to_string(),
                        attr: name.clone(),
                    });
                }
            }
        } else if node.text().map(str::is_empty).unwrap_or(true) {
            return Err(ModelError::InvalidContent {
                node: TEXT_TYPE.to_string(),
                reason: "empty text nodes are not allowed".to_string(),
            });
        }
        for mark in node.marks() {
            if self.mark_spec(mark.type_name()).is_none() {
                return Err(ModelError::UnknownMarkType(mark.type_name().to_string()));
            }
        }

        self.check_content(node)?;
        for child in node.content() {
            self.check(child)?;
        }
        Ok(())
    }

    /// Whether replacing children `from..to` of `parent` with one node of
    /// `type_name` leaves valid content
    pub fn can_replace_with(&self, parent: &Node, from: usize, to: usize, type_name: &str) -> bool {
        let Some(parent_type) = self.node_type(parent.type_name()) else {
            return false;
        };
        let children: Vec<&str> = parent.content().iter().map(Node::type_name).collect();
        if from > to || to > children.len() {
            return false;
        }

        let mut types: Vec<&str> = children[..from].to_vec();
        types.push(type_name);
        types.extend_from_slice(&children[to..]);
        parent_type.valid_content_types(&types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic_descriptor() -> SchemaDescriptor {
        let mut nodes = IndexMap::new();
        nodes.insert(DOC_TYPE.to_string(), NodeSpec::new().with_content("block+"));
        nodes.insert(TEXT_TYPE.to_string(), NodeSpec::new().with_group("inline"));
        nodes.insert(
            "paragraph".to_string(),
            NodeSpec::new().with_content("inline*").with_group("block"),
        );
        nodes.insert(
            "code_block".to_string(),
            NodeSpec::new()
                .with_content("text*")
                .with_group("block")
                .with_marks("")
                .code(),
        );

        let mut marks = IndexMap::new();
        marks.insert("em".to_string(), MarkSpec::new());
        marks.insert("code".to_string(), MarkSpec::new());
        SchemaDescriptor::new(nodes, marks)
    }

    #[test]
    fn test_compiles_types() {
        let schema = Schema::new(basic_descriptor()).unwrap();

        assert!(schema.node_type("paragraph").unwrap().is_textblock());
        assert!(schema.node_type("text").unwrap().is_inline());
        assert!(!schema.node_type("doc").unwrap().inline_content());
        assert!(!schema.node_type("code_block").unwrap().allows_mark("em"));
        assert!(schema.node_type("paragraph").unwrap().allows_mark("em"));
    }

    #[test]
    fn test_unknown_group_in_content_fails() {
        let mut descriptor = basic_descriptor();
        descriptor.nodes.insert(
            "figure".to_string(),
            NodeSpec::new().with_content("figure_content").with_group("block"),
        );

        let err = Schema::new(descriptor).unwrap_err();
        assert!(matches!(err, ModelError::InvalidContentExpression { .. }));
    }

    #[test]
    fn test_empty_doc_is_invalid() {
        let schema = Schema::new(basic_descriptor()).unwrap();
        let err = schema.node("doc", Attrs::new(), Fragment::empty()).unwrap_err();
        assert!(err.to_string().contains("block+"));
    }

    #[test]
    fn test_marks_keep_schema_order() {
        let schema = Schema::new(basic_descriptor()).unwrap();
        let em = schema.mark("em", Attrs::new()).unwrap();
        let code = schema.mark("code", Attrs::new()).unwrap();

        let set = schema.add_mark_to_set(&[code.clone()], &em);
        assert_eq!(set, vec![em.clone(), code.clone()]);
        assert_eq!(schema.remove_mark_from_set(&set, "em"), vec![code]);
    }

    #[test]
    fn test_can_replace_with() {
        let schema = Schema::new(basic_descriptor()).unwrap();
        let para = schema.node("paragraph", Attrs::new(), Fragment::empty()).unwrap();
        let doc = schema.node("doc", Attrs::new(), Fragment::from_node(para)).unwrap();

        assert!(schema.can_replace_with(&doc, 1, 1, "code_block"));
        assert!(!schema.can_replace_with(&doc, 1, 1, "text"));
    }
}
