//! # Document Tree
//!
//! Immutable node values. Positions use the usual token model: a text node
//! occupies one position per character, a leaf node occupies one position,
//! and any other node occupies its content size plus one position for each
//! of its boundaries.
//!
//! ```text
//! 0   1 2 3 4    5
//!  <p> a b c </p>
//! ```

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::resolve::ResolvedPos;
use crate::spec::Attrs;

/// Name of the built-in inline text type
pub const TEXT_TYPE: &str = "text";

/// Inline annotation attached to a node (emphasis, code, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    type_name: String,
    attrs: Attrs,
}

impl Mark {
    pub(crate) fn new_unchecked(type_name: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }
}

/// A node in a document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    type_name: String,
    attrs: Attrs,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
    leaf: bool,
}

impl Node {
    pub(crate) fn new_unchecked(
        type_name: impl Into<String>,
        attrs: Attrs,
        content: Fragment,
        marks: Vec<Mark>,
        leaf: bool,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            attrs,
            content,
            marks,
            text: None,
            leaf,
        }
    }

    /// Create a text node. Text nodes are always valid on their own; whether
    /// they may appear somewhere is decided by the parent's content expression.
    pub fn text_node(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            type_name: TEXT_TYPE.to_string(),
            attrs: Attrs::new(),
            content: Fragment::empty(),
            marks,
            text: Some(text.into()),
            leaf: true,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.text.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Number of positions this node occupies in its parent
    pub fn size(&self) -> usize {
        match &self.text {
            Some(text) => text.chars().count(),
            None if self.leaf => 1,
            None => self.content.size() + 2,
        }
    }

    pub fn child_count(&self) -> usize {
        self.content.child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => self.content.text_content(),
        }
    }

    /// Same type, attributes and marks
    pub fn same_markup(&self, other: &Node) -> bool {
        self.type_name == other.type_name
            && self.attrs == other.attrs
            && self.marks == other.marks
    }

    /// Type matches and every given attribute has the given value
    pub fn has_markup(&self, type_name: &str, attrs: &Attrs) -> bool {
        self.type_name == type_name
            && attrs
                .iter()
                .all(|(key, value)| self.attrs.get(key) == Some(value))
    }

    pub fn with_content(&self, content: Fragment) -> Node {
        Node {
            content,
            ..self.clone()
        }
    }

    pub(crate) fn with_markup(&self, type_name: &str, attrs: Attrs, leaf: bool) -> Node {
        Node {
            type_name: type_name.to_string(),
            attrs,
            leaf,
            ..self.clone()
        }
    }

    pub fn with_marks(&self, marks: Vec<Mark>) -> Node {
        Node {
            marks,
            ..self.clone()
        }
    }

    /// Cut out the part between two offsets. For text nodes offsets are
    /// characters; for other nodes they are content positions.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.text {
            Some(text) => Node {
                text: Some(char_slice(text, from, to)),
                ..self.clone()
            },
            None => {
                if from == 0 && to == self.content.size() {
                    return self.clone();
                }
                self.with_content(self.content.cut(from, to))
            }
        }
    }

    /// Content between two positions inside this node
    pub fn slice(&self, from: usize, to: usize) -> Fragment {
        self.content.cut(from, to)
    }

    pub fn resolve(&self, pos: usize) -> ModelResult<ResolvedPos<'_>> {
        ResolvedPos::resolve(self, pos)
    }

    /// The node directly after the given position, if any
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let mut node = self;
        let mut pos = pos;
        loop {
            let (index, offset) = node.content.find_index(pos)?;
            let child = node.content.get(index)?;
            if offset == pos || child.is_text() {
                return Some(child);
            }
            pos -= offset + 1;
            node = child;
        }
    }

    /// Visit every descendant with its position. The callback returns whether
    /// to descend into the node's children.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize) -> bool) {
        self.content.nodes_between(0, self.content.size(), f, 0);
    }

    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize) -> bool,
    ) {
        self.content.nodes_between(from, to, f, 0);
    }

    /// Text between two content positions; inline leaves render as `leaf_text`
    pub fn text_between(&self, from: usize, to: usize, leaf_text: &str) -> String {
        self.content.text_between(from, to, leaf_text)
    }

    pub fn range_has_mark(&self, from: usize, to: usize, mark_type: &str) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _| {
                if node.marks.iter().any(|m| m.type_name == mark_type) {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Rebuild the tree with the node at `path` (child indices from this
    /// node) replaced by the result of `f`
    pub(crate) fn update_at(
        &self,
        path: &[usize],
        f: &mut dyn FnMut(&Node) -> ModelResult<Node>,
    ) -> ModelResult<Node> {
        let Some((&index, rest)) = path.split_first() else {
            return f(self);
        };

        let child = self
            .content
            .get(index)
            .ok_or_else(|| ModelError::InvalidReplace(format!("no child at index {}", index)))?;
        let updated = child.update_at(rest, f)?;
        Ok(self.with_content(self.content.replace_child(index, updated)))
    }
}

/// An ordered sequence of sibling nodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    nodes: Vec<Node>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a fragment, dropping empty text nodes and joining adjacent text
    /// nodes that carry the same marks
    pub fn from_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let mut out: Vec<Node> = Vec::new();
        for node in nodes {
            if node.text.as_deref() == Some("") {
                continue;
            }
            if let (Some(last), Some(text)) = (out.last_mut(), node.text.as_deref()) {
                if last.is_text() && last.marks == node.marks {
                    if let Some(existing) = last.text.as_mut() {
                        existing.push_str(text);
                    }
                    continue;
                }
            }
            out.push(node);
        }

        let size = out.iter().map(Node::size).sum();
        Self { nodes: out, size }
    }

    pub fn from_node(node: Node) -> Self {
        Self::from_nodes([node])
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn first(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn append(&self, other: &Fragment) -> Fragment {
        Fragment::from_nodes(self.nodes.iter().chain(other.nodes.iter()).cloned())
    }

    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let mut nodes = self.nodes.clone();
        nodes[index] = node;
        Fragment::from_nodes(nodes)
    }

    pub fn text_content(&self) -> String {
        self.nodes.iter().map(Node::text_content).collect()
    }

    /// Cut out the part between two positions. Nodes that straddle a
    /// boundary are kept with their content cut.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        if to <= from {
            return Fragment::empty();
        }

        let mut result = Vec::new();
        let mut pos = 0;
        for child in &self.nodes {
            if pos >= to {
                break;
            }
            let end = pos + child.size();
            if end > from {
                let piece = if child.is_text() {
                    child.cut(from.saturating_sub(pos), to.min(end) - pos)
                } else if child.is_leaf() {
                    child.clone()
                } else {
                    child.cut(
                        from.saturating_sub(pos + 1),
                        child.content.size().min(to - pos - 1),
                    )
                };
                result.push(piece);
            }
            pos = end;
        }

        Fragment::from_nodes(result)
    }

    /// Index of the child at or after `pos`, and that child's start offset
    pub fn find_index(&self, pos: usize) -> Option<(usize, usize)> {
        if pos == 0 {
            return Some((0, 0));
        }
        if pos == self.size {
            return Some((self.nodes.len(), self.size));
        }
        if pos > self.size {
            return None;
        }

        let mut cur = 0;
        for (i, child) in self.nodes.iter().enumerate() {
            let end = cur + child.size();
            if end >= pos {
                if end == pos {
                    return Some((i + 1, end));
                }
                return Some((i, cur));
            }
            cur = end;
        }
        None
    }

    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize) -> bool,
        start: usize,
    ) {
        let mut pos = 0;
        for child in &self.nodes {
            if pos >= to {
                break;
            }
            let end = pos + child.size();
            if end > from && f(child, start + pos) && child.content.size() > 0 {
                let inner_start = pos + 1;
                child.content.nodes_between(
                    from.saturating_sub(inner_start),
                    child.content.size().min(to - inner_start),
                    f,
                    start + inner_start,
                );
            }
            pos = end;
        }
    }

    pub fn text_between(&self, from: usize, to: usize, leaf_text: &str) -> String {
        let mut out = String::new();
        let mut pos = 0;
        for child in &self.nodes {
            if pos >= to {
                break;
            }
            let end = pos + child.size();
            if end > from {
                if let Some(text) = child.text() {
                    out.push_str(&char_slice(text, from.saturating_sub(pos), to.min(end) - pos));
                } else if child.is_leaf() {
                    out.push_str(leaf_text);
                } else {
                    let inner_start = pos + 1;
                    out.push_str(&child.content.text_between(
                        from.saturating_sub(inner_start),
                        child.content.size().min(to - inner_start),
                        leaf_text,
                    ));
                }
            }
            pos = end;
        }
        out
    }

    /// First position, counting from `pos`, at which this fragment and
    /// `other` differ. `None` when they are identical.
    pub fn find_diff_start(&self, other: &Fragment, pos: usize) -> Option<usize> {
        let mut pos = pos;
        let mut i = 0;
        loop {
            if i == self.child_count() || i == other.child_count() {
                return if self.child_count() == other.child_count() {
                    None
                } else {
                    Some(pos)
                };
            }

            let (a, b) = (&self.nodes[i], &other.nodes[i]);
            if a == b {
                pos += a.size();
                i += 1;
                continue;
            }
            if !a.same_markup(b) {
                return Some(pos);
            }
            if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
                if ta != tb {
                    for (ca, cb) in ta.chars().zip(tb.chars()) {
                        if ca != cb {
                            break;
                        }
                        pos += 1;
                    }
                    return Some(pos);
                }
            }
            if a.content.size() > 0 || b.content.size() > 0 {
                if let Some(inner) = a.content.find_diff_start(&b.content, pos + 1) {
                    return Some(inner);
                }
            }
            pos += a.size();
            i += 1;
        }
    }

    /// Last positions, scanning backwards from `pos_a` in this fragment and
    /// `pos_b` in `other`, at which the two differ. Returns one end per
    /// side. `None` when they are identical.
    pub fn find_diff_end(
        &self,
        other: &Fragment,
        pos_a: usize,
        pos_b: usize,
    ) -> Option<(usize, usize)> {
        let (mut ia, mut ib) = (self.child_count(), other.child_count());
        let (mut pos_a, mut pos_b) = (pos_a, pos_b);
        loop {
            if ia == 0 || ib == 0 {
                return if ia == ib { None } else { Some((pos_a, pos_b)) };
            }
            ia -= 1;
            ib -= 1;

            let (a, b) = (&self.nodes[ia], &other.nodes[ib]);
            let size = a.size();
            if a == b {
                pos_a -= size;
                pos_b -= size;
                continue;
            }
            if !a.same_markup(b) {
                return Some((pos_a, pos_b));
            }
            if let (Some(ta), Some(tb)) = (a.text(), b.text()) {
                if ta != tb {
                    for (ca, cb) in ta.chars().rev().zip(tb.chars().rev()) {
                        if ca != cb {
                            break;
                        }
                        pos_a -= 1;
                        pos_b -= 1;
                    }
                    return Some((pos_a, pos_b));
                }
            }
            if a.content.size() > 0 || b.content.size() > 0 {
                if let Some(inner) = a.content.find_diff_end(&b.content, pos_a - 1, pos_b - 1) {
                    return Some(inner);
                }
            }
            pos_a -= size;
            pos_b -= b.size();
        }
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

pub(crate) fn char_slice(text: &str, from: usize, to: usize) -> String {
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Node {
        Node::text_node(s, vec![])
    }

    fn para(s: &str) -> Node {
        Node::new_unchecked("paragraph", Attrs::new(), Fragment::from_node(text(s)), vec![], false)
    }

    #[test]
    fn test_sizes_follow_token_model() {
        let p = para("abc");
        assert_eq!(p.size(), 5);
        assert_eq!(Fragment::from_nodes([p.clone(), p]).size(), 10);
    }

    #[test]
    fn test_adjacent_text_is_joined() {
        let frag = Fragment::from_nodes([text("ab"), text(""), text("c")]);
        assert_eq!(frag.child_count(), 1);
        assert_eq!(frag.text_content(), "abc");
    }

    #[test]
    fn test_cut_splits_text_and_keeps_wrappers() {
        let frag = Fragment::from_nodes([para("abc"), para("def")]);
        let cut = frag.cut(2, 8);

        assert_eq!(cut.child_count(), 2);
        assert_eq!(cut.get(0).unwrap().text_content(), "bc");
        assert_eq!(cut.get(1).unwrap().text_content(), "de");
    }

    #[test]
    fn test_node_at_descends() {
        let doc = Node::new_unchecked(
            "doc",
            Attrs::new(),
            Fragment::from_nodes([para("abc"), para("de")]),
            vec![],
            false,
        );

        assert_eq!(doc.node_at(0).unwrap().type_name(), "paragraph");
        assert_eq!(doc.node_at(5).unwrap().text_content(), "de");
        assert_eq!(doc.node_at(2).unwrap().text(), Some("abc"));
    }

    #[test]
    fn test_find_diff_start_and_end_on_text() {
        let a = Fragment::from_node(text("aXbc"));
        let b = Fragment::from_node(text("abc"));

        assert_eq!(a.find_diff_start(&b, 0), Some(1));
        assert_eq!(a.find_diff_end(&b, a.size(), b.size()), Some((2, 1)));
    }

    #[test]
    fn test_identical_fragments_have_no_diff() {
        let a = Fragment::from_nodes([para("abc")]);
        assert_eq!(a.find_diff_start(&a.clone(), 0), None);
        assert_eq!(a.find_diff_end(&a.clone(), a.size(), a.size()), None);
    }

    #[test]
    fn test_text_between_spans_blocks() {
        let doc = Node::new_unchecked(
            "doc",
            Attrs::new(),
            Fragment::from_nodes([para("abc"), para("de")]),
            vec![],
            false,
        );
        assert_eq!(doc.text_between(2, 7, ""), "bcd");
    }
}
