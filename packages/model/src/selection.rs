//! Selections and their mapping through document changes.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::node::Node;
use crate::schema::Schema;
use crate::step::Mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Selection {
    /// A cursor or text range. `anchor` stays put while `head` moves.
    Text { anchor: usize, head: usize },
    /// A single selected node spanning `from..to`
    Node { from: usize, to: usize },
    /// The whole document; `size` is the document's content size
    All { size: usize },
}

impl Selection {
    pub fn cursor(pos: usize) -> Self {
        Selection::Text {
            anchor: pos,
            head: pos,
        }
    }

    pub fn text(anchor: usize, head: usize) -> Self {
        Selection::Text { anchor, head }
    }

    /// Select the node starting at `pos`
    pub fn node(doc: &Node, pos: usize) -> ModelResult<Self> {
        match doc.node_at(pos) {
            Some(node) if !node.is_text() => Ok(Selection::Node {
                from: pos,
                to: pos + node.size(),
            }),
            _ => Err(ModelError::NoNodeAt(pos)),
        }
    }

    pub fn all(doc: &Node) -> Self {
        Selection::All {
            size: doc.content().size(),
        }
    }

    /// A cursor at the start of the first textblock, or at 0
    pub fn at_start(doc: &Node, schema: &Schema) -> Self {
        let mut found = None;
        doc.descendants(&mut |node, pos| {
            if found.is_some() {
                return false;
            }
            if schema
                .node_type(node.type_name())
                .map(|t| t.is_textblock())
                .unwrap_or(false)
            {
                found = Some(pos + 1);
                return false;
            }
            true
        });
        Selection::cursor(found.unwrap_or(0))
    }

    pub fn from(&self) -> usize {
        match *self {
            Selection::Text { anchor, head } => anchor.min(head),
            Selection::Node { from, .. } => from,
            Selection::All { .. } => 0,
        }
    }

    pub fn to(&self) -> usize {
        match *self {
            Selection::Text { anchor, head } => anchor.max(head),
            Selection::Node { to, .. } => to,
            Selection::All { size } => size,
        }
    }

    pub fn anchor(&self) -> usize {
        match *self {
            Selection::Text { anchor, .. } => anchor,
            _ => self.from(),
        }
    }

    pub fn head(&self) -> usize {
        match *self {
            Selection::Text { head, .. } => head,
            _ => self.to(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from() == self.to()
    }

    /// Position of the selected node, for node selections
    pub fn node_pos(&self) -> Option<usize> {
        match *self {
            Selection::Node { from, .. } => Some(from),
            _ => None,
        }
    }

    /// Map through `mapping` onto `doc`, the document the mapping produced.
    /// A node selection whose node was deleted collapses to a cursor.
    pub fn map(&self, doc: &Node, mapping: &Mapping) -> Selection {
        let size = doc.content().size();
        match *self {
            Selection::Text { anchor, head } => Selection::Text {
                anchor: mapping.map(anchor, 1).min(size),
                head: mapping.map(head, 1).min(size),
            },
            Selection::Node { from, .. } => {
                let result = mapping.map_result(from, 1);
                let pos = result.pos.min(size);
                if result.deleted {
                    return Selection::cursor(pos);
                }
                Selection::node(doc, pos).unwrap_or_else(|_| Selection::cursor(pos))
            }
            Selection::All { .. } => Selection::all(doc),
        }
    }
}
