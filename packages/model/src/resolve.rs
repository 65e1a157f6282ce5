//! Resolved positions: a position plus the chain of ancestors around it.

use crate::error::{ModelError, ModelResult};
use crate::node::{Mark, Node};

#[derive(Debug, Clone, Copy)]
struct Level<'a> {
    node: &'a Node,
    /// Index of the child at or containing the position
    index: usize,
    /// Position of this node's content start
    start: usize,
}

/// A position resolved against a document
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pos: usize,
    path: Vec<Level<'a>>,
    parent_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(doc: &'a Node, pos: usize) -> ModelResult<Self> {
        let size = doc.content().size();
        if pos > size {
            return Err(ModelError::PositionOutOfRange { pos, size });
        }

        let mut path = Vec::new();
        let mut node = doc;
        let mut start = 0;
        loop {
            let rem = pos - start;
            let mut index = node.child_count();
            let mut descend = None;
            let mut offset = 0;
            for (i, child) in node.content().iter().enumerate() {
                let end = offset + child.size();
                if rem < end {
                    index = i;
                    if !child.is_text() && !child.is_leaf() && rem > offset {
                        descend = Some((child, start + offset + 1));
                    }
                    break;
                }
                offset = end;
            }

            path.push(Level { node, index, start });
            match descend {
                Some((child, child_start)) => {
                    node = child;
                    start = child_start;
                }
                None => {
                    return Ok(Self {
                        pos,
                        path,
                        parent_offset: rem,
                    });
                }
            }
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Depth of the innermost ancestor (0 for the document itself)
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    pub fn parent(&self) -> &'a Node {
        self.path[self.depth()].node
    }

    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    pub fn node(&self, depth: usize) -> &'a Node {
        self.path[depth].node
    }

    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Content start of the ancestor at `depth`
    pub fn start(&self, depth: usize) -> usize {
        self.path[depth].start
    }

    /// Content end of the ancestor at `depth`
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// Position directly before the ancestor at `depth` (depth >= 1)
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth) - 1
    }

    /// Position directly after the ancestor at `depth` (depth >= 1)
    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    /// Offset into the text node the position points into, 0 at boundaries
    pub fn text_offset(&self) -> usize {
        let parent = self.parent();
        let mut offset = 0;
        for child in parent.content().iter().take(self.index(self.depth())) {
            offset += child.size();
        }
        self.parent_offset - offset
    }

    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Child indices leading from the document to the parent
    pub fn path_to_parent(&self) -> Vec<usize> {
        (0..self.depth()).map(|d| self.index(d)).collect()
    }

    /// Marks that apply at this position: those of the text around it
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).map(|n| n.marks().to_vec()).unwrap_or_default();
        }
        let before = if index > 0 { parent.child(index - 1) } else { None };
        before
            .or_else(|| parent.child(index))
            .map(|n| n.marks().to_vec())
            .unwrap_or_default()
    }

    /// Deepest depth whose content contains both this position and `pos`
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.depth() == other.depth() && self.start(self.depth()) == other.start(other.depth())
    }
}
