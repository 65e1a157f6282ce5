//! # Block Structure Commands
//!
//! Commands that change how blocks nest: wrapping, lifting, joining and the
//! list item operations. Each one rewrites a run of sibling blocks around
//! the selection with a single closed replace step, so the textblocks and
//! atom blocks of the document survive in order and the selection is
//! carried over by their ordinal.

use std::sync::Arc;

use tracing::debug;

use crate::commands::{finish, Command};
use crate::error::ModelResult;
use crate::node::{Fragment, Node};
use crate::resolve::ResolvedPos;
use crate::schema::Schema;
use crate::selection::Selection;
use crate::spec::Attrs;
use crate::state::EditorState;
use crate::transaction::Transaction;

/// Children `start..end` of the ancestor at `depth`, covering the document
/// positions `from..to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockRange {
    depth: usize,
    start: usize,
    end: usize,
    from: usize,
    to: usize,
}

fn offset_of(node: &Node, index: usize) -> usize {
    node.content().iter().take(index).map(Node::size).sum()
}

fn has_inline_content(schema: &Schema, node: &Node) -> bool {
    schema
        .node_type(node.type_name())
        .map(|t| t.inline_content())
        .unwrap_or(false)
}

fn children(node: &Node, from: usize, to: usize) -> Vec<Node> {
    node.content()
        .iter()
        .skip(from)
        .take(to.saturating_sub(from))
        .cloned()
        .collect()
}

/// The innermost run of sibling blocks covering the selection whose parent
/// satisfies `pred`
fn block_range<'a>(
    state: &'a EditorState,
    pred: &dyn Fn(&Node) -> bool,
) -> Option<(ResolvedPos<'a>, BlockRange)> {
    let selection = state.selection();
    let (from, to) = (selection.from(), selection.to());
    let rfrom = state.doc().resolve(from).ok()?;
    let rto = state.doc().resolve(to).ok()?;
    let top = if from == to || has_inline_content(state.schema(), rfrom.parent()) {
        rfrom.depth().checked_sub(1)?
    } else {
        rfrom.depth()
    };

    for depth in (0..=top).rev() {
        let node = rfrom.node(depth);
        if to > rfrom.end(depth) || !pred(node) {
            continue;
        }
        let start = rfrom.index(depth);
        if start >= node.child_count() {
            return None;
        }
        let end = rto.index_after(depth).clamp(start + 1, node.child_count());
        let range = BlockRange {
            depth,
            start,
            end,
            from: rfrom.start(depth) + offset_of(node, start),
            to: rfrom.start(depth) + offset_of(node, end),
        };
        return Some((rfrom, range));
    }
    None
}

/// Position before each textblock and atom block in document order, with
/// its content size and whether it is a textblock
fn stops(schema: &Schema, doc: &Node) -> Vec<(usize, usize, bool)> {
    let mut stops = Vec::new();
    doc.descendants(&mut |node, pos| {
        let Some(node_type) = schema.node_type(node.type_name()) else {
            return false;
        };
        if node_type.is_textblock() || (node_type.is_block() && node_type.is_atom()) {
            stops.push((pos, node.content().size(), node_type.is_textblock()));
            return false;
        }
        true
    });
    stops
}

/// Move the state's selection onto the same textblocks and atom blocks in
/// the transaction's document. Leaves the mapped selection when the blocks
/// do not line up.
fn carry_selection(state: &EditorState, tr: &mut Transaction) {
    let schema = state.schema();
    let old = stops(schema, state.doc());
    let new = stops(schema, tr.doc());
    if old.len() != new.len() {
        return;
    }
    let carry = |pos: usize| {
        old.iter()
            .zip(&new)
            .find_map(|(&(before, size, textblock), &(after, _, _))| {
                (textblock && pos > before && pos <= before + 1 + size)
                    .then(|| pos - before + after)
            })
    };

    let selection = match state.selection() {
        Selection::Text { anchor, head } => match (carry(anchor), carry(head)) {
            (Some(anchor), Some(head)) => Selection::text(anchor, head),
            _ => return,
        },
        Selection::Node { from, .. } => {
            let Some(index) = old.iter().position(|&(before, _, _)| before == from) else {
                return;
            };
            match Selection::node(tr.doc(), new[index].0) {
                Ok(selection) => selection,
                Err(_) => return,
            }
        }
        Selection::All { .. } => Selection::all(tr.doc()),
    };
    tr.set_selection(selection);
}

/// `blocks` inside a `type_name` node, or, when it cannot hold them
/// directly, each block inside one of its item types
fn wrap_blocks(schema: &Schema, type_name: &str, attrs: &Attrs, blocks: Vec<Node>) -> Option<Node> {
    let direct = schema.node(type_name, attrs.clone(), Fragment::from_nodes(blocks.clone()));
    if let Ok(node) = direct {
        return Some(node);
    }

    let wrapper = schema.node_type(type_name)?;
    let item = schema.node_types().find(|item| {
        !item.is_text()
            && wrapper.valid_content_types(&[item.name()])
            && blocks
                .iter()
                .all(|block| item.valid_content_types(&[block.type_name()]))
    })?;
    let items = blocks
        .into_iter()
        .map(|block| schema.node(item.name(), Attrs::new(), Fragment::from_node(block)))
        .collect::<ModelResult<Vec<_>>>()
        .ok()?;
    schema
        .node(type_name, attrs.clone(), Fragment::from_nodes(items))
        .ok()
}

/// Wrap the blocks around the selection in a `type_name` node
pub fn wrap_in(type_name: &str, attrs: Attrs) -> Command {
    let type_name = type_name.to_string();
    Arc::new(move |state, dispatch| {
        let Some((rfrom, range)) = block_range(state, &|_| true) else {
            return false;
        };
        let schema = state.schema();
        let parent = rfrom.node(range.depth);
        if !schema.can_replace_with(parent, range.start, range.end, &type_name) {
            return false;
        }
        let blocks = children(parent, range.start, range.end);
        let Some(wrapper) = wrap_blocks(schema, &type_name, &attrs, blocks) else {
            return false;
        };

        let mut tr = state.tr();
        if tr
            .replace(range.from, range.to, Fragment::from_node(wrapper))
            .is_err()
        {
            return false;
        }
        carry_selection(state, &mut tr);
        debug!(wrapper = %type_name, blocks = range.end - range.start, "Wrapped blocks");
        finish(tr, dispatch)
    })
}

/// Move the blocks around the selection out of their parent, which is
/// split around them
pub fn lift() -> Command {
    Arc::new(|state, dispatch| {
        let Some((rfrom, range)) = block_range(state, &|_| true) else {
            return false;
        };
        if range.depth == 0 {
            return false;
        }
        let container = rfrom.node(range.depth);
        let size = container.child_count();

        let mut nodes = Vec::new();
        if range.start > 0 {
            nodes.push(container.with_content(Fragment::from_nodes(children(container, 0, range.start))));
        }
        nodes.extend(children(container, range.start, range.end));
        if range.end < size {
            nodes.push(container.with_content(Fragment::from_nodes(children(container, range.end, size))));
        }

        let mut tr = state.tr();
        let (from, to) = (rfrom.before(range.depth), rfrom.after(range.depth));
        if tr.replace(from, to, Fragment::from_nodes(nodes)).is_err() {
            return false;
        }
        carry_selection(state, &mut tr);
        finish(tr, dispatch)
    })
}

/// `before` with the content of `after` appended, when both are containers
/// of blocks and the result is valid
fn joined(schema: &Schema, before: &Node, after: &Node) -> Option<Node> {
    if before.is_text() || after.is_text() || before.is_leaf() || after.is_leaf() {
        return None;
    }
    if has_inline_content(schema, before) {
        return None;
    }
    let node = before.with_content(before.content().append(after.content()));
    schema.check_content(&node).ok()?;
    Some(node)
}

/// Start, size and joined replacement of the nearest pair of adjacent
/// joinable blocks above (or below) the selection, looking upward through
/// its ancestors
fn join_point(state: &EditorState, up: bool) -> Option<(usize, usize, Node)> {
    let selection = state.selection();
    let pos = if up { selection.from() } else { selection.to() };
    let rpos = state.doc().resolve(pos).ok()?;
    let depth = rpos.depth();

    for d in (0..=depth).rev() {
        let index = rpos.index(d);
        let first = if d == depth {
            if rpos.text_offset() > 0 {
                continue;
            }
            index.checked_sub(1)
        } else if up {
            index.checked_sub(1)
        } else {
            Some(index)
        };
        let Some(first) = first else {
            continue;
        };
        let parent = rpos.node(d);
        let (Some(before), Some(after)) = (parent.child(first), parent.child(first + 1)) else {
            continue;
        };
        if let Some(node) = joined(state.schema(), before, after) {
            let start = rpos.start(d) + offset_of(parent, first);
            return Some((start, before.size() + after.size(), node));
        }
    }
    None
}

fn join(up: bool) -> Command {
    Arc::new(move |state, dispatch| {
        let Some((from, size, node)) = join_point(state, up) else {
            return false;
        };
        let mut tr = state.tr();
        if tr.replace(from, from + size, Fragment::from_node(node)).is_err() {
            return false;
        }
        if state.selection().node_pos().is_some() {
            if let Ok(selection) = Selection::node(tr.doc(), from) {
                tr.set_selection(selection);
            }
        } else {
            carry_selection(state, &mut tr);
        }
        debug!(from, up, "Joined blocks");
        finish(tr, dispatch)
    })
}

/// Join the block around the selection with the one above it. Textblocks
/// are never merged.
pub fn join_up() -> Command {
    join(true)
}

/// Join the block around the selection with the one below it
pub fn join_down() -> Command {
    join(false)
}

fn is_list_of<'a>(item_type: &'a str) -> impl Fn(&Node) -> bool + 'a {
    move |node: &Node| {
        node.child(0)
            .map(|child| child.type_name() == item_type)
            .unwrap_or(false)
    }
}

/// Split the list item around the cursor in two. In an empty last
/// paragraph this lifts the item out of the list instead.
pub fn split_list_item(item_type: &str) -> Command {
    let item_type = item_type.to_string();
    Arc::new(move |state, dispatch| {
        let selection = state.selection();
        if !matches!(selection, Selection::Text { .. }) {
            return false;
        }
        let doc = state.doc();
        let (Ok(rfrom), Ok(rto)) = (doc.resolve(selection.from()), doc.resolve(selection.to()))
        else {
            return false;
        };
        let depth = rfrom.depth();
        if depth < 2
            || !rfrom.same_parent(&rto)
            || !has_inline_content(state.schema(), rfrom.parent())
            || rfrom.node(depth - 1).type_name() != item_type
        {
            return false;
        }

        let block = rfrom.parent();
        let item = rfrom.node(depth - 1);
        let index = rfrom.index(depth - 1);
        if block.content().size() == 0 && index + 1 == item.child_count() {
            return lift_list_item(&item_type)(state, dispatch);
        }

        let mut left = children(item, 0, index);
        left.push(block.cut(0, rfrom.parent_offset()));
        let mut right = vec![block.cut(rto.parent_offset(), block.content().size())];
        right.extend(children(item, index + 1, item.child_count()));
        let left = item.with_content(Fragment::from_nodes(left));
        let right = item.with_content(Fragment::from_nodes(right));

        let item_start = rfrom.before(depth - 1);
        let cursor = item_start + left.size() + 2;
        let mut tr = state.tr();
        if tr
            .replace(item_start, rfrom.after(depth - 1), Fragment::from_nodes([left, right]))
            .is_err()
        {
            return false;
        }
        tr.set_selection(Selection::cursor(cursor));
        finish(tr, dispatch)
    })
}

/// Lift the selected list items one level: into the enclosing list when
/// nested, otherwise out of the list altogether
pub fn lift_list_item(item_type: &str) -> Command {
    let item_type = item_type.to_string();
    Arc::new(move |state, dispatch| {
        let is_list = is_list_of(&item_type);
        let Some((rfrom, range)) = block_range(state, &is_list) else {
            return false;
        };
        if range.depth == 0 {
            return false;
        }
        let list = rfrom.node(range.depth);
        let size = list.child_count();
        let outer = rfrom.node(range.depth - 1);

        let (from, to, nodes) = if range.depth >= 2 && outer.type_name() == item_type {
            let index = rfrom.index(range.depth - 1);
            let mut kept = children(outer, 0, index);
            if range.start > 0 {
                kept.push(list.with_content(Fragment::from_nodes(children(list, 0, range.start))));
            }
            let mut trailing = Vec::new();
            if range.end < size {
                trailing.push(list.with_content(Fragment::from_nodes(children(list, range.end, size))));
            }
            trailing.extend(children(outer, index + 1, outer.child_count()));

            let mut lifted = children(list, range.start, range.end);
            if let Some(last) = lifted.last_mut() {
                if !trailing.is_empty() {
                    *last = last.with_content(last.content().append(&Fragment::from_nodes(trailing)));
                }
            }
            let mut nodes = vec![outer.with_content(Fragment::from_nodes(kept))];
            nodes.extend(lifted);
            (rfrom.before(range.depth - 1), rfrom.after(range.depth - 1), nodes)
        } else {
            let mut nodes = Vec::new();
            if range.start > 0 {
                nodes.push(list.with_content(Fragment::from_nodes(children(list, 0, range.start))));
            }
            for item in children(list, range.start, range.end) {
                nodes.extend(item.content().iter().cloned());
            }
            if range.end < size {
                nodes.push(list.with_content(Fragment::from_nodes(children(list, range.end, size))));
            }
            (rfrom.before(range.depth), rfrom.after(range.depth), nodes)
        };

        let mut tr = state.tr();
        if tr.replace(from, to, Fragment::from_nodes(nodes)).is_err() {
            return false;
        }
        carry_selection(state, &mut tr);
        finish(tr, dispatch)
    })
}

/// Nest the selected list items inside the item before them, in a list of
/// the same type
pub fn sink_list_item(item_type: &str) -> Command {
    let item_type = item_type.to_string();
    Arc::new(move |state, dispatch| {
        let is_list = is_list_of(&item_type);
        let Some((rfrom, range)) = block_range(state, &is_list) else {
            return false;
        };
        if range.start == 0 {
            return false;
        }
        let list = rfrom.node(range.depth);
        let Some(previous) = list.child(range.start - 1) else {
            return false;
        };
        if previous.type_name() != item_type {
            return false;
        }

        let sunk = Fragment::from_nodes(children(list, range.start, range.end));
        let nested = match previous.content().last() {
            Some(last) if last.type_name() == list.type_name() => {
                let merged = last.with_content(last.content().append(&sunk));
                previous.with_content(
                    previous
                        .content()
                        .replace_child(previous.child_count() - 1, merged),
                )
            }
            _ => {
                let Ok(sublist) = state.schema().node(list.type_name(), Attrs::new(), sunk) else {
                    return false;
                };
                previous.with_content(previous.content().append(&Fragment::from_node(sublist)))
            }
        };

        let mut tr = state.tr();
        let from = range.from - previous.size();
        if tr.replace(from, range.to, Fragment::from_node(nested)).is_err() {
            return false;
        }
        carry_selection(state, &mut tr);
        finish(tr, dispatch)
    })
}
