//! # Commands
//!
//! A [`Command`] inspects a state and, when given a dispatch function,
//! builds and dispatches a transaction. Called without dispatch it only
//! reports whether it would apply.

use std::sync::Arc;

use tracing::debug;

use crate::node::{Fragment, Node};
use crate::selection::Selection;
use crate::spec::Attrs;
use crate::state::EditorState;
use crate::transaction::Transaction;

pub type Command =
    Arc<dyn Fn(&EditorState, Option<&mut dyn FnMut(Transaction)>) -> bool + Send + Sync>;

pub(crate) fn finish(tr: Transaction, dispatch: Option<&mut dyn FnMut(Transaction)>) -> bool {
    if let Some(dispatch) = dispatch {
        dispatch(tr);
    }
    true
}

/// Turn every textblock in the selection into `type_name` with `attrs`
pub fn set_block_type(type_name: &str, attrs: Attrs) -> Command {
    let type_name = type_name.to_string();
    Arc::new(move |state, dispatch| {
        let selection = state.selection();
        let mut targets = Vec::new();
        state
            .doc()
            .nodes_between(selection.from(), selection.to(), &mut |node, pos| {
                let textblock = state
                    .schema()
                    .node_type(node.type_name())
                    .map(|t| t.is_textblock())
                    .unwrap_or(false);
                if textblock {
                    if !node.has_markup(&type_name, &attrs) {
                        targets.push(pos);
                    }
                    return false;
                }
                true
            });

        let mut tr = state.tr();
        let mut applied = false;
        for pos in targets {
            if tr.set_node_markup(pos, &type_name, attrs.clone()).is_ok() {
                applied = true;
            }
        }
        if !applied {
            return false;
        }
        finish(tr, dispatch)
    })
}

/// Whether the selection sits in (or selects) a block of the given type
/// whose attributes include `attrs`
pub fn block_active(state: &EditorState, type_name: &str, attrs: &Attrs) -> bool {
    let selection = state.selection();
    if let Some(pos) = selection.node_pos() {
        return state
            .doc()
            .node_at(pos)
            .map(|node| node.has_markup(type_name, attrs))
            .unwrap_or(false);
    }
    match state.doc().resolve(selection.from()) {
        Ok(rpos) => {
            selection.to() <= rpos.end(rpos.depth())
                && rpos.parent().has_markup(type_name, attrs)
        }
        Err(_) => false,
    }
}

/// Whether a mark applies to the selection (or to typed text, for cursors)
pub fn mark_active(state: &EditorState, mark_type: &str) -> bool {
    let selection = state.selection();
    if selection.is_empty() {
        let marks = match state.stored_marks() {
            Some(marks) => marks.to_vec(),
            None => match state.doc().resolve(selection.from()) {
                Ok(rpos) => rpos.marks(),
                Err(_) => return false,
            },
        };
        return marks.iter().any(|m| m.type_name() == mark_type);
    }
    state
        .doc()
        .range_has_mark(selection.from(), selection.to(), mark_type)
}

pub fn toggle_mark(mark_type: &str, attrs: Attrs) -> Command {
    let mark_type = mark_type.to_string();
    Arc::new(move |state, dispatch| {
        let schema = state.schema();
        let Ok(mark) = schema.mark(&mark_type, attrs.clone()) else {
            return false;
        };
        let selection = state.selection();

        if selection.is_empty() {
            let Ok(rpos) = state.doc().resolve(selection.from()) else {
                return false;
            };
            let allowed = schema
                .node_type(rpos.parent().type_name())
                .map(|t| t.allows_mark(&mark_type))
                .unwrap_or(false);
            if !allowed {
                return false;
            }
            let current = state
                .stored_marks()
                .map(|marks| marks.to_vec())
                .unwrap_or_else(|| rpos.marks());
            let marks = if current.iter().any(|m| m.type_name() == mark_type) {
                schema.remove_mark_from_set(&current, &mark_type)
            } else {
                schema.add_mark_to_set(&current, &mark)
            };
            let mut tr = state.tr();
            tr.set_stored_marks(Some(marks));
            return finish(tr, dispatch);
        }

        let (from, to) = (selection.from(), selection.to());
        let mut applicable = false;
        state.doc().nodes_between(from, to, &mut |node, _| {
            if applicable {
                return false;
            }
            let node_type = schema.node_type(node.type_name());
            if node_type.map(|t| t.inline_content()).unwrap_or(false) {
                applicable = node_type
                    .map(|t| t.allows_mark(&mark_type))
                    .unwrap_or(false);
            }
            !applicable
        });
        if !applicable {
            return false;
        }

        let mut tr = state.tr();
        let result = if state.doc().range_has_mark(from, to, &mark_type) {
            tr.remove_mark(from, to, &mark_type).map(|_| ())
        } else {
            tr.add_mark(from, to, mark).map(|_| ())
        };
        if result.is_err() {
            return false;
        }
        finish(tr, dispatch)
    })
}

/// Whether a node of `type_name` can be inserted at the selection start, at
/// any depth
pub fn can_insert(state: &EditorState, type_name: &str) -> bool {
    let Ok(rpos) = state.doc().resolve(state.selection().from()) else {
        return false;
    };
    (0..=rpos.depth()).rev().any(|depth| {
        let index = rpos.index(depth);
        state
            .schema()
            .can_replace_with(rpos.node(depth), index, index, type_name)
    })
}

/// Nearest position around `pos` where a node of `type_name` can be
/// inserted: `pos` itself, or before/after its ancestors when `pos` sits at
/// the very start/end of them
pub fn insert_point(state: &EditorState, pos: usize, type_name: &str) -> Option<usize> {
    let schema = state.schema();
    let rpos = state.doc().resolve(pos).ok()?;
    let depth = rpos.depth();
    let index = rpos.index(depth);
    if schema.can_replace_with(rpos.parent(), index, index, type_name) {
        return Some(pos);
    }

    if rpos.parent_offset() == 0 {
        for d in (0..depth).rev() {
            let index = rpos.index(d);
            if schema.can_replace_with(rpos.node(d), index, index, type_name) {
                return Some(rpos.before(d + 1));
            }
            if index > 0 {
                return None;
            }
        }
    }

    if rpos.parent_offset() == rpos.parent().content().size() {
        for d in (0..depth).rev() {
            let index = rpos.index_after(d);
            if schema.can_replace_with(rpos.node(d), index, index, type_name) {
                return Some(rpos.after(d + 1));
            }
            if index < rpos.node(d).child_count() {
                return None;
            }
        }
    }

    None
}

/// Replace the selection with a node. Inline nodes replace the selected
/// range; block nodes go to the nearest valid insert point.
pub fn replace_selection_with(node: Node) -> Command {
    Arc::new(move |state, dispatch| {
        let schema = state.schema();
        let Some(node_type) = schema.node_type(node.type_name()) else {
            return false;
        };
        let mut tr = state.tr();

        if node_type.is_inline() {
            if tr.replace_selection_with(node.clone()).is_err() {
                return false;
            }
            return finish(tr, dispatch);
        }

        let selection = state.selection();
        let Some(pos) = insert_point(state, selection.to(), node.type_name())
            .or_else(|| insert_point(state, selection.from(), node.type_name()))
        else {
            return false;
        };
        if tr.insert(pos, Fragment::from_node(node.clone())).is_err() {
            return false;
        }
        if let Ok(selected) = Selection::node(tr.doc(), pos) {
            tr.set_selection(selected);
        }
        finish(tr, dispatch)
    })
}

/// First textblock type the schema can create empty
fn default_textblock(state: &EditorState) -> Option<&str> {
    state
        .schema()
        .node_types()
        .find(|t| t.is_textblock() && t.valid_content_types(&[]))
        .map(|t| t.name())
}

fn delete_selection_tr(state: &EditorState) -> Option<Transaction> {
    let selection = state.selection();
    if selection.is_empty() {
        return None;
    }
    let mut tr = state.tr();

    if let Selection::All { size } = selection {
        let type_name = default_textblock(state)?;
        let empty = state
            .schema()
            .node(type_name, Attrs::new(), Fragment::empty())
            .ok()?;
        tr.replace(0, size, Fragment::from_node(empty)).ok()?;
        tr.set_selection(Selection::cursor(1));
        return Some(tr);
    }

    let from = selection.from();
    tr.delete(from, selection.to()).ok()?;
    tr.set_selection(Selection::cursor(from));
    Some(tr)
}

/// Delete the selected content. Fails for empty selections and for ranges
/// that span several parents.
pub fn delete_selection() -> Command {
    Arc::new(|state, dispatch| match delete_selection_tr(state) {
        Some(tr) => finish(tr, dispatch),
        None => false,
    })
}

fn is_atom_block(state: &EditorState, node: &Node) -> bool {
    !node.is_text()
        && state
            .schema()
            .node_type(node.type_name())
            .map(|t| t.is_block() && t.is_atom())
            .unwrap_or(false)
}

fn is_textblock(state: &EditorState, node: &Node) -> bool {
    state
        .schema()
        .node_type(node.type_name())
        .map(|t| t.is_textblock())
        .unwrap_or(false)
}

/// Backspace: delete the selection, the character or inline node before
/// the cursor, an empty textblock, or select an atom block before it
pub fn delete_backward() -> Command {
    Arc::new(|state, dispatch| {
        if let Some(tr) = delete_selection_tr(state) {
            return finish(tr, dispatch);
        }
        let pos = state.selection().from();
        let Ok(rpos) = state.doc().resolve(pos) else {
            return false;
        };
        let parent = rpos.parent();
        let depth = rpos.depth();
        let mut tr = state.tr();

        if rpos.parent_offset() > 0 {
            let size = if rpos.text_offset() > 0 {
                1
            } else {
                match parent.child(rpos.index(depth) - 1) {
                    Some(node) if node.is_text() => 1,
                    Some(node) => node.size(),
                    None => return false,
                }
            };
            if tr.delete(pos - size, pos).is_err() {
                return false;
            }
            debug!(pos, size, "Deleted backward");
            return finish(tr, dispatch);
        }

        if depth == 0 {
            return false;
        }
        let before = rpos.before(depth);
        let outer = rpos.node(depth - 1);
        let index = rpos.index(depth - 1);
        let Some(previous) = index.checked_sub(1).and_then(|i| outer.child(i)) else {
            return false;
        };

        if parent.content().size() == 0 && is_textblock(state, previous) {
            if tr.delete(before, before + parent.size()).is_err() {
                return false;
            }
            tr.set_selection(Selection::cursor(before - 1));
            return finish(tr, dispatch);
        }
        if is_atom_block(state, previous) {
            match Selection::node(state.doc(), before - previous.size()) {
                Ok(selection) => {
                    tr.set_selection(selection);
                    return finish(tr, dispatch);
                }
                Err(_) => return false,
            }
        }
        false
    })
}

/// Delete: the mirror image of [`delete_backward`]
pub fn delete_forward() -> Command {
    Arc::new(|state, dispatch| {
        if let Some(tr) = delete_selection_tr(state) {
            return finish(tr, dispatch);
        }
        let pos = state.selection().from();
        let Ok(rpos) = state.doc().resolve(pos) else {
            return false;
        };
        let parent = rpos.parent();
        let depth = rpos.depth();
        let mut tr = state.tr();

        if rpos.parent_offset() < parent.content().size() {
            let size = match parent.child(rpos.index(depth)) {
                Some(node) if node.is_text() => 1,
                Some(node) => node.size(),
                None => return false,
            };
            if tr.delete(pos, pos + size).is_err() {
                return false;
            }
            return finish(tr, dispatch);
        }

        if depth == 0 {
            return false;
        }
        let before = rpos.before(depth);
        let after = rpos.after(depth);
        let outer = rpos.node(depth - 1);
        let Some(next) = outer.child(rpos.index(depth - 1) + 1) else {
            return false;
        };

        if parent.content().size() == 0 && is_textblock(state, next) {
            if tr.delete(before, after).is_err() {
                return false;
            }
            tr.set_selection(Selection::cursor(before + 1));
            return finish(tr, dispatch);
        }
        if is_atom_block(state, next) {
            match Selection::node(state.doc(), after) {
                Ok(selection) => {
                    tr.set_selection(selection);
                    return finish(tr, dispatch);
                }
                Err(_) => return false,
            }
        }
        false
    })
}

pub fn select_all() -> Command {
    Arc::new(|state, dispatch| {
        let mut tr = state.tr();
        tr.set_selection(Selection::all(state.doc()));
        finish(tr, dispatch)
    })
}

/// Select the innermost node around the selection
pub fn select_parent_node() -> Command {
    Arc::new(|state, dispatch| {
        let selection = state.selection();
        let Ok(rpos) = state.doc().resolve(selection.from()) else {
            return false;
        };
        let depth = rpos.shared_depth(selection.to());
        if depth == 0 {
            return false;
        }
        let Ok(parent) = Selection::node(state.doc(), rpos.before(depth)) else {
            return false;
        };
        let mut tr = state.tr();
        tr.set_selection(parent);
        finish(tr, dispatch)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc_of, image, para, schema};

    fn run(command: &Command, state: &EditorState) -> Option<EditorState> {
        let mut result = None;
        let handled = command(state, Some(&mut |tr: Transaction| {
            result = Some(state.apply(&tr).unwrap());
        }));
        assert_eq!(handled, result.is_some());
        result
    }

    fn state_with(blocks: Vec<Node>, selection: Selection) -> EditorState {
        let schema = schema();
        let doc = doc_of(&schema, blocks);
        EditorState::new(schema, doc).unwrap().with_selection(selection)
    }

    #[test]
    fn test_set_block_type_and_block_active() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab")], Selection::cursor(1));
        let to_code = set_block_type("code_block", Attrs::new());

        assert!(!block_active(&state, "code_block", &Attrs::new()));
        let next = run(&to_code, &state).unwrap();
        assert!(block_active(&next, "code_block", &Attrs::new()));
        assert!(run(&to_code, &next).is_none());
    }

    #[test]
    fn test_dry_run_does_not_dispatch() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab")], Selection::cursor(1));
        assert!(set_block_type("code_block", Attrs::new())(&state, None));
    }

    #[test]
    fn test_toggle_mark_on_range() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "abc")], Selection::text(1, 3));
        let toggle = toggle_mark("em", Attrs::new());

        let marked = run(&toggle, &state).unwrap();
        assert!(mark_active(&marked, "em"));
        let unmarked = run(&toggle, &marked).unwrap();
        assert!(!mark_active(&unmarked, "em"));
    }

    #[test]
    fn test_toggle_mark_on_cursor_sets_stored_marks() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "abc")], Selection::cursor(2));

        let next = run(&toggle_mark("em", Attrs::new()), &state).unwrap();
        assert!(mark_active(&next, "em"));
        assert!(!next.doc().range_has_mark(1, 4, "em"));
    }

    #[test]
    fn test_toggle_mark_refused_in_code_block() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab")], Selection::cursor(1));
        let state = run(&set_block_type("code_block", Attrs::new()), &state).unwrap();
        let state = state.with_selection(Selection::text(1, 3));

        assert!(run(&toggle_mark("em", Attrs::new()), &state).is_none());
    }

    #[test]
    fn test_insert_block_at_end_of_textblock() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab")], Selection::cursor(3));

        assert!(can_insert(&state, "image"));
        assert_eq!(insert_point(&state, 3, "image"), Some(4));
        assert_eq!(insert_point(&state, 2, "image"), None);

        let next = run(&replace_selection_with(image(&schema, "a.png")), &state).unwrap();
        assert_eq!(next.doc().child_count(), 2);
        assert_eq!(next.selection(), Selection::Node { from: 4, to: 5 });
    }

    #[test]
    fn test_backspace_deletes_char_then_selects_atom() {
        let schema = schema();
        let state = state_with(
            vec![image(&schema, "a.png"), para(&schema, "a")],
            Selection::cursor(3),
        );
        let backspace = delete_backward();

        let state = run(&backspace, &state).unwrap();
        assert_eq!(state.doc().child(1).unwrap().content().size(), 0);
        let state = run(&backspace, &state).unwrap();
        assert_eq!(state.selection(), Selection::Node { from: 0, to: 1 });
    }

    #[test]
    fn test_backspace_removes_empty_textblock() {
        let schema = schema();
        let state = state_with(
            vec![para(&schema, "ab"), para(&schema, "")],
            Selection::cursor(5),
        );

        let next = run(&delete_backward(), &state).unwrap();
        assert_eq!(next.doc().child_count(), 1);
        assert_eq!(next.selection(), Selection::cursor(3));
    }

    #[test]
    fn test_delete_forward_deletes_next_char() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab")], Selection::cursor(1));

        let next = run(&delete_forward(), &state).unwrap();
        assert_eq!(next.doc().text_content(), "b");
    }

    #[test]
    fn test_delete_selection_of_whole_doc_leaves_empty_paragraph() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab"), para(&schema, "cd")], Selection::cursor(1));
        let state = run(&select_all(), &state).unwrap();

        let next = run(&delete_selection(), &state).unwrap();
        assert_eq!(next.doc().child_count(), 1);
        assert_eq!(next.doc().text_content(), "");
        assert_eq!(next.selection(), Selection::cursor(1));
    }

    #[test]
    fn test_select_parent_node() {
        let schema = schema();
        let state = state_with(vec![para(&schema, "ab")], Selection::cursor(2));

        let next = run(&select_parent_node(), &state).unwrap();
        assert_eq!(next.selection(), Selection::Node { from: 0, to: 4 });
        assert!(run(&select_parent_node(), &next).is_none());
    }
}
