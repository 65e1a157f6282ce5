//! # Steps and Position Mapping
//!
//! A [`Step`] is one atomic document change. Every step produces a
//! [`StepMap`] describing how positions before it relate to positions after
//! it; a [`Mapping`] chains those maps across a whole transaction.

use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::node::{Fragment, Mark, Node};
use crate::schema::Schema;
use crate::spec::Attrs;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Replace the range `from..to` with closed content. Both ends must lie
    /// in the same parent node.
    Replace {
        from: usize,
        to: usize,
        content: Fragment,
    },
    AddMark {
        from: usize,
        to: usize,
        mark: Mark,
    },
    RemoveMark {
        from: usize,
        to: usize,
        mark_type: String,
    },
    /// Change the type and attributes of the node starting at `pos`,
    /// keeping its content
    SetMarkup {
        pos: usize,
        type_name: String,
        attrs: Attrs,
    },
}

impl Step {
    pub fn apply(&self, doc: &Node, schema: &Schema) -> ModelResult<Node> {
        match self {
            Step::Replace { from, to, content } => apply_replace(doc, schema, *from, *to, content),
            Step::AddMark { from, to, mark } => {
                check_range(doc, *from, *to)?;
                let mut add = |marks: &[Mark]| schema.add_mark_to_set(marks, mark);
                Ok(map_inline_marks(doc, schema, *from, *to, &mut add, mark.type_name()))
            }
            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                check_range(doc, *from, *to)?;
                let mut remove = |marks: &[Mark]| schema.remove_mark_from_set(marks, mark_type);
                Ok(map_inline_marks(doc, schema, *from, *to, &mut remove, mark_type))
            }
            Step::SetMarkup {
                pos,
                type_name,
                attrs,
            } => apply_set_markup(doc, schema, *pos, type_name, attrs),
        }
    }

    pub fn get_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, content } => {
                StepMap::new(vec![(*from, to - from, content.size())])
            }
            _ => StepMap::empty(),
        }
    }

    /// The same step re-expressed in a coordinate space shifted by `offset`
    pub fn offset(&self, offset: usize) -> Step {
        match self {
            Step::Replace { from, to, content } => Step::Replace {
                from: from + offset,
                to: to + offset,
                content: content.clone(),
            },
            Step::AddMark { from, to, mark } => Step::AddMark {
                from: from + offset,
                to: to + offset,
                mark: mark.clone(),
            },
            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => Step::RemoveMark {
                from: from + offset,
                to: to + offset,
                mark_type: mark_type.clone(),
            },
            Step::SetMarkup {
                pos,
                type_name,
                attrs,
            } => Step::SetMarkup {
                pos: pos + offset,
                type_name: type_name.clone(),
                attrs: attrs.clone(),
            },
        }
    }
}

fn check_range(doc: &Node, from: usize, to: usize) -> ModelResult<()> {
    let size = doc.content().size();
    if from > to {
        return Err(ModelError::InvalidReplace(format!(
            "range start {} is after its end {}",
            from, to
        )));
    }
    if to > size {
        return Err(ModelError::PositionOutOfRange { pos: to, size });
    }
    Ok(())
}

fn apply_replace(
    doc: &Node,
    schema: &Schema,
    from: usize,
    to: usize,
    content: &Fragment,
) -> ModelResult<Node> {
    check_range(doc, from, to)?;
    let rfrom = doc.resolve(from)?;
    let rto = doc.resolve(to)?;
    if !rfrom.same_parent(&rto) {
        return Err(ModelError::InvalidReplace(format!(
            "positions {} and {} do not share a parent",
            from, to
        )));
    }

    for node in content {
        schema.check(node)?;
    }

    let (start_off, end_off) = (rfrom.parent_offset(), rto.parent_offset());
    let path = rfrom.path_to_parent();
    debug!(from, to, inserted = content.size(), "Applying replace step");

    doc.update_at(&path, &mut |parent| {
        let before = parent.content().cut(0, start_off);
        let after = parent.content().cut(end_off, parent.content().size());
        let replaced = parent.with_content(before.append(content).append(&after));
        schema.check_content(&replaced)?;
        Ok(replaced)
    })
}

fn apply_set_markup(
    doc: &Node,
    schema: &Schema,
    pos: usize,
    type_name: &str,
    attrs: &Attrs,
) -> ModelResult<Node> {
    let rpos = doc.resolve(pos)?;
    let index = rpos.index(rpos.depth());
    let parent = rpos.parent();
    let target = match parent.child(index) {
        Some(node) if rpos.text_offset() == 0 && !node.is_text() => node,
        _ => return Err(ModelError::NoNodeAt(pos)),
    };

    let node_type = schema
        .node_type(type_name)
        .ok_or_else(|| ModelError::UnknownNodeType(type_name.to_string()))?;
    if target.type_name() != type_name && !schema.can_replace_with(parent, index, index + 1, type_name)
    {
        return Err(ModelError::InvalidContent {
            node: parent.type_name().to_string(),
            reason: format!("cannot hold a {} at index {}", type_name, index),
        });
    }
    let attrs = schema.compute_attrs(type_name, &node_type.spec().attrs, attrs)?;
    let leaf = node_type.is_leaf();

    let mut path = rpos.path_to_parent();
    path.push(index);
    doc.update_at(&path, &mut |node| {
        let updated = node.with_markup(type_name, attrs.clone(), leaf);
        schema.check_content(&updated)?;
        Ok(updated)
    })
}

/// Rebuild `node` with `f` applied to the marks of every inline node
/// overlapping `from..to` whose parent allows `mark_type`
fn map_inline_marks(
    node: &Node,
    schema: &Schema,
    from: usize,
    to: usize,
    f: &mut dyn FnMut(&[Mark]) -> Vec<Mark>,
    mark_type: &str,
) -> Node {
    let allows = schema
        .node_type(node.type_name())
        .map(|t| t.allows_mark(mark_type))
        .unwrap_or(false);

    let mut children = Vec::with_capacity(node.child_count());
    let mut pos = 0;
    for child in node.content() {
        let end = pos + child.size();
        if end <= from || pos >= to {
            children.push(child.clone());
            pos = end;
            continue;
        }

        let inline = child.is_text()
            || schema
                .node_type(child.type_name())
                .map(|t| t.is_inline())
                .unwrap_or(false);

        if inline && allows {
            if child.is_text() {
                let (start, stop) = (from.saturating_sub(pos), to.min(end) - pos);
                children.push(child.cut(0, start));
                let marked = child.cut(start, stop);
                let marks = f(marked.marks());
                children.push(marked.with_marks(marks));
                children.push(child.cut(stop, child.size()));
            } else {
                let mut marked = child.with_marks(f(child.marks()));
                if child.content().size() > 0 {
                    let inner = map_inline_marks(
                        child,
                        schema,
                        from.saturating_sub(pos + 1),
                        child.content().size().min(to - pos - 1),
                        f,
                        mark_type,
                    );
                    marked = marked.with_content(inner.content().clone());
                }
                children.push(marked);
            }
        } else if !child.is_text() && child.content().size() > 0 {
            children.push(map_inline_marks(
                child,
                schema,
                from.saturating_sub(pos + 1),
                child.content().size().min(to.saturating_sub(pos + 1)),
                f,
                mark_type,
            ));
        } else {
            children.push(child.clone());
        }
        pos = end;
    }

    node.with_content(Fragment::from_nodes(children))
}

/// Result of mapping a single position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// Whether the content around the position was replaced
    pub deleted: bool,
}

/// Position map of a single step: a list of `(start, old_size, new_size)`
/// replaced ranges in ascending order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepMap {
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self { ranges }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[(usize, usize, usize)] {
        &self.ranges
    }

    /// Map a position. `assoc` picks the side a position sticks to when
    /// content is inserted exactly at it: negative for before, positive for
    /// after.
    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let base = (start as isize + diff) as usize;
                let mapped = if side < 0 { base } else { base + new_size };
                let deleted = if assoc < 0 { pos != start } else { pos != end };
                return MapResult {
                    pos: mapped,
                    deleted,
                };
            }
            diff += new_size as isize - old_size as isize;
        }

        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }
}

/// A sequence of step maps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for map in &self.maps {
            let result = map.map_result(pos, assoc);
            deleted |= result.deleted;
            pos = result.pos;
        }
        MapResult { pos, deleted }
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc_of, para, schema};

    #[test]
    fn test_replace_inside_text() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let step = Step::Replace {
            from: 2,
            to: 2,
            content: Fragment::from_node(schema.text("X", vec![])),
        };

        let result = step.apply(&doc, &schema).unwrap();
        assert_eq!(result.text_content(), "aXbc");
    }

    #[test]
    fn test_replace_across_parents_is_rejected() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab"), para(&schema, "cd")]);
        let step = Step::Replace {
            from: 2,
            to: 6,
            content: Fragment::empty(),
        };

        assert!(matches!(
            step.apply(&doc, &schema),
            Err(ModelError::InvalidReplace(_))
        ));
    }

    #[test]
    fn test_replace_that_breaks_content_is_rejected() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab")]);
        let step = Step::Replace {
            from: 0,
            to: 4,
            content: Fragment::empty(),
        };

        assert!(matches!(
            step.apply(&doc, &schema),
            Err(ModelError::InvalidContent { .. })
        ));
    }

    #[test]
    fn test_add_mark_splits_text() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abcd")]);
        let em = schema.mark("em", Attrs::new()).unwrap();
        let step = Step::AddMark {
            from: 2,
            to: 4,
            mark: em,
        };

        let result = step.apply(&doc, &schema).unwrap();
        let para = result.child(0).unwrap();
        assert_eq!(para.child_count(), 3);
        assert_eq!(para.child(1).unwrap().text(), Some("bc"));
        assert!(result.range_has_mark(2, 4, "em"));
        assert!(!result.range_has_mark(1, 2, "em"));
    }

    #[test]
    fn test_remove_mark_rejoins_text() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abcd")]);
        let em = schema.mark("em", Attrs::new()).unwrap();
        let marked = Step::AddMark {
            from: 2,
            to: 4,
            mark: em,
        }
        .apply(&doc, &schema)
        .unwrap();

        let unmarked = Step::RemoveMark {
            from: 1,
            to: 5,
            mark_type: "em".to_string(),
        }
        .apply(&marked, &schema)
        .unwrap();
        assert_eq!(unmarked, doc);
    }

    #[test]
    fn test_set_markup_changes_type() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "ab")]);
        let step = Step::SetMarkup {
            pos: 0,
            type_name: "code_block".to_string(),
            attrs: Attrs::new(),
        };

        let result = step.apply(&doc, &schema).unwrap();
        assert_eq!(result.child(0).unwrap().type_name(), "code_block");
        assert_eq!(result.text_content(), "ab");
    }

    #[test]
    fn test_offset_shifts_positions() {
        let step = Step::Replace {
            from: 1,
            to: 2,
            content: Fragment::empty(),
        };
        assert_eq!(
            step.offset(4),
            Step::Replace {
                from: 5,
                to: 6,
                content: Fragment::empty()
            }
        );
    }

    #[test]
    fn test_map_through_insertion_and_deletion() {
        let insert = StepMap::new(vec![(2, 0, 3)]);
        assert_eq!(insert.map(1, 1), 1);
        assert_eq!(insert.map(2, -1), 2);
        assert_eq!(insert.map(2, 1), 5);
        assert_eq!(insert.map(4, 1), 7);

        let delete = StepMap::new(vec![(2, 4, 0)]);
        let inside = delete.map_result(3, 1);
        assert_eq!(inside.pos, 2);
        assert!(inside.deleted);
        assert_eq!(delete.map(8, 1), 4);
        assert!(!delete.map_result(6, 1).deleted);
    }

    #[test]
    fn test_mapping_chains_maps() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(vec![(0, 0, 2)]));
        mapping.push(StepMap::new(vec![(5, 1, 0)]));

        assert_eq!(mapping.map(2, 1), 4);
        assert_eq!(mapping.map(7, 1), 8);
        assert!(mapping.map_result(3, 1).deleted);
    }
}
