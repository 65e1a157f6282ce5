//! # Transactions
//!
//! A [`Transaction`] accumulates steps against a starting document. It keeps
//! the document it was built on (`before`) so that an [`EditorState`]
//! can refuse to apply it to any other document.
//!
//! [`EditorState`]: crate::EditorState

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::error::ModelResult;
use crate::node::{Fragment, Mark, Node};
use crate::schema::Schema;
use crate::selection::Selection;
use crate::spec::Attrs;
use crate::step::{Mapping, Step};

#[derive(Debug, Clone)]
pub struct Transaction {
    schema: Arc<Schema>,
    before: Node,
    doc: Node,
    steps: Vec<Step>,
    mapping: Mapping,
    selection_before: Selection,
    selection: Option<Selection>,
    stored_marks: Option<Vec<Mark>>,
    stored_marks_set: bool,
    meta: IndexMap<String, Value>,
}

impl Transaction {
    pub fn new(schema: Arc<Schema>, doc: Node, selection: Selection) -> Self {
        Self {
            schema,
            before: doc.clone(),
            doc,
            steps: Vec::new(),
            mapping: Mapping::new(),
            selection_before: selection,
            selection: None,
            stored_marks: None,
            stored_marks_set: false,
            meta: IndexMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The document this transaction was built against
    pub fn before(&self) -> &Node {
        &self.before
    }

    /// The document after all steps so far
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Whether the resulting document differs from the starting one. A
    /// transaction whose steps cancel out does not count as a change.
    pub fn doc_changed(&self) -> bool {
        self.doc != self.before
    }

    /// Apply a step, leaving the transaction untouched if it fails
    pub fn step(&mut self, step: Step) -> ModelResult<&mut Self> {
        let doc = step.apply(&self.doc, &self.schema)?;
        debug!(steps = self.steps.len() + 1, "Step added to transaction");
        self.mapping.push(step.get_map());
        self.steps.push(step);
        self.doc = doc;
        Ok(self)
    }

    pub fn replace(&mut self, from: usize, to: usize, content: Fragment) -> ModelResult<&mut Self> {
        self.step(Step::Replace { from, to, content })
    }

    pub fn insert(&mut self, pos: usize, content: Fragment) -> ModelResult<&mut Self> {
        self.replace(pos, pos, content)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> ModelResult<&mut Self> {
        self.replace(from, to, Fragment::empty())
    }

    /// Replace `from..to` with text. The text takes the stored marks if any
    /// were set, otherwise the marks at `from`. Typing over the selection
    /// puts the cursor after the text; any other selection is mapped.
    pub fn insert_text(&mut self, text: &str, from: usize, to: usize) -> ModelResult<&mut Self> {
        let selection = self.selection();
        let over_selection = selection.from() == from && selection.to() == to;
        if text.is_empty() {
            return self.delete(from, to);
        }
        let marks = match &self.stored_marks {
            Some(marks) => marks.clone(),
            None => self.doc.resolve(from)?.marks(),
        };
        let node = self.schema.text(text, marks);
        self.replace(from, to, Fragment::from_node(node))?;
        if over_selection {
            self.set_selection(Selection::cursor(from + text.chars().count()));
        }
        Ok(self)
    }

    pub fn add_mark(&mut self, from: usize, to: usize, mark: Mark) -> ModelResult<&mut Self> {
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(&mut self, from: usize, to: usize, mark_type: &str) -> ModelResult<&mut Self> {
        self.step(Step::RemoveMark {
            from,
            to,
            mark_type: mark_type.to_string(),
        })
    }

    pub fn set_node_markup(
        &mut self,
        pos: usize,
        type_name: &str,
        attrs: Attrs,
    ) -> ModelResult<&mut Self> {
        self.step(Step::SetMarkup {
            pos,
            type_name: type_name.to_string(),
            attrs,
        })
    }

    /// Replace the current selection with `node`
    pub fn replace_selection_with(&mut self, node: Node) -> ModelResult<&mut Self> {
        let selection = self.selection();
        let size = node.size();
        let from = selection.from();
        self.replace(from, selection.to(), Fragment::from_node(node))?;
        self.set_selection(Selection::cursor(from + size));
        Ok(self)
    }

    /// The explicitly set selection, or the starting selection mapped
    /// through the steps so far
    pub fn selection(&self) -> Selection {
        self.selection
            .unwrap_or_else(|| self.selection_before.map(&self.doc, &self.mapping))
    }

    pub fn selection_set(&self) -> bool {
        self.selection.is_some()
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection);
        self
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn stored_marks_set(&self) -> bool {
        self.stored_marks_set
    }

    pub fn set_stored_marks(&mut self, marks: Option<Vec<Mark>>) -> &mut Self {
        self.stored_marks = marks;
        self.stored_marks_set = true;
        self
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn get_meta(&self, key: &str) -> Option<&Value> {
        self.meta.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc_of, image, para, schema};

    #[test]
    fn test_insert_text_moves_cursor() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let mut tr = Transaction::new(schema, doc, Selection::cursor(2));

        tr.insert_text("XY", 2, 2).unwrap();
        assert_eq!(tr.doc().text_content(), "aXYbc");
        assert_eq!(tr.selection(), Selection::cursor(4));
        assert!(tr.doc_changed());
    }

    #[test]
    fn test_insert_text_elsewhere_maps_selection() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc"), image(&schema, "a.png")]);
        let selection = Selection::node(&doc, 5).unwrap();
        let mut tr = Transaction::new(schema, doc, selection);

        tr.insert_text("XY", 2, 2).unwrap();
        assert!(!tr.selection_set());
        assert_eq!(tr.selection(), Selection::Node { from: 7, to: 8 });
    }

    #[test]
    fn test_typed_text_inherits_marks() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let em = schema.mark("em", Attrs::new()).unwrap();
        let mut tr = Transaction::new(schema, doc, Selection::cursor(1));

        tr.add_mark(1, 4, em).unwrap();
        tr.insert_text("X", 3, 3).unwrap();
        assert!(tr.doc().range_has_mark(3, 4, "em"));
    }

    #[test]
    fn test_failed_step_leaves_transaction_untouched() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let mut tr = Transaction::new(schema, doc, Selection::cursor(1));

        assert!(tr.delete(0, 5).is_err());
        assert!(tr.steps().is_empty());
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_cancelling_steps_do_not_count_as_change() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let mut tr = Transaction::new(schema, doc, Selection::cursor(1));

        tr.insert_text("X", 2, 2).unwrap();
        tr.delete(2, 3).unwrap();
        assert_eq!(tr.steps().len(), 2);
        assert!(!tr.doc_changed());
    }

    #[test]
    fn test_unset_selection_is_mapped() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let mut tr = Transaction::new(schema.clone(), doc, Selection::cursor(3));

        tr.insert(1, Fragment::from_node(schema.text("XY", vec![])))
            .unwrap();
        assert!(!tr.selection_set());
        assert_eq!(tr.selection(), Selection::cursor(5));
    }

    #[test]
    fn test_meta_round_trip() {
        let schema = schema();
        let doc = doc_of(&schema, vec![para(&schema, "abc")]);
        let mut tr = Transaction::new(schema, doc, Selection::cursor(1));

        tr.set_meta("origin", "test");
        assert_eq!(tr.get_meta("origin"), Some(&Value::from("test")));
        assert_eq!(tr.get_meta("missing"), None);
    }
}
