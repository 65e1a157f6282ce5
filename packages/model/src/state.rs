use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{ModelError, ModelResult};
use crate::node::{Mark, Node};
use crate::schema::Schema;
use crate::selection::Selection;
use crate::transaction::Transaction;

/// Immutable editor state: a valid document plus selection
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    stored_marks: Option<Vec<Mark>>,
}

impl EditorState {
    /// Create a state for a document, validating it first
    pub fn new(schema: Arc<Schema>, doc: Node) -> ModelResult<Self> {
        schema.check(&doc)?;
        if doc.type_name() != schema.descriptor().top_node {
            return Err(ModelError::InvalidContent {
                node: doc.type_name().to_string(),
                reason: format!(
                    "top-level node must be \"{}\"",
                    schema.descriptor().top_node
                ),
            });
        }
        let selection = Selection::at_start(&doc, &schema);
        Ok(Self {
            schema,
            doc,
            selection,
            stored_marks: None,
        })
    }

    /// Create a state rooted at an arbitrary node, for editing one node's
    /// content on its own. The node is validated but need not be of the top
    /// type.
    pub fn for_node(schema: Arc<Schema>, node: Node) -> ModelResult<Self> {
        schema.check(&node)?;
        let selection = Selection::at_start(&node, &schema);
        Ok(Self {
            schema,
            doc: node,
            selection,
            stored_marks: None,
        })
    }

    pub fn from_json(schema: Arc<Schema>, value: &Value) -> ModelResult<Self> {
        let doc = schema.document_from_json(value)?;
        Self::new(schema, doc)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn to_json(&self) -> Value {
        self.doc.to_json()
    }

    /// Start a transaction against this state
    pub fn tr(&self) -> Transaction {
        let mut tr = Transaction::new(self.schema.clone(), self.doc.clone(), self.selection);
        if let Some(marks) = &self.stored_marks {
            tr.set_stored_marks(Some(marks.clone()));
        }
        tr
    }

    /// Apply a transaction built against this state's document
    pub fn apply(&self, tr: &Transaction) -> ModelResult<EditorState> {
        if tr.before() != &self.doc {
            return Err(ModelError::MismatchedTransaction);
        }

        let stored_marks = if tr.stored_marks_set() && !tr.doc_changed() {
            tr.stored_marks().map(<[Mark]>::to_vec)
        } else if tr.doc_changed() {
            None
        } else {
            self.stored_marks.clone()
        };

        debug!(
            steps = tr.steps().len(),
            changed = tr.doc_changed(),
            "Applied transaction"
        );
        Ok(EditorState {
            schema: self.schema.clone(),
            doc: tr.doc().clone(),
            selection: tr.selection(),
            stored_marks,
        })
    }

    pub fn with_selection(&self, selection: Selection) -> EditorState {
        EditorState {
            selection,
            stored_marks: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{doc_of, para, schema};
    use serde_json::json;

    #[test]
    fn test_from_json_validates() {
        let schema = schema();
        let err = EditorState::from_json(schema, &json!({ "type": "doc" })).unwrap_err();
        assert!(matches!(err, ModelError::InvalidContent { .. }));
    }

    #[test]
    fn test_from_json_rejects_non_top_node() {
        let schema = schema();
        let err = EditorState::from_json(schema, &json!({ "type": "paragraph" })).unwrap_err();
        assert!(err.to_string().contains("top-level"));
    }

    #[test]
    fn test_apply_rejects_stale_transaction() {
        let schema = schema();
        let state = EditorState::new(schema.clone(), doc_of(&schema, vec![para(&schema, "ab")]))
            .unwrap();

        let mut stale = state.tr();
        stale.insert_text("X", 1, 1).unwrap();

        let mut first = state.tr();
        first.insert_text("Y", 1, 1).unwrap();
        let next = state.apply(&first).unwrap();

        assert!(matches!(
            next.apply(&stale),
            Err(ModelError::MismatchedTransaction)
        ));
        assert_eq!(next.doc().text_content(), "Yab");
    }

    #[test]
    fn test_stored_marks_survive_selection_only_transactions() {
        let schema = schema();
        let state = EditorState::new(schema.clone(), doc_of(&schema, vec![para(&schema, "ab")]))
            .unwrap();
        let em = schema.mark("em", Default::default()).unwrap();

        let mut tr = state.tr();
        tr.set_stored_marks(Some(vec![em.clone()]));
        let state = state.apply(&tr).unwrap();
        assert_eq!(state.stored_marks(), Some(&[em][..]));

        let mut tr = state.tr();
        tr.insert_text("X", 1, 1).unwrap();
        let state = state.apply(&tr).unwrap();
        assert!(state.stored_marks().is_none());
        assert!(state.doc().range_has_mark(1, 2, "em"));
    }

    #[test]
    fn test_for_node_edits_a_detached_paragraph() {
        let schema = schema();
        let state = EditorState::for_node(schema.clone(), para(&schema, "abc")).unwrap();
        assert_eq!(state.selection(), Selection::cursor(0));

        let mut tr = state.tr();
        tr.insert_text("X", 1, 1).unwrap();
        let state = state.apply(&tr).unwrap();
        assert_eq!(state.doc().type_name(), "paragraph");
        assert_eq!(state.doc().text_content(), "aXbc");
    }

    #[test]
    fn test_round_trips_json() {
        let schema = schema();
        let value = json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "hi ", "marks": [{ "type": "em" }] },
                    { "type": "text", "text": "there" }
                ] },
                { "type": "image", "attrs": { "src": "a.png", "alt": "" } }
            ]
        });

        let state = EditorState::from_json(schema, &value).unwrap();
        assert_eq!(state.to_json(), value);
    }
}
