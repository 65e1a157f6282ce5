//! # Fallback Recovery
//!
//! Takes over when the canonical document does not validate against the
//! schema. The controller holds a raw text draft and walks a small state
//! machine:
//!
//! ```text
//!   draft text ──parse──▶ InvalidJson   (parse error kept, no validation)
//!              └─ok────▶ validate ──▶ InvalidSchema (validation error kept)
//!                                 └─ok─▶ Valid: committed document emitted
//! ```

use std::sync::Arc;

use reprose_model::Schema;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{EditorError, EditorResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RecoveryState {
    Valid,
    InvalidJson,
    InvalidSchema,
}

/// Working state of the recovery editor
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackDraft {
    /// Edited text; `None` means the canonical document's serialization
    pub raw: Option<String>,
    pub parse_error: Option<String>,
    pub validation_error: Option<String>,
}

/// What the host should present
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum RecoverySurface {
    /// Plain text editing of the raw draft
    RawText(String),
    /// Targeted editing of parsed but invalid data
    Tree(Value),
    /// Nothing can be edited; the draft text is shown as is
    ReadOnly(String),
}

pub struct FallbackRecoveryController {
    schema: Arc<Schema>,
    canonical: Value,
    draft: FallbackDraft,
    parsed: Option<Value>,
    state: RecoveryState,
    read_only: bool,
}

impl FallbackRecoveryController {
    /// Mount the controller on `canonical`, running the first validation
    pub fn new(schema: Arc<Schema>, canonical: Value, read_only: bool) -> Self {
        let mut controller = Self {
            schema,
            canonical,
            draft: FallbackDraft::default(),
            parsed: None,
            state: RecoveryState::Valid,
            read_only,
        };
        controller.validate();
        controller
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn draft(&self) -> &FallbackDraft {
        &self.draft
    }

    /// The last known document: the upstream payload or the last commit
    pub fn canonical(&self) -> &Value {
        &self.canonical
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The text being recovered
    pub fn raw_text(&self) -> String {
        match &self.draft.raw {
            Some(raw) => raw.clone(),
            None => serde_json::to_string_pretty(&self.canonical)
                .unwrap_or_else(|_| self.canonical.to_string()),
        }
    }

    /// Error messages to show, parse error first
    pub fn errors(&self) -> Vec<&str> {
        self.draft
            .parse_error
            .iter()
            .chain(self.draft.validation_error.iter())
            .map(String::as_str)
            .collect()
    }

    pub fn surface(&self) -> RecoverySurface {
        if self.read_only {
            return RecoverySurface::ReadOnly(self.raw_text());
        }
        match (&self.state, &self.parsed) {
            (RecoveryState::InvalidSchema, Some(parsed)) => RecoverySurface::Tree(parsed.clone()),
            _ => RecoverySurface::RawText(self.raw_text()),
        }
    }

    /// Replace the draft text. Returns the document if it is now valid.
    pub fn edit_raw(&mut self, text: impl Into<String>) -> EditorResult<Option<Value>> {
        if self.read_only {
            return Err(EditorError::ReadOnly);
        }
        self.draft.raw = Some(text.into());
        Ok(self.validate())
    }

    /// Set the value at a JSON Pointer inside the parsed draft. Only
    /// available once the draft parses.
    pub fn edit_tree(&mut self, pointer: &str, value: Value) -> EditorResult<Option<Value>> {
        if self.read_only {
            return Err(EditorError::ReadOnly);
        }
        let Some(mut parsed) = self.parsed.clone() else {
            return Err(EditorError::DocumentValidation(
                "the draft is not valid JSON yet".to_string(),
            ));
        };
        match parsed.pointer_mut(pointer) {
            Some(target) => *target = value,
            None => {
                return Err(EditorError::DocumentValidation(format!(
                    "nothing at \"{}\" in the draft",
                    pointer
                )))
            }
        }
        let text = serde_json::to_string_pretty(&parsed)
            .map_err(|err| EditorError::DocumentValidation(err.to_string()))?;
        self.draft.raw = Some(text);
        Ok(self.validate())
    }

    /// The canonical document changed upstream; discard the draft and
    /// start over from it
    pub fn upstream_changed(&mut self, canonical: Value) -> Option<Value> {
        self.canonical = canonical;
        self.draft.raw = None;
        self.validate()
    }

    fn validate(&mut self) -> Option<Value> {
        let text = self.raw_text();
        let parsed: Value = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "Recovery draft is not valid JSON");
                self.draft.parse_error = Some(err.to_string());
                self.draft.validation_error = None;
                self.parsed = None;
                self.state = RecoveryState::InvalidJson;
                return None;
            }
        };

        if let Err(err) = self.schema.document_from_json(&parsed) {
            warn!(error = %err, "Recovery draft does not fit the schema");
            self.draft.parse_error = None;
            self.draft.validation_error = Some(err.to_string());
            self.parsed = Some(parsed);
            self.state = RecoveryState::InvalidSchema;
            return None;
        }

        info!("Recovered document is valid");
        self.draft = FallbackDraft::default();
        self.parsed = None;
        self.canonical = parsed.clone();
        self.state = RecoveryState::Valid;
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indexmap::IndexMap;
    use reprose_model::{NodeSpec, SchemaDescriptor};
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        let mut nodes = IndexMap::new();
        nodes.insert("doc".to_string(), NodeSpec::new().with_content("block+"));
        nodes.insert("text".to_string(), NodeSpec::new().with_group("inline"));
        nodes.insert(
            "paragraph".to_string(),
            NodeSpec::new().with_content("inline*").with_group("block"),
        );
        Arc::new(Schema::new(SchemaDescriptor::new(nodes, IndexMap::new())).unwrap())
    }

    fn invalid() -> Value {
        json!({ "type": "doc", "content": [{ "type": "heading" }] })
    }

    #[test]
    fn test_mount_reports_validation_error() {
        let controller = FallbackRecoveryController::new(schema(), invalid(), false);
        assert_eq!(controller.state(), RecoveryState::InvalidSchema);
        assert!(controller.draft().validation_error.is_some());
        assert!(matches!(controller.surface(), RecoverySurface::Tree(_)));
        assert!(controller.raw_text().contains("heading"));
    }

    #[test]
    fn test_fallback_recovery_cycle() {
        let mut controller = FallbackRecoveryController::new(schema(), invalid(), false);

        assert_eq!(controller.edit_raw("{ \"type\": ").unwrap(), None);
        assert_eq!(controller.state(), RecoveryState::InvalidJson);
        assert!(!controller.draft().parse_error.as_deref().unwrap_or("").is_empty());
        assert!(controller.draft().validation_error.is_none());
        assert!(matches!(controller.surface(), RecoverySurface::RawText(_)));

        let wrong = json!({ "type": "doc", "content": [] }).to_string();
        assert_eq!(controller.edit_raw(wrong).unwrap(), None);
        assert_eq!(controller.state(), RecoveryState::InvalidSchema);
        assert!(!controller.draft().validation_error.as_deref().unwrap_or("").is_empty());
        assert!(controller.draft().parse_error.is_none());

        let committed = controller
            .edit_tree("/content", json!([{ "type": "paragraph" }]))
            .unwrap();
        assert_eq!(
            committed,
            Some(json!({ "type": "doc", "content": [{ "type": "paragraph" }] }))
        );
        assert_eq!(controller.state(), RecoveryState::Valid);
        assert_eq!(controller.draft(), &FallbackDraft::default());
    }

    #[test]
    fn test_edit_tree_needs_parsed_draft() {
        let mut controller = FallbackRecoveryController::new(schema(), invalid(), false);
        controller.edit_raw("not json").unwrap();
        let err = controller.edit_tree("/content", json!([])).unwrap_err();
        assert!(matches!(err, EditorError::DocumentValidation(_)));
    }

    #[test]
    fn test_edit_tree_rejects_missing_pointer() {
        let mut controller = FallbackRecoveryController::new(schema(), invalid(), false);
        let err = controller.edit_tree("/nowhere/3", json!(1)).unwrap_err();
        assert!(err.to_string().contains("/nowhere/3"));
    }

    #[test]
    fn test_read_only_still_shows_errors() {
        let mut controller = FallbackRecoveryController::new(schema(), invalid(), true);
        assert!(matches!(controller.surface(), RecoverySurface::ReadOnly(_)));
        assert_eq!(controller.errors().len(), 1);
        assert_eq!(controller.edit_raw("{}").unwrap_err(), EditorError::ReadOnly);
    }

    #[test]
    fn test_upstream_change_discards_draft() {
        let mut controller = FallbackRecoveryController::new(schema(), invalid(), false);
        controller.edit_raw("{").unwrap();

        let valid = json!({ "type": "doc", "content": [{ "type": "paragraph" }] });
        assert_eq!(controller.upstream_changed(valid.clone()), Some(valid));
        assert_eq!(controller.draft().raw, None);
    }
}
