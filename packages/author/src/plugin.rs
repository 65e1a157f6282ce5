//! Behavior plugins

use std::fmt;

use reprose_model::{EditorState, Transaction};

use crate::keymap::{KeyBindingTable, KeyCombo};
use crate::view::NodeViewFactory;

/// Editor behavior beyond the schema. Every hook defaults to "not
/// handled"; the primary session consults plugins in list order and stops
/// at the first that handles an input.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn handle_key(
        &self,
        _state: &EditorState,
        _combo: &KeyCombo,
        _dispatch: &mut dyn FnMut(Transaction),
    ) -> bool {
        false
    }

    /// Text typed over `from..to`
    fn handle_text_input(
        &self,
        _state: &EditorState,
        _from: usize,
        _to: usize,
        _text: &str,
        _dispatch: &mut dyn FnMut(Transaction),
    ) -> bool {
        false
    }

    /// Node views by node type name
    fn node_views(&self) -> Vec<(String, NodeViewFactory)> {
        Vec::new()
    }
}

/// Runs the resolved key binding table. Always the second plugin.
#[derive(Debug, Clone)]
pub struct KeymapPlugin {
    table: KeyBindingTable,
}

impl KeymapPlugin {
    pub fn new(table: KeyBindingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeyBindingTable {
        &self.table
    }
}

impl Plugin for KeymapPlugin {
    fn name(&self) -> &str {
        "keymap"
    }

    fn handle_key(
        &self,
        state: &EditorState,
        combo: &KeyCombo,
        dispatch: &mut dyn FnMut(Transaction),
    ) -> bool {
        self.table.handle(state, combo, dispatch)
    }
}

/// A plugin that only contributes node views
#[derive(Clone)]
pub struct NodeViewPlugin {
    name: String,
    views: Vec<(String, NodeViewFactory)>,
}

impl NodeViewPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            views: Vec::new(),
        }
    }

    pub fn with_view(mut self, node_type: impl Into<String>, factory: NodeViewFactory) -> Self {
        self.views.push((node_type.into(), factory));
        self
    }
}

impl Plugin for NodeViewPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn node_views(&self) -> Vec<(String, NodeViewFactory)> {
        self.views.clone()
    }
}

impl fmt::Debug for NodeViewPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeViewPlugin")
            .field("name", &self.name)
            .field(
                "views",
                &self.views.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}
