//! # Reprose Author
//!
//! Editor core for Reprose: turns an ordered list of features into a
//! working editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ features: nodes, marks, menus, keys, plugins│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ aggregation (once, at construction)         │
//! │  - Schema: ordered merge, last one wins     │
//! │  - Capabilities: chained key bindings       │
//! │  - Menu: two-level ordered union            │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: one mode at a time                  │
//! │  - Editing: EditorView + node views         │
//! │    (nested regions, attribute editors)      │
//! │  - Recovering: fallback recovery controller │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Order decides conflicts**: later features override specs and menu
//!    options, and get first refusal on shared key bindings
//! 2. **One dispatch point per session**: the primary session and every
//!    nested region apply transactions in order, one at a time
//! 3. **Nested regions never echo**: reconciliation transactions are
//!    tagged and never forwarded back to the parent
//! 4. **Invalid documents are recovered, not dropped**: the editor
//!    switches to a raw/tree editing surface that shows the errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reprose_author::{Editor, EditorConfig, HeadlessHost};
//!
//! let mut editor = Editor::new(
//!     EditorConfig::default(),
//!     &features,
//!     &initial_json,
//!     Some(Box::new(|doc| save(doc))),
//!     Box::new(HeadlessHost::new()),
//! )?;
//!
//! editor.handle_text_input("Hello")?;
//! editor.handle_key("Mod-a")?;
//!
//! if let MenuActivation::Pending(action) = editor.activate_menu_option("inline", "link")? {
//!     editor.complete_menu_action(action.await)?;
//! }
//! ```

mod attribute_editor;
mod capabilities;
mod config;
mod editor;
mod errors;
mod feature;
mod input_rules;
mod keymap;
mod menu;
mod nested;
mod plugin;
mod recovery;
mod schema;
mod session;
mod view;

pub use attribute_editor::{attribute_editor_factory, AttributeControl, AttributeEditorView};
pub use capabilities::{aggregate_capabilities, Capabilities};
pub use config::{EditorConfig, Platform, SchemaPolicy};
pub use editor::{ChangeHandler, Editor, EditorMode};
pub use errors::{EditorError, EditorResult};
pub use feature::{Feature, Hook, Keymap};
pub use input_rules::{typographic_rules, InputRule, InputRulesPlugin};
pub use keymap::{baseline_keymap, chain, KeyBindingTable, KeyCombo};
pub use menu::{
    command_enabled, find_option, menu_group, merge_menus, AsyncAction, MenuActivation,
    MenuGroups, MenuOption, MenuRun, MenuState, Predicate,
};
pub use nested::{nested_region_factory, reconcile_range, NestedRegionController, RECONCILE_META};
pub use plugin::{KeymapPlugin, NodeViewPlugin, Plugin};
pub use recovery::{FallbackDraft, FallbackRecoveryController, RecoveryState, RecoverySurface};
pub use schema::{features_to_schema, merge_descriptor, minimal_descriptor, AggregatedSchema};
pub use session::EditorView;
pub use view::{
    BoxFuture, ContainerId, Coords, DomMutation, EventTarget, HeadlessHost, MountRequest,
    NodeView, NodeViewFactory, RenderHost, Rendered, ViewContext, ViewEvent, ViewUpdate,
};

// Re-export the document engine for feature authors
pub use reprose_model;
