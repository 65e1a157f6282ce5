//! # Reprose Model
//!
//! Small reference document engine used by the Reprose editor core.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: descriptor → compiled node types    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ node: immutable trees, JSON in/out          │
//! │  - Positions and resolution                 │
//! │  - Fragment diffing                         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ state: steps → transactions → EditorState   │
//! │  - Position mapping                         │
//! │  - Built-in commands                        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Documents are values**: every change produces a new tree
//! 2. **Steps are closed**: a replace never leaves a node half open
//! 3. **Transactions remember their origin**: a state refuses to apply a
//!    transaction built against another document
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reprose_model::{EditorState, Schema};
//!
//! let schema = Arc::new(Schema::new(descriptor)?);
//! let state = EditorState::from_json(schema, &json)?;
//!
//! let mut tr = state.tr();
//! tr.insert_text("Hello", 1, 1)?;
//! let state = state.apply(&tr)?;
//! ```

mod commands;
mod content_expr;
mod error;
mod json;
mod node;
mod resolve;
mod schema;
mod selection;
mod spec;
mod state;
mod step;
mod structure;
mod transaction;

#[cfg(test)]
mod test_support;

pub use commands::{
    block_active, can_insert, delete_backward, delete_forward, delete_selection, insert_point,
    mark_active, replace_selection_with, select_all, select_parent_node, set_block_type,
    toggle_mark, Command,
};
pub use error::{ModelError, ModelResult};
pub use node::{Fragment, Mark, Node, TEXT_TYPE};
pub use resolve::ResolvedPos;
pub use schema::{NodeType, Schema, SchemaDescriptor, DOC_TYPE};
pub use selection::Selection;
pub use spec::{AttrSpec, Attrs, MarkSpec, NodeSpec};
pub use state::EditorState;
pub use step::{MapResult, Mapping, Step, StepMap};
pub use structure::{
    join_down, join_up, lift, lift_list_item, sink_list_item, split_list_item, wrap_in,
};
pub use transaction::Transaction;
