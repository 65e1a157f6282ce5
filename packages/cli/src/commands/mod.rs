pub mod check;
pub mod init;
pub mod menu;
pub mod outline;
pub mod schema;

pub use check::{check, CheckArgs};
pub use init::{init, InitArgs};
pub use menu::{menu, MenuArgs};
pub use outline::{outline, OutlineArgs};
pub use schema::{schema, SchemaArgs};

use anyhow::{Context, Result};
use reprose_author::{Editor, HeadlessHost};
use serde_json::Value;
use std::path::Path;

use crate::config::Config;

/// Read a JSON document from disk
pub(crate) fn read_document(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("parsing {}", path.display()))
}

/// A read-only editor over `document` with the configured features
pub(crate) fn open_editor(config: &Config, document: &Value) -> Result<Editor> {
    let features = config.build_features()?;
    let editor = Editor::new(
        config.editor.clone(),
        &features,
        document,
        None,
        Box::new(HeadlessHost::new()),
    )?;
    Ok(editor)
}
