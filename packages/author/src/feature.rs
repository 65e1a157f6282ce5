//! # Features
//!
//! A [`Feature`] is a record of optional capabilities. Declarations (nodes
//! and marks) are plain data; everything that needs the merged schema is a
//! hook, a pure function of the schema that may be called any number of
//! times. Aggregation skips absent hooks.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reprose_model::{Command, MarkSpec, NodeSpec, Schema};

use crate::input_rules::InputRule;
use crate::menu::MenuGroups;
use crate::plugin::Plugin;

/// A pure function of the merged schema
pub type Hook<T> = Arc<dyn Fn(&Schema) -> T + Send + Sync>;

/// Key bindings declared by one feature, in declaration order. Keys are
/// combos such as `"Mod-b"` or `"Shift-Ctrl-0"`.
pub type Keymap = IndexMap<String, Command>;

#[derive(Clone, Default)]
pub struct Feature {
    name: String,
    nodes: IndexMap<String, NodeSpec>,
    marks: IndexMap<String, MarkSpec>,
    menu: Option<Hook<MenuGroups>>,
    input_rules: Option<Hook<Vec<InputRule>>>,
    keymap: Option<Hook<Keymap>>,
    plugins: Option<Hook<Vec<Arc<dyn Plugin>>>>,
}

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn with_node(mut self, name: impl Into<String>, spec: NodeSpec) -> Self {
        self.nodes.insert(name.into(), spec);
        self
    }

    pub fn with_mark(mut self, name: impl Into<String>, spec: MarkSpec) -> Self {
        self.marks.insert(name.into(), spec);
        self
    }

    pub fn with_menu(
        mut self,
        hook: impl Fn(&Schema) -> MenuGroups + Send + Sync + 'static,
    ) -> Self {
        self.menu = Some(Arc::new(hook));
        self
    }

    pub fn with_input_rules(
        mut self,
        hook: impl Fn(&Schema) -> Vec<InputRule> + Send + Sync + 'static,
    ) -> Self {
        self.input_rules = Some(Arc::new(hook));
        self
    }

    pub fn with_keymap(mut self, hook: impl Fn(&Schema) -> Keymap + Send + Sync + 'static) -> Self {
        self.keymap = Some(Arc::new(hook));
        self
    }

    pub fn with_plugins(
        mut self,
        hook: impl Fn(&Schema) -> Vec<Arc<dyn Plugin>> + Send + Sync + 'static,
    ) -> Self {
        self.plugins = Some(Arc::new(hook));
        self
    }

    pub fn nodes(&self) -> &IndexMap<String, NodeSpec> {
        &self.nodes
    }

    pub fn marks(&self) -> &IndexMap<String, MarkSpec> {
        &self.marks
    }

    pub fn menu(&self, schema: &Schema) -> Option<MenuGroups> {
        self.menu.as_ref().map(|hook| hook(schema))
    }

    pub fn input_rules(&self, schema: &Schema) -> Option<Vec<InputRule>> {
        self.input_rules.as_ref().map(|hook| hook(schema))
    }

    pub fn keymap(&self, schema: &Schema) -> Option<Keymap> {
        self.keymap.as_ref().map(|hook| hook(schema))
    }

    pub fn plugins(&self, schema: &Schema) -> Option<Vec<Arc<dyn Plugin>>> {
        self.plugins.as_ref().map(|hook| hook(schema))
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("marks", &self.marks.keys().collect::<Vec<_>>())
            .field("menu", &self.menu.is_some())
            .field("input_rules", &self.input_rules.is_some())
            .field("keymap", &self.keymap.is_some())
            .field("plugins", &self.plugins.is_some())
            .finish()
    }
}
