//! # Menu Model
//!
//! Features declare menu options in named groups. Merging is a two-level
//! ordered union where a later `(group, option)` declaration replaces the
//! earlier one outright. Option state is evaluated on demand against the
//! current editor state.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reprose_model::{Command, EditorState, Schema, Transaction};
use serde::Serialize;
use tracing::debug;

use crate::errors::{EditorError, EditorResult};
use crate::feature::Feature;
use crate::view::BoxFuture;

/// A predicate over the editor state
pub type Predicate = Arc<dyn Fn(&EditorState) -> bool + Send + Sync>;

/// An action that awaits something outside the editor before producing a
/// transaction against the state it was started from
pub type AsyncAction =
    Arc<dyn Fn(&EditorState) -> BoxFuture<EditorResult<Transaction>> + Send + Sync>;

#[derive(Clone)]
pub enum MenuRun {
    Command(Command),
    Async(AsyncAction),
}

#[derive(Clone)]
pub struct MenuOption {
    pub label: String,
    /// Rendering hint for the host, such as an icon name
    pub hint: Option<String>,
    pub run: MenuRun,
    pub active: Option<Predicate>,
    pub enable: Option<Predicate>,
}

impl MenuOption {
    pub fn command(label: impl Into<String>, command: Command) -> Self {
        Self {
            label: label.into(),
            hint: None,
            run: MenuRun::Command(command),
            active: None,
            enable: None,
        }
    }

    pub fn asynchronous(label: impl Into<String>, action: AsyncAction) -> Self {
        Self {
            label: label.into(),
            hint: None,
            run: MenuRun::Async(action),
            active: None,
            enable: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_active(
        mut self,
        active: impl Fn(&EditorState) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.active = Some(Arc::new(active));
        self
    }

    pub fn with_enable(
        mut self,
        enable: impl Fn(&EditorState) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.enable = Some(Arc::new(enable));
        self
    }

    /// `active` defaults to false and `enable` to true when undeclared
    pub fn evaluate(&self, state: &EditorState) -> MenuState {
        MenuState {
            active: self.active.as_ref().map(|p| p(state)).unwrap_or(false),
            enabled: self.enable.as_ref().map(|p| p(state)).unwrap_or(true),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self.run, MenuRun::Async(_))
    }
}

impl fmt::Debug for MenuOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuOption")
            .field("label", &self.label)
            .field("hint", &self.hint)
            .field("async", &self.is_async())
            .field("active", &self.active.is_some())
            .field("enable", &self.enable.is_some())
            .finish()
    }
}

/// Evaluated state of one option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MenuState {
    pub active: bool,
    pub enabled: bool,
}

/// A predicate that dry-runs `command`
pub fn command_enabled(command: Command) -> impl Fn(&EditorState) -> bool + Send + Sync {
    move |state: &EditorState| command(state, None)
}

/// group id → option id → option
pub type MenuGroups = IndexMap<String, IndexMap<String, MenuOption>>;

/// Helper for features building their menu declaration
pub fn menu_group(
    group: impl Into<String>,
    options: impl IntoIterator<Item = (&'static str, MenuOption)>,
) -> MenuGroups {
    let mut groups = MenuGroups::new();
    groups.insert(
        group.into(),
        options
            .into_iter()
            .map(|(id, option)| (id.to_string(), option))
            .collect(),
    );
    groups
}

/// Merge feature menus in registration order
pub fn merge_menus(features: &[Feature], schema: &Schema) -> MenuGroups {
    let mut merged = MenuGroups::new();
    for feature in features {
        let Some(groups) = feature.menu(schema) else {
            continue;
        };
        for (group_id, options) in groups {
            let group = merged.entry(group_id.clone()).or_default();
            for (option_id, option) in options {
                if group.insert(option_id.clone(), option).is_some() {
                    debug!(
                        feature = %feature.name(),
                        group = %group_id,
                        option = %option_id,
                        "Menu option overwritten"
                    );
                }
            }
        }
    }
    merged
}

/// Look up an option by its identity
pub fn find_option<'a>(
    menu: &'a MenuGroups,
    group: &str,
    option: &str,
) -> EditorResult<&'a MenuOption> {
    menu.get(group)
        .and_then(|options| options.get(option))
        .ok_or_else(|| EditorError::UnknownMenuOption {
            group: group.to_string(),
            option: option.to_string(),
        })
}

/// Outcome of activating a menu option
pub enum MenuActivation {
    /// The command ran; `true` if it handled the state
    Completed(bool),
    /// The action awaits something; hand its outcome to
    /// `Editor::complete_menu_action`
    Pending(BoxFuture<EditorResult<Transaction>>),
}

impl fmt::Debug for MenuActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuActivation::Completed(handled) => {
                f.debug_tuple("Completed").field(handled).finish()
            }
            MenuActivation::Pending(_) => f.write_str("Pending"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use reprose_model::{NodeSpec, SchemaDescriptor};
    use serde_json::json;

    fn state() -> EditorState {
        let mut nodes = IndexMap::new();
        nodes.insert("doc".to_string(), NodeSpec::new().with_content("block+"));
        nodes.insert("text".to_string(), NodeSpec::new().with_group("inline"));
        nodes.insert(
            "paragraph".to_string(),
            NodeSpec::new().with_content("inline*").with_group("block"),
        );
        let schema = Arc::new(Schema::new(SchemaDescriptor::new(nodes, IndexMap::new())).unwrap());
        EditorState::from_json(
            schema,
            &json!({ "type": "doc", "content": [{ "type": "paragraph" }] }),
        )
        .unwrap()
    }

    fn noop() -> Command {
        Arc::new(|_, _| false)
    }

    #[test]
    fn test_menu_merge_overwrite() {
        let state = state();
        let features = vec![
            Feature::new("first").with_menu(|_| {
                menu_group(
                    "blocks",
                    [
                        ("plain", MenuOption::command("First", noop())),
                        ("other", MenuOption::command("Other", noop())),
                    ],
                )
            }),
            Feature::new("second").with_menu(|_| {
                menu_group("blocks", [("plain", MenuOption::command("Second", noop()))])
            }),
        ];

        let menu = merge_menus(&features, state.schema());
        let blocks = &menu["blocks"];
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks["plain"].label, "Second");
        // Overwriting keeps the original position
        assert_eq!(blocks.keys().next().map(String::as_str), Some("plain"));
    }

    #[test]
    fn test_groups_keep_registration_order() {
        let state = state();
        let features = vec![
            Feature::new("a")
                .with_menu(|_| menu_group("inline", [("em", MenuOption::command("Em", noop()))])),
            Feature::new("b")
                .with_menu(|_| menu_group("blocks", [("plain", MenuOption::command("P", noop()))])),
            Feature::new("c").with_menu(|_| {
                menu_group("inline", [("code", MenuOption::command("Code", noop()))])
            }),
        ];

        let menu = merge_menus(&features, state.schema());
        let groups: Vec<&str> = menu.keys().map(String::as_str).collect();
        assert_eq!(groups, vec!["inline", "blocks"]);
        let inline: Vec<&str> = menu["inline"].keys().map(String::as_str).collect();
        assert_eq!(inline, vec!["em", "code"]);
    }

    #[test]
    fn test_evaluate_defaults() {
        let state = state();
        let option = MenuOption::command("Nothing", noop());
        assert_eq!(
            option.evaluate(&state),
            MenuState {
                active: false,
                enabled: true
            }
        );

        let option = option.with_active(|_| true).with_enable(command_enabled(noop()));
        assert_eq!(
            option.evaluate(&state),
            MenuState {
                active: true,
                enabled: false
            }
        );
    }

    #[test]
    fn test_unknown_option() {
        let menu = MenuGroups::new();
        let err = find_option(&menu, "blocks", "plain").unwrap_err();
        assert_eq!(err.to_string(), "Unknown menu option: blocks.plain");
    }
}
