//! # Editor
//!
//! The host-facing entry point. An editor aggregates its features once at
//! construction, then runs either the primary editing session or, while
//! the canonical document is invalid, the fallback recovery controller.
//! Every committed document change reaches the change callback as the
//! full serialized document.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reprose_model::{EditorState, Schema, Selection, Transaction};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::capabilities::{aggregate_capabilities, Capabilities};
use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::feature::Feature;
use crate::menu::{find_option, merge_menus, MenuActivation, MenuGroups, MenuRun, MenuState};
use crate::recovery::FallbackRecoveryController;
use crate::schema::{features_to_schema, AggregatedSchema};
use crate::session::EditorView;
use crate::view::{HeadlessHost, RenderHost, ViewEvent};

/// Receives the serialized document after every committed change
pub type ChangeHandler = Box<dyn FnMut(Value) + Send>;

pub enum EditorMode {
    Editing(EditorView),
    Recovering(FallbackRecoveryController),
}

pub struct Editor {
    config: EditorConfig,
    aggregated: AggregatedSchema,
    capabilities: Capabilities,
    menu: MenuGroups,
    mode: EditorMode,
    on_change: Option<ChangeHandler>,
    /// Holds the render host while no editing session uses it
    idle_host: Option<Box<dyn RenderHost>>,
}

impl Editor {
    /// Build an editor. Aggregation errors surface here; an invalid
    /// `initial` document starts the editor in recovery. Without a change
    /// handler the editor is read-only.
    pub fn new(
        config: EditorConfig,
        features: &[Feature],
        initial: &Value,
        on_change: Option<ChangeHandler>,
        host: Box<dyn RenderHost>,
    ) -> EditorResult<Self> {
        let aggregated = features_to_schema(features, config.schema_policy)?;
        let capabilities = aggregate_capabilities(features, &aggregated.schema, &config)?;
        let menu = merge_menus(features, &aggregated.schema);
        info!(
            features = features.len(),
            plugins = capabilities.plugins.len(),
            menu_groups = menu.len(),
            read_only = on_change.is_none(),
            "Editor created"
        );

        let read_only = on_change.is_none();
        let (mode, idle_host) = match EditorState::from_json(aggregated.schema.clone(), initial) {
            Ok(state) => {
                let view = EditorView::new(
                    state,
                    capabilities.plugins.clone(),
                    host,
                    config.platform,
                    !read_only,
                );
                (EditorMode::Editing(view), None)
            }
            Err(err) => {
                warn!(error = %err, "Initial document is invalid; starting recovery");
                let controller = FallbackRecoveryController::new(
                    aggregated.schema.clone(),
                    initial.clone(),
                    read_only,
                );
                (EditorMode::Recovering(controller), Some(host))
            }
        };

        Ok(Self {
            config,
            aggregated,
            capabilities,
            menu,
            mode,
            on_change,
            idle_host,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.aggregated.schema
    }

    pub fn aggregated_schema(&self) -> &AggregatedSchema {
        &self.aggregated
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn menu(&self) -> &MenuGroups {
        &self.menu
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.on_change.is_none()
    }

    pub fn is_recovering(&self) -> bool {
        matches!(self.mode, EditorMode::Recovering(_))
    }

    pub fn view(&self) -> Option<&EditorView> {
        match &self.mode {
            EditorMode::Editing(view) => Some(view),
            EditorMode::Recovering(_) => None,
        }
    }

    pub fn recovery(&self) -> Option<&FallbackRecoveryController> {
        match &self.mode {
            EditorMode::Recovering(controller) => Some(controller),
            EditorMode::Editing(_) => None,
        }
    }

    pub fn state(&self) -> Option<&EditorState> {
        self.view().map(EditorView::state)
    }

    /// The canonical document
    pub fn to_json(&self) -> Value {
        match &self.mode {
            EditorMode::Editing(view) => view.state().to_json(),
            EditorMode::Recovering(controller) => controller.canonical().clone(),
        }
    }

    pub fn handle_key(&mut self, combo: &str) -> EditorResult<bool> {
        let result = self.editing()?.handle_key(combo);
        self.flush();
        result
    }

    pub fn handle_text_input(&mut self, text: &str) -> EditorResult<bool> {
        let result = self.editing()?.handle_text_input(text);
        self.flush();
        result
    }

    pub fn handle_event(&mut self, event: &ViewEvent) -> EditorResult<bool> {
        let result = self.editing()?.handle_event(event);
        self.flush();
        result
    }

    pub fn dispatch(&mut self, tr: Transaction) -> EditorResult<()> {
        let result = self.editing()?.dispatch(tr);
        self.flush();
        result
    }

    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        let result = self.editing()?.set_selection(selection);
        self.flush();
        result
    }

    pub fn select_node(&mut self, pos: usize) -> EditorResult<()> {
        let result = self.editing()?.select_node(pos);
        self.flush();
        result
    }

    pub fn menu_state(&self, group: &str, option: &str) -> EditorResult<MenuState> {
        let option = find_option(&self.menu, group, option)?;
        let state = self.state().ok_or(EditorError::Recovering)?;
        Ok(option.evaluate(state))
    }

    /// Every option's state, in display order
    pub fn menu_states(&self) -> EditorResult<IndexMap<String, IndexMap<String, MenuState>>> {
        let state = self.state().ok_or(EditorError::Recovering)?;
        Ok(self
            .menu
            .iter()
            .map(|(group, options)| {
                let states = options
                    .iter()
                    .map(|(id, option)| (id.clone(), option.evaluate(state)))
                    .collect();
                (group.clone(), states)
            })
            .collect())
    }

    /// Run a menu option. Disabled options do nothing. Asynchronous
    /// options hand back a future whose outcome goes to
    /// [`Editor::complete_menu_action`].
    pub fn activate_menu_option(
        &mut self,
        group: &str,
        option: &str,
    ) -> EditorResult<MenuActivation> {
        let option = find_option(&self.menu, group, option)?.clone();
        let view = self.editing()?;
        if !view.is_editable() {
            return Err(EditorError::ReadOnly);
        }
        if !option.evaluate(view.state()).enabled {
            debug!(group, option = %option.label, "Menu option disabled");
            return Ok(MenuActivation::Completed(false));
        }

        match &option.run {
            MenuRun::Command(command) => {
                let mut produced = Vec::new();
                let handled = command(view.state(), Some(&mut |tr: Transaction| produced.push(tr)));
                let mut result = Ok(());
                for tr in produced {
                    if let Err(err) = view.dispatch(tr) {
                        result = Err(err);
                        break;
                    }
                }
                self.flush();
                result.map(|_| MenuActivation::Completed(handled))
            }
            MenuRun::Async(action) => {
                debug!(group, option = %option.label, "Menu action pending");
                Ok(MenuActivation::Pending(action(view.state())))
            }
        }
    }

    /// Dispatch the outcome of an asynchronous menu action. A failure, or
    /// a transaction built against a document that has since changed,
    /// dispatches nothing.
    pub fn complete_menu_action(&mut self, outcome: EditorResult<Transaction>) -> EditorResult<()> {
        let tr = outcome.map_err(|err| match err {
            EditorError::AsyncAction(_) => err,
            other => EditorError::AsyncAction(other.to_string()),
        });
        let tr = match tr {
            Ok(tr) => tr,
            Err(err) => {
                warn!(error = %err, "Menu action failed");
                return Err(err);
            }
        };

        let view = self.editing()?;
        if tr.before() != view.state().doc() {
            let err = EditorError::AsyncAction(
                "the document changed while the action was pending".to_string(),
            );
            warn!(error = %err, "Stale menu action discarded");
            return Err(err);
        }
        let result = view.dispatch(tr);
        self.flush();
        result
    }

    /// Replace the recovery draft text
    pub fn edit_raw(&mut self, text: &str) -> EditorResult<()> {
        let committed = self.recovering()?.edit_raw(text)?;
        self.commit_recovered(committed)
    }

    /// Edit the parsed recovery draft at a JSON Pointer
    pub fn edit_tree(&mut self, pointer: &str, value: Value) -> EditorResult<()> {
        let committed = self.recovering()?.edit_tree(pointer, value)?;
        self.commit_recovered(committed)
    }

    /// The host's canonical document changed. A valid document replaces
    /// the session; an invalid one starts recovery. Nothing is emitted.
    pub fn upstream_changed(&mut self, value: Value) -> EditorResult<()> {
        if let EditorMode::Recovering(controller) = &mut self.mode {
            if let Some(doc) = controller.upstream_changed(value) {
                let state = EditorState::from_json(self.aggregated.schema.clone(), &doc)?;
                self.enter_editing(state)?;
            }
            return Ok(());
        }

        if self.state().map(EditorState::to_json).as_ref() == Some(&value) {
            return Ok(());
        }
        match EditorState::from_json(self.aggregated.schema.clone(), &value) {
            Ok(state) => self.enter_editing(state),
            Err(err) => {
                warn!(error = %err, "Upstream document is invalid; starting recovery");
                self.enter_recovery(value);
                Ok(())
            }
        }
    }

    /// Tear down the editing session's node views
    pub fn destroy(&mut self) {
        if let EditorMode::Editing(view) = &mut self.mode {
            view.destroy();
        }
    }

    fn editing(&mut self) -> EditorResult<&mut EditorView> {
        match &mut self.mode {
            EditorMode::Editing(view) => Ok(view),
            EditorMode::Recovering(_) => Err(EditorError::Recovering),
        }
    }

    fn recovering(&mut self) -> EditorResult<&mut FallbackRecoveryController> {
        match &mut self.mode {
            EditorMode::Recovering(controller) => Ok(controller),
            EditorMode::Editing(_) => Err(EditorError::NotRecovering),
        }
    }

    fn commit_recovered(&mut self, committed: Option<Value>) -> EditorResult<()> {
        let Some(doc) = committed else {
            return Ok(());
        };
        let state = EditorState::from_json(self.aggregated.schema.clone(), &doc)?;
        self.enter_editing(state)?;
        info!("Recovered document committed");
        self.emit(doc);
        Ok(())
    }

    fn enter_editing(&mut self, state: EditorState) -> EditorResult<()> {
        match &mut self.mode {
            EditorMode::Editing(view) => view.replace_state(state),
            EditorMode::Recovering(_) => {
                let host = self
                    .idle_host
                    .take()
                    .unwrap_or_else(|| Box::new(HeadlessHost::new()));
                let view = EditorView::new(
                    state,
                    self.capabilities.plugins.clone(),
                    host,
                    self.config.platform,
                    !self.is_read_only(),
                );
                self.mode = EditorMode::Editing(view);
                Ok(())
            }
        }
    }

    fn enter_recovery(&mut self, canonical: Value) {
        let controller = FallbackRecoveryController::new(
            self.aggregated.schema.clone(),
            canonical,
            self.is_read_only(),
        );
        let previous = std::mem::replace(&mut self.mode, EditorMode::Recovering(controller));
        if let EditorMode::Editing(view) = previous {
            self.idle_host = Some(view.into_host());
        }
    }

    fn flush(&mut self) {
        let EditorMode::Editing(view) = &mut self.mode else {
            return;
        };
        let changes = view.take_changes();
        if let Some(handler) = self.on_change.as_mut() {
            for change in changes {
                handler(change);
            }
        }
    }

    fn emit(&mut self, doc: Value) {
        if let Some(handler) = self.on_change.as_mut() {
            handler(doc);
        }
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.mode {
            EditorMode::Editing(_) => "editing",
            EditorMode::Recovering(_) => "recovering",
        };
        f.debug_struct("Editor")
            .field("config", &self.config)
            .field("mode", &mode)
            .field("capabilities", &self.capabilities)
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
