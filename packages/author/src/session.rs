//! # Editor View
//!
//! The primary editing session. Every transaction goes through
//! [`EditorView::dispatch`], the single dispatch point; transactions that
//! plugins or node views produce are queued and applied in order after the
//! one that triggered them.
//!
//! Node views are kept in a registry keyed by the position of their node.
//! After each transaction the registry is mapped through the
//! transaction's steps: views whose node was deleted are destroyed, views
//! whose node changed type are rebuilt, and the rest receive the new node.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reprose_model::{EditorState, Mapping, Node, Selection, Transaction};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Platform;
use crate::errors::{EditorError, EditorResult};
use crate::keymap::KeyCombo;
use crate::plugin::Plugin;
use crate::view::{
    DomMutation, EventTarget, NodeView, NodeViewFactory, RenderHost, Rendered, ViewContext,
    ViewEvent, ViewUpdate,
};

struct MountedView {
    type_name: String,
    view: Box<dyn NodeView>,
    selected: bool,
}

pub struct EditorView {
    state: EditorState,
    plugins: Vec<Arc<dyn Plugin>>,
    factories: IndexMap<String, NodeViewFactory>,
    views: BTreeMap<usize, MountedView>,
    host: Box<dyn RenderHost>,
    platform: Platform,
    editable: bool,
    dispatch_count: usize,
    changes: Vec<Value>,
}

impl EditorView {
    /// Open a session on `state`. A read-only session (`editable` false)
    /// refuses transactions that change the document; node views see both
    /// settings through their [`ViewContext`].
    pub fn new(
        state: EditorState,
        plugins: Vec<Arc<dyn Plugin>>,
        host: Box<dyn RenderHost>,
        platform: Platform,
        editable: bool,
    ) -> Self {
        let mut factories: IndexMap<String, NodeViewFactory> = IndexMap::new();
        for plugin in &plugins {
            for (type_name, factory) in plugin.node_views() {
                // The first plugin to provide a view for a type wins
                factories.entry(type_name).or_insert(factory);
            }
        }

        let mut view = Self {
            state,
            plugins,
            factories,
            views: BTreeMap::new(),
            host,
            platform,
            editable,
            dispatch_count: 0,
            changes: Vec::new(),
        };

        let mut outbox = Vec::new();
        view.sync_views(None, &mut outbox);
        if let Err(err) = view.drain(outbox) {
            warn!(error = %err, "Node view transaction rejected during setup");
        }
        view
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Number of transactions dispatched so far
    pub fn dispatch_count(&self) -> usize {
        self.dispatch_count
    }

    /// Serialized documents of the changes committed since the last call
    pub fn take_changes(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.changes)
    }

    /// Apply a transaction, then any transactions it triggers
    pub fn dispatch(&mut self, tr: Transaction) -> EditorResult<()> {
        self.drain(vec![tr])
    }

    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        let mut tr = self.state.tr();
        tr.set_selection(selection);
        self.dispatch(tr)
    }

    /// Select the node starting at `pos`
    pub fn select_node(&mut self, pos: usize) -> EditorResult<()> {
        let selection = Selection::node(self.state.doc(), pos)?;
        self.set_selection(selection)
    }

    /// Run a key combo through the plugins
    pub fn handle_key(&mut self, combo: &str) -> EditorResult<bool> {
        let combo = KeyCombo::parse(combo, self.platform)?;
        let mut outgoing = Vec::new();
        let handled = self.plugins.iter().any(|plugin| {
            plugin.handle_key(&self.state, &combo, &mut |tr| outgoing.push(tr))
        });
        debug!(combo = %combo, handled, "Key handled");
        self.drain(outgoing)?;
        Ok(handled)
    }

    /// Type `text` over the selection. Plugins get the first chance; the
    /// default inserts the text.
    pub fn handle_text_input(&mut self, text: &str) -> EditorResult<bool> {
        if !self.editable {
            return Err(EditorError::ReadOnly);
        }
        let selection = self.state.selection();
        let (from, to) = (selection.from(), selection.to());

        let mut outgoing = Vec::new();
        let handled = self.plugins.iter().any(|plugin| {
            plugin.handle_text_input(&self.state, from, to, text, &mut |tr| outgoing.push(tr))
        });
        if handled {
            self.drain(outgoing)?;
            return Ok(true);
        }

        let mut tr = self.state.tr();
        match tr.insert_text(text, from, to) {
            Ok(_) => {
                self.dispatch(tr)?;
                Ok(true)
            }
            Err(err) => {
                debug!(error = %err, from, to, "Text cannot go here");
                Ok(false)
            }
        }
    }

    /// Deliver a host event. Node views that claim the event handle it;
    /// otherwise keys and text on the editor surface are handled here.
    pub fn handle_event(&mut self, event: &ViewEvent) -> EditorResult<bool> {
        if !self.editable
            && matches!(event, ViewEvent::TextInput { .. } | ViewEvent::Change { .. })
        {
            return Err(EditorError::ReadOnly);
        }

        let claimed = self
            .views
            .iter()
            .find(|(_, mounted)| mounted.view.stop_event(event))
            .map(|(pos, _)| *pos);

        if let Some(pos) = claimed {
            let mut outbox = Vec::new();
            let handled = match self.views.get_mut(&pos) {
                Some(mounted) => {
                    let mut ctx =
                        ViewContext::new(&self.state, pos, self.host.as_mut(), &mut outbox)
                            .with_session(self.platform, self.editable);
                    mounted.view.handle_event(event, &mut ctx)
                }
                None => false,
            };
            if let Err(err) = self.drain(outbox) {
                self.resync_views();
                return Err(err);
            }
            return Ok(handled);
        }

        match event {
            ViewEvent::Key {
                target: EventTarget::Editor,
                combo,
            } => self.handle_key(combo),
            ViewEvent::TextInput {
                target: EventTarget::Editor,
                text,
            } => self.handle_text_input(text),
            ViewEvent::SelectionChange {
                target: EventTarget::Editor,
                anchor,
                head,
            } => {
                let size = self.state.doc().content().size();
                if *anchor > size || *head > size {
                    return Ok(false);
                }
                self.set_selection(Selection::text(*anchor, *head))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Whether a node view asked for this mutation to be disregarded
    pub fn ignores_mutation(&self, mutation: &DomMutation) -> bool {
        self.views
            .values()
            .any(|mounted| mounted.view.ignore_mutation(mutation))
    }

    /// What the node view at `pos` shows, if there is one
    pub fn rendered(&self, pos: usize) -> Option<Rendered> {
        self.views.get(&pos).map(|mounted| mounted.view.render())
    }

    /// All node views as `(pos, type, rendering)`
    pub fn node_views(&self) -> Vec<(usize, &str, Rendered)> {
        self.views
            .iter()
            .map(|(pos, mounted)| (*pos, mounted.type_name.as_str(), mounted.view.render()))
            .collect()
    }

    /// Tear down every node view
    pub fn destroy(&mut self) {
        for (_, mut mounted) in std::mem::take(&mut self.views) {
            mounted.view.destroy(self.host.as_mut());
        }
    }

    /// Swap in an unrelated state, such as a document replaced upstream.
    /// Every node view is rebuilt and no change is recorded.
    pub fn replace_state(&mut self, state: EditorState) -> EditorResult<()> {
        self.destroy();
        self.state = state;
        let mut outbox = Vec::new();
        self.sync_views(None, &mut outbox);
        self.drain(outbox)
    }

    /// Tear down the view and give back its render host
    pub fn into_host(mut self) -> Box<dyn RenderHost> {
        self.destroy();
        self.host
    }

    /// Hand every node view its node from the current document. Views that
    /// ran ahead of a transaction the document refused are brought back.
    fn resync_views(&mut self) {
        let mut outbox = Vec::new();
        self.sync_views(None, &mut outbox);
        if let Err(err) = self.drain(outbox) {
            warn!(error = %err, "Node view transaction rejected while resyncing");
        }
    }

    fn drain(&mut self, transactions: Vec<Transaction>) -> EditorResult<()> {
        let mut queue: VecDeque<Transaction> = transactions.into();
        let mut first_error = None;
        while let Some(tr) = queue.pop_front() {
            match self.apply(tr) {
                Ok(outgoing) => queue.extend(outgoing),
                Err(err) => {
                    warn!(error = %err, "Transaction rejected");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply(&mut self, tr: Transaction) -> EditorResult<Vec<Transaction>> {
        self.dispatch_count += 1;
        if !self.editable && tr.doc_changed() {
            return Err(EditorError::ReadOnly);
        }
        self.state = self.state.apply(&tr)?;
        if tr.doc_changed() {
            self.changes.push(self.state.to_json());
        }
        debug!(
            dispatches = self.dispatch_count,
            changed = tr.doc_changed(),
            "Transaction dispatched"
        );

        let mut outbox = Vec::new();
        self.sync_views(Some(tr.mapping()), &mut outbox);
        Ok(outbox)
    }

    fn sync_views(&mut self, mapping: Option<&Mapping>, outbox: &mut Vec<Transaction>) {
        let mut survivors: BTreeMap<usize, MountedView> = BTreeMap::new();
        for (pos, mut mounted) in std::mem::take(&mut self.views) {
            let (pos, deleted) = match mapping {
                Some(mapping) => {
                    let result = mapping.map_result(pos, 1);
                    (result.pos, result.deleted)
                }
                None => (pos, false),
            };
            if deleted {
                debug!(pos, node = %mounted.type_name, "Node view destroyed with its node");
                mounted.view.destroy(self.host.as_mut());
                continue;
            }
            if let Some(mut displaced) = survivors.insert(pos, mounted) {
                displaced.view.destroy(self.host.as_mut());
            }
        }

        let mut wanted: Vec<(usize, Node)> = Vec::new();
        let factories = &self.factories;
        self.state.doc().descendants(&mut |node, pos| {
            if factories.contains_key(node.type_name()) {
                wanted.push((pos, node.clone()));
            }
            true
        });

        for (pos, node) in wanted {
            let kept = match survivors.remove(&pos) {
                Some(mut mounted) if mounted.type_name == node.type_name() => {
                    let mut ctx = ViewContext::new(&self.state, pos, self.host.as_mut(), outbox)
            .with_session(self.platform, self.editable);
                    match mounted.view.update(&node, &mut ctx) {
                        ViewUpdate::Kept => Some(mounted),
                        ViewUpdate::RebuildRequired => {
                            debug!(pos, node = %mounted.type_name, "Node view rebuilt");
                            mounted.view.destroy(self.host.as_mut());
                            None
                        }
                    }
                }
                Some(mut mounted) => {
                    mounted.view.destroy(self.host.as_mut());
                    None
                }
                None => None,
            };
            let mounted = match kept {
                Some(mounted) => Some(mounted),
                None => self.create_view(&node, pos, outbox),
            };
            if let Some(mounted) = mounted {
                self.views.insert(pos, mounted);
            }
        }

        for (_, mut mounted) in survivors {
            mounted.view.destroy(self.host.as_mut());
        }

        let selected = self.state.selection().node_pos();
        for (pos, mounted) in self.views.iter_mut() {
            let should_select = selected == Some(*pos);
            if should_select == mounted.selected {
                continue;
            }
            let mut ctx = ViewContext::new(&self.state, *pos, self.host.as_mut(), outbox)
                .with_session(self.platform, self.editable);
            if should_select {
                mounted.view.select_node(&mut ctx);
            } else {
                mounted.view.deselect_node(&mut ctx);
            }
            mounted.selected = should_select;
        }
    }

    fn create_view(
        &mut self,
        node: &Node,
        pos: usize,
        outbox: &mut Vec<Transaction>,
    ) -> Option<MountedView> {
        let factory = self.factories.get(node.type_name())?.clone();
        let mut ctx = ViewContext::new(&self.state, pos, self.host.as_mut(), outbox)
            .with_session(self.platform, self.editable);
        let view = factory(node, &mut ctx);
        debug!(pos, node = %node.type_name(), "Node view created");
        Some(MountedView {
            type_name: node.type_name().to_string(),
            view,
            selected: false,
        })
    }
}

impl fmt::Debug for EditorView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorView")
            .field("doc", &self.state.doc().text_content())
            .field("selection", &self.state.selection())
            .field("views", &self.views.keys().collect::<Vec<_>>())
            .field("editable", &self.editable)
            .field("dispatch_count", &self.dispatch_count)
            .finish()
    }
}
