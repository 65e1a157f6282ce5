//! # Nested Regions
//!
//! A node view that edits its node's content in a separate child session
//! while the node is selected.
//!
//! ```text
//!   Closed ──select──▶ Open ──deselect / destroy──▶ Closed
//!
//!   Open:
//!     child edit ──▶ apply to child ──▶ offset steps ──▶ parent dispatch
//!     parent edit ──▶ diff node content ──▶ tagged child transaction
//! ```
//!
//! The child session owns its own copy of the node, seeded from the parent
//! when the region opens. Transactions built while reconciling parent
//! changes carry [`RECONCILE_META`] and are never forwarded back.

use std::sync::Arc;

use reprose_model::{EditorState, Fragment, Node, Schema, Selection, Transaction};
use tracing::{debug, warn};

use crate::config::Platform;
use crate::errors::EditorError;
use crate::keymap::{baseline_keymap, KeyBindingTable, KeyCombo};
use crate::view::{
    ContainerId, DomMutation, EventTarget, MountRequest, NodeView, NodeViewFactory, RenderHost,
    Rendered, ViewContext, ViewEvent, ViewUpdate,
};

/// Meta key marking a child transaction that reconciles a parent change
pub const RECONCILE_META: &str = "reprose.reconcile";

/// The smallest range that differs between `new` and `old`, as
/// `(start, end_in_new, end_in_old)`. `None` when the fragments are equal.
pub fn reconcile_range(new: &Fragment, old: &Fragment) -> Option<(usize, usize, usize)> {
    let start = new.find_diff_start(old, 0)?;
    let (mut end_new, mut end_old) = new
        .find_diff_end(old, new.size(), old.size())
        .unwrap_or((new.size(), old.size()));
    let overlap = start.saturating_sub(end_new.min(end_old));
    if overlap > 0 {
        end_new += overlap;
        end_old += overlap;
    }
    Some((start, end_new, end_old))
}

struct OpenRegion {
    child: EditorState,
    container: ContainerId,
    offset: usize,
}

pub struct NestedRegionController {
    node: Node,
    schema: Arc<Schema>,
    keymap: KeyBindingTable,
    platform: Platform,
    region: Option<OpenRegion>,
    inner_dispatches: usize,
}

impl NestedRegionController {
    /// A closed controller for `node`. The child session uses the baseline
    /// key table, resolved for `platform`.
    pub fn new(node: &Node, schema: Arc<Schema>, platform: Platform) -> Self {
        let keymap =
            KeyBindingTable::from_keymap(&baseline_keymap(), platform).unwrap_or_default();
        Self {
            node: node.clone(),
            schema,
            keymap,
            platform,
            region: None,
            inner_dispatches: 0,
        }
    }

    pub fn with_keymap(mut self, keymap: KeyBindingTable, platform: Platform) -> Self {
        self.keymap = keymap;
        self.platform = platform;
        self
    }

    pub fn is_open(&self) -> bool {
        self.region.is_some()
    }

    pub fn child_state(&self) -> Option<&EditorState> {
        self.region.as_ref().map(|region| &region.child)
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.region.as_ref().map(|region| region.container)
    }

    /// Parent position of the child's position 0
    pub fn offset(&self) -> Option<usize> {
        self.region.as_ref().map(|region| region.offset)
    }

    /// Transactions applied to the child session so far
    pub fn inner_dispatch_count(&self) -> usize {
        self.inner_dispatches
    }

    fn open(&mut self, ctx: &mut ViewContext<'_>) {
        if self.region.is_some() {
            return;
        }
        let child = match EditorState::for_node(self.schema.clone(), self.node.clone()) {
            Ok(child) => child,
            Err(err) => {
                let err = EditorError::NestedSession(err.to_string());
                warn!(error = %err, node = %self.node.type_name(), "Nested region stays closed");
                return;
            }
        };
        let pos = ctx.pos();
        let anchor = ctx.host().coords_at_pos(pos);
        let container = ctx.host().mount(MountRequest {
            kind: "nested-region".to_string(),
            anchor,
        });
        debug!(pos, container = %container, "Nested region opened");
        self.region = Some(OpenRegion {
            child,
            container,
            offset: pos + 1,
        });
    }

    fn close(&mut self, host: &mut dyn RenderHost) {
        if let Some(region) = self.region.take() {
            host.unmount(region.container);
            debug!(container = %region.container, "Nested region closed");
        }
    }

    /// The child session's dispatch point. Each transaction is applied to
    /// the child first; the steps of those that do not reconcile a parent
    /// change are then replayed on the parent as one transaction. Returns
    /// whether any transaction reached the child.
    fn dispatch_inner(
        &mut self,
        transactions: Vec<Transaction>,
        ctx: &mut ViewContext<'_>,
    ) -> bool {
        let Some(region) = self.region.as_mut() else {
            return false;
        };
        let offset = ctx.pos() + 1;
        let mut outer = ctx.state().tr();
        let mut applied = false;

        for tr in transactions {
            let reconciling = tr.get_meta(RECONCILE_META).is_some();
            if !reconciling && tr.doc_changed() && !ctx.is_editable() {
                debug!("Read-only session; child edit dropped");
                continue;
            }
            match region.child.apply(&tr) {
                Ok(next) => region.child = next,
                Err(err) => {
                    warn!(error = %err, "Child transaction rejected");
                    continue;
                }
            }
            self.inner_dispatches += 1;
            applied = true;
            if reconciling {
                continue;
            }

            for step in tr.steps() {
                if let Err(err) = outer.step(step.offset(offset)) {
                    warn!(error = %err, "Child edit does not fit the parent; resetting child");
                    if let Ok(child) =
                        EditorState::for_node(self.schema.clone(), self.node.clone())
                    {
                        region.child = child;
                    }
                    return applied;
                }
            }
        }

        if outer.doc_changed() {
            ctx.dispatch(outer);
        }
        applied
    }

    /// Bring the open child session in line with `node`, the parent's
    /// current version of it
    fn reconcile(&mut self, node: &Node, ctx: &mut ViewContext<'_>) {
        let Some(region) = self.region.as_mut() else {
            return;
        };
        region.offset = ctx.pos() + 1;
        let old = region.child.doc().content();
        let Some((start, end_new, end_old)) = reconcile_range(node.content(), old) else {
            return;
        };

        let mut tr = region.child.tr();
        if tr.replace(start, end_old, node.slice(start, end_new)).is_err() {
            let mut full = region.child.tr();
            if full.replace(0, old.size(), node.content().clone()).is_err() {
                warn!("Child cannot take the parent's content; reseeding");
                if let Ok(child) = EditorState::for_node(self.schema.clone(), node.clone()) {
                    region.child = child;
                }
                return;
            }
            tr = full;
        }
        tr.set_meta(RECONCILE_META, true);
        debug!(start, end_new, end_old, "Reconciling child with parent");
        self.dispatch_inner(vec![tr], ctx);
    }

    fn handle_child_key(&mut self, combo: &str, ctx: &mut ViewContext<'_>) -> bool {
        let Some(region) = self.region.as_ref() else {
            return false;
        };
        let Ok(combo) = KeyCombo::parse(combo, self.platform) else {
            return false;
        };
        let mut produced = Vec::new();
        let handled = self
            .keymap
            .handle(&region.child, &combo, &mut |tr| produced.push(tr));
        self.dispatch_inner(produced, ctx);
        handled
    }

    fn handle_child_text(&mut self, text: &str, ctx: &mut ViewContext<'_>) -> bool {
        let Some(region) = self.region.as_ref() else {
            return false;
        };
        if !ctx.is_editable() {
            return false;
        }
        let selection = region.child.selection();
        let mut tr = region.child.tr();
        if tr
            .insert_text(text, selection.from(), selection.to())
            .is_err()
        {
            return false;
        }
        self.dispatch_inner(vec![tr], ctx)
    }

    fn handle_child_selection(&mut self, anchor: usize, head: usize) -> bool {
        let Some(region) = self.region.as_mut() else {
            return false;
        };
        let size = region.child.doc().content().size();
        if anchor > size || head > size {
            return false;
        }
        region.child = region.child.with_selection(Selection::text(anchor, head));
        true
    }

    fn owns(&self, target: EventTarget) -> bool {
        matches!(
            (target, self.container()),
            (EventTarget::Container(target), Some(container)) if target == container
        )
    }
}

impl NodeView for NestedRegionController {
    fn render(&self) -> Rendered {
        match &self.region {
            Some(region) => Rendered::Region {
                container: region.container,
                text: region.child.doc().text_content(),
            },
            None => Rendered::Text {
                text: self.node.text_content(),
            },
        }
    }

    fn select_node(&mut self, ctx: &mut ViewContext<'_>) {
        self.open(ctx);
    }

    fn deselect_node(&mut self, ctx: &mut ViewContext<'_>) {
        self.close(ctx.host());
    }

    fn update(&mut self, node: &Node, ctx: &mut ViewContext<'_>) -> ViewUpdate {
        if !node.same_markup(&self.node) {
            return ViewUpdate::RebuildRequired;
        }
        self.node = node.clone();
        self.reconcile(node, ctx);
        ViewUpdate::Kept
    }

    fn stop_event(&self, event: &ViewEvent) -> bool {
        self.owns(event.target())
    }

    fn ignore_mutation(&self, mutation: &DomMutation) -> bool {
        self.owns(mutation.target)
    }

    fn handle_event(&mut self, event: &ViewEvent, ctx: &mut ViewContext<'_>) -> bool {
        match event {
            ViewEvent::Key { combo, .. } => self.handle_child_key(combo, ctx),
            ViewEvent::TextInput { text, .. } => self.handle_child_text(text, ctx),
            ViewEvent::SelectionChange { anchor, head, .. } => {
                self.handle_child_selection(*anchor, *head)
            }
            ViewEvent::MouseDown { .. } => true,
            ViewEvent::Change { .. } => false,
        }
    }

    fn destroy(&mut self, host: &mut dyn RenderHost) {
        self.close(host);
    }
}

/// Node view factory that edits nodes in nested regions
pub fn nested_region_factory() -> NodeViewFactory {
    Arc::new(|node, ctx| {
        let schema = ctx.state().schema().clone();
        Box::new(NestedRegionController::new(node, schema, ctx.platform())) as Box<dyn NodeView>
    })
}
