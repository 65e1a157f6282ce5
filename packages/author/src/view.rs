//! # View Seams
//!
//! Interfaces between the editor core and the rendering collaborator.
//! A [`RenderHost`] supplies positions on screen, mount points for
//! auxiliary chrome and a place to run background work. A [`NodeView`]
//! takes over rendering and interaction for one node of the document.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reprose_model::{EditorState, Node, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::Platform;

/// Boxed future used for asynchronous actions and resolvers
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Handle of a container mounted by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Screen coordinates of a document position
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub left: f64,
    pub top: f64,
}

/// What a node view asks the host to mount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountRequest {
    /// Kind of chrome, e.g. `"nested-region"` or `"attribute-editor"`
    pub kind: String,
    /// Where the chrome should be anchored
    pub anchor: Coords,
}

/// Rendering collaborator
pub trait RenderHost: Send {
    fn coords_at_pos(&self, pos: usize) -> Coords;

    fn mount(&mut self, request: MountRequest) -> ContainerId;

    fn unmount(&mut self, container: ContainerId);

    /// Run background work, such as resolving an image URL. The host owns
    /// the executor and may drop the task.
    fn spawn(&mut self, task: BoxFuture<()>);
}

/// Host without a screen: records mounts and queues spawned tasks. Clones
/// share the same records, so a caller can keep a handle after giving one
/// to an editor.
#[derive(Clone, Default)]
pub struct HeadlessHost {
    inner: Arc<Mutex<HeadlessRecords>>,
}

#[derive(Default)]
struct HeadlessRecords {
    next_id: u64,
    mounted: Vec<(ContainerId, MountRequest)>,
    tasks: Vec<BoxFuture<()>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HeadlessRecords> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Currently mounted containers, in mount order
    pub fn mounted(&self) -> Vec<(ContainerId, MountRequest)> {
        self.records().mounted.clone()
    }

    pub fn is_mounted(&self, container: ContainerId) -> bool {
        self.records().mounted.iter().any(|(id, _)| *id == container)
    }

    /// Take the spawned tasks so the caller can drive them
    pub fn take_tasks(&self) -> Vec<BoxFuture<()>> {
        std::mem::take(&mut self.records().tasks)
    }

    pub fn pending_tasks(&self) -> usize {
        self.records().tasks.len()
    }
}

impl RenderHost for HeadlessHost {
    fn coords_at_pos(&self, pos: usize) -> Coords {
        Coords {
            left: pos as f64,
            top: 0.0,
        }
    }

    fn mount(&mut self, request: MountRequest) -> ContainerId {
        let mut records = self.records();
        records.next_id += 1;
        let id = ContainerId(records.next_id);
        debug!(container = %id, kind = %request.kind, "Mounted container");
        records.mounted.push((id, request));
        id
    }

    fn unmount(&mut self, container: ContainerId) {
        self.records().mounted.retain(|(id, _)| *id != container);
        debug!(container = %container, "Unmounted container");
    }

    fn spawn(&mut self, task: BoxFuture<()>) {
        self.records().tasks.push(task);
    }
}

impl fmt::Debug for HeadlessHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records = self.records();
        f.debug_struct("HeadlessHost")
            .field("mounted", &records.mounted)
            .field("tasks", &records.tasks.len())
            .finish()
    }
}

/// Where an event was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum EventTarget {
    /// The primary document surface
    Editor,
    /// A container mounted for a node view
    Container(ContainerId),
}

/// Input delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ViewEvent {
    Key { target: EventTarget, combo: String },
    TextInput { target: EventTarget, text: String },
    /// A form control in some chrome changed its value
    Change { target: EventTarget, value: Value },
    MouseDown { target: EventTarget },
    /// The host moved the text selection; positions are in the target's
    /// own document
    SelectionChange {
        target: EventTarget,
        anchor: usize,
        head: usize,
    },
}

impl ViewEvent {
    pub fn target(&self) -> EventTarget {
        match self {
            ViewEvent::Key { target, .. }
            | ViewEvent::TextInput { target, .. }
            | ViewEvent::Change { target, .. }
            | ViewEvent::MouseDown { target }
            | ViewEvent::SelectionChange { target, .. } => *target,
        }
    }
}

/// A structural change the host observed in rendered output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomMutation {
    pub target: EventTarget,
}

/// What a node view currently shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Rendered {
    /// Flattened, non-interactive text
    Text { text: String },
    /// A live nested editor mounted in `container`
    Region { container: ContainerId, text: String },
    /// Chrome for editing one attribute
    Chrome {
        container: ContainerId,
        attr: String,
        value: Value,
    },
    /// A resource that is still being resolved
    Pending { placeholder: String },
    /// A resolved resource
    Resource { src: String },
    /// Several parts side by side
    Group { parts: Vec<Rendered> },
}

/// Answer of [`NodeView::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewUpdate {
    /// The view absorbed the new node
    Kept,
    /// The view must be destroyed and created again
    RebuildRequired,
}

/// Access a node view gets to its surroundings during a call
pub struct ViewContext<'a> {
    state: &'a EditorState,
    pos: usize,
    host: &'a mut dyn RenderHost,
    outbox: &'a mut Vec<Transaction>,
    platform: Platform,
    editable: bool,
}

impl<'a> ViewContext<'a> {
    pub fn new(
        state: &'a EditorState,
        pos: usize,
        host: &'a mut dyn RenderHost,
        outbox: &'a mut Vec<Transaction>,
    ) -> Self {
        Self {
            state,
            pos,
            host,
            outbox,
            platform: Platform::current(),
            editable: true,
        }
    }

    /// Settings of the owning session
    pub fn with_session(mut self, platform: Platform, editable: bool) -> Self {
        self.platform = platform;
        self.editable = editable;
        self
    }

    /// State of the document the node lives in
    pub fn state(&self) -> &EditorState {
        self.state
    }

    /// Current position of the node
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Platform the owning session resolves `Mod` for
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Whether the owning session accepts document changes
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn host(&mut self) -> &mut dyn RenderHost {
        &mut *self.host
    }

    /// Queue a transaction for the owning session's dispatch point
    pub fn dispatch(&mut self, tr: Transaction) {
        self.outbox.push(tr);
    }
}

/// Custom rendering and interaction for one node
pub trait NodeView: Send {
    fn render(&self) -> Rendered;

    /// The node became the selected node
    fn select_node(&mut self, _ctx: &mut ViewContext<'_>) {}

    fn deselect_node(&mut self, _ctx: &mut ViewContext<'_>) {}

    /// The document changed and this view's node now looks like `node`
    fn update(&mut self, node: &Node, ctx: &mut ViewContext<'_>) -> ViewUpdate;

    /// Whether the view handles this event itself instead of the editor
    fn stop_event(&self, _event: &ViewEvent) -> bool {
        false
    }

    /// Whether the editor should disregard this mutation
    fn ignore_mutation(&self, _mutation: &DomMutation) -> bool {
        false
    }

    /// Handle an event this view claimed through [`NodeView::stop_event`]
    fn handle_event(&mut self, _event: &ViewEvent, _ctx: &mut ViewContext<'_>) -> bool {
        false
    }

    fn destroy(&mut self, _host: &mut dyn RenderHost) {}
}

/// Creates a node view for a node at a position
pub type NodeViewFactory =
    Arc<dyn Fn(&Node, &mut ViewContext<'_>) -> Box<dyn NodeView> + Send + Sync>;
