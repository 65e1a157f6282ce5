//! Sibling chrome for editing one attribute of a node

use std::sync::Arc;

use reprose_model::Node;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::view::{
    ContainerId, DomMutation, EventTarget, MountRequest, NodeView, NodeViewFactory, RenderHost,
    Rendered, ViewContext, ViewEvent, ViewUpdate,
};

/// The form control the host should render
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AttributeControl {
    Text { placeholder: String },
    /// A choice between `(value, label)` pairs
    Select { options: Vec<(String, String)> },
}

impl AttributeControl {
    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (AttributeControl::Text { .. }, Value::String(_)) => true,
            (AttributeControl::Select { options }, Value::String(value)) => {
                options.iter().any(|(option, _)| option == value)
            }
            _ => false,
        }
    }
}

/// Renders a control bound to `attr` next to the node. A change rewrites
/// the node's markup in the parent document directly.
pub struct AttributeEditorView {
    node: Node,
    attr: String,
    control: AttributeControl,
    container: ContainerId,
}

impl AttributeEditorView {
    pub fn new(
        node: &Node,
        attr: impl Into<String>,
        control: AttributeControl,
        ctx: &mut ViewContext<'_>,
    ) -> Self {
        let pos = ctx.pos();
        let anchor = ctx.host().coords_at_pos(pos);
        let container = ctx.host().mount(MountRequest {
            kind: "attribute-editor".to_string(),
            anchor,
        });
        Self {
            node: node.clone(),
            attr: attr.into(),
            control,
            container,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn control(&self) -> &AttributeControl {
        &self.control
    }

    pub fn container(&self) -> ContainerId {
        self.container
    }

    pub fn value(&self) -> Value {
        self.node.attr(&self.attr).cloned().unwrap_or(Value::Null)
    }

    fn owns(&self, target: EventTarget) -> bool {
        target == EventTarget::Container(self.container)
    }

    fn change(&mut self, value: &Value, ctx: &mut ViewContext<'_>) -> bool {
        if !self.control.accepts(value) {
            warn!(attr = %self.attr, value = %value, "Attribute value rejected");
            return false;
        }
        if self.node.attr(&self.attr) == Some(value) {
            return true;
        }
        let mut attrs = self.node.attrs().clone();
        attrs.insert(self.attr.clone(), value.clone());

        let pos = ctx.pos();
        let mut tr = ctx.state().tr();
        if let Err(err) = tr.set_node_markup(pos, self.node.type_name(), attrs) {
            warn!(error = %err, pos, "Attribute change failed");
            return false;
        }
        debug!(attr = %self.attr, pos, "Attribute changed");
        ctx.dispatch(tr);
        true
    }
}

impl NodeView for AttributeEditorView {
    fn render(&self) -> Rendered {
        Rendered::Chrome {
            container: self.container,
            attr: self.attr.clone(),
            value: self.value(),
        }
    }

    fn update(&mut self, node: &Node, _ctx: &mut ViewContext<'_>) -> ViewUpdate {
        if node.type_name() != self.node.type_name() {
            return ViewUpdate::RebuildRequired;
        }
        self.node = node.clone();
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
            ViewEvent::Change { value, .. } => self.change(value, ctx),
            // Typing and clicks inside the control stay in the control
            _ => true,
        }
    }

    fn destroy(&mut self, host: &mut dyn RenderHost) {
        host.unmount(self.container);
    }
}

/// Node view factory for an attribute editor on `attr`
pub fn attribute_editor_factory(attr: &str, control: AttributeControl) -> NodeViewFactory {
    let attr = attr.to_string();
    Arc::new(move |node, ctx| {
        Box::new(AttributeEditorView::new(node, attr.clone(), control.clone(), ctx))
            as Box<dyn NodeView>
    })
}
