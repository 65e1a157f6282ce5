//! # Images
//!
//! Image atoms live in figures. The stored `src` can differ from the one
//! shown: `src_to_store` maps a fresh URL before it enters the document and
//! `src_to_show` maps it back for display, possibly asynchronously. While a
//! deferred resolution is running the view shows a loading placeholder.

use std::fmt;
use std::sync::{Arc, OnceLock};

use reprose_author::{
    AsyncAction, AttributeControl, AttributeEditorView, BoxFuture, DomMutation, EditorError,
    EditorResult, Feature, MenuGroups, MenuOption, NodeView, NodeViewPlugin, Plugin, RenderHost,
    Rendered, ViewContext, ViewEvent, ViewUpdate,
};
use reprose_model::{
    block_active, can_insert, replace_selection_with, AttrSpec, Attrs, EditorState, Fragment,
    Node, NodeSpec, Transaction,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::figure::{FIGURE, FIGURE_CONTENT};

pub const IMAGE: &str = "image";

pub const ALT_PLACEHOLDER: &str =
    "Please enter alternative text for visually impaired readers here";

pub const LOADING_PLACEHOLDER: &str = concat!(
    "data:image/svg+xml;base64,",
    "PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHZpZXdCb3g9IjAgMCAyMCAy",
    "MCI+PGNpcmNsZSBjeD0iMTAiIGN5PSIxMCIgcj0iOCIgZmlsbD0ibm9uZSIgc3Ryb2tlPSIjOTk5",
    "IiBzdHJva2Utd2lkdGg9IjIiIHN0cm9rZS1kYXNoYXJyYXk9IjEyIDYiLz48L3N2Zz4=",
);

/// Asks the user (or anything else) for the URL of a new image
pub type ImageUrlRequest = Arc<dyn Fn() -> BoxFuture<EditorResult<String>> + Send + Sync>;

pub type SrcMapper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Maps a stored `src` to the one to display
#[derive(Clone)]
pub enum SrcResolver {
    Immediate(SrcMapper),
    Deferred(Arc<dyn Fn(&str) -> BoxFuture<String> + Send + Sync>),
}

#[derive(Clone)]
pub struct ImageOptions {
    pub request_image_url: ImageUrlRequest,
    pub src_to_show: SrcResolver,
    pub src_to_store: SrcMapper,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            request_image_url: Arc::new(|| -> BoxFuture<EditorResult<String>> {
                Box::pin(async {
                    Err(EditorError::AsyncAction(
                        "no image URL source configured".to_string(),
                    ))
                })
            }),
            src_to_show: SrcResolver::Immediate(Arc::new(|src: &str| src.to_string())),
            src_to_store: Arc::new(|src: &str| src.to_string()),
        }
    }
}

impl fmt::Debug for ImageOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolver = match self.src_to_show {
            SrcResolver::Immediate(_) => "immediate",
            SrcResolver::Deferred(_) => "deferred",
        };
        f.debug_struct("ImageOptions")
            .field("src_to_show", &resolver)
            .finish_non_exhaustive()
    }
}

/// The image itself plus an alt text editor
pub struct ImageView {
    node: Node,
    alt: AttributeEditorView,
    shown: Arc<OnceLock<String>>,
}

impl ImageView {
    pub fn new(node: &Node, resolver: &SrcResolver, ctx: &mut ViewContext<'_>) -> Self {
        let alt = AttributeEditorView::new(
            node,
            "alt",
            AttributeControl::Text {
                placeholder: ALT_PLACEHOLDER.to_string(),
            },
            ctx,
        );
        let src = node.attr("src").and_then(Value::as_str).unwrap_or("");
        let shown = Arc::new(OnceLock::new());

        match resolver {
            SrcResolver::Immediate(map) => {
                let _ = shown.set(map(src));
            }
            SrcResolver::Deferred(resolve) => {
                debug!(src, "Resolving image source");
                let pending = resolve(src);
                let slot = Arc::clone(&shown);
                ctx.host().spawn(Box::pin(async move {
                    let _ = slot.set(pending.await);
                }));
            }
        }

        Self {
            node: node.clone(),
            alt,
            shown,
        }
    }

    /// The resolved display source, once known
    pub fn shown_src(&self) -> Option<&str> {
        self.shown.get().map(String::as_str)
    }
}

impl NodeView for ImageView {
    fn render(&self) -> Rendered {
        let image = match self.shown.get() {
            Some(src) => Rendered::Resource { src: src.clone() },
            None => Rendered::Pending {
                placeholder: LOADING_PLACEHOLDER.to_string(),
            },
        };
        Rendered::Group {
            parts: vec![image, self.alt.render()],
        }
    }

    fn update(&mut self, node: &Node, ctx: &mut ViewContext<'_>) -> ViewUpdate {
        if node.type_name() != self.node.type_name() || node.attr("src") != self.node.attr("src")
        {
            return ViewUpdate::RebuildRequired;
        }
        self.node = node.clone();
        self.alt.update(node, ctx)
    }

    fn stop_event(&self, event: &ViewEvent) -> bool {
        self.alt.stop_event(event)
    }

    fn ignore_mutation(&self, _mutation: &DomMutation) -> bool {
        true
    }

    fn handle_event(&mut self, event: &ViewEvent, ctx: &mut ViewContext<'_>) -> bool {
        self.alt.handle_event(event, ctx)
    }

    fn destroy(&mut self, host: &mut dyn RenderHost) {
        self.alt.destroy(host);
    }
}

/// Transaction inserting an image with `src` at the selection, wrapped in
/// a figure when the image cannot stand there alone
fn image_transaction(state: &EditorState, src: String) -> EditorResult<Transaction> {
    let schema = state.schema();
    let mut attrs = Attrs::new();
    attrs.insert("src".to_string(), Value::from(src));
    let image = schema.node(IMAGE, attrs, Fragment::empty())?;
    let node = if can_insert(state, IMAGE) {
        image
    } else {
        schema.node(FIGURE, Attrs::new(), Fragment::from_node(image))?
    };

    let mut produced = None;
    let inserted =
        replace_selection_with(node)(state, Some(&mut |tr: Transaction| produced = Some(tr)));
    match produced {
        Some(tr) if inserted => Ok(tr),
        _ => Err(EditorError::AsyncAction(
            "an image cannot be inserted here".to_string(),
        )),
    }
}

fn insert_image(options: ImageOptions) -> AsyncAction {
    Arc::new(move |state: &EditorState| -> BoxFuture<EditorResult<Transaction>> {
        let state = state.clone();
        let request = (options.request_image_url)();
        let to_store = Arc::clone(&options.src_to_store);
        Box::pin(async move {
            let url = request.await.map_err(|err| match err {
                EditorError::AsyncAction(_) => err,
                other => EditorError::AsyncAction(other.to_string()),
            })?;
            let src = to_store(&url);
            debug!(url = %url, src = %src, "Inserting image");
            image_transaction(&state, src).inspect_err(|err| {
                warn!(error = %err, "Image insertion failed");
            })
        })
    })
}

/// Needs the figure feature
pub fn image(options: ImageOptions) -> Feature {
    let for_views = options.src_to_show.clone();
    Feature::new("image")
        .with_node(
            IMAGE,
            NodeSpec::new()
                .with_group(FIGURE_CONTENT)
                .atom()
                .with_attr("alt", AttrSpec::with_default(""))
                .with_attr("src", AttrSpec::with_default("")),
        )
        .with_plugins(move |_| {
            let resolver = for_views.clone();
            let view = NodeViewPlugin::new("image-view").with_view(
                IMAGE,
                Arc::new(move |node, ctx| {
                    Box::new(ImageView::new(node, &resolver, ctx)) as Box<dyn NodeView>
                }),
            );
            vec![Arc::new(view) as Arc<dyn Plugin>]
        })
        .with_menu(move |_| {
            let mut menu = MenuGroups::new();
            menu.entry("sections".to_string()).or_default().insert(
                "section".to_string(),
                MenuOption::asynchronous("Insert image", insert_image(options.clone()))
                    .with_hint("image")
                    .with_active(|state| block_active(state, IMAGE, &Attrs::new()))
                    .with_enable(|state| can_insert(state, IMAGE) || can_insert(state, FIGURE)),
            );
            menu
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_refuse_requests() {
        let options = ImageOptions::default();
        let SrcResolver::Immediate(show) = &options.src_to_show else {
            panic!("expected an immediate resolver");
        };
        assert_eq!(show("a.png"), "a.png");
        assert_eq!((options.src_to_store)("b.png"), "b.png");
    }

    #[test]
    fn test_image_node_spec() {
        let feature = image(ImageOptions::default());
        let spec = &feature.nodes()[IMAGE];
        assert!(spec.atom);
        assert!(!spec.inline);
        assert_eq!(spec.groups(), vec![FIGURE_CONTENT]);
    }

    #[test]
    fn test_placeholder_is_svg_data_url() {
        assert!(LOADING_PLACEHOLDER.starts_with("data:image/svg+xml;base64,"));
    }
}
