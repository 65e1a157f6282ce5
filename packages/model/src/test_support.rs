//! Shared fixtures for the unit tests of this crate

use std::sync::Arc;

use indexmap::IndexMap;

use crate::node::{Fragment, Node};
use crate::schema::{Schema, SchemaDescriptor, DOC_TYPE};
use crate::spec::{AttrSpec, Attrs, MarkSpec, NodeSpec};

pub(crate) fn descriptor() -> SchemaDescriptor {
    let mut nodes = IndexMap::new();
    nodes.insert(DOC_TYPE.to_string(), NodeSpec::new().with_content("block+"));
    nodes.insert("text".to_string(), NodeSpec::new().with_group("inline"));
    nodes.insert(
        "paragraph".to_string(),
        NodeSpec::new().with_content("inline*").with_group("block"),
    );
    nodes.insert(
        "code_block".to_string(),
        NodeSpec::new()
            .with_content("text*")
            .with_group("block")
            .with_marks("")
            .code(),
    );
    nodes.insert(
        "image".to_string(),
        NodeSpec::new()
            .with_group("block")
            .with_attr("src", AttrSpec::required())
            .with_attr("alt", AttrSpec::with_default(""))
            .atom(),
    );
    nodes.insert(
        "blockquote".to_string(),
        NodeSpec::new().with_content("block+").with_group("block"),
    );
    nodes.insert(
        "bullet_list".to_string(),
        NodeSpec::new().with_content("list_item+").with_group("block"),
    );
    nodes.insert(
        "list_item".to_string(),
        NodeSpec::new().with_content("paragraph block*"),
    );

    let mut marks = IndexMap::new();
    marks.insert("em".to_string(), MarkSpec::new());
    marks.insert("code".to_string(), MarkSpec::new());
    SchemaDescriptor::new(nodes, marks)
}

pub(crate) fn schema() -> Arc<Schema> {
    Arc::new(Schema::new(descriptor()).unwrap())
}

pub(crate) fn para(schema: &Schema, text: &str) -> Node {
    let content = if text.is_empty() {
        Fragment::empty()
    } else {
        Fragment::from_node(schema.text(text, vec![]))
    };
    schema.node("paragraph", Attrs::new(), content).unwrap()
}

pub(crate) fn image(schema: &Schema, src: &str) -> Node {
    let mut attrs = Attrs::new();
    attrs.insert("src".to_string(), src.into());
    schema.node("image", attrs, Fragment::empty()).unwrap()
}

pub(crate) fn doc_of(schema: &Schema, blocks: Vec<Node>) -> Node {
    schema
        .node(DOC_TYPE, Attrs::new(), Fragment::from_nodes(blocks))
        .unwrap()
}

pub(crate) fn wrapper(schema: &Schema, type_name: &str, children: Vec<Node>) -> Node {
    schema
        .node(type_name, Attrs::new(), Fragment::from_nodes(children))
        .unwrap()
}
