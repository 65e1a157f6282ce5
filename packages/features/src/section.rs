//! # Sections
//!
//! A section is a header followed by blocks or nested sections. Section ids
//! serve as anchors; sections still carrying [`DEFAULT_SECTION_ID`] take
//! their anchor from the header text.
//!
//! The feature redeclares the document root so sections can appear at the
//! top level.

use std::sync::Arc;

use reprose_author::{menu_group, Feature, MenuOption};
use reprose_model::{
    block_active, can_insert, replace_selection_with, AttrSpec, Attrs, Command, Fragment,
    ModelResult, Node, NodeSpec, Schema, DOC_TYPE,
};
use serde_json::Value;

use crate::helpers::block_type_option;
use crate::paragraph::PARAGRAPH;

pub const SECTION: &str = "section";
pub const SECTION_HEADER: &str = "section_header";
pub const DEFAULT_SECTION_ID: &str = "untitled-section";

/// Anchor-safe id from header text: trimmed, lowercased, spaces become
/// hyphens, and anything but word characters and hyphens is dropped
pub fn make_section_id(header_text: &str) -> String {
    header_text
        .trim()
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// The id a section is reachable under
pub fn section_anchor(section: &Node) -> String {
    let existing = section
        .attr("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or("");
    if !existing.is_empty() && existing != DEFAULT_SECTION_ID {
        return existing.to_string();
    }
    let header = section
        .child(0)
        .filter(|child| child.type_name() == SECTION_HEADER)
        .map(Node::text_content)
        .unwrap_or_default();
    if header.trim().is_empty() {
        DEFAULT_SECTION_ID.to_string()
    } else {
        make_section_id(&header)
    }
}

/// An empty section: a blank header and one empty paragraph
pub fn empty_section(schema: &Schema) -> ModelResult<Node> {
    let header = schema.node(SECTION_HEADER, Attrs::new(), Fragment::empty())?;
    let body = schema.node(PARAGRAPH, Attrs::new(), Fragment::empty())?;
    let mut attrs = Attrs::new();
    attrs.insert("id".to_string(), Value::from(DEFAULT_SECTION_ID));
    schema.node(SECTION, attrs, Fragment::from_nodes([header, body]))
}

fn insert_subsection() -> Command {
    Arc::new(|state, dispatch| match empty_section(state.schema()) {
        Ok(section) => replace_selection_with(section)(state, dispatch),
        Err(_) => false,
    })
}

/// Needs the paragraph feature
pub fn section() -> Feature {
    Feature::new("section")
        .with_node(DOC_TYPE, NodeSpec::new().with_content("(block | sectioning)+"))
        .with_node(SECTION_HEADER, NodeSpec::new().with_content("inline*"))
        .with_node(
            SECTION,
            NodeSpec::new()
                .with_attr("id", AttrSpec::required())
                .with_content("section_header (block | sectioning)+")
                .with_group("sectioning"),
        )
        .with_menu(|_| {
            menu_group(
                "sections",
                [
                    (
                        "section",
                        MenuOption::command("Insert subsection", insert_subsection())
                            .with_active(|state| block_active(state, SECTION, &Attrs::new()))
                            .with_enable(|state| can_insert(state, SECTION)),
                    ),
                    (
                        "section_header",
                        block_type_option("Make section header", SECTION_HEADER),
                    ),
                ],
            )
        })
}
