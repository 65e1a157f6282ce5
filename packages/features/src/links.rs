//! # Links
//!
//! A link is an inline atom whose text is edited in a nested region. Its
//! `schemaID` attribute names a [`LinkSchema`] that knows how to validate
//! and sanitize the `reference`.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reprose_author::{
    menu_group, nested_region_factory, Feature, MenuOption, NodeViewPlugin, Plugin,
};
use reprose_model::{
    block_active, insert_point, replace_selection_with, AttrSpec, Attrs, Command, Fragment,
    Node, NodeSpec,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub const LINK: &str = "link";
pub const WEB_SCHEMA: &str = "web";

/// Reference given to links made from the menu
pub const PLACEHOLDER_REFERENCE: &str = "https://example.com/";

/// How references of one kind of link target are checked
#[derive(Clone, Copy)]
pub struct LinkSchema {
    pub entity_type_label: &'static str,
    /// Problems with a location; empty when it is fine
    pub validate_location: fn(&str) -> Vec<String>,
    pub sanitize_location: fn(&str) -> Result<String, String>,
}

impl fmt::Debug for LinkSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSchema")
            .field("entity_type_label", &self.entity_type_label)
            .finish_non_exhaustive()
    }
}

/// schema id → schema
pub type LinkSchemas = IndexMap<String, LinkSchema>;

fn validate_web_location(location: &str) -> Vec<String> {
    if location.to_lowercase().starts_with("https") {
        Vec::new()
    } else {
        vec!["Link is not using secure protocol".to_string()]
    }
}

fn sanitize_web_location(location: &str) -> Result<String, String> {
    if location.starts_with("http") {
        Ok(location.to_lowercase().trim().to_string())
    } else {
        Err("Invalid page URL".to_string())
    }
}

pub fn default_link_schemas() -> LinkSchemas {
    let mut schemas = LinkSchemas::new();
    schemas.insert(
        WEB_SCHEMA.to_string(),
        LinkSchema {
            entity_type_label: "Web page",
            validate_location: validate_web_location,
            sanitize_location: sanitize_web_location,
        },
    );
    schemas
}

/// A problem with one link in a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkIssue {
    pub pos: usize,
    pub schema_id: String,
    pub reference: String,
    pub message: String,
}

/// Check every link in `doc` against its schema
pub fn check_links(doc: &Node, schemas: &LinkSchemas) -> Vec<LinkIssue> {
    let mut issues = Vec::new();
    doc.descendants(&mut |node: &Node, pos: usize| {
        if node.type_name() != LINK {
            return true;
        }
        let schema_id = node
            .attr("schemaID")
            .and_then(Value::as_str)
            .unwrap_or(WEB_SCHEMA)
            .to_string();
        let reference = node
            .attr("reference")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let issue = |message: String| LinkIssue {
            pos,
            schema_id: schema_id.clone(),
            reference: reference.clone(),
            message,
        };

        match schemas.get(&schema_id) {
            None => issues.push(issue(format!("Unknown link schema \"{}\"", schema_id))),
            Some(schema) => match (schema.sanitize_location)(&reference) {
                Err(message) => issues.push(issue(message)),
                Ok(sanitized) => issues.extend(
                    (schema.validate_location)(&sanitized)
                        .into_iter()
                        .map(&issue),
                ),
            },
        }
        false
    });
    debug!(issues = issues.len(), "Links checked");
    issues
}

/// Wrap the selection in a new web link. A selection inside one textblock
/// becomes the link text; anything else yields an empty link.
fn make_link() -> Command {
    Arc::new(|state, dispatch| {
        let schema = state.schema();
        let selection = state.selection();
        let doc = state.doc();
        let (Ok(from), Ok(to)) = (doc.resolve(selection.from()), doc.resolve(selection.to()))
        else {
            return false;
        };

        let inline_parent = schema
            .node_type(from.parent().type_name())
            .is_some_and(|parent| parent.inline_content());
        let content = if !selection.is_empty() && from.same_parent(&to) && inline_parent {
            from.parent()
                .content()
                .cut(from.parent_offset(), to.parent_offset())
        } else {
            Fragment::empty()
        };

        let mut attrs = Attrs::new();
        attrs.insert("schemaID".to_string(), Value::from(WEB_SCHEMA));
        attrs.insert("reference".to_string(), Value::from(PLACEHOLDER_REFERENCE));
        match schema.node(LINK, attrs, content) {
            Ok(link) => replace_selection_with(link)(state, dispatch),
            Err(_) => false,
        }
    })
}

pub fn links() -> Feature {
    Feature::new("links")
        .with_node(
            LINK,
            NodeSpec::new()
                .with_group("inline")
                .with_content("inline*")
                .inline()
                .atom()
                .draggable()
                .with_attr("schemaID", AttrSpec::with_default(WEB_SCHEMA))
                .with_attr("reference", AttrSpec::required()),
        )
        .with_plugins(|_| {
            let view = NodeViewPlugin::new("link-text").with_view(LINK, nested_region_factory());
            vec![Arc::new(view) as Arc<dyn Plugin>]
        })
        .with_menu(|_| {
            menu_group(
                "inline",
                [(
                    "link",
                    MenuOption::command("Make a link", make_link())
                        .with_hint("link")
                        .with_active(|state| block_active(state, LINK, &Attrs::new()))
                        .with_enable(|state| {
                            insert_point(state, state.selection().from(), LINK).is_some()
                        }),
                )],
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_schema_validation() {
        let schemas = default_link_schemas();
        let web = &schemas[WEB_SCHEMA];
        assert!((web.validate_location)("HTTPS://example.com").is_empty());
        assert_eq!(
            (web.validate_location)("http://example.com"),
            vec!["Link is not using secure protocol".to_string()]
        );
    }

    #[test]
    fn test_web_schema_sanitizing() {
        let schemas = default_link_schemas();
        let web = &schemas[WEB_SCHEMA];
        assert_eq!(
            (web.sanitize_location)("https://Example.com/Page "),
            Ok("https://example.com/page".to_string())
        );
        assert_eq!(
            (web.sanitize_location)("ftp://example.com"),
            Err("Invalid page URL".to_string())
        );
    }
}
