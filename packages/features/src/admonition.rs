//! Admonitions: callout blocks of paragraphs with an optional caption

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reprose_author::{
    attribute_editor_factory, menu_group, AttributeControl, Feature, MenuOption, NodeViewPlugin,
    Plugin,
};
use reprose_model::{
    block_active, can_insert, replace_selection_with, AttrSpec, Attrs, Command, Fragment,
    ModelResult, Node, NodeSpec, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::helpers::block_type_option;
use crate::paragraph::PARAGRAPH;

pub const ADMONITION: &str = "admonition";
pub const ADMONITION_CAPTION: &str = "admonition_caption";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmonitionType {
    #[default]
    SeeAlso,
    Note,
    Tip,
    Important,
    Warning,
    Attention,
}

impl AdmonitionType {
    pub const ALL: [AdmonitionType; 6] = [
        AdmonitionType::SeeAlso,
        AdmonitionType::Note,
        AdmonitionType::Tip,
        AdmonitionType::Important,
        AdmonitionType::Warning,
        AdmonitionType::Attention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AdmonitionType::SeeAlso => "seealso",
            AdmonitionType::Note => "note",
            AdmonitionType::Tip => "tip",
            AdmonitionType::Important => "important",
            AdmonitionType::Warning => "warning",
            AdmonitionType::Attention => "attention",
        }
    }

    /// Label shown ahead of the admonition body
    pub fn label(&self) -> &'static str {
        match self {
            AdmonitionType::SeeAlso => "See also:",
            AdmonitionType::Note => "Note:",
            AdmonitionType::Tip => "Tip:",
            AdmonitionType::Important => "Important!",
            AdmonitionType::Warning => "Warning!",
            AdmonitionType::Attention => "Attention!",
        }
    }

    /// Type of an admonition node; unknown values read as the default
    pub fn of(node: &Node) -> Self {
        node.attr("type")
            .and_then(Value::as_str)
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for AdmonitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdmonitionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown admonition type: {}", s))
    }
}

/// A default admonition holding one empty paragraph
pub fn empty_admonition(schema: &Schema) -> ModelResult<Node> {
    let body = schema.node(PARAGRAPH, Attrs::new(), Fragment::empty())?;
    schema.node(ADMONITION, Attrs::new(), Fragment::from_node(body))
}

fn insert_admonition() -> Command {
    Arc::new(|state, dispatch| match empty_admonition(state.schema()) {
        Ok(node) => replace_selection_with(node)(state, dispatch),
        Err(_) => false,
    })
}

/// Needs the paragraph feature
pub fn admonition() -> Feature {
    Feature::new("admonition")
        .with_node(ADMONITION_CAPTION, NodeSpec::new().with_content("inline*"))
        .with_node(
            ADMONITION,
            NodeSpec::new()
                .with_attr("type", AttrSpec::with_default(AdmonitionType::default().as_str()))
                .with_content("admonition_caption? paragraph+")
                .with_group("admonition block"),
        )
        .with_plugins(|_| {
            let options = AdmonitionType::ALL
                .iter()
                .map(|kind| (kind.as_str().to_string(), kind.label().to_string()))
                .collect();
            let view = NodeViewPlugin::new("admonition-type").with_view(
                ADMONITION,
                attribute_editor_factory("type", AttributeControl::Select { options }),
            );
            vec![Arc::new(view) as Arc<dyn Plugin>]
        })
        .with_menu(|_| {
            menu_group(
                "admonitions",
                [
                    (
                        "admonition",
                        MenuOption::command("Insert an admonition", insert_admonition())
                            .with_active(|state| block_active(state, ADMONITION, &Attrs::new()))
                            .with_enable(|state| can_insert(state, ADMONITION)),
                    ),
                    (
                        "admonition_caption",
                        block_type_option("Change to admonition caption", ADMONITION_CAPTION),
                    ),
                ],
            )
        })
}
