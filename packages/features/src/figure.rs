//! Figures: a piece of figure content with an optional caption

use reprose_author::Feature;
use reprose_model::NodeSpec;

pub const FIGURE: &str = "figure";
pub const FIGURE_CAPTION: &str = "figure_caption";

/// Node group that figure content (such as images) joins
pub const FIGURE_CONTENT: &str = "figure_content";

pub fn figure() -> Feature {
    Feature::new("figure")
        .with_node(FIGURE_CAPTION, NodeSpec::new().with_content("inline*"))
        .with_node(
            FIGURE,
            NodeSpec::new()
                .with_content("figure_content figure_caption?")
                .with_group("block"),
        )
}
