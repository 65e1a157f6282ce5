//! Plain paragraphs

use reprose_author::{menu_group, Feature};
use reprose_model::{set_block_type, Attrs, NodeSpec};

use crate::helpers::{block_type_option, keymap};

pub const PARAGRAPH: &str = "paragraph";

pub fn paragraph() -> Feature {
    Feature::new("paragraph")
        .with_node(
            PARAGRAPH,
            NodeSpec::new().with_content("inline*").with_group("block"),
        )
        .with_keymap(|_| keymap([("Shift-Ctrl-0", set_block_type(PARAGRAPH, Attrs::new()))]))
        .with_menu(|_| {
            menu_group(
                "blocks",
                [(
                    "plain",
                    block_type_option("Change to paragraph", PARAGRAPH).with_hint("paragraph"),
                )],
            )
        })
}
