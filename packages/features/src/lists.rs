//! Bullet and ordered lists of paragraph-led items

use reprose_author::{command_enabled, menu_group, Feature, MenuOption};
use reprose_model::{
    block_active, lift_list_item, sink_list_item, split_list_item, wrap_in, AttrSpec, Attrs,
    NodeSpec,
};

use crate::helpers::keymap;

pub const ORDERED_LIST: &str = "ordered_list";
pub const BULLET_LIST: &str = "bullet_list";
pub const LIST_ITEM: &str = "list_item";

fn wrap_option(label: &str, list_type: &'static str) -> MenuOption {
    let command = wrap_in(list_type, Attrs::new());
    MenuOption::command(label, command.clone())
        .with_active(move |state| block_active(state, list_type, &Attrs::new()))
        .with_enable(command_enabled(command))
}

/// Needs the paragraph feature
pub fn lists() -> Feature {
    Feature::new("lists")
        .with_node(
            ORDERED_LIST,
            NodeSpec::new()
                .with_attr("order", AttrSpec::with_default(1))
                .with_content("list_item+")
                .with_group("block"),
        )
        .with_node(
            BULLET_LIST,
            NodeSpec::new().with_content("list_item+").with_group("block"),
        )
        .with_node(LIST_ITEM, NodeSpec::new().with_content("paragraph block*"))
        .with_keymap(|_| {
            keymap([
                ("Shift-Ctrl-8", wrap_in(BULLET_LIST, Attrs::new())),
                ("Shift-Ctrl-9", wrap_in(ORDERED_LIST, Attrs::new())),
                ("Enter", split_list_item(LIST_ITEM)),
                ("Mod-[", lift_list_item(LIST_ITEM)),
                ("Mod-]", sink_list_item(LIST_ITEM)),
            ])
        })
        .with_menu(|_| {
            menu_group(
                "blocks",
                [
                    (BULLET_LIST, wrap_option("Wrap in bullet list", BULLET_LIST)),
                    (ORDERED_LIST, wrap_option("Wrap in ordered list", ORDERED_LIST)),
                ],
            )
        })
}
