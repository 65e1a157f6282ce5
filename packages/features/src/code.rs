//! Inline code, and optionally code blocks

use reprose_author::{Feature, MenuGroups, MenuOption};
use reprose_model::{mark_active, set_block_type, toggle_mark, Attrs, MarkSpec, NodeSpec};
use serde::Deserialize;

use crate::helpers::{block_type_option, keymap};

pub const CODE: &str = "code";
pub const CODE_BLOCK: &str = "code_block";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeOptions {
    /// Also declare `code_block`
    pub allow_blocks: bool,
}

pub fn code(options: CodeOptions) -> Feature {
    let mut feature = Feature::new("code").with_mark(CODE, MarkSpec::new());
    if options.allow_blocks {
        feature = feature.with_node(
            CODE_BLOCK,
            NodeSpec::new()
                .with_content("text*")
                .with_marks("")
                .with_group("block")
                .code()
                .defining(),
        );
    }

    feature
        .with_keymap(move |_| {
            let mut bindings = vec![("Mod-`", toggle_mark(CODE, Attrs::new()))];
            if options.allow_blocks {
                bindings.push(("Shift-Ctrl-\\", set_block_type(CODE_BLOCK, Attrs::new())));
            }
            keymap(bindings)
        })
        .with_menu(move |_| {
            let mut menu = MenuGroups::new();
            menu.entry("inline".to_string()).or_default().insert(
                "code".to_string(),
                MenuOption::command("Toggle code", toggle_mark(CODE, Attrs::new()))
                    .with_hint("code")
                    .with_active(|state| mark_active(state, CODE)),
            );
            if options.allow_blocks {
                menu.entry("blocks".to_string()).or_default().insert(
                    "code_block".to_string(),
                    block_type_option("Change to code block", CODE_BLOCK),
                );
            }
            menu
        })
}
