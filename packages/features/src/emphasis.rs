//! Inline emphasis

use reprose_author::{menu_group, Feature, MenuOption};
use reprose_model::{mark_active, toggle_mark, Attrs, MarkSpec};

pub const EM: &str = "em";

pub fn emphasis() -> Feature {
    Feature::new("emphasis")
        .with_mark(EM, MarkSpec::new())
        .with_menu(|_| {
            menu_group(
                "inline",
                [(
                    "emphasis",
                    MenuOption::command("Emphasize", toggle_mark(EM, Attrs::new()))
                        .with_hint("italic")
                        .with_active(|state| mark_active(state, EM)),
                )],
            )
        })
}
