//! Block navigation: climb from the cursor to enclosing nodes, lift blocks
//! out of them and join neighbouring ones

use reprose_author::{command_enabled, menu_group, Feature, MenuOption};
use reprose_model::{join_down, join_up, lift, select_parent_node, Command};

use crate::helpers::keymap;

fn command_option(label: &str, command: Command) -> MenuOption {
    MenuOption::command(label, command.clone()).with_enable(command_enabled(command))
}

pub fn blocky() -> Feature {
    Feature::new("blocky")
        .with_keymap(|_| {
            keymap([
                ("Mod-BracketLeft", lift()),
                ("Alt-ArrowUp", join_up()),
                ("Alt-ArrowDown", join_down()),
                ("Escape", select_parent_node()),
            ])
        })
        .with_menu(|_| {
            menu_group(
                "blocks",
                [
                    ("lift", command_option("Lift out of enclosing block", lift())),
                    ("join_up", command_option("Join with above block", join_up())),
                    (
                        "select_parent",
                        command_option("Select parent node", select_parent_node()),
                    ),
                ],
            )
        })
}
