//! Small builders shared by the built-in features

use reprose_author::{command_enabled, Keymap, MenuOption};
use reprose_model::{block_active, set_block_type, Attrs, Command};

/// Keymap from `(combo, command)` pairs, in order
pub(crate) fn keymap<'a>(bindings: impl IntoIterator<Item = (&'a str, Command)>) -> Keymap {
    bindings
        .into_iter()
        .map(|(combo, command)| (combo.to_string(), command))
        .collect()
}

/// Option that turns the selected textblocks into `type_name`. Active
/// inside such a block; enabled when the change would apply.
pub(crate) fn block_type_option(label: &str, type_name: &'static str) -> MenuOption {
    let command = set_block_type(type_name, Attrs::new());
    MenuOption::command(label, command.clone())
        .with_active(move |state| block_active(state, type_name, &Attrs::new()))
        .with_enable(command_enabled(command))
}
