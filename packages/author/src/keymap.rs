//! # Key Bindings
//!
//! Key combos are normalized before they are used as table keys, so
//! `"Shift-Ctrl-0"` and `"Ctrl-Shift-0"` name the same binding and `Mod`
//! resolves per platform. Binding a combo that is already bound chains the
//! new command in front of the old one.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use reprose_model::{
    delete_backward, delete_forward, select_all, select_parent_node, Command, EditorState,
    Transaction,
};
use tracing::debug;

use crate::config::Platform;
use crate::errors::{EditorError, EditorResult};
use crate::feature::Keymap;

/// A normalized key combination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub key: String,
}

impl KeyCombo {
    /// Parse a combo such as `"Mod-Shift-z"`, `"Alt-ArrowUp"` or `"Mod--"`
    pub fn parse(spec: &str, platform: Platform) -> EditorResult<Self> {
        let (modifiers, key) = if spec == "-" {
            ("", "-")
        } else if let Some(rest) = spec.strip_suffix("--") {
            (rest, "-")
        } else {
            match spec.rfind('-') {
                Some(i) => (&spec[..i], &spec[i + 1..]),
                None => ("", spec),
            }
        };
        if key.is_empty() {
            return Err(EditorError::Configuration(format!(
                "key combo \"{}\" has no key",
                spec
            )));
        }

        let mut combo = KeyCombo {
            alt: false,
            ctrl: false,
            meta: false,
            shift: false,
            key: if key == "Space" { " ".to_string() } else { key.to_string() },
        };

        for modifier in modifiers.split('-').filter(|m| !m.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "cmd" | "meta" | "m" => combo.meta = true,
                "a" | "alt" => combo.alt = true,
                "c" | "ctrl" | "control" => combo.ctrl = true,
                "s" | "shift" => combo.shift = true,
                "mod" => match platform {
                    Platform::Mac => combo.meta = true,
                    Platform::Other => combo.ctrl = true,
                },
                _ => {
                    return Err(EditorError::Configuration(format!(
                        "unrecognized modifier \"{}\" in key combo \"{}\"",
                        modifier, spec
                    )))
                }
            }
        }
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.alt {
            write!(f, "Alt-")?;
        }
        if self.ctrl {
            write!(f, "Ctrl-")?;
        }
        if self.meta {
            write!(f, "Meta-")?;
        }
        if self.shift {
            write!(f, "Shift-")?;
        }
        if self.key == " " {
            write!(f, "Space")
        } else {
            write!(f, "{}", self.key)
        }
    }
}

/// Try `first`; if it does not handle the state, try `fallback`
pub fn chain(first: Command, fallback: Command) -> Command {
    Arc::new(move |state, dispatch| match dispatch {
        Some(dispatch) => first(state, Some(&mut *dispatch)) || fallback(state, Some(dispatch)),
        None => first(state, None) || fallback(state, None),
    })
}

/// Bindings every editor starts from
pub fn baseline_keymap() -> Keymap {
    let mut keymap = Keymap::new();
    keymap.insert("Backspace".to_string(), delete_backward());
    keymap.insert("Delete".to_string(), delete_forward());
    keymap.insert("Mod-a".to_string(), select_all());
    keymap.insert("Escape".to_string(), select_parent_node());
    keymap
}

/// Resolved combo → command table
#[derive(Clone, Default)]
pub struct KeyBindingTable {
    bindings: IndexMap<KeyCombo, Command>,
}

impl KeyBindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a keymap, chaining duplicates in order
    pub fn from_keymap(keymap: &Keymap, platform: Platform) -> EditorResult<Self> {
        let mut table = Self::new();
        table.extend(keymap, platform)?;
        Ok(table)
    }

    /// Bind `command` to `combo`. An existing binding is kept as the
    /// fallback of the new one.
    pub fn bind(&mut self, combo: KeyCombo, command: Command) {
        let command = match self.bindings.get(&combo) {
            Some(previous) => {
                debug!(combo = %combo, "Chaining key binding");
                chain(command, previous.clone())
            }
            None => command,
        };
        self.bindings.insert(combo, command);
    }

    pub fn extend(&mut self, keymap: &Keymap, platform: Platform) -> EditorResult<()> {
        for (spec, command) in keymap {
            self.bind(KeyCombo::parse(spec, platform)?, command.clone());
        }
        Ok(())
    }

    pub fn get(&self, combo: &KeyCombo) -> Option<&Command> {
        self.bindings.get(combo)
    }

    pub fn combos(&self) -> impl Iterator<Item = &KeyCombo> {
        self.bindings.keys()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Run the command bound to `combo`, if any
    pub fn handle(
        &self,
        state: &EditorState,
        combo: &KeyCombo,
        dispatch: &mut dyn FnMut(Transaction),
    ) -> bool {
        match self.bindings.get(combo) {
            Some(command) => command(state, Some(dispatch)),
            None => false,
        }
    }
}

impl fmt::Debug for KeyBindingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.bindings.keys().map(|combo| combo.to_string()))
            .finish()
    }
}
