//! # Capability Aggregation
//!
//! Merges the key bindings, input rules and plugins of an ordered feature
//! list. Input rules and plugins are concatenated in registration order.
//! Key bindings chain: the last feature to bind a combo runs first and
//! falls back through earlier features to the baseline binding.

use std::fmt;
use std::sync::Arc;

use reprose_model::Schema;
use tracing::{debug, info};

use crate::config::EditorConfig;
use crate::errors::EditorResult;
use crate::feature::Feature;
use crate::input_rules::{typographic_rules, InputRule, InputRulesPlugin};
use crate::keymap::{baseline_keymap, KeyBindingTable};
use crate::plugin::{KeymapPlugin, Plugin};

/// The active editing configuration
#[derive(Clone)]
pub struct Capabilities {
    pub input_rules: Vec<InputRule>,
    pub keymap: KeyBindingTable,
    /// Input-rule plugin, keymap plugin, then feature plugins
    pub plugins: Vec<Arc<dyn Plugin>>,
}

impl Capabilities {
    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field(
                "input_rules",
                &self.input_rules.iter().map(InputRule::name).collect::<Vec<_>>(),
            )
            .field("keymap", &self.keymap)
            .field("plugins", &self.plugin_names())
            .finish()
    }
}

pub fn aggregate_capabilities(
    features: &[Feature],
    schema: &Schema,
    config: &EditorConfig,
) -> EditorResult<Capabilities> {
    let mut input_rules = if config.typographic_rules {
        typographic_rules()?
    } else {
        Vec::new()
    };
    let mut keymap = KeyBindingTable::from_keymap(&baseline_keymap(), config.platform)?;
    let mut feature_plugins: Vec<Arc<dyn Plugin>> = Vec::new();

    for feature in features {
        if let Some(rules) = feature.input_rules(schema) {
            debug!(feature = %feature.name(), rules = rules.len(), "Input rules added");
            input_rules.extend(rules);
        }
        if let Some(bindings) = feature.keymap(schema) {
            debug!(feature = %feature.name(), bindings = bindings.len(), "Key bindings added");
            keymap.extend(&bindings, config.platform)?;
        }
        if let Some(plugins) = feature.plugins(schema) {
            debug!(feature = %feature.name(), plugins = plugins.len(), "Plugins added");
            feature_plugins.extend(plugins);
        }
    }

    let mut plugins: Vec<Arc<dyn Plugin>> = vec![
        Arc::new(InputRulesPlugin::new(input_rules.clone())),
        Arc::new(KeymapPlugin::new(keymap.clone())),
    ];
    plugins.extend(feature_plugins);

    info!(
        input_rules = input_rules.len(),
        key_bindings = keymap.len(),
        plugins = plugins.len(),
        "Capabilities aggregated"
    );

    Ok(Capabilities {
        input_rules,
        keymap,
        plugins,
    })
}
