use anyhow::{Context, Result};
use reprose_author::{EditorConfig, Feature};
use reprose_features::{feature_named, FeatureOptions, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_CONFIG_NAME: &str = "reprose.config.json";

/// Reprose configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Built-in features to enable, in order
    #[serde(default = "default_feature_names")]
    pub features: Vec<String>,

    /// Let the code feature declare code blocks
    #[serde(default)]
    pub code_blocks: bool,

    /// Platform, schema policy and typographic rules
    #[serde(flatten)]
    pub editor: EditorConfig,
}

fn default_feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &Path) -> Result<Self> {
        let config_path = cwd.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", config_path.display()))?;
            debug!(
                path = %config_path.display(),
                features = config.features.len(),
                "loaded config"
            );
            Ok(config)
        } else {
            debug!(cwd = %cwd.display(), "no config file, using defaults");
            Ok(Config::default())
        }
    }

    pub fn path(cwd: &Path) -> PathBuf {
        cwd.join(DEFAULT_CONFIG_NAME)
    }

    /// Instantiate the configured features
    pub fn build_features(&self) -> Result<Vec<Feature>> {
        let options = FeatureOptions {
            code_blocks: self.code_blocks,
            ..Default::default()
        };
        self.features
            .iter()
            .map(|name| feature_named(name, &options).map_err(anyhow::Error::from))
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            features: default_feature_names(),
            code_blocks: false,
            editor: EditorConfig::default(),
        }
    }
}
