use serde::{Deserialize, Serialize};

/// Platform used to resolve the `Mod` key modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Platform {
    /// `Mod` means `Meta` (Cmd)
    Mac,
    /// `Mod` means `Ctrl`
    Other,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::current()
    }
}

/// What the schema aggregator does when the features yield no usable node
/// types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaPolicy {
    /// Fail construction with a configuration error
    #[default]
    Strict,
    /// Substitute a minimal `doc`/`paragraph`/`text` schema and log a warning
    DegradeToParagraph,
}

/// Editor-level options shared by the aggregators and the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    pub platform: Platform,

    pub schema_policy: SchemaPolicy,

    /// Prepend the smart quote, ellipsis and em-dash rules to the feature
    /// input rules
    pub typographic_rules: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            platform: Platform::current(),
            schema_policy: SchemaPolicy::Strict,
            typographic_rules: true,
        }
    }
}
