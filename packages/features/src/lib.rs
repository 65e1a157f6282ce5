//! # Reprose Features
//!
//! The built-in features an editor is usually assembled from.
//!
//! ## Dependencies between features
//!
//! ```text
//! paragraph ◀── section, admonition, lists
//! figure    ◀── image
//! emphasis, code, links, blocky: standalone
//! ```
//!
//! Features are plain values; the order they are handed to the editor in
//! decides which one wins a conflict. [`default_features`] returns the
//! usual order.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reprose_features::{default_features, FeatureOptions};
//!
//! let options = FeatureOptions {
//!     code_blocks: true,
//!     ..Default::default()
//! };
//! let editor = Editor::new(config, &default_features(&options), &doc, None, host)?;
//! ```

mod admonition;
mod blocky;
mod code;
mod emphasis;
mod figure;
mod helpers;
mod image;
mod links;
mod lists;
mod paragraph;
mod section;

pub use admonition::{admonition, empty_admonition, AdmonitionType, ADMONITION, ADMONITION_CAPTION};
pub use blocky::blocky;
pub use code::{code, CodeOptions, CODE, CODE_BLOCK};
pub use emphasis::{emphasis, EM};
pub use figure::{figure, FIGURE, FIGURE_CAPTION, FIGURE_CONTENT};
pub use image::{
    image, ImageOptions, ImageUrlRequest, ImageView, SrcMapper, SrcResolver, ALT_PLACEHOLDER,
    IMAGE, LOADING_PLACEHOLDER,
};
pub use links::{
    check_links, default_link_schemas, links, LinkIssue, LinkSchema, LinkSchemas, LINK,
    PLACEHOLDER_REFERENCE, WEB_SCHEMA,
};
pub use lists::{lists, BULLET_LIST, LIST_ITEM, ORDERED_LIST};
pub use paragraph::{paragraph, PARAGRAPH};
pub use section::{
    empty_section, make_section_id, section, section_anchor, DEFAULT_SECTION_ID, SECTION,
    SECTION_HEADER,
};

use reprose_author::{EditorError, EditorResult, Feature};

/// Names accepted by [`feature_named`], in default order
pub const FEATURE_NAMES: [&str; 10] = [
    "paragraph",
    "emphasis",
    "code",
    "section",
    "figure",
    "image",
    "admonition",
    "lists",
    "links",
    "blocky",
];

/// Options for the configurable built-in features
#[derive(Debug, Clone, Default)]
pub struct FeatureOptions {
    pub code_blocks: bool,
    pub image: ImageOptions,
}

/// Look up a built-in feature by name
pub fn feature_named(name: &str, options: &FeatureOptions) -> EditorResult<Feature> {
    let feature = match name {
        "paragraph" => paragraph(),
        "emphasis" => emphasis(),
        "code" => code(CodeOptions {
            allow_blocks: options.code_blocks,
        }),
        "section" => section(),
        "figure" => figure(),
        "image" => image(options.image.clone()),
        "admonition" => admonition(),
        "lists" => lists(),
        "links" => links(),
        "blocky" => blocky(),
        other => {
            return Err(EditorError::Configuration(format!(
                "Unknown feature: {}",
                other
            )))
        }
    };
    Ok(feature)
}

/// Every built-in feature. Image comes after section, so its
/// `sections.section` option replaces the subsection one.
pub fn default_features(options: &FeatureOptions) -> Vec<Feature> {
    vec![
        paragraph(),
        emphasis(),
        code(CodeOptions {
            allow_blocks: options.code_blocks,
        }),
        section(),
        figure(),
        image(options.image.clone()),
        admonition(),
        lists(),
        links(),
        blocky(),
    ]
}
