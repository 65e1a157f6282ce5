//! # Schema Aggregation
//!
//! Merges the node and mark declarations of an ordered feature list into
//! one [`SchemaDescriptor`]. A synthetic `doc` root and the `text` type are
//! always declared first; a later feature declaring an existing name
//! replaces the earlier spec outright.

use std::sync::Arc;

use indexmap::IndexMap;
use reprose_model::{MarkSpec, NodeSpec, Schema, SchemaDescriptor, DOC_TYPE, TEXT_TYPE};
use tracing::{debug, info, warn};

use crate::config::SchemaPolicy;
use crate::errors::{EditorError, EditorResult};
use crate::feature::Feature;

/// The merged descriptor, its compiled schema and the policy that produced
/// them
#[derive(Debug, Clone)]
pub struct AggregatedSchema {
    pub descriptor: SchemaDescriptor,
    pub schema: Arc<Schema>,
    pub policy: SchemaPolicy,
    /// True when the minimal fallback schema was substituted
    pub degraded: bool,
}

fn base_nodes() -> IndexMap<String, NodeSpec> {
    let mut nodes = IndexMap::new();
    nodes.insert(DOC_TYPE.to_string(), NodeSpec::new().with_content("block+"));
    nodes.insert(TEXT_TYPE.to_string(), NodeSpec::new().with_group("inline"));
    nodes
}

/// The paragraph-only descriptor used in degraded mode
pub fn minimal_descriptor() -> SchemaDescriptor {
    let mut nodes = base_nodes();
    nodes.insert(
        "paragraph".to_string(),
        NodeSpec::new().with_content("inline*").with_group("block"),
    );
    SchemaDescriptor::new(nodes, IndexMap::new())
}

/// Merge feature declarations without compiling them
pub fn merge_descriptor(features: &[Feature]) -> (SchemaDescriptor, usize) {
    let mut nodes = base_nodes();
    let mut marks: IndexMap<String, MarkSpec> = IndexMap::new();
    let mut declared = 0;

    for feature in features {
        for (name, spec) in feature.nodes() {
            if nodes.insert(name.clone(), spec.clone()).is_some() {
                debug!(feature = %feature.name(), node = %name, "Node spec overwritten");
            }
        }
        for (name, spec) in feature.marks() {
            if marks.insert(name.clone(), spec.clone()).is_some() {
                debug!(feature = %feature.name(), mark = %name, "Mark spec overwritten");
            }
        }
        declared += feature.nodes().len();
    }

    (SchemaDescriptor::new(nodes, marks), declared)
}

/// Build the editor schema from an ordered feature list
pub fn features_to_schema(
    features: &[Feature],
    policy: SchemaPolicy,
) -> EditorResult<AggregatedSchema> {
    let (descriptor, declared) = merge_descriptor(features);

    let failure = if declared == 0 {
        "no node types declared by features".to_string()
    } else {
        match Schema::new(descriptor.clone()) {
            Ok(schema) => {
                info!(
                    features = features.len(),
                    nodes = descriptor.nodes.len(),
                    marks = descriptor.marks.len(),
                    "Schema aggregated"
                );
                return Ok(AggregatedSchema {
                    descriptor,
                    schema: Arc::new(schema),
                    policy,
                    degraded: false,
                });
            }
            Err(err) => err.to_string(),
        }
    };

    match policy {
        SchemaPolicy::Strict => Err(EditorError::Configuration(failure)),
        SchemaPolicy::DegradeToParagraph => {
            warn!(reason = %failure, "Falling back to paragraph-only schema");
            let descriptor = minimal_descriptor();
            let schema = Schema::new(descriptor.clone())?;
            Ok(AggregatedSchema {
                descriptor,
                schema: Arc::new(schema),
                policy,
                degraded: true,
            })
        }
    }
}
