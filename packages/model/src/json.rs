//! # JSON Wire Format
//!
//! ```json
//! { "type": "paragraph",
//!   "attrs": { ... },
//!   "content": [ { "type": "text", "text": "Hi", "marks": [ { "type": "em" } ] } ] }
//! ```

use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};
use crate::node::{Fragment, Mark, Node, TEXT_TYPE};
use crate::schema::Schema;
use crate::spec::Attrs;

impl Node {
    /// Canonical serialized form
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String(self.type_name().to_string()));

        if !self.attrs().is_empty() {
            obj.insert("attrs".to_string(), attrs_to_json(self.attrs()));
        }
        if let Some(text) = self.text() {
            obj.insert("text".to_string(), Value::String(text.to_string()));
        }
        if self.child_count() > 0 {
            obj.insert(
                "content".to_string(),
                Value::Array(self.content().iter().map(Node::to_json).collect()),
            );
        }
        if !self.marks().is_empty() {
            obj.insert(
                "marks".to_string(),
                Value::Array(self.marks().iter().map(Mark::to_json).collect()),
            );
        }

        Value::Object(obj)
    }
}

impl Mark {
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("type".to_string(), Value::String(self.type_name().to_string()));
        if !self.attrs().is_empty() {
            obj.insert("attrs".to_string(), attrs_to_json(self.attrs()));
        }
        Value::Object(obj)
    }
}

fn attrs_to_json(attrs: &Attrs) -> Value {
    Value::Object(attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
}

fn attrs_from_json(owner: &str, value: Option<&Value>) -> ModelResult<Attrs> {
    match value {
        None | Some(Value::Null) => Ok(Attrs::new()),
        Some(Value::Object(map)) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(_) => Err(ModelError::InvalidJson(format!(
            "\"attrs\" of {} must be an object",
            owner
        ))),
    }
}

impl Schema {
    /// Build a node tree from its JSON form. Attributes are completed from
    /// defaults; content is not validated (see [`Schema::check`]).
    pub fn node_from_json(&self, value: &Value) -> ModelResult<Node> {
        let obj = value
            .as_object()
            .ok_or_else(|| ModelError::InvalidJson("expected an object for a node".to_string()))?;
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::InvalidJson("node is missing a string \"type\"".to_string()))?;

        let marks = match obj.get("marks") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| self.mark_from_json(item))
                .collect::<ModelResult<Vec<_>>>()?,
            Some(_) => {
                return Err(ModelError::InvalidJson(format!(
                    "\"marks\" of {} must be an array",
                    type_name
                )))
            }
        };

        if type_name == TEXT_TYPE {
            let text = obj.get("text").and_then(Value::as_str).ok_or_else(|| {
                ModelError::InvalidJson("text node requires a string \"text\"".to_string())
            })?;
            return Ok(Node::text_node(text, marks));
        }

        let node_type = self
            .node_type(type_name)
            .ok_or_else(|| ModelError::UnknownNodeType(type_name.to_string()))?;
        let given = attrs_from_json(type_name, obj.get("attrs"))?;
        let attrs = self.compute_attrs(type_name, &node_type.spec().attrs, &given)?;

        let content = match obj.get("content") {
            None | Some(Value::Null) => Fragment::empty(),
            Some(Value::Array(items)) => Fragment::from_nodes(
                items
                    .iter()
                    .map(|item| self.node_from_json(item))
                    .collect::<ModelResult<Vec<_>>>()?,
            ),
            Some(_) => {
                return Err(ModelError::InvalidJson(format!(
                    "\"content\" of {} must be an array",
                    type_name
                )))
            }
        };

        Ok(Node::new_unchecked(type_name, attrs, content, Vec::new(), node_type.is_leaf())
            .with_marks(marks))
    }

    pub fn mark_from_json(&self, value: &Value) -> ModelResult<Mark> {
        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ModelError::InvalidJson("mark is missing a string \"type\"".to_string()))?;
        let given = attrs_from_json(type_name, value.get("attrs"))?;
        self.mark(type_name, given)
    }

    /// Build and fully validate a top-level document
    pub fn document_from_json(&self, value: &Value) -> ModelResult<Node> {
        let doc = self.node_from_json(value)?;
        let top = &self.descriptor().top_node;
        if doc.type_name() != top {
            return Err(ModelError::InvalidContent {
                node: doc.type_name().to_string(),
                reason: format!("top-level node must be \"{}\"", top),
            });
        }
        self.check(&doc)?;
        Ok(doc)
    }
}
