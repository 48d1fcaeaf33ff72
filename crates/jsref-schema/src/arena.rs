//! # Schema Arena
//!
//! Every schema document the engine sees is imported into a [`SchemaArena`]
//! as a tree of [`SchemaNode`]s addressed by [`NodeId`]. Node identity (not
//! structural equality) is what the cache, the compiler's cycle checks, and
//! the annotation side tables key on: two identical sub-schemas at different
//! positions are distinct nodes.
//!
//! The arena is append-only. Documents are never mutated after import; all
//! compilation state lives in [`Annotations`](crate::context::Annotations).

use indexmap::IndexMap;
use serde_json::{Number, Value};

use jsref_core::instance::numbers_equal;

/// Stable handle of a node inside a [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One node of an imported schema document.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<NodeId>),
    Object(IndexMap<String, NodeId>),
}

/// Append-only store of schema nodes.
#[derive(Debug, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
}

impl SchemaArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes held.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Import a document, returning the id of its root node.
    pub fn import(&mut self, value: &Value) -> NodeId {
        let node = match value {
            Value::Null => SchemaNode::Null,
            Value::Bool(b) => SchemaNode::Bool(*b),
            Value::Number(n) => SchemaNode::Number(n.clone()),
            Value::String(s) => SchemaNode::String(s.clone()),
            Value::Array(items) => {
                SchemaNode::Array(items.iter().map(|item| self.import(item)).collect())
            }
            Value::Object(map) => SchemaNode::Object(
                map.iter()
                    .map(|(key, child)| (key.clone(), self.import(child)))
                    .collect(),
            ),
        };
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn is_object(&self, id: NodeId) -> bool {
        matches!(self.node(id), SchemaNode::Object(_))
    }

    /// An object node with no keys: the always-valid empty schema.
    pub fn is_empty_object(&self, id: NodeId) -> bool {
        matches!(self.node(id), SchemaNode::Object(map) if map.is_empty())
    }

    pub fn entries(&self, id: NodeId) -> Option<&IndexMap<String, NodeId>> {
        match self.node(id) {
            SchemaNode::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn items(&self, id: NodeId) -> Option<&[NodeId]> {
        match self.node(id) {
            SchemaNode::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn str_of(&self, id: NodeId) -> Option<&str> {
        match self.node(id) {
            SchemaNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn bool_of(&self, id: NodeId) -> Option<bool> {
        match self.node(id) {
            SchemaNode::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn number_of(&self, id: NodeId) -> Option<&Number> {
        match self.node(id) {
            SchemaNode::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn f64_of(&self, id: NodeId) -> Option<f64> {
        self.number_of(id).and_then(Number::as_f64)
    }

    /// Child of an object node by key.
    pub fn get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.entries(id).and_then(|map| map.get(key).copied())
    }

    pub fn has(&self, id: NodeId, key: &str) -> bool {
        self.get(id, key).is_some()
    }

    pub fn get_str(&self, id: NodeId, key: &str) -> Option<&str> {
        self.get(id, key).and_then(|child| self.str_of(child))
    }

    pub fn get_bool(&self, id: NodeId, key: &str) -> Option<bool> {
        self.get(id, key).and_then(|child| self.bool_of(child))
    }

    /// The schema's string `id`, if it declares one.
    pub fn id_of(&self, id: NodeId) -> Option<&str> {
        self.get_str(id, "id")
    }

    /// Human-readable context for errors: `description`, else `id`.
    pub fn description_of(&self, id: NodeId) -> Option<String> {
        self.get_str(id, "description")
            .or_else(|| self.id_of(id))
            .map(str::to_string)
    }

    /// JSON type name of a node, used when a schema has the wrong shape.
    pub fn type_name(&self, id: NodeId) -> &'static str {
        match self.node(id) {
            SchemaNode::Null => "null",
            SchemaNode::Bool(_) => "boolean",
            SchemaNode::Number(_) => "number",
            SchemaNode::String(_) => "string",
            SchemaNode::Array(_) => "array",
            SchemaNode::Object(_) => "object",
        }
    }

    /// Rebuild the plain JSON value rooted at `id`.
    pub fn to_value(&self, id: NodeId) -> Value {
        match self.node(id) {
            SchemaNode::Null => Value::Null,
            SchemaNode::Bool(b) => Value::Bool(*b),
            SchemaNode::Number(n) => Value::Number(n.clone()),
            SchemaNode::String(s) => Value::String(s.clone()),
            SchemaNode::Array(items) => {
                Value::Array(items.iter().map(|&item| self.to_value(item)).collect())
            }
            SchemaNode::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, &child)| (key.clone(), self.to_value(child)))
                    .collect(),
            ),
        }
    }

    /// Strict type-and-value equality between a node and an instance value.
    pub fn equals_value(&self, id: NodeId, value: &Value) -> bool {
        match (self.node(id), value) {
            (SchemaNode::Null, Value::Null) => true,
            (SchemaNode::Bool(a), Value::Bool(b)) => a == b,
            (SchemaNode::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (SchemaNode::String(a), Value::String(b)) => a == b,
            (SchemaNode::Array(items), Value::Array(values)) => {
                items.len() == values.len()
                    && items
                        .iter()
                        .zip(values)
                        .all(|(&item, value)| self.equals_value(item, value))
            }
            (SchemaNode::Object(map), Value::Object(values)) => {
                map.len() == values.len()
                    && map.iter().all(|(key, &child)| {
                        values
                            .get(key)
                            .is_some_and(|value| self.equals_value(child, value))
                    })
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_round_trips_value() {
        let mut arena = SchemaArena::new();
        let doc = json!({"type": "object", "properties": {"a": {"enum": [1, "x", null]}}});
        let root = arena.import(&doc);
        assert_eq!(arena.to_value(root), doc);
    }

    #[test]
    fn test_identical_subtrees_are_distinct_nodes() {
        let mut arena = SchemaArena::new();
        let root = arena.import(&json!({"a": {"type": "string"}, "b": {"type": "string"}}));
        let a = arena.get(root, "a").unwrap();
        let b = arena.get(root, "b").unwrap();
        assert_ne!(a, b);
        assert_eq!(arena.to_value(a), arena.to_value(b));
    }

    #[test]
    fn test_key_order_preserved() {
        let mut arena = SchemaArena::new();
        let root = arena.import(&json!({"z": 1, "a": 2, "m": 3}));
        let keys: Vec<&str> = arena.entries(root).unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_description_falls_back_to_id() {
        let mut arena = SchemaArena::new();
        let with_id = arena.import(&json!({"id": "#thing"}));
        let with_both = arena.import(&json!({"id": "#thing", "description": "A thing"}));
        assert_eq!(arena.description_of(with_id).as_deref(), Some("#thing"));
        assert_eq!(arena.description_of(with_both).as_deref(), Some("A thing"));
    }

    #[test]
    fn test_equals_value_is_strict() {
        let mut arena = SchemaArena::new();
        let node = arena.import(&json!({"a": [1, true]}));
        assert!(arena.equals_value(node, &json!({"a": [1, true]})));
        assert!(!arena.equals_value(node, &json!({"a": [1, "true"]})));
        assert!(!arena.equals_value(node, &json!({"a": [1, true], "b": null})));
    }

    #[test]
    fn test_empty_object_detection() {
        let mut arena = SchemaArena::new();
        let empty = arena.import(&json!({}));
        let array = arena.import(&json!([]));
        assert!(arena.is_empty_object(empty));
        assert!(!arena.is_empty_object(array));
    }
}
