//! Structural schema inference
//!
//! Builds a draft 7 JSON Schema from example documents in the style of
//! `genson`: every observed value widens the schema at its path, so each
//! example is guaranteed to validate against the result.

use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// `$schema` URI emitted at the root of inferred schemas
pub const SCHEMA_URI: &str = "http://json-schema.org/draft-07/schema#";

/// Accumulates example documents into a single schema
///
/// # Examples
///
/// ```
/// use reframe_gatekeeper::SchemaInferrer;
/// use serde_json::json;
///
/// let mut inferrer = SchemaInferrer::new();
/// inferrer
///     .add_document(&json!({"id": 1, "label": "a"}))
///     .add_document(&json!({"id": 2.5}));
///
/// let schema = inferrer.build();
/// assert_eq!(schema["properties"]["id"]["type"], "number");
/// assert_eq!(schema["required"], json!(["id"]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaInferrer {
    root: Node,
    documents: usize,
}

impl SchemaInferrer {
    /// Create an inferrer that has seen no documents
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen the schema so that `document` conforms to it
    pub fn add_document(&mut self, document: &Value) -> &mut Self {
        self.root.observe(document);
        self.documents += 1;
        self
    }

    /// Number of documents observed so far
    pub fn document_count(&self) -> usize {
        self.documents
    }

    /// Emit the schema as a JSON value
    pub fn build(&self) -> Value {
        let mut root = Map::new();
        root.insert("$schema".to_string(), Value::String(SCHEMA_URI.to_string()));
        if let Value::Object(body) = self.root.to_schema() {
            root.extend(body);
        }
        Value::Object(root)
    }
}

/// Infer the schema of a single document
pub fn infer_schema(document: &Value) -> Value {
    let mut inferrer = SchemaInferrer::new();
    inferrer.add_document(document);
    inferrer.build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Scalar {
    Boolean,
    Integer,
    Null,
    Number,
    String,
}

impl Scalar {
    fn name(self) -> &'static str {
        match self {
            Scalar::Boolean => "boolean",
            Scalar::Integer => "integer",
            Scalar::Null => "null",
            Scalar::Number => "number",
            Scalar::String => "string",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ObjectNode {
    properties: BTreeMap<String, Node>,
    // Keys present in every object seen so far
    required: Option<BTreeSet<String>>,
}

#[derive(Debug, Clone, Default)]
struct ArrayNode {
    items: Option<Box<Node>>,
}

#[derive(Debug, Clone, Default)]
struct Node {
    scalars: BTreeSet<Scalar>,
    object: Option<ObjectNode>,
    array: Option<ArrayNode>,
}

impl Node {
    fn observe(&mut self, value: &Value) {
        match value {
            Value::Null => {
                self.scalars.insert(Scalar::Null);
            }
            Value::Bool(_) => {
                self.scalars.insert(Scalar::Boolean);
            }
            Value::Number(n) => {
                let kind = if n.is_i64() || n.is_u64() {
                    Scalar::Integer
                } else {
                    Scalar::Number
                };
                self.scalars.insert(kind);
            }
            Value::String(_) => {
                self.scalars.insert(Scalar::String);
            }
            Value::Array(items) => {
                let array = self.array.get_or_insert_with(ArrayNode::default);
                for item in items {
                    array
                        .items
                        .get_or_insert_with(|| Box::new(Node::default()))
                        .observe(item);
                }
            }
            Value::Object(map) => {
                let object = self.object.get_or_insert_with(ObjectNode::default);
                for (key, child) in map {
                    object.properties.entry(key.clone()).or_default().observe(child);
                }
                let keys: BTreeSet<String> = map.keys().cloned().collect();
                object.required = Some(match object.required.take() {
                    None => keys,
                    Some(seen) => seen.intersection(&keys).cloned().collect(),
                });
            }
        }
    }

    fn to_schema(&self) -> Value {
        let mut alternatives = Vec::new();

        let mut scalars = self.scalars.clone();
        if scalars.contains(&Scalar::Number) {
            // integer values also satisfy "number"
            scalars.remove(&Scalar::Integer);
        }
        match scalars.len() {
            0 => {}
            1 => {
                let only = scalars.iter().next().map(|s| s.name()).unwrap_or("null");
                alternatives.push(json!({ "type": only }));
            }
            _ => {
                let names: Vec<&str> = scalars.iter().map(|s| s.name()).collect();
                alternatives.push(json!({ "type": names }));
            }
        }

        if let Some(object) = &self.object {
            let mut schema = Map::new();
            schema.insert("type".to_string(), json!("object"));
            let properties: Map<String, Value> = object
                .properties
                .iter()
                .map(|(key, node)| (key.clone(), node.to_schema()))
                .collect();
            schema.insert("properties".to_string(), Value::Object(properties));
            if let Some(required) = object.required.as_ref().filter(|r| !r.is_empty()) {
                schema.insert("required".to_string(), json!(required));
            }
            alternatives.push(Value::Object(schema));
        }

        if let Some(array) = &self.array {
            let mut schema = Map::new();
            schema.insert("type".to_string(), json!("array"));
            if let Some(items) = &array.items {
                schema.insert("items".to_string(), items.to_schema());
            }
            alternatives.push(Value::Object(schema));
        }

        match alternatives.len() {
            0 => json!({}),
            1 => alternatives.remove(0),
            _ => json!({ "anyOf": alternatives }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_types() {
        assert_eq!(infer_schema(&json!("x"))["type"], "string");
        assert_eq!(infer_schema(&json!(3))["type"], "integer");
        assert_eq!(infer_schema(&json!(3.5))["type"], "number");
        assert_eq!(infer_schema(&json!(true))["type"], "boolean");
        assert_eq!(infer_schema(&json!(null))["type"], "null");
    }

    #[test]
    fn test_root_carries_schema_uri() {
        let schema = infer_schema(&json!({}));
        assert_eq!(schema["$schema"], SCHEMA_URI);
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn test_object_required_keys_sorted() {
        let schema = infer_schema(&json!({"b": 1, "a": "x"}));
        assert_eq!(schema["required"], json!(["a", "b"]));
        assert_eq!(schema["properties"]["a"], json!({"type": "string"}));
    }

    #[test]
    fn test_array_items_are_merged() {
        let schema = infer_schema(&json!([{"id": 1, "tag": "x"}, {"id": 2}]));
        assert_eq!(schema["type"], "array");
        let items = &schema["items"];
        assert_eq!(items["required"], json!(["id"]));
        assert_eq!(items["properties"]["tag"], json!({"type": "string"}));
    }

    #[test]
    fn test_empty_array_has_no_items() {
        let schema = infer_schema(&json!({"list": []}));
        assert_eq!(schema["properties"]["list"], json!({"type": "array"}));
    }

    #[test]
    fn test_mixed_scalars_become_type_list() {
        let schema = infer_schema(&json!([1, "two", null]));
        assert_eq!(schema["items"]["type"], json!(["integer", "null", "string"]));
    }

    #[test]
    fn test_integer_widens_to_number() {
        let schema = infer_schema(&json!([1, 2.5]));
        assert_eq!(schema["items"]["type"], "number");
    }

    #[test]
    fn test_structured_and_scalar_use_any_of() {
        let schema = infer_schema(&json!([{"a": 1}, "text"]));
        let any_of = schema["items"]["anyOf"].as_array().unwrap();
        assert_eq!(any_of.len(), 2);
        assert_eq!(any_of[0], json!({"type": "string"}));
        assert_eq!(any_of[1]["type"], "object");
    }

    #[test]
    fn test_inference_is_deterministic() {
        let doc = json!({"z": [1, {"k": null}], "a": {"b": [true]}});
        assert_eq!(infer_schema(&doc), infer_schema(&doc));
    }

    #[test]
    fn test_multiple_documents_relax_required() {
        let mut inferrer = SchemaInferrer::new();
        inferrer
            .add_document(&json!({"a": 1, "b": 2}))
            .add_document(&json!({"a": 3}));
        assert_eq!(inferrer.document_count(), 2);
        assert_eq!(inferrer.build()["required"], json!(["a"]));
    }
}
