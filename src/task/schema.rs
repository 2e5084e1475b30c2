//! Typed output schemas.
//!
//! A small subset of JSON Schema, enough to describe the objects agents are
//! expected to return. Serializes to standard JSON Schema so it can be handed
//! to the agent verbatim.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Type of a single schema property.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<SchemaType>),
    Object(OutputSchema),
    /// Anything goes.
    Any,
}

impl SchemaType {
    pub fn array(item: SchemaType) -> Self {
        Self::Array(Box::new(item))
    }

    /// `[{ path, format?, label? }]`
    pub fn artifacts() -> Self {
        Self::array(Self::Object(
            OutputSchema::object()
                .required("path", SchemaType::String)
                .optional("format", SchemaType::String)
                .optional("label", SchemaType::String),
        ))
    }

    fn to_json_schema(&self) -> Value {
        match self {
            Self::String => json!({"type": "string"}),
            Self::Number => json!({"type": "number"}),
            Self::Integer => json!({"type": "integer"}),
            Self::Boolean => json!({"type": "boolean"}),
            Self::Array(item) => json!({"type": "array", "items": item.to_json_schema()}),
            Self::Object(schema) => schema.to_json_schema(),
            Self::Any => json!({}),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Any => "any",
        }
    }
}

/// One named property in an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaProperty {
    pub ty: SchemaType,
    pub required: bool,
}

/// Object schema describing an agent's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSchema {
    properties: BTreeMap<String, SchemaProperty>,
}

/// First mismatch found by [`OutputSchema::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// `/`-separated location, `""` for the root.
    pub path: String,
    pub reason: String,
}

impl OutputSchema {
    pub fn object() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, ty: SchemaType) -> Self {
        self.properties
            .insert(name.into(), SchemaProperty { ty, required: true });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, ty: SchemaType) -> Self {
        self.properties
            .insert(name.into(), SchemaProperty { ty, required: false });
        self
    }

    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    pub fn required_names(&self) -> Vec<&str> {
        self.properties
            .iter()
            .filter(|(_, p)| p.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Render as a JSON Schema document.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, prop) in &self.properties {
            properties.insert(name.clone(), prop.ty.to_json_schema());
        }
        let mut schema = Map::new();
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        let required = self.required_names();
        if !required.is_empty() {
            schema.insert("required".into(), json!(required));
        }
        Value::Object(schema)
    }

    /// Check `value` against this schema. Extra properties are allowed.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        validate_object(self, value, "")
    }
}

impl Serialize for OutputSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_schema().serialize(serializer)
    }
}

fn validate_object(schema: &OutputSchema, value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let Some(obj) = value.as_object() else {
        return Err(SchemaViolation {
            path: path.to_string(),
            reason: format!("expected object, got {}", json_kind(value)),
        });
    };

    for (name, prop) in &schema.properties {
        let child_path = format!("{}/{}", path, name);
        match obj.get(name) {
            None | Some(Value::Null) if prop.required => {
                return Err(SchemaViolation {
                    path: child_path,
                    reason: "required property is missing".to_string(),
                });
            }
            None | Some(Value::Null) => {}
            Some(v) => validate_type(&prop.ty, v, &child_path)?,
        }
    }
    Ok(())
}

fn validate_type(ty: &SchemaType, value: &Value, path: &str) -> Result<(), SchemaViolation> {
    let ok = match ty {
        SchemaType::Any => true,
        SchemaType::String => value.is_string(),
        SchemaType::Number => value.is_number(),
        SchemaType::Integer => value.is_i64() || value.is_u64(),
        SchemaType::Boolean => value.is_boolean(),
        SchemaType::Array(item) => {
            let Some(items) = value.as_array() else {
                return Err(mismatch(ty, value, path));
            };
            for (i, v) in items.iter().enumerate() {
                validate_type(item, v, &format!("{}/{}", path, i))?;
            }
            true
        }
        SchemaType::Object(schema) => return validate_object(schema, value, path),
    };

    if ok { Ok(()) } else { Err(mismatch(ty, value, path)) }
}

fn mismatch(ty: &SchemaType, value: &Value, path: &str) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        reason: format!("expected {}, got {}", ty.type_name(), json_kind(value)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
