//! Typed tool parameter declarations rendered to JSON schema

use super::ToolId;
use crate::llm::ToolDefinition;
use serde_json::{json, Map, Value};

/// Parameter value type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<ParamType>),
}

impl ParamType {
    fn schema(&self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Integer => json!({"type": "integer"}),
            ParamType::Number => json!({"type": "number"}),
            ParamType::Boolean => json!({"type": "boolean"}),
            ParamType::Array(items) => json!({"type": "array", "items": items.schema()}),
        }
    }
}

/// One named tool parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolParameter {
    pub name: &'static str,
    pub ty: ParamType,
    pub description: &'static str,
    pub required: bool,
    pub allowed: &'static [&'static str],
}

impl ToolParameter {
    fn new(name: &'static str, ty: ParamType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            description,
            required: false,
            allowed: &[],
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamType::String, description)
    }

    pub fn integer(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamType::Integer, description)
    }

    pub fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamType::Number, description)
    }

    pub fn string_list(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamType::Array(Box::new(ParamType::String)), description)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = allowed;
        self
    }

    fn schema(&self) -> Value {
        let mut schema = self.ty.schema();
        if let Value::Object(obj) = &mut schema {
            obj.insert("description".into(), Value::from(self.description));
            if !self.allowed.is_empty() {
                obj.insert("enum".into(), json!(self.allowed));
            }
        }
        schema
    }
}

/// A tool as advertised to the agent
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    pub id: ToolId,
    pub description: &'static str,
    pub parameters: Vec<ToolParameter>,
}

impl ToolSpec {
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.id.wire_name().to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}
