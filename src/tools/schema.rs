//! Schema Synthesizer - builds tool descriptors from command metadata
//!
//! Information Hiding:
//! - Type mapping from semantic types to JSON Schema hidden here
//! - Default-value policy for optional parameters applied in one place

use crate::engine::annotations::constant_default;
use crate::engine::{CommandMetadata, ParameterInfo, SemanticType};
use crate::error::{AdapterError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Published description of a tool; immutable once built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    #[serde(skip)]
    pub parameters: Vec<ParameterDescriptor>,
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// One accepted argument of a tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    pub description: String,
    pub mandatory: bool,
    /// Advertised default; present iff the parameter is optional
    pub default_value: Option<Value>,
}

/// Derive a protocol-safe tool name from a command name
pub fn tool_name(command: &str) -> String {
    command
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Build the descriptor for a documented command
pub fn synthesize(metadata: &CommandMetadata) -> Result<ToolDescriptor> {
    if metadata.parameter_sets > 1 {
        return Err(AdapterError::UnsupportedShape {
            command: metadata.name.clone(),
            parameter_sets: metadata.parameter_sets,
        });
    }

    let parameters: Vec<ParameterDescriptor> = metadata
        .parameters
        .iter()
        .map(|p| describe_parameter(&metadata.name, p))
        .collect::<Result<_>>()?;

    let mut properties = Map::new();
    let mut required = Vec::new();

    for parameter in &parameters {
        let mut schema = type_schema(&parameter.semantic_type);
        schema.insert(
            "description".to_string(),
            Value::String(parameter.description.clone()),
        );
        if let Some(default) = &parameter.default_value {
            schema.insert("default".to_string(), default.clone());
        }
        properties.insert(parameter.name.clone(), Value::Object(schema));

        if parameter.mandatory {
            required.push(Value::String(parameter.name.clone()));
        }
    }

    let mut input_schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
    });
    if !required.is_empty() {
        input_schema["required"] = Value::Array(required);
    }

    let description = metadata
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AdapterError::MissingDocumentation {
            command: metadata.name.clone(),
            detail: "the command has no description".to_string(),
        })?;

    Ok(ToolDescriptor {
        name: tool_name(&metadata.name),
        description: description.to_string(),
        input_schema,
        parameters,
    })
}

fn describe_parameter(command: &str, info: &ParameterInfo) -> Result<ParameterDescriptor> {
    let description = info
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| AdapterError::MissingDocumentation {
            command: command.to_string(),
            detail: format!("no description for parameter(s) {}", info.name),
        })?;

    let default_value = if info.mandatory {
        None
    } else {
        Some(default_value(info))
    };

    Ok(ParameterDescriptor {
        name: info.name.clone(),
        semantic_type: info.semantic_type.clone(),
        description: description.to_string(),
        mandatory: info.mandatory,
        default_value,
    })
}

/// Advertised default for an optional parameter, first match wins:
/// a constant default expression, zero for integers, the empty string for
/// text, then the zero value of the type.
fn default_value(info: &ParameterInfo) -> Value {
    if let Some(constant) = info
        .default_expression
        .as_deref()
        .and_then(constant_default)
        .filter(|v| !v.is_null())
    {
        return constant;
    }

    match &info.semantic_type {
        SemanticType::Integer => Value::from(0),
        SemanticType::Text { .. } => Value::String(String::new()),
        other => zero_value(other),
    }
}

fn zero_value(semantic_type: &SemanticType) -> Value {
    match semantic_type {
        SemanticType::Integer => Value::from(0),
        SemanticType::Number => json!(0.0),
        SemanticType::Text { .. } => Value::String(String::new()),
        SemanticType::Boolean => Value::Bool(false),
        SemanticType::Array(_) => Value::Array(Vec::new()),
        SemanticType::Object => Value::Object(Map::new()),
        SemanticType::Any => Value::Null,
    }
}

/// Canonical JSON Schema for a semantic type
pub fn type_schema(semantic_type: &SemanticType) -> Map<String, Value> {
    let mut schema = Map::new();

    match semantic_type {
        SemanticType::Integer => {
            schema.insert("type".to_string(), json!("integer"));
        }
        SemanticType::Number => {
            schema.insert("type".to_string(), json!("number"));
        }
        SemanticType::Text { choices } => {
            schema.insert("type".to_string(), json!("string"));
            if !choices.is_empty() {
                schema.insert("enum".to_string(), json!(choices));
            }
        }
        SemanticType::Boolean => {
            schema.insert("type".to_string(), json!("boolean"));
        }
        SemanticType::Array(items) => {
            schema.insert("type".to_string(), json!("array"));
            schema.insert("items".to_string(), Value::Object(type_schema(items)));
        }
        SemanticType::Object => {
            schema.insert("type".to_string(), json!("object"));
        }
        SemanticType::Any => {}
    }

    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, semantic_type: SemanticType, mandatory: bool) -> ParameterInfo {
        ParameterInfo {
            name: name.to_string(),
            type_name: String::new(),
            semantic_type,
            mandatory,
            description: Some(format!("The {}.", name)),
            default_expression: None,
        }
    }

    fn command(name: &str, parameters: Vec<ParameterInfo>) -> CommandMetadata {
        CommandMetadata {
            name: name.to_string(),
            description: Some("Does a thing.".to_string()),
            parameters,
            parameter_sets: 1,
            outputs: Vec::new(),
        }
    }

    #[test]
    fn test_tool_name_normalization() {
        assert_eq!(tool_name("Get-Item"), "Get_Item");
        assert_eq!(tool_name("add_stock"), "add_stock");
        assert_eq!(tool_name("my script.v2"), "my_script_v2");
    }

    #[test]
    fn test_required_lists_exactly_mandatory_parameters() {
        let descriptor = synthesize(&command(
            "Get-Item",
            vec![
                param("path", SemanticType::text(), true),
                param("depth", SemanticType::Integer, false),
            ],
        ))
        .unwrap();

        assert_eq!(descriptor.name, "Get_Item");
        assert_eq!(descriptor.input_schema["type"], "object");
        assert_eq!(descriptor.input_schema["additionalProperties"], false);
        assert_eq!(descriptor.input_schema["required"], json!(["path"]));

        let properties = descriptor.input_schema["properties"].as_object().unwrap();
        assert_eq!(properties.len(), 2);
        assert_eq!(properties["path"]["type"], "string");
        assert_eq!(properties["path"]["description"], "The path.");
        assert!(properties["path"].get("default").is_none());
    }

    #[test]
    fn test_required_omitted_without_mandatory_parameters() {
        let descriptor = synthesize(&command(
            "List",
            vec![param("limit", SemanticType::Integer, false)],
        ))
        .unwrap();
        assert!(descriptor.input_schema.get("required").is_none());
    }

    #[test]
    fn test_default_policy() {
        let mut constant = param("mode", SemanticType::text(), false);
        constant.default_expression = Some("\"safe\"".to_string());

        let mut dynamic = param("count", SemanticType::Integer, false);
        dynamic.default_expression = Some("#items".to_string());

        let descriptor = synthesize(&command(
            "Update",
            vec![
                constant,
                dynamic,
                param("name", SemanticType::text(), false),
                param("force", SemanticType::Boolean, false),
                param("ratio", SemanticType::Number, false),
                param("tags", SemanticType::Array(Box::new(SemanticType::text())), false),
                param("extra", SemanticType::Object, false),
                param("anything", SemanticType::Any, false),
            ],
        ))
        .unwrap();

        let properties = &descriptor.input_schema["properties"];
        assert_eq!(properties["mode"]["default"], json!("safe"));
        assert_eq!(properties["count"]["default"], json!(0));
        assert_eq!(properties["name"]["default"], json!(""));
        assert_eq!(properties["force"]["default"], json!(false));
        assert_eq!(properties["ratio"]["default"], json!(0.0));
        assert_eq!(properties["tags"]["default"], json!([]));
        assert_eq!(properties["tags"]["items"]["type"], "string");
        assert_eq!(properties["extra"]["default"], json!({}));
        assert_eq!(properties["anything"]["default"], Value::Null);
        assert!(properties["anything"].get("type").is_none());
    }

    #[test]
    fn test_nil_default_falls_through_to_type_zero() {
        let mut limit = param("limit", SemanticType::Integer, false);
        limit.default_expression = Some("nil".to_string());

        let descriptor = synthesize(&command("List", vec![limit])).unwrap();
        assert_eq!(descriptor.input_schema["properties"]["limit"]["default"], json!(0));
    }

    #[test]
    fn test_choices_become_enum() {
        let descriptor = synthesize(&command(
            "Set-Mode",
            vec![param(
                "mode",
                SemanticType::Text {
                    choices: vec!["fast".to_string(), "safe".to_string()],
                },
                true,
            )],
        ))
        .unwrap();
        assert_eq!(
            descriptor.input_schema["properties"]["mode"]["enum"],
            json!(["fast", "safe"])
        );
    }

    #[test]
    fn test_multiple_parameter_sets_rejected() {
        let mut metadata = command("Get-Item", vec![]);
        metadata.parameter_sets = 2;

        let err = synthesize(&metadata).unwrap_err();
        assert_eq!(
            err,
            AdapterError::UnsupportedShape {
                command: "Get-Item".to_string(),
                parameter_sets: 2
            }
        );
    }

    #[test]
    fn test_descriptor_serializes_input_schema_key() {
        let descriptor = synthesize(&command("Ping", vec![])).unwrap();
        let value = serde_json::to_value(&descriptor).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("parameters").is_none());
    }
}
