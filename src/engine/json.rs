//! JSON conversion for captured script values

use super::{EngineError, ScriptValue};
use serde_json::{Map, Number, Value};

/// Conversion settings for `to_json`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Containers nested deeper than this are rendered as their type name
    pub depth: usize,
    pub enums_as_strings: bool,
    pub compress: bool,
}

impl JsonOptions {
    pub fn compact(depth: usize) -> Self {
        Self {
            depth,
            enums_as_strings: true,
            compress: true,
        }
    }
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            depth: 2,
            enums_as_strings: false,
            compress: false,
        }
    }
}

pub fn to_json(value: &ScriptValue, options: &JsonOptions) -> Result<String, EngineError> {
    let json = convert(value, 0, options)?;

    let text = if options.compress {
        serde_json::to_string(&json)
    } else {
        serde_json::to_string_pretty(&json)
    };

    text.map_err(|e| EngineError::Conversion(e.to_string()))
}

fn convert(value: &ScriptValue, level: usize, options: &JsonOptions) -> Result<Value, EngineError> {
    let json = match value {
        ScriptValue::Null => Value::Null,
        ScriptValue::Bool(b) => Value::Bool(*b),
        ScriptValue::Integer(i) => Value::from(*i),
        ScriptValue::Number(n) => Number::from_f64(*n).map(Value::Number).ok_or_else(|| {
            EngineError::Conversion(format!(
                "The value {} cannot be converted to JSON because it is not a finite number.",
                n
            ))
        })?,
        ScriptValue::Text(text) => Value::String(text.clone()),
        ScriptValue::Enum(e) if options.enums_as_strings => Value::String(e.name.clone()),
        ScriptValue::Enum(e) => Value::from(e.code),
        ScriptValue::Opaque(kind) => Value::String(kind.clone()),
        ScriptValue::List(_) | ScriptValue::Record(_) if level >= options.depth => {
            tracing::debug!(
                "Truncating {} at depth {} during JSON conversion",
                value.type_name(),
                options.depth
            );
            Value::String(value.type_name().to_string())
        }
        ScriptValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| convert(item, level + 1, options))
                .collect::<Result<_, _>>()?,
        ),
        ScriptValue::Record(fields) => {
            let mut map = Map::new();
            for (key, field) in fields {
                map.insert(key.clone(), convert(field, level + 1, options)?);
            }
            Value::Object(map)
        }
    };

    Ok(json)
}
