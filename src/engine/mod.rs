//! Script Engine Boundary
//!
//! Information Hiding:
//! - Interpreter state (variables, loaded modules) hidden behind `ScriptSession`
//! - Documentation and signature introspection exposed only as `CommandMetadata`
//! - Engine-native result values captured into owned `ScriptValue`s

pub mod annotations;
pub mod json;
pub mod lua;

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use json::JsonOptions;
pub use lua::LuaSession;

/// Failures raised by a script engine while loading, introspecting or running commands
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("The term '{0}' is not recognized as the name of a command.")]
    CommandNotFound(String),

    #[error("Cannot find path '{}' because it does not exist.", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Failed to load '{name}': {message}")]
    Load { name: String, message: String },

    #[error("{0}")]
    ParameterBinding(String),

    #[error("{0}")]
    Execution(String),

    #[error("{0}")]
    Conversion(String),
}

/// Semantic category of a declared parameter type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    Integer,
    Number,
    /// Text, optionally restricted to a set of literal choices
    Text { choices: Vec<String> },
    Boolean,
    Array(Box<SemanticType>),
    Object,
    Any,
}

impl SemanticType {
    pub fn text() -> Self {
        SemanticType::Text { choices: Vec::new() }
    }
}

/// One declared parameter of a command, as reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    /// Declared type in the engine's own notation
    pub type_name: String,
    pub semantic_type: SemanticType,
    pub mandatory: bool,
    pub description: Option<String>,
    /// Default value expression in source form, when statically present
    pub default_expression: Option<String>,
}

/// Reflective metadata and documentation for one command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMetadata {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<ParameterInfo>,
    /// Number of alternate argument shapes the command accepts
    pub parameter_sets: usize,
    /// Documented return values
    pub outputs: Vec<String>,
}

impl CommandMetadata {
    pub fn parameter(&self, name: &str) -> Option<&ParameterInfo> {
        self.parameters
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Commands exported by an imported module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleInfo {
    pub name: String,
    pub commands: Vec<String>,
}

/// A categorical value carrying both its name and numeric code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub name: String,
    pub code: i64,
}

/// Owned copy of one value produced by a command
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    Enum(EnumValue),
    List(Vec<ScriptValue>),
    /// Keyed fields, sorted by key
    Record(Vec<(String, ScriptValue)>),
    /// A value with no data representation (functions, threads, foreign handles)
    Opaque(String),
}

impl ScriptValue {
    pub fn type_name(&self) -> &str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Integer(_) => "integer",
            ScriptValue::Number(_) => "number",
            ScriptValue::Text(_) => "string",
            ScriptValue::Enum(e) => &e.type_name,
            ScriptValue::List(_) => "list",
            ScriptValue::Record(_) => "record",
            ScriptValue::Opaque(kind) => kind,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScriptValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// A stateful execution context in a script engine
///
/// Commands are run pipeline-style: queue a command, bind named parameters,
/// then execute. Interpreter state persists between executions.
pub trait ScriptSession: Send {
    /// Import a module and enumerate the commands it exports
    fn import_module(&mut self, path: &Path) -> Result<ModuleInfo, EngineError>;

    /// Resolve a standalone script file to a command; returns the command key
    fn resolve_script(&mut self, path: &Path) -> Result<String, EngineError>;

    /// Signature and documentation of a resolved command
    fn command_metadata(&mut self, command: &str) -> Result<CommandMetadata, EngineError>;

    /// Queue a command for the next execution
    fn add_command(&mut self, command: &str);

    /// Bind a named parameter to the queued command
    fn add_parameter(&mut self, name: &str, value: Value);

    /// Run the queued command and return its results in order
    fn execute(&mut self) -> Result<Vec<ScriptValue>, EngineError>;

    /// Drop any queued command and bound parameters
    fn clear(&mut self);

    /// Convert results to JSON text
    fn convert_to_json(
        &mut self,
        value: &ScriptValue,
        options: &JsonOptions,
    ) -> Result<String, EngineError> {
        json::to_json(value, options)
    }
}
