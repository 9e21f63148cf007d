use crate::engine::EngineError;
use thiserror::Error;

/// Scriptbridge crate-specific Result type alias
pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AdapterError {
    #[error("The command '{command}' cannot be found.")]
    NotFound { command: String },

    #[error("The command '{command}' is missing documentation: {detail}")]
    MissingDocumentation { command: String, detail: String },

    #[error(
        "The command '{command}' declares {parameter_sets} parameter sets; only commands with a single parameter set are supported."
    )]
    UnsupportedShape {
        command: String,
        parameter_sets: usize,
    },

    #[error("The module '{module}' doesn't expose any functions.")]
    NoExportedCommands { module: String },

    #[error("A tool named '{tool}' is already registered.")]
    DuplicateTool { tool: String },

    #[error("The call to '{tool}' was cancelled before it started.")]
    Cancelled { tool: String },

    #[error(transparent)]
    Engine(#[from] EngineError),
}
