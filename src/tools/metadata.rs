//! Metadata Reader - validated command documentation
//!
//! Information Hiding:
//! - Engine lookup failures mapped to adapter errors
//! - Documentation completeness enforced before any descriptor is built

use crate::engine::{CommandMetadata, EngineError, ScriptSession};
use crate::error::{AdapterError, Result};

/// Fetch metadata for `command` and verify it is fully documented
///
/// Every command needs a description, and every declared parameter needs
/// its own description, before it can be exposed as a tool.
pub fn read_metadata(session: &mut dyn ScriptSession, command: &str) -> Result<CommandMetadata> {
    let metadata = lookup(session, command)?;
    validate(&metadata)?;

    tracing::debug!(
        "Read metadata for '{}' ({} parameters)",
        metadata.name,
        metadata.parameters.len()
    );

    Ok(metadata)
}

/// Fetch metadata for `command` as the engine reports it, documented or not
pub fn lookup(session: &mut dyn ScriptSession, command: &str) -> Result<CommandMetadata> {
    session.command_metadata(command).map_err(|e| match e {
        EngineError::CommandNotFound(_) => AdapterError::NotFound {
            command: command.to_string(),
        },
        other => AdapterError::Engine(other),
    })
}

/// Report a module or script file that does not exist as `NotFound`
pub fn missing_source(error: AdapterError) -> AdapterError {
    match error {
        AdapterError::Engine(EngineError::SourceNotFound(path)) => AdapterError::NotFound {
            command: path.display().to_string(),
        },
        other => other,
    }
}

fn validate(metadata: &CommandMetadata) -> Result<()> {
    if is_blank(metadata.description.as_deref()) {
        return Err(AdapterError::MissingDocumentation {
            command: metadata.name.clone(),
            detail: "the command has no description".to_string(),
        });
    }

    let undocumented: Vec<&str> = metadata
        .parameters
        .iter()
        .filter(|p| is_blank(p.description.as_deref()))
        .map(|p| p.name.as_str())
        .collect();

    if !undocumented.is_empty() {
        return Err(AdapterError::MissingDocumentation {
            command: metadata.name.clone(),
            detail: format!("no description for parameter(s) {}", undocumented.join(", ")),
        });
    }

    Ok(())
}

fn is_blank(text: Option<&str>) -> bool {
    text.map_or(true, |t| t.trim().is_empty())
}
