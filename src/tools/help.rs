//! Help tools - rendered documentation for any loaded command
//!
//! Information Hiding:
//! - Command lookup across every registered session hidden behind `SessionDirectory`
//! - Help text layout kept private to this module

use super::schema::synthesize;
use super::{CallOutcome, SharedSession, Tool, ToolDescriptor};
use crate::engine::{CommandMetadata, ParameterInfo, SemanticType};
use crate::error::{AdapterError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Sessions searched, in registration order, when resolving a command for help
#[derive(Clone, Default)]
pub struct SessionDirectory {
    sessions: Arc<RwLock<Vec<SharedSession>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, session: SharedSession) {
        self.sessions.write().await.push(session);
    }

    /// Metadata of the first session that knows `command`
    pub async fn find(&self, command: &str) -> Result<CommandMetadata> {
        let sessions = self.sessions.read().await.clone();

        for session in &sessions {
            match session.describe(command).await {
                Ok(metadata) => return Ok(metadata),
                Err(AdapterError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(AdapterError::NotFound {
            command: command.to_string(),
        })
    }
}

/// `get_help_for_command`
pub struct CommandHelpTool {
    descriptor: ToolDescriptor,
    directory: SessionDirectory,
}

impl CommandHelpTool {
    pub fn new(directory: SessionDirectory) -> Result<Self> {
        let descriptor = synthesize(&CommandMetadata {
            name: "get_help_for_command".to_string(),
            description: Some("Get help content for a Lua command.".to_string()),
            parameters: vec![text_parameter(
                "command",
                "The name of a Lua command to get help for.",
            )],
            parameter_sets: 1,
            outputs: vec!["string".to_string()],
        })?;

        Ok(Self {
            descriptor,
            directory,
        })
    }
}

#[async_trait]
impl Tool for CommandHelpTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        args: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome> {
        check_cancelled(&self.descriptor, cancel)?;

        let help = match string_argument(args, "command") {
            Ok(command) => self
                .directory
                .find(command)
                .await
                .map(|m| render_command(&m))
                .map_err(|e| e.to_string()),
            Err(message) => Err(message),
        };

        Ok(match help {
            Ok(text) => CallOutcome::text(text),
            Err(e) => help_error(&e, "the passed-in command name"),
        })
    }
}

/// `get_help_for_parameter`
pub struct ParameterHelpTool {
    descriptor: ToolDescriptor,
    directory: SessionDirectory,
}

impl ParameterHelpTool {
    pub fn new(directory: SessionDirectory) -> Result<Self> {
        let descriptor = synthesize(&CommandMetadata {
            name: "get_help_for_parameter".to_string(),
            description: Some(
                "Get help content about one or more parameters of a Lua command.".to_string(),
            ),
            parameters: vec![
                text_parameter("command", "The name of a Lua command."),
                ParameterInfo {
                    name: "parameters".to_string(),
                    type_name: "string[]".to_string(),
                    semantic_type: SemanticType::Array(Box::new(SemanticType::text())),
                    mandatory: true,
                    description: Some(
                        "The names of one or more parameters of the specified Lua command."
                            .to_string(),
                    ),
                    default_expression: None,
                },
            ],
            parameter_sets: 1,
            outputs: vec!["string".to_string()],
        })?;

        Ok(Self {
            descriptor,
            directory,
        })
    }

    async fn help(&self, args: &Map<String, Value>) -> std::result::Result<String, String> {
        let command = string_argument(args, "command")?;
        let names = string_list_argument(args, "parameters")?;

        let metadata = self
            .directory
            .find(command)
            .await
            .map_err(|e| e.to_string())?;

        let mut out = String::new();
        for name in &names {
            let parameter = metadata
                .parameter(name)
                .ok_or_else(|| format!("No parameter matches criteria '{}'.", name))?;
            render_parameter(&mut out, parameter);
        }

        Ok(out)
    }
}

#[async_trait]
impl Tool for ParameterHelpTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        args: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome> {
        check_cancelled(&self.descriptor, cancel)?;

        Ok(match self.help(args).await {
            Ok(text) => CallOutcome::text(text),
            Err(e) => help_error(&e, "the passed-in command name or parameter name(s)"),
        })
    }
}

fn text_parameter(name: &str, description: &str) -> ParameterInfo {
    ParameterInfo {
        name: name.to_string(),
        type_name: "string".to_string(),
        semantic_type: SemanticType::text(),
        mandatory: true,
        description: Some(description.to_string()),
        default_expression: None,
    }
}

fn check_cancelled(descriptor: &ToolDescriptor, cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(AdapterError::Cancelled {
            tool: descriptor.name.clone(),
        });
    }
    Ok(())
}

fn help_error(error: &dyn std::fmt::Display, culprit: &str) -> CallOutcome {
    tracing::debug!("Help lookup failed: {}", error);
    CallOutcome::error(format!(
        "Failed to retrieve the help content due to the following error:\n```\n{}\n```\nCheck to see if it's caused by {}, and if so, please try again.",
        error, culprit
    ))
}

fn string_argument<'a>(args: &'a Map<String, Value>, name: &str) -> std::result::Result<&'a str, String> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("The argument '{}' is required and must be a string.", name))
}

fn string_list_argument(args: &Map<String, Value>, name: &str) -> std::result::Result<Vec<String>, String> {
    let invalid = || format!("The argument '{}' must be a list of strings.", name);

    match args.get(name) {
        Some(Value::String(single)) => Ok(vec![single.clone()]),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}

fn render_command(metadata: &CommandMetadata) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "NAME\n    {}\n", metadata.name);

    if let Some(description) = metadata.description.as_deref() {
        let _ = writeln!(out, "SYNOPSIS");
        for line in description.lines() {
            let _ = writeln!(out, "    {}", line);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "SYNTAX\n    {}\n", syntax(metadata));

    if !metadata.parameters.is_empty() {
        let _ = writeln!(out, "PARAMETERS");
        for parameter in &metadata.parameters {
            render_parameter(&mut out, parameter);
        }
    }

    if !metadata.outputs.is_empty() {
        let _ = writeln!(out, "OUTPUTS");
        for output in &metadata.outputs {
            let _ = writeln!(out, "    {}", output);
        }
    }

    out.trim_end().to_string()
}

fn syntax(metadata: &CommandMetadata) -> String {
    let params = metadata
        .parameters
        .iter()
        .map(|p| {
            let marker = if p.mandatory { "" } else { "?" };
            format!("{}{}: {}", p.name, marker, p.type_name)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("{}({})", metadata.name, params)
}

fn render_parameter(out: &mut String, parameter: &ParameterInfo) {
    let _ = writeln!(out, "    {} <{}>", parameter.name, parameter.type_name);
    if let Some(description) = parameter.description.as_deref() {
        for line in description.lines() {
            let _ = writeln!(out, "        {}", line);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "        Required?       {}", parameter.mandatory);
    if let Some(default) = parameter.default_expression.as_deref() {
        let _ = writeln!(out, "        Default value   {}", default);
    }
    let _ = writeln!(out);
}
