//! Module-scoped tools - every exported function of one module
//!
//! Information Hiding:
//! - All tools of a module share one session through `SharedSession`
//! - Per-command registration failures are contained to that command

use super::marshal::JSON_DEPTH;
use super::metadata::missing_source;
use super::schema::synthesize;
use super::{invoke_command, CallOutcome, SharedSession, Tool, ToolDescriptor};
use crate::engine::{LuaSession, ScriptSession};
use crate::error::{AdapterError, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One exported module function exposed as a tool
pub struct ModuleTool {
    descriptor: ToolDescriptor,
    command: String,
    session: SharedSession,
}

impl ModuleTool {
    async fn build(session: &SharedSession, command: &str) -> Result<Self> {
        let metadata = session.command_metadata(command).await?;
        let descriptor = synthesize(&metadata)?;

        Ok(Self {
            descriptor,
            command: command.to_string(),
            session: session.clone(),
        })
    }

    /// Name of the module function behind this tool
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Tool for ModuleTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn invoke(
        &self,
        args: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome> {
        invoke_command(&self.descriptor, &self.session, &self.command, args, cancel).await
    }
}

/// The tools produced by importing one module
pub struct ModuleTools {
    pub module: String,
    pub session: SharedSession,
    pub tools: Vec<Arc<ModuleTool>>,
    /// Exported functions that could not become tools
    pub skipped: Vec<(String, AdapterError)>,
}

impl ModuleTools {
    /// Import a Lua module into a fresh session
    pub async fn import(path: &Path) -> Result<Self> {
        let session = LuaSession::new()?.with_capture_depth(JSON_DEPTH + 1);
        Self::import_into(Box::new(session), path).await
    }

    /// Import a module into the given session and build one tool per export
    ///
    /// Fails as a whole only when the module cannot be imported or exports
    /// nothing; commands that cannot be described are skipped.
    pub async fn import_into(session: Box<dyn ScriptSession>, path: &Path) -> Result<Self> {
        let session = SharedSession::new(path.display().to_string(), session);
        let info = session.import_module(path).await.map_err(missing_source)?;

        if info.commands.is_empty() {
            return Err(AdapterError::NoExportedCommands { module: info.name });
        }

        let mut tools = Vec::new();
        let mut skipped = Vec::new();

        for command in &info.commands {
            match ModuleTool::build(&session, command).await {
                Ok(tool) => tools.push(Arc::new(tool)),
                Err(e) => {
                    tracing::warn!(
                        "Skipping '{}' from module '{}': {}",
                        command,
                        info.name,
                        e
                    );
                    skipped.push((command.clone(), e));
                }
            }
        }

        tracing::info!(
            "Module '{}' provides {} of {} commands as tools",
            info.name,
            tools.len(),
            info.commands.len()
        );

        Ok(Self {
            module: info.name,
            session,
            tools,
            skipped,
        })
    }
}
