//! Standalone script tool - one script file, one private session

use super::marshal::JSON_DEPTH;
use super::metadata::missing_source;
use super::schema::synthesize;
use super::{invoke_command, CallOutcome, SharedSession, Tool, ToolDescriptor};
use crate::engine::{LuaSession, ScriptSession};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// A script file exposed as a single tool
///
/// The session is private to this tool but still locked per call, so
/// concurrent invocations of the same script run one after another.
pub struct ScriptTool {
    descriptor: ToolDescriptor,
    command: String,
    session: SharedSession,
}

impl ScriptTool {
    /// Load a Lua script into a fresh session
    pub async fn load(path: &Path) -> Result<Self> {
        let session = LuaSession::new()?.with_capture_depth(JSON_DEPTH + 1);
        Self::load_into(Box::new(session), path).await
    }

    pub async fn load_into(session: Box<dyn ScriptSession>, path: &Path) -> Result<Self> {
        let session = SharedSession::new(path.display().to_string(), session);
        let command = session.resolve_script(path).await.map_err(missing_source)?;
        let metadata = session.command_metadata(&command).await?;
        let descriptor = synthesize(&metadata)?;

        tracing::info!("Script '{}' provides tool '{}'", path.display(), descriptor.name);

        Ok(Self {
            descriptor,
            command,
            session,
        })
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }
}

#[async_trait]
impl Tool for ScriptTool {
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
