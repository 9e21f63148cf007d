//! Tool System - Exposes documented script commands as callable tools
//!
//! Information Hiding:
//! - Session locking and argument binding hidden behind `Tool::invoke`
//! - Descriptor synthesis hidden in `schema`
//! - Invocation failures converted to error outcomes at the tool boundary

pub mod help;
pub mod marshal;
pub mod metadata;
pub mod module_tool;
pub mod registry;
pub mod schema;
pub mod script_tool;
pub mod session;

use crate::error::{AdapterError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tokio_util::sync::CancellationToken;

pub use schema::{ParameterDescriptor, ToolDescriptor};
pub use session::SharedSession;

/// Atomic unit of returned data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text { text } => text,
        }
    }
}

/// Result of a tool call, as handed back to the protocol layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallOutcome {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            is_error: false,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            is_error: false,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(message)],
            is_error: true,
        }
    }

    /// All text content joined with newlines
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text_content())
    }
}

/// Tool trait - every externally invocable unit implements this
///
/// Information Hiding: implementations hide which session they run in and
/// how results are converted; callers only see descriptors and outcomes.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Immutable name, description and input schema
    fn descriptor(&self) -> &ToolDescriptor;

    /// Invoke the tool with already-decoded arguments
    ///
    /// # Returns
    /// * `Ok(CallOutcome)` - for successful calls and for invocation failures
    /// * `Err(AdapterError::Cancelled)` - when `cancel` fired before the call started
    async fn invoke(
        &self,
        args: &Map<String, Value>,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome>;
}

/// Error outcome for a failed invocation
pub fn invocation_error(tool: &str, error: &dyn fmt::Display) -> CallOutcome {
    CallOutcome::error(format!(
        "Failed to invoke the tool '{}' due to the following error:\n```\n{}\n```\nCheck to see if it's caused by the passed-in command name or parameter name(s), and if so, please try again.",
        tool, error
    ))
}

/// Call frame shared by session-backed tools
pub(crate) async fn invoke_command(
    descriptor: &ToolDescriptor,
    session: &SharedSession,
    command: &str,
    args: &Map<String, Value>,
    cancel: &CancellationToken,
) -> Result<CallOutcome> {
    if cancel.is_cancelled() {
        return Err(AdapterError::Cancelled {
            tool: descriptor.name.clone(),
        });
    }

    tracing::debug!(
        "Invoking tool '{}' with {} arguments",
        descriptor.name,
        args.len()
    );

    match session.invoke_marshalled(command, args).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::warn!("Tool '{}' failed: {}", descriptor.name, e);
            Ok(invocation_error(&descriptor.name, &e))
        }
    }
}
