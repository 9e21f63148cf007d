//! Tool Registry
//!
//! Information Hiding:
//! - Tool storage and lookup implementation hidden
//! - Module, script and help registration funnelled through one place
//! - Registration failures recorded instead of aborting the whole adapter

use super::help::{CommandHelpTool, ParameterHelpTool, SessionDirectory};
use super::module_tool::ModuleTools;
use super::script_tool::ScriptTool;
use super::{invocation_error, CallOutcome, Tool, ToolDescriptor};
use crate::config::AdapterConfig;
use crate::error::{AdapterError, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A module, script or command that could not be turned into tools
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationFailure {
    /// Module path, script path, or `module: command`
    pub source: String,
    pub error: AdapterError,
}

/// Tool registry for managing available tools
///
/// Provides the protocol-facing `list_tools` / `call_tool` surface
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    directory: SessionDirectory,
    failures: Vec<RegistrationFailure>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            directory: SessionDirectory::new(),
            failures: Vec::new(),
        }
    }

    /// Build a registry from configuration, recording anything that fails
    pub async fn from_config(config: &AdapterConfig) -> Self {
        let mut registry = Self::new();

        for path in &config.modules {
            if let Err(e) = registry.register_module(path).await {
                registry.record_failure(path.display().to_string(), e);
            }
        }

        for path in &config.scripts {
            if let Err(e) = registry.register_script(path).await {
                registry.record_failure(path.display().to_string(), e);
            }
        }

        if config.help_tools {
            if let Err(e) = registry.register_help_tools() {
                registry.record_failure("help tools".to_string(), e);
            }
        }

        tracing::info!(
            "Registry ready: {} tools, {} registration failures",
            registry.tools.len(),
            registry.failures.len()
        );

        registry
    }

    /// Register a new tool
    ///
    /// The first tool registered under a name keeps it; a later tool with
    /// the same name is rejected with `DuplicateTool`.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.descriptor().name.clone();
        if self.tools.contains_key(&name) {
            return Err(AdapterError::DuplicateTool { tool: name });
        }

        tracing::info!("Registering tool: {}", name);
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Import a Lua module and register one tool per documented export
    ///
    /// # Returns
    /// Number of tools registered from the module
    pub async fn register_module(&mut self, path: &Path) -> Result<usize> {
        let module = ModuleTools::import(path).await?;
        Ok(self.add_module(module).await)
    }

    /// Register the tools of an already imported module
    pub async fn add_module(&mut self, module: ModuleTools) -> usize {
        self.directory.add(module.session.clone()).await;

        for (command, error) in module.skipped {
            self.record_failure(format!("{}: {}", module.module, command), error);
        }

        let mut count = 0;
        for tool in module.tools {
            let source = format!("{}: {}", module.module, tool.command());
            match self.register(tool) {
                Ok(()) => count += 1,
                Err(e) => self.record_failure(source, e),
            }
        }
        count
    }

    /// Load a standalone Lua script and register it as a tool
    pub async fn register_script(&mut self, path: &Path) -> Result<()> {
        let tool = ScriptTool::load(path).await?;
        self.add_script(tool).await;
        Ok(())
    }

    pub async fn add_script(&mut self, tool: ScriptTool) {
        let source = tool.session().label().to_string();
        self.directory.add(tool.session().clone()).await;
        if let Err(e) = self.register(Arc::new(tool)) {
            self.record_failure(source, e);
        }
    }

    /// Register `get_help_for_command` and `get_help_for_parameter`
    pub fn register_help_tools(&mut self) -> Result<()> {
        let help: [Arc<dyn Tool>; 2] = [
            Arc::new(CommandHelpTool::new(self.directory.clone())?),
            Arc::new(ParameterHelpTool::new(self.directory.clone())?),
        ];

        for tool in help {
            let source = format!("help tools: {}", tool.descriptor().name);
            if let Err(e) = self.register(tool) {
                self.record_failure(source, e);
            }
        }
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Descriptors of every registered tool, sorted by name
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|tool| tool.descriptor().clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Call a tool with protocol-level arguments
    ///
    /// Unknown tools and malformed arguments produce error outcomes; only
    /// cancellation is reported as `Err`.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: &CancellationToken,
    ) -> Result<CallOutcome> {
        let Some(tool) = self.get(name) else {
            tracing::warn!("Call to unknown tool '{}'", name);
            return Ok(invocation_error(
                name,
                &format!("The tool '{}' is not registered.", name),
            ));
        };

        let args = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Ok(invocation_error(
                    name,
                    &format!("Arguments must be a JSON object, not {}.", json_kind(&other)),
                ))
            }
        };

        tool.invoke(&args, cancel).await
    }

    pub fn registration_failures(&self) -> &[RegistrationFailure] {
        &self.failures
    }

    fn record_failure(&mut self, source: String, error: AdapterError) {
        tracing::error!("Failed to register '{}': {}", source, error);
        self.failures.push(RegistrationFailure { source, error });
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
