//! In-memory script session for unit tests

use crate::engine::{
    json, CommandMetadata, EngineError, JsonOptions, ModuleInfo, ScriptSession, ScriptValue,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Handler = Box<dyn Fn(&HashMap<String, Value>) -> Result<Vec<ScriptValue>, EngineError> + Send>;

/// Observable pipeline state of a `MockSession`
#[derive(Debug, Default)]
pub struct MockState {
    pub queued: Option<String>,
    pub parameters: Vec<(String, Value)>,
    pub executed: Vec<String>,
    pub clears: usize,
}

#[derive(Default)]
pub struct MockSession {
    commands: HashMap<String, CommandMetadata>,
    handlers: HashMap<String, Handler>,
    modules: HashMap<PathBuf, ModuleInfo>,
    scripts: HashMap<PathBuf, String>,
    json_failure: Option<String>,
    state: Arc<Mutex<MockState>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_command(mut self, metadata: CommandMetadata) -> Self {
        self.commands.insert(metadata.name.clone(), metadata);
        self
    }

    pub fn with_handler<F>(mut self, command: &str, handler: F) -> Self
    where
        F: Fn(&HashMap<String, Value>) -> Result<Vec<ScriptValue>, EngineError> + Send + 'static,
    {
        self.handlers.insert(command.to_string(), Box::new(handler));
        self
    }

    pub fn with_module(mut self, path: impl Into<PathBuf>, info: ModuleInfo) -> Self {
        self.modules.insert(path.into(), info);
        self
    }

    pub fn with_script(mut self, path: impl Into<PathBuf>, metadata: CommandMetadata) -> Self {
        let path = path.into();
        self.scripts.insert(path, metadata.name.clone());
        self.with_command(metadata)
    }

    pub fn with_json_failure(mut self, message: &str) -> Self {
        self.json_failure = Some(message.to_string());
        self
    }

    /// Handle for inspecting pipeline state after the session is boxed
    pub fn observer(&self) -> Arc<Mutex<MockState>> {
        self.state.clone()
    }
}

impl ScriptSession for MockSession {
    fn import_module(&mut self, path: &Path) -> Result<ModuleInfo, EngineError> {
        self.modules
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::SourceNotFound(path.to_path_buf()))
    }

    fn resolve_script(&mut self, path: &Path) -> Result<String, EngineError> {
        self.scripts
            .get(path)
            .cloned()
            .ok_or_else(|| EngineError::SourceNotFound(path.to_path_buf()))
    }

    fn command_metadata(&mut self, command: &str) -> Result<CommandMetadata, EngineError> {
        self.commands
            .get(command)
            .cloned()
            .ok_or_else(|| EngineError::CommandNotFound(command.to_string()))
    }

    fn add_command(&mut self, command: &str) {
        self.state.lock().unwrap().queued = Some(command.to_string());
    }

    fn add_parameter(&mut self, name: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .parameters
            .push((name.to_string(), value));
    }

    fn execute(&mut self) -> Result<Vec<ScriptValue>, EngineError> {
        let (command, parameters) = {
            let mut state = self.state.lock().unwrap();
            let command = state.queued.take().ok_or_else(|| {
                EngineError::Execution("No command has been queued for execution.".to_string())
            })?;
            state.executed.push(command.clone());
            let parameters: HashMap<String, Value> = state.parameters.drain(..).collect();
            (command, parameters)
        };

        match self.handlers.get(&command) {
            Some(handler) => handler(&parameters),
            None => Err(EngineError::CommandNotFound(command)),
        }
    }

    fn clear(&mut self) {
        let mut state = self.state.lock().unwrap();
        state.queued = None;
        state.parameters.clear();
        state.clears += 1;
    }

    fn convert_to_json(
        &mut self,
        value: &ScriptValue,
        options: &JsonOptions,
    ) -> Result<String, EngineError> {
        match &self.json_failure {
            Some(message) => Err(EngineError::Conversion(message.clone())),
            None => json::to_json(value, options),
        }
    }
}
