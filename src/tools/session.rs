//! Session Invoker - serialized access to a shared script session
//!
//! Information Hiding:
//! - The raw session is never handed out; every access goes through the lock
//! - Pipeline state is cleared before and after each call
//! - Result conversion runs inside the same critical section as execution

use super::marshal;
use super::CallOutcome;
use crate::engine::{CommandMetadata, ModuleInfo, ScriptSession, ScriptValue};
use crate::error::Result;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A script session guarded for exclusive use by one call at a time
#[derive(Clone)]
pub struct SharedSession {
    label: Arc<str>,
    inner: Arc<Mutex<Box<dyn ScriptSession>>>,
}

impl SharedSession {
    pub fn new(label: impl Into<String>, session: Box<dyn ScriptSession>) -> Self {
        Self {
            label: Arc::from(label.into()),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Name of the module or script this session serves
    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn import_module(&self, path: &Path) -> Result<ModuleInfo> {
        let mut session = self.inner.lock().await;
        Ok(session.import_module(path)?)
    }

    pub async fn resolve_script(&self, path: &Path) -> Result<String> {
        let mut session = self.inner.lock().await;
        Ok(session.resolve_script(path)?)
    }

    /// Read validated metadata for a command in this session
    pub async fn command_metadata(&self, command: &str) -> Result<CommandMetadata> {
        let mut session = self.inner.lock().await;
        super::metadata::read_metadata(session.as_mut(), command)
    }

    /// Unvalidated metadata for a command in this session
    pub async fn describe(&self, command: &str) -> Result<CommandMetadata> {
        let mut session = self.inner.lock().await;
        super::metadata::lookup(session.as_mut(), command)
    }

    /// Run `command` with named arguments and return its raw results
    pub async fn invoke(
        &self,
        command: &str,
        args: &Map<String, Value>,
    ) -> Result<Vec<ScriptValue>> {
        let mut session = self.inner.lock().await;
        Ok(run(session.as_mut(), command, args)?)
    }

    /// Run `command` and marshal its results while still holding the session
    pub async fn invoke_marshalled(
        &self,
        command: &str,
        args: &Map<String, Value>,
    ) -> Result<CallOutcome> {
        let mut session = self.inner.lock().await;
        let results = run(session.as_mut(), command, args)?;
        Ok(marshal::marshal(&results, session.as_mut()))
    }
}

impl std::fmt::Debug for SharedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSession")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn run(
    session: &mut dyn ScriptSession,
    command: &str,
    args: &Map<String, Value>,
) -> std::result::Result<Vec<ScriptValue>, crate::engine::EngineError> {
    session.clear();
    session.add_command(command);
    for (name, value) in args {
        session.add_parameter(name, value.clone());
    }

    let results = session.execute();
    session.clear();

    tracing::trace!("Command '{}' finished (ok: {})", command, results.is_ok());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use crate::testing::MockSession;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_invoke_binds_parameters_and_clears() {
        let mock = MockSession::new().with_handler("echo", |params| {
            Ok(vec![ScriptValue::Text(params["text"].as_str().unwrap().to_string())])
        });
        let observer = mock.observer();
        let shared = SharedSession::new("mock", Box::new(mock));

        let results = shared.invoke("echo", &args(json!({"text": "hi"}))).await.unwrap();
        assert_eq!(results, vec![ScriptValue::Text("hi".to_string())]);

        let state = observer.lock().unwrap();
        assert_eq!(state.executed, vec!["echo".to_string()]);
        assert!(state.queued.is_none());
        assert!(state.parameters.is_empty());
        assert_eq!(state.clears, 2);
    }

    #[tokio::test]
    async fn test_failure_discards_results_and_clears() {
        let mock = MockSession::new().with_handler("boom", |_| {
            Err(EngineError::Execution("exploded".to_string()))
        });
        let observer = mock.observer();
        let shared = SharedSession::new("mock", Box::new(mock));

        let err = shared.invoke("boom", &Map::new()).await.unwrap_err();
        assert!(err.to_string().contains("exploded"));
        assert!(observer.lock().unwrap().queued.is_none());
    }

    #[tokio::test]
    async fn test_marshalled_invocation() {
        let mock = MockSession::new().with_handler("pair", |_| {
            Ok(vec![ScriptValue::Integer(1), ScriptValue::Integer(2)])
        });
        let shared = SharedSession::new("mock", Box::new(mock));

        let outcome = shared.invoke_marshalled("pair", &Map::new()).await.unwrap();
        assert_eq!(outcome.text_content(), "[1,2]");
        assert!(!outcome.is_error);
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_their_own_arguments() {
        let mock = MockSession::new().with_handler("identity", |params| {
            Ok(vec![ScriptValue::Integer(params["n"].as_i64().unwrap())])
        });
        let observer = mock.observer();
        let shared = SharedSession::new("mock", Box::new(mock));

        let calls = (0..8).map(|n| {
            let shared = shared.clone();
            tokio::spawn(async move { shared.invoke("identity", &args(json!({"n": n}))).await })
        });
        let results = futures::future::join_all(calls).await;

        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result.unwrap().unwrap(), vec![ScriptValue::Integer(n as i64)]);
        }
        assert_eq!(observer.lock().unwrap().executed.len(), 8);
    }
}
