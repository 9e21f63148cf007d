//! Lua Script Session
//!
//! Information Hiding:
//! - The embedded interpreter and its loaded modules stay inside `LuaSession`
//! - Named parameters are bound to positional Lua arguments here
//! - Lua values are captured into owned `ScriptValue`s before leaving the session

use super::annotations;
use super::{CommandMetadata, EngineError, EnumValue, ModuleInfo, ScriptSession, ScriptValue};
use mlua::{
    Function, Lua, MetaMethod, MultiValue, Table, UserData, UserDataFields, UserDataMethods,
    Value as LuaValue,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Tables nested deeper than this are captured by kind only
const CAPTURE_DEPTH: usize = 8;

impl UserData for EnumValue {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("type", |_, this| Ok(this.type_name.clone()));
        fields.add_field_method_get("name", |_, this| Ok(this.name.clone()));
        fields.add_field_method_get("code", |_, this| Ok(this.code));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.name.clone()));
    }
}

enum Target {
    Export {
        module: Table,
        function: String,
        method: bool,
    },
    Script {
        chunk: Function,
    },
}

struct LuaCommand {
    target: Target,
    metadata: CommandMetadata,
}

/// A long-lived Lua interpreter holding imported modules and scripts
pub struct LuaSession {
    lua: Lua,
    commands: HashMap<String, LuaCommand>,
    queued: Option<String>,
    parameters: Vec<(String, Value)>,
    capture_depth: usize,
}

impl LuaSession {
    pub fn new() -> Result<Self, EngineError> {
        let lua = Lua::new();
        install_prelude(&lua).map_err(|e| load_error("prelude", e))?;

        Ok(Self {
            lua,
            commands: HashMap::new(),
            queued: None,
            parameters: Vec::new(),
            capture_depth: CAPTURE_DEPTH,
        })
    }

    /// Limit how deep result tables are copied out of the interpreter
    ///
    /// Nested tables past the limit come back as `Opaque("list")` or
    /// `Opaque("record")`, so self-referencing tables stay bounded.
    pub fn with_capture_depth(mut self, depth: usize) -> Self {
        self.capture_depth = depth;
        self
    }

    fn find(&self, command: &str) -> Option<&LuaCommand> {
        self.commands.get(command).or_else(|| {
            self.commands
                .values()
                .find(|c| c.metadata.name == command)
        })
    }
}

/// Globals every session starts with: `enum(type, name, code)` and a `print`
/// that logs instead of writing to stdout
fn install_prelude(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    globals.set(
        "enum",
        lua.create_function(
            |_, (type_name, name, code): (String, String, Option<i64>)| {
                Ok(EnumValue {
                    type_name,
                    name,
                    code: code.unwrap_or(0),
                })
            },
        )?,
    )?;

    globals.set(
        "print",
        lua.create_function(|_, args: MultiValue| {
            let line = args.iter().map(describe).collect::<Vec<_>>().join("\t");
            tracing::info!(target: "lua", "{}", line);
            Ok(())
        })?,
    )?;

    Ok(())
}

impl ScriptSession for LuaSession {
    fn import_module(&mut self, path: &Path) -> Result<ModuleInfo, EngineError> {
        let source = read_source(path)?;
        let name = stem(path);

        let exports = match self
            .lua
            .load(source.as_str())
            .set_name(format!("@{}", path.display()))
            .eval::<LuaValue>()
        {
            Ok(LuaValue::Table(table)) => table,
            Ok(other) => {
                return Err(EngineError::Load {
                    name,
                    message: format!(
                        "module returned a {} instead of a table",
                        other.type_name()
                    ),
                })
            }
            Err(e) => return Err(load_error(&name, e)),
        };

        // make the module reachable through require() from later code
        self.lua
            .globals()
            .get::<Table>("package")
            .and_then(|package| package.get::<Table>("loaded"))
            .and_then(|loaded| loaded.set(name.as_str(), exports.clone()))
            .map_err(|e| load_error(&name, e))?;

        // `function M.x` outranks a same-named `local function x` helper
        let mut decls: HashMap<String, annotations::FunctionDecl> = HashMap::new();
        for decl in annotations::scan_functions(&source) {
            let keep_existing = decls
                .get(&decl.name)
                .is_some_and(|existing| existing.qualified || !decl.qualified);
            if !keep_existing {
                decls.insert(decl.name.clone(), decl);
            }
        }

        let mut commands = Vec::new();
        for pair in exports.clone().pairs::<LuaValue, LuaValue>() {
            let (key, value) = pair.map_err(|e| load_error(&name, e))?;
            if let (LuaValue::String(key), LuaValue::Function(_)) = (&key, &value) {
                commands.push(String::from(key.to_string_lossy()));
            }
        }
        commands.sort();

        for command in &commands {
            let (metadata, method) = match decls.get(command) {
                Some(decl) => (
                    annotations::build_metadata(command, &decl.params, &decl.doc, &decl.defaults),
                    decl.method,
                ),
                None => (
                    CommandMetadata {
                        name: command.clone(),
                        description: None,
                        parameters: Vec::new(),
                        parameter_sets: 1,
                        outputs: Vec::new(),
                    },
                    false,
                ),
            };

            if self.commands.contains_key(command) {
                tracing::warn!(
                    "Function '{}' from module '{}' replaces an earlier command",
                    command,
                    name
                );
            }

            self.commands.insert(
                command.clone(),
                LuaCommand {
                    target: Target::Export {
                        module: exports.clone(),
                        function: command.clone(),
                        method,
                    },
                    metadata,
                },
            );
        }

        tracing::info!(
            "Imported Lua module '{}' exporting {} functions",
            name,
            commands.len()
        );

        Ok(ModuleInfo { name, commands })
    }

    fn resolve_script(&mut self, path: &Path) -> Result<String, EngineError> {
        let source = read_source(path)?;
        let name = stem(path);

        if path.extension().and_then(|ext| ext.to_str()) != Some("lua") {
            return Err(EngineError::Load {
                name,
                message: "not a Lua script (expected a .lua file)".to_string(),
            });
        }

        let chunk = self
            .lua
            .load(source.as_str())
            .set_name(format!("@{}", path.display()))
            .into_function()
            .map_err(|e| load_error(&name, e))?;

        let decl = annotations::scan_script(&source);
        let metadata = annotations::build_metadata(&name, &decl.params, &decl.doc, &decl.defaults);

        let key = path.display().to_string();
        self.commands.insert(
            key.clone(),
            LuaCommand {
                target: Target::Script { chunk },
                metadata,
            },
        );

        tracing::info!("Resolved Lua script '{}'", key);
        Ok(key)
    }

    fn command_metadata(&mut self, command: &str) -> Result<CommandMetadata, EngineError> {
        self.find(command)
            .map(|c| c.metadata.clone())
            .ok_or_else(|| EngineError::CommandNotFound(command.to_string()))
    }

    fn add_command(&mut self, command: &str) {
        self.queued = Some(command.to_string());
    }

    fn add_parameter(&mut self, name: &str, value: Value) {
        self.parameters.push((name.to_string(), value));
    }

    fn execute(&mut self) -> Result<Vec<ScriptValue>, EngineError> {
        let command = self.queued.take().ok_or_else(|| {
            EngineError::Execution("No command has been queued for execution.".to_string())
        })?;
        let parameters = std::mem::take(&mut self.parameters);

        let entry = self
            .find(&command)
            .ok_or_else(|| EngineError::CommandNotFound(command.clone()))?;

        let slots = bind_arguments(&entry.metadata, parameters)?;

        let (function, receiver) = match &entry.target {
            Target::Export {
                module,
                function,
                method,
            } => match module.get::<LuaValue>(function.as_str()) {
                Ok(LuaValue::Function(f)) => (f, method.then(|| module.clone())),
                Ok(_) => return Err(EngineError::CommandNotFound(command)),
                Err(e) => return Err(EngineError::Execution(e.to_string())),
            },
            Target::Script { chunk } => (chunk.clone(), None),
        };

        let mut args = Vec::with_capacity(slots.len() + 1);
        if let Some(receiver) = receiver {
            args.push(LuaValue::Table(receiver));
        }
        for slot in slots {
            let value = match slot {
                Some(value) => json_to_lua(&self.lua, &value)
                    .map_err(|e| EngineError::ParameterBinding(e.to_string()))?,
                None => LuaValue::Nil,
            };
            args.push(value);
        }

        let results = function
            .call::<MultiValue>(MultiValue::from_vec(args))
            .map_err(|e| EngineError::Execution(e.to_string()))?;

        let limit = self.capture_depth;
        Ok(results.iter().map(|value| capture(value, 0, limit)).collect())
    }

    fn clear(&mut self) {
        self.queued = None;
        self.parameters.clear();
    }
}

/// Place named arguments into the command's positional slots
fn bind_arguments(
    metadata: &CommandMetadata,
    parameters: Vec<(String, Value)>,
) -> Result<Vec<Option<Value>>, EngineError> {
    let mut slots: Vec<Option<Value>> = vec![None; metadata.parameters.len()];

    for (name, value) in parameters {
        let index = metadata
            .parameters
            .iter()
            .position(|p| p.name == name)
            .or_else(|| {
                metadata
                    .parameters
                    .iter()
                    .position(|p| p.name.eq_ignore_ascii_case(&name))
            })
            .ok_or_else(|| {
                EngineError::ParameterBinding(format!(
                    "A parameter cannot be found that matches parameter name '{}'.",
                    name
                ))
            })?;
        slots[index] = Some(value);
    }

    let missing: Vec<&str> = metadata
        .parameters
        .iter()
        .zip(&slots)
        .filter(|(param, slot)| param.mandatory && slot.is_none())
        .map(|(param, _)| param.name.as_str())
        .collect();

    if !missing.is_empty() {
        return Err(EngineError::ParameterBinding(format!(
            "Cannot process command because of one or more missing mandatory parameters: {}.",
            missing.join(" ")
        )));
    }

    Ok(slots)
}

fn json_to_lua(lua: &Lua, value: &Value) -> mlua::Result<LuaValue> {
    Ok(match value {
        Value::Null => LuaValue::Nil,
        Value::Bool(b) => LuaValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => LuaValue::Integer(i),
            None => LuaValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => LuaValue::String(lua.create_string(s)?),
        Value::Array(items) => {
            let table = lua.create_table()?;
            for (i, item) in items.iter().enumerate() {
                table.raw_set(i + 1, json_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
        Value::Object(map) => {
            let table = lua.create_table()?;
            for (key, item) in map {
                table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
            }
            LuaValue::Table(table)
        }
    })
}

fn capture(value: &LuaValue, depth: usize, limit: usize) -> ScriptValue {
    match value {
        LuaValue::Nil => ScriptValue::Null,
        LuaValue::Boolean(b) => ScriptValue::Bool(*b),
        LuaValue::Integer(i) => ScriptValue::Integer(*i),
        LuaValue::Number(n) => ScriptValue::Number(*n),
        LuaValue::String(s) => ScriptValue::Text(String::from(s.to_string_lossy())),
        LuaValue::Table(table) => capture_table(table, depth, limit),
        LuaValue::UserData(data) => match data.borrow::<EnumValue>() {
            Ok(e) => ScriptValue::Enum(EnumValue::clone(&e)),
            Err(_) => ScriptValue::Opaque(value.type_name().to_string()),
        },
        other => ScriptValue::Opaque(other.type_name().to_string()),
    }
}

fn capture_table(table: &Table, depth: usize, limit: usize) -> ScriptValue {
    let fields: Vec<(LuaValue, LuaValue)> = table
        .clone()
        .pairs::<LuaValue, LuaValue>()
        .filter_map(Result::ok)
        .collect();

    let len = table.raw_len();
    let is_list = len > 0 && fields.len() == len;

    if depth >= limit {
        let kind = if is_list { "list" } else { "record" };
        return ScriptValue::Opaque(kind.to_string());
    }

    if is_list {
        let items = (1..=len)
            .map(|i| {
                table
                    .raw_get::<LuaValue>(i)
                    .map(|v| capture(&v, depth + 1, limit))
                    .unwrap_or(ScriptValue::Null)
            })
            .collect();
        return ScriptValue::List(items);
    }

    let mut record: Vec<(String, ScriptValue)> = fields
        .iter()
        .map(|(key, value)| (describe(key), capture(value, depth + 1, limit)))
        .collect();
    record.sort_by(|a, b| a.0.cmp(&b.0));
    ScriptValue::Record(record)
}

fn describe(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => String::from(s.to_string_lossy()),
        other => other.type_name().to_string(),
    }
}

fn read_source(path: &Path) -> Result<String, EngineError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EngineError::SourceNotFound(path.to_path_buf()),
        _ => EngineError::Load {
            name: path.display().to_string(),
            message: e.to_string(),
        },
    })
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_error(name: &str, e: mlua::Error) -> EngineError {
    EngineError::Load {
        name: name.to_string(),
        message: e.to_string(),
    }
}
