//! Scriptbridge - expose documented Lua commands as tools
//!
//! This library turns the exported functions of Lua modules, and
//! standalone Lua scripts, into tools with JSON-Schema input contracts.
//! Calls run against long-lived interpreter sessions, serialized per
//! session, and results come back as text content.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod tools;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::Settings;
pub use engine::{LuaSession, ScriptSession};
pub use error::{AdapterError, Result};
pub use tools::registry::ToolRegistry;
pub use tools::{CallOutcome, ContentBlock, Tool, ToolDescriptor};
