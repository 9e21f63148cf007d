//! Result Marshaller - turns raw command results into call outcomes
//!
//! Information Hiding:
//! - Plain-text fast path versus JSON fallback decided here
//! - JSON conversion delegated to the session that produced the values

use super::CallOutcome;
use crate::engine::{JsonOptions, ScriptSession, ScriptValue};

/// Nesting depth kept when results are converted to JSON
pub const JSON_DEPTH: usize = 5;

/// Convert a result sequence into protocol content
///
/// No results, or a lone null, give empty content. A single text result
/// is returned verbatim; anything else is rendered
/// as compact JSON with enum values written by name. A conversion failure
/// comes back as an error outcome carrying the conversion's own message.
pub fn marshal(results: &[ScriptValue], session: &mut dyn ScriptSession) -> CallOutcome {
    match results {
        [] | [ScriptValue::Null] => CallOutcome::empty(),
        [ScriptValue::Text(text)] => CallOutcome::text(text.clone()),
        _ => {
            let value = match results {
                [single] => single.clone(),
                many => ScriptValue::List(many.to_vec()),
            };

            match session.convert_to_json(&value, &JsonOptions::compact(JSON_DEPTH)) {
                Ok(json) => CallOutcome::text(json),
                Err(e) => {
                    tracing::warn!("Failed to convert results to JSON: {}", e);
                    CallOutcome::error(e.to_string())
                }
            }
        }
    }
}
