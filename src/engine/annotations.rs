//! Lua documentation annotations
//!
//! Reads LuaLS-style `---` doc blocks, function signatures and
//! `name = name or <expr>` default idioms straight from module and script
//! source text.

use super::{CommandMetadata, ParameterInfo, SemanticType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

static FUNCTION_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:local\s+)?function\s+([A-Za-z_][\w.:]*)\s*\(([^)]*)\)").unwrap()
});

static ASSIGNED_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z_][\w.]*)\s*=\s*function\s*\(([^)]*)\)").unwrap()
});

static OR_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_]\w*)\s*=\s*([A-Za-z_]\w*)\s+or\s+(.+)$").unwrap()
});

static NIL_CHECK_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^if\s+([A-Za-z_]\w*)\s*==\s*nil\s+then\s+([A-Za-z_]\w*)\s*=\s*(.+?)\s+end$").unwrap()
});

static SCRIPT_PARAMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^local\s+([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s*=\s*\.\.\.\s*;?$").unwrap()
});

/// A parsed `---` documentation block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocBlock {
    pub description: Option<String>,
    pub params: Vec<ParamDoc>,
    pub returns: Vec<String>,
    pub overloads: usize,
}

/// One `---@param` annotation
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDoc {
    pub name: String,
    pub optional: bool,
    pub type_expr: String,
    pub description: Option<String>,
}

/// A documented function declaration found in module source
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// Final segment of the declared name (`add` for `function M.add`)
    pub name: String,
    /// Declared with `:` and expects its owner as the implicit first argument
    pub method: bool,
    /// Declared through an owner (`M.x`, `M:x`, `M.x = function`) rather than bare
    pub qualified: bool,
    pub params: Vec<String>,
    pub doc: DocBlock,
    pub defaults: HashMap<String, String>,
}

/// Documentation and parameters of a standalone script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptDecl {
    pub doc: DocBlock,
    pub params: Vec<String>,
    pub defaults: HashMap<String, String>,
}

/// Find every function declaration in `source` together with its doc block
pub fn scan_functions(source: &str) -> Vec<FunctionDecl> {
    let lines: Vec<&str> = source.lines().collect();
    let mut decls = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if let Some(doc) = trimmed.strip_prefix("---") {
            pending.push(doc);
            continue;
        }

        if let Some((path, params)) = match_function_header(line) {
            let (name, method) = split_declared_name(&path);
            decls.push(FunctionDecl {
                qualified: name.len() < path.len(),
                name,
                method,
                params: split_params(&params),
                doc: parse_doc(&pending),
                defaults: scan_defaults(&lines[index + 1..]),
            });
            pending.clear();
        } else if !trimmed.is_empty() && !trimmed.starts_with("--") {
            pending.clear();
        }
    }

    decls
}

/// Read the leading doc block and `local a, b = ...` parameter list of a script
pub fn scan_script(source: &str) -> ScriptDecl {
    let lines: Vec<&str> = source.lines().collect();
    let mut header: Vec<&str> = Vec::new();
    let mut in_header = true;
    let mut decl = ScriptDecl::default();

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if in_header {
            if let Some(doc) = trimmed.strip_prefix("---") {
                header.push(doc);
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with("--") || trimmed.starts_with("#!") {
                continue;
            }
            in_header = false;
        }

        if let Some(caps) = SCRIPT_PARAMS.captures(trimmed) {
            decl.params = split_params(&caps[1]);
            decl.defaults = scan_defaults(&lines[index + 1..]);
            break;
        }
    }

    decl.doc = parse_doc(&header);
    decl
}

fn match_function_header(line: &str) -> Option<(String, String)> {
    FUNCTION_DECL
        .captures(line)
        .or_else(|| ASSIGNED_FUNCTION.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
}

fn split_declared_name(path: &str) -> (String, bool) {
    match path.rfind(['.', ':']) {
        Some(pos) => (path[pos + 1..].to_string(), path[pos..].starts_with(':')),
        None => (path.to_string(), false),
    }
}

fn split_params(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty() && *p != "...")
        .map(str::to_string)
        .collect()
}

/// Collect `name = name or <expr>` defaults from the top of a body
fn scan_defaults(body: &[&str]) -> HashMap<String, String> {
    let mut defaults = HashMap::new();

    for line in body {
        let trimmed = strip_comment(line).trim().trim_end_matches(';').trim();
        if trimmed.is_empty() {
            continue;
        }

        let caps = match OR_DEFAULT
            .captures(trimmed)
            .or_else(|| NIL_CHECK_DEFAULT.captures(trimmed))
        {
            Some(caps) if caps[1] == caps[2] => caps,
            _ => break,
        };

        defaults
            .entry(caps[1].to_string())
            .or_insert_with(|| caps[3].trim().to_string());
    }

    defaults
}

/// Remove a trailing `--` comment that is not inside a string literal
fn strip_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev_dash = false;

    for (pos, c) in line.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => {
                quote = Some(c);
                prev_dash = false;
            }
            '-' if prev_dash => return &line[..pos - 1],
            '-' => prev_dash = true,
            _ => prev_dash = false,
        }
    }

    line
}

fn parse_doc(lines: &[&str]) -> DocBlock {
    let mut block = DocBlock::default();
    let mut description: Vec<&str> = Vec::new();

    for raw in lines {
        let text = raw.trim();
        if !text.is_empty() && text.chars().all(|c| c == '-') {
            continue;
        }

        let Some(annotation) = text.strip_prefix('@') else {
            description.push(text);
            continue;
        };

        let (tag, rest) = annotation
            .split_once(char::is_whitespace)
            .unwrap_or((annotation, ""));

        match tag {
            "param" => {
                if let Some(param) = parse_param(rest) {
                    block.params.push(param);
                }
            }
            "return" => block.returns.push(rest.trim().to_string()),
            "overload" => block.overloads += 1,
            _ => {}
        }
    }

    let joined = description.join("\n");
    let joined = joined.trim();
    if !joined.is_empty() {
        block.description = Some(joined.to_string());
    }

    block
}

fn parse_param(rest: &str) -> Option<ParamDoc> {
    let rest = rest.trim();
    let (name, rest) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    if name.is_empty() {
        return None;
    }

    let (name, optional) = match name.strip_suffix('?') {
        Some(stripped) => (stripped, true),
        None => (name, false),
    };

    let (type_expr, rest) = split_type(rest.trim_start());
    let description = rest.trim().trim_start_matches('#').trim();

    Some(ParamDoc {
        name: name.to_string(),
        optional,
        type_expr: if type_expr.is_empty() {
            "any".to_string()
        } else {
            type_expr
        },
        description: (!description.is_empty()).then(|| description.to_string()),
    })
}

/// Split a type expression off the front of an annotation tail
fn split_type(text: &str) -> (String, &str) {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut out = String::new();
    let mut chars = text.char_indices();

    while let Some((pos, c)) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                let joins_previous = out.ends_with('|') || out.ends_with(',');
                let remaining = text[pos..].trim_start();
                if !joins_previous && !remaining.starts_with('|') {
                    return (out, &text[pos..]);
                }
                continue;
            }
            c if c.is_whitespace() => continue,
            _ => {}
        }
        out.push(c);
    }

    (out, "")
}

/// Split `expr` on `separator` outside brackets and quotes
fn split_top_level(expr: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (pos, c) in expr.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(expr[start..pos].trim());
                start = pos + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(expr[start..].trim());
    parts
}

fn string_literal(text: &str) -> Option<&str> {
    let first = text.chars().next()?;
    if (first == '"' || first == '\'') && text.len() >= 2 && text.ends_with(first) {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

/// Map a declared type expression to its semantic type; the flag reports nullability
pub fn parse_type(expr: &str) -> (SemanticType, bool) {
    let mut expr = expr.trim();
    let mut nullable = false;

    if let Some(inner) = expr.strip_suffix('?') {
        nullable = true;
        expr = inner.trim();
    }

    let mut kept = Vec::new();
    for alternative in split_top_level(expr, '|') {
        if alternative == "nil" {
            nullable = true;
        } else if !alternative.is_empty() {
            kept.push(alternative);
        }
    }

    if kept.is_empty() {
        return (SemanticType::Any, true);
    }

    if kept.iter().all(|alt| string_literal(alt).is_some()) {
        let choices = kept
            .iter()
            .filter_map(|alt| string_literal(alt))
            .map(str::to_string)
            .collect();
        return (SemanticType::Text { choices }, nullable);
    }

    if kept.iter().all(|alt| alt.parse::<i64>().is_ok()) {
        return (SemanticType::Integer, nullable);
    }

    let first = base_type(kept[0]);
    if kept[1..].iter().all(|alt| base_type(alt) == first) {
        (first, nullable)
    } else {
        (SemanticType::Any, nullable)
    }
}

fn base_type(name: &str) -> SemanticType {
    let name = name.trim();

    if let Some(element) = name.strip_suffix("[]") {
        return SemanticType::Array(Box::new(base_type(element)));
    }
    if let Some(inner) = name.strip_prefix('(').and_then(|n| n.strip_suffix(')')) {
        return parse_type(inner).0;
    }

    match name {
        "integer" => SemanticType::Integer,
        "number" => SemanticType::Number,
        "string" => SemanticType::text(),
        "boolean" | "true" | "false" => SemanticType::Boolean,
        "any" | "unknown" | "nil" | "function" => SemanticType::Any,
        _ if name.starts_with("fun(") => SemanticType::Any,
        // tables, table<K, V>, inline shapes and named classes
        _ => SemanticType::Object,
    }
}

/// Evaluate a default expression when it is a plain literal
pub fn constant_default(expr: &str) -> Option<Value> {
    let expr = strip_comment(expr).trim();

    match expr {
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        "nil" => return Some(Value::Null),
        "{}" => return Some(Value::Object(serde_json::Map::new())),
        _ => {}
    }

    if let Some(inner) = string_literal(expr) {
        return unescape(inner).map(Value::String);
    }

    if let Ok(integer) = expr.parse::<i64>() {
        return Some(Value::from(integer));
    }

    let numeric = expr
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
    if numeric {
        return expr
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number);
    }

    None
}

fn unescape(inner: &str) -> Option<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            other @ ('\\' | '"' | '\'') => out.push(other),
            // escapes with computed values are not constants we can read
            _ => return None,
        }
    }

    Some(out)
}

/// Combine a signature, its doc block and its default expressions
pub fn build_metadata(
    name: &str,
    params: &[String],
    doc: &DocBlock,
    defaults: &HashMap<String, String>,
) -> CommandMetadata {
    for documented in &doc.params {
        if !params.contains(&documented.name) {
            tracing::warn!(
                "Command '{}' documents parameter '{}' which it does not declare",
                name,
                documented.name
            );
        }
    }

    let parameters = params
        .iter()
        .map(|param| {
            let default_expression = defaults.get(param).cloned();

            match doc.params.iter().find(|d| &d.name == param) {
                Some(documented) => {
                    let (semantic_type, nullable) = parse_type(&documented.type_expr);
                    ParameterInfo {
                        name: param.clone(),
                        type_name: documented.type_expr.clone(),
                        semantic_type,
                        mandatory: !(documented.optional
                            || nullable
                            || default_expression.is_some()),
                        description: documented.description.clone(),
                        default_expression,
                    }
                }
                None => ParameterInfo {
                    name: param.clone(),
                    type_name: "any".to_string(),
                    semantic_type: SemanticType::Any,
                    mandatory: default_expression.is_none(),
                    description: None,
                    default_expression,
                },
            }
        })
        .collect();

    CommandMetadata {
        name: name.to_string(),
        description: doc.description.clone(),
        parameters,
        parameter_sets: 1 + doc.overloads,
        outputs: doc.returns.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MODULE: &str = r#"
local M = {}

--- Adds stock for an item.
---
--- Returns the new total.
---@param name string The item name.
---@param count? integer How many to add.
---@param mode "fast"|"safe" Update mode.
---@return integer total
function M.add_stock(name, count, mode)
  count = count or 1 -- one by default
  mode = mode or "safe"
  return count
end

local helper = 1

---@param key string
function M:lookup(key)
end

M.reset = function()
end

return M
"#;

    #[test]
    fn test_scan_functions_reads_doc_blocks() {
        let decls = scan_functions(MODULE);
        let names: Vec<_> = decls.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["add_stock", "lookup", "reset"]);
        assert!(decls.iter().all(|d| d.qualified));

        let add = &decls[0];
        assert!(!add.method);
        assert_eq!(add.params, vec!["name", "count", "mode"]);
        assert_eq!(
            add.doc.description.as_deref(),
            Some("Adds stock for an item.\n\nReturns the new total.")
        );
        assert_eq!(add.doc.params.len(), 3);
        assert!(add.doc.params[1].optional);
        assert_eq!(add.doc.params[2].type_expr, r#""fast"|"safe""#);
        assert_eq!(add.doc.returns, vec!["integer total"]);
        assert_eq!(add.defaults.get("count").map(String::as_str), Some("1"));
        assert_eq!(add.defaults.get("mode").map(String::as_str), Some(r#""safe""#));
    }

    #[test]
    fn test_scan_functions_methods_and_missing_docs() {
        let decls = scan_functions(MODULE);

        let lookup = &decls[1];
        assert!(lookup.method);
        assert_eq!(lookup.doc.description, None);
        assert_eq!(lookup.doc.params[0].description, None);

        // `local helper = 1` separates the reset function from any doc block
        assert_eq!(decls[2].doc, DocBlock::default());
    }

    #[test]
    fn test_bare_declarations_are_unqualified() {
        let source = r#"
local function trim(s) end
function shout(s) end
helper = function(x) end
function M.trim(text) end
"#;
        let decls: Vec<(String, bool)> = scan_functions(source)
            .into_iter()
            .map(|d| (d.name, d.qualified))
            .collect();
        assert_eq!(
            decls,
            vec![
                ("trim".to_string(), false),
                ("shout".to_string(), false),
                ("helper".to_string(), false),
                ("trim".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_overloads_are_counted() {
        let source = r#"
--- Finds things.
---@param query string What to find.
---@overload fun(id: integer): table
---@overload fun(): table
function find(query) end
"#;
        let decl = &scan_functions(source)[0];
        let meta = build_metadata(&decl.name, &decl.params, &decl.doc, &decl.defaults);
        assert_eq!(meta.parameter_sets, 3);
    }

    #[test]
    fn test_scan_script() {
        let source = r#"#!/usr/bin/env lua
--- Greets someone.
---@param person string Who to greet.
---@param greeting? string Greeting word.
local person, greeting = ...
greeting = greeting or "Hello"
return greeting .. ", " .. person
"#;
        let decl = scan_script(source);
        assert_eq!(decl.doc.description.as_deref(), Some("Greets someone."));
        assert_eq!(decl.params, vec!["person", "greeting"]);
        assert_eq!(
            decl.defaults.get("greeting").map(String::as_str),
            Some(r#""Hello""#)
        );
    }

    #[test]
    fn test_parse_type() {
        assert_eq!(parse_type("integer"), (SemanticType::Integer, false));
        assert_eq!(parse_type("string?"), (SemanticType::text(), true));
        assert_eq!(parse_type("string|nil"), (SemanticType::text(), true));
        assert_eq!(parse_type("boolean"), (SemanticType::Boolean, false));
        assert_eq!(
            parse_type("string[]"),
            (SemanticType::Array(Box::new(SemanticType::text())), false)
        );
        assert_eq!(parse_type("table<string, integer>"), (SemanticType::Object, false));
        assert_eq!(parse_type("integer|string"), (SemanticType::Any, false));
        assert_eq!(
            parse_type(r#""low" | "high""#),
            (
                SemanticType::Text {
                    choices: vec!["low".to_string(), "high".to_string()]
                },
                false
            )
        );
    }

    #[test]
    fn test_split_type_handles_spaces_inside_generics() {
        let param = parse_param("opts table<string, integer> Tuning options.").unwrap();
        assert_eq!(param.type_expr, "table<string,integer>");
        assert_eq!(param.description.as_deref(), Some("Tuning options."));

        let param = parse_param("value string | nil maybe").unwrap();
        assert_eq!(param.type_expr, "string|nil");
        assert_eq!(param.description.as_deref(), Some("maybe"));
    }

    #[test]
    fn test_constant_default() {
        assert_eq!(constant_default("10"), Some(json!(10)));
        assert_eq!(constant_default("-2.5"), Some(json!(-2.5)));
        assert_eq!(constant_default(r#""a\"b""#), Some(json!("a\"b")));
        assert_eq!(constant_default("'x' -- note"), Some(json!("x")));
        assert_eq!(constant_default("true"), Some(json!(true)));
        assert_eq!(constant_default("nil"), Some(Value::Null));
        assert_eq!(constant_default("{}"), Some(json!({})));
        assert_eq!(constant_default("os.time()"), None);
        assert_eq!(constant_default("inf"), None);
        assert_eq!(constant_default("limit * 2"), None);
    }

    #[test]
    fn test_build_metadata_mandatory_flags() {
        let decl = &scan_functions(MODULE)[0];
        let meta = build_metadata(&decl.name, &decl.params, &decl.doc, &decl.defaults);

        assert_eq!(meta.parameter_sets, 1);
        assert!(meta.parameters[0].mandatory);
        assert!(!meta.parameters[1].mandatory);
        // a default expression makes the parameter optional
        assert!(!meta.parameters[2].mandatory);
        assert_eq!(meta.parameters[1].semantic_type, SemanticType::Integer);
        assert_eq!(meta.outputs, vec!["integer total"]);
    }
}
