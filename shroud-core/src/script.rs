//! Unit script: the built-in reference executor
//!
//! A line-oriented language just big enough to express units that bind
//! values, export them and load other units:
//!
//! ```text
//! # comment
//! let base = require "./lib/base"
//! let greeting = "hello"
//! let name = base.user.name
//! export { "version": 2 }
//! fail "refusing to load"
//! ```
//!
//! An expression is a JSON literal, `require "<path>"`, or a lookup of an
//! earlier binding (`name`, `name.field`, `name.0`). The compiled form is
//! the JSON-encoded statement list.

use crate::error::LoadError;
use crate::executor::{Executor, Scope};
use crate::location::Location;
use crate::unit::Unit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Statement {
    Let { name: String, value: Expr, line: usize },
    Export { value: Expr, line: usize },
    Fail { message: String, line: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    Require(String),
    Lookup(Vec<String>),
}

/// Compiled program
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

/// Parse unit script source
pub fn parse(source: &str) -> Result<Program, String> {
    let mut statements = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        let text = raw.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let statement = parse_statement(text, line).map_err(|e| format!("line {}: {}", line, e))?;
        statements.push(statement);
    }
    Ok(Program { statements })
}

fn parse_statement(text: &str, line: usize) -> Result<Statement, String> {
    if let Some(rest) = keyword(text, "let") {
        let (name, expr) = rest
            .split_once('=')
            .ok_or_else(|| String::from("expected `let NAME = EXPR`"))?;
        let name = name.trim();
        if !is_identifier(name) {
            return Err(format!("invalid binding name '{}'", name));
        }
        return Ok(Statement::Let {
            name: name.to_string(),
            value: parse_expr(expr.trim())?,
            line,
        });
    }
    if let Some(rest) = keyword(text, "export") {
        return Ok(Statement::Export {
            value: parse_expr(rest)?,
            line,
        });
    }
    if let Some(rest) = keyword(text, "fail") {
        return Ok(Statement::Fail {
            message: parse_string(rest)?,
            line,
        });
    }
    Err(format!("unknown statement '{}'", text))
}

fn parse_expr(text: &str) -> Result<Expr, String> {
    if text.is_empty() {
        return Err(String::from("missing expression"));
    }
    if let Some(rest) = keyword(text, "require") {
        return Ok(Expr::Require(parse_string(rest)?));
    }
    let first = text.chars().next().unwrap_or(' ');
    let is_literal = matches!(first, '"' | '{' | '[' | '-' | '0'..='9')
        || matches!(text, "true" | "false" | "null");
    if is_literal {
        return serde_json::from_str(text)
            .map(Expr::Literal)
            .map_err(|e| format!("invalid literal: {}", e));
    }
    let segments: Vec<String> = text.split('.').map(|s| s.trim().to_string()).collect();
    let valid = is_identifier(&segments[0])
        && segments[1..]
            .iter()
            .all(|s| is_identifier(s) || (!s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())));
    if !valid {
        return Err(format!("invalid expression '{}'", text));
    }
    Ok(Expr::Lookup(segments))
}

fn parse_string(text: &str) -> Result<String, String> {
    serde_json::from_str::<String>(text.trim()).map_err(|_| String::from("expected a quoted string"))
}

/// `text` minus a leading keyword followed by whitespace
fn keyword<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Executor for unit scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptExecutor;

impl ScriptExecutor {
    pub fn new() -> Self {
        Self
    }

    fn evaluate(
        &self,
        unit: &Unit,
        expr: &Expr,
        line: usize,
        scope: &mut Scope<'_, '_>,
    ) -> Result<Value, LoadError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Require(path) => scope.require_with(path.as_str(), Unit::exports),
            Expr::Lookup(segments) => {
                let (head, fields) = match segments.split_first() {
                    Some(split) => split,
                    None => return Err(LoadError::execution(unit.identity(), "empty lookup")),
                };
                let mut value = unit.get(head).ok_or_else(|| {
                    LoadError::execution(
                        unit.identity(),
                        format!("line {}: undefined name '{}'", line, head),
                    )
                })?;
                for field in fields {
                    let next = match &value {
                        Value::Object(map) => map.get(field).cloned(),
                        Value::Array(items) => field.parse::<usize>().ok().and_then(|i| items.get(i).cloned()),
                        _ => None,
                    };
                    value = next.ok_or_else(|| {
                        LoadError::execution(
                            unit.identity(),
                            format!("line {}: no field '{}' in '{}'", line, field, segments.join(".")),
                        )
                    })?;
                }
                Ok(value)
            }
        }
    }
}

impl Executor for ScriptExecutor {
    fn compile(&self, location: &Location, source: &str) -> Result<Vec<u8>, LoadError> {
        let program = parse(source).map_err(|message| LoadError::compile(location, message))?;
        serde_json::to_vec(&program).map_err(|e| LoadError::compile(location, e.to_string()))
    }

    fn execute(
        &self,
        unit: &Unit,
        compiled: &[u8],
        scope: &mut Scope<'_, '_>,
    ) -> Result<(), LoadError> {
        let program: Program = serde_json::from_slice(compiled).map_err(|e| {
            LoadError::compile(unit.identity(), format!("corrupt compiled form: {}", e))
        })?;
        for statement in &program.statements {
            match statement {
                Statement::Let { name, value, line } => {
                    let value = self.evaluate(unit, value, *line, scope)?;
                    unit.set(name.clone(), value);
                }
                Statement::Export { value, line } => {
                    let value = self.evaluate(unit, value, *line, scope)?;
                    unit.set_exports(value);
                }
                Statement::Fail { message, line } => {
                    return Err(LoadError::execution(
                        unit.identity(),
                        format!("line {}: {}", line, message),
                    ));
                }
            }
        }
        Ok(())
    }
}
