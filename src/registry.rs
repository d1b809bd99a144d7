//! Tool registry and dispatcher
//!
//! Flattens all domain agents into one namespace (`<agent>_<tool>`), checks
//! required arguments before a handler ever runs, and routes each invocation
//! to its bound handler. The dispatcher adds no retry logic of its own -
//! retries live in the backend client.

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::agent::{Agent, ToolDescriptor};
use crate::protocol::{InputSchema, ParamType, ToolInfo};
use crate::{Error, Result};

/// Registry of all tools exposed by the gateway, keyed by composite name
pub struct ToolRegistry {
    /// Tools by `<agent>_<tool>` name
    tools: DashMap<String, ToolDescriptor>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Register every tool of an agent under `<agent>_<tool>` keys
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` on a duplicate composite name. Registration
    /// happens once at process start, so a duplicate is a fatal startup
    /// defect rather than a runtime condition.
    pub fn register(&self, agent: &Agent) -> Result<()> {
        for tool in &agent.tools {
            let key = format!("{}_{}", agent.name, tool.name);
            if self.tools.contains_key(&key) {
                return Err(Error::Config(format!(
                    "Duplicate tool registration: {key}"
                )));
            }
            self.tools.insert(key, tool.clone());
        }
        info!(agent = %agent.name, tools = agent.tools.len(), "Registered agent");
        Ok(())
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schema-only listing of every registered tool, sorted by name
    ///
    /// Handlers are never exposed.
    #[must_use]
    pub fn list(&self) -> Vec<ToolInfo> {
        let mut infos: Vec<ToolInfo> = self
            .tools
            .iter()
            .map(|entry| entry.value().info(entry.key()))
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Look up the handler for `name`, validate `args`, and run it
    ///
    /// # Errors
    ///
    /// `Error::ToolNotFound` for an unknown name, `Error::Validation` when
    /// required fields are missing or mistyped (all problems reported in one
    /// pass), otherwise the handler's own result unchanged.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value> {
        let Some(entry) = self.tools.get(name) else {
            return Err(Error::ToolNotFound(name.to_string()));
        };
        let tool = entry.value().clone();
        drop(entry);

        let args = validate_arguments(&tool.input_schema, args)?;

        let trace_id = format!("plm-{}", uuid::Uuid::new_v4());
        info!(tool = %name, trace_id = %trace_id, "Dispatching tool call");

        let result = tool.handler.call(args).await;
        match &result {
            Ok(_) => debug!(tool = %name, trace_id = %trace_id, "Tool call completed"),
            Err(e) => debug!(tool = %name, trace_id = %trace_id, error = %e, "Tool call failed"),
        }
        result
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Check `args` against the schema, reporting every problem in one pass
///
/// Missing required fields and type mismatches are collected together so a
/// single round trip surfaces all of them. Values that can be losslessly
/// coerced into the declared type (numeric strings for `number`,
/// `"true"`/`"false"` for `boolean`) are coerced rather than rejected.
fn validate_arguments(schema: &InputSchema, args: Value) -> Result<Value> {
    let mut map = match args {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(Error::Validation {
                missing: Vec::new(),
                mismatched: vec![format!(
                    "<arguments> (expected object, got {})",
                    type_name(&other)
                )],
            });
        }
    };

    let missing: Vec<String> = schema
        .required
        .iter()
        .filter(|field| !matches!(map.get(field.as_str()), Some(v) if !v.is_null()))
        .cloned()
        .collect();

    let mut mismatched = Vec::new();
    for (field, prop) in &schema.properties {
        let Some(value) = map.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        match coerce_value(value, prop.param_type) {
            Some(coerced) => {
                if &coerced != value {
                    map.insert(field.clone(), coerced);
                }
            }
            None => mismatched.push(format!("{field} (expected {})", prop.param_type)),
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        Ok(Value::Object(map))
    } else {
        Err(Error::Validation { missing, mismatched })
    }
}

/// Coerce `value` into `expected`, returning `None` when impossible
///
/// The table is deliberately narrow: only the conversions the legacy tool
/// surface relied on (stringly-typed numbers and booleans from form-ish
/// clients) are reproduced.
fn coerce_value(value: &Value, expected: ParamType) -> Option<Value> {
    match (expected, value) {
        (ParamType::String, Value::String(_))
        | (ParamType::Number, Value::Number(_))
        | (ParamType::Boolean, Value::Bool(_))
        | (ParamType::Array, Value::Array(_))
        | (ParamType::Object, Value::Object(_)) => Some(value.clone()),
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        (ParamType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
