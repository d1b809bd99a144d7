//! Tool descriptors and the agent grouping consumed by the registry
//!
//! The gateway never inspects handler internals: a domain agent hands over
//! `{name, tools}` where every tool is a `{name, description, inputSchema,
//! handler}` value, and the registry owns them from then on.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::protocol::{InputSchema, ToolInfo};

/// Async tool handler bound to one tool descriptor
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Execute the tool with already-validated arguments
    async fn call(&self, args: Value) -> Result<Value>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<Value> {
        (self)(args).await
    }
}

/// One named, schema-described remote operation
///
/// Registered once at process start; immutable thereafter.
#[derive(Clone)]
pub struct ToolDescriptor {
    /// Tool name, unique within its agent
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Input schema (required fields + per-field primitive type)
    pub input_schema: InputSchema,
    /// Bound handler
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDescriptor {
    /// Create a tool descriptor from any handler implementation
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: InputSchema,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        }
    }

    /// Schema-only view under a composite name
    #[must_use]
    pub fn info(&self, composite_name: &str) -> ToolInfo {
        ToolInfo {
            name: composite_name.to_string(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// A grouping of related tools bound to one backend domain
#[derive(Debug, Clone)]
pub struct Agent {
    /// Agent name - becomes the tool name prefix
    pub name: String,
    /// Tools declared by this agent
    pub tools: Vec<ToolDescriptor>,
}

impl Agent {
    /// Create an empty agent
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
        }
    }

    /// Add a tool to this agent
    #[must_use]
    pub fn tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.push(tool);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ParamType;
    use serde_json::json;

    #[tokio::test]
    async fn closure_handlers_satisfy_the_trait() {
        let tool = ToolDescriptor::new(
            "echo",
            "Echo the arguments back",
            InputSchema::object(),
            |args: Value| async move { Ok(args) },
        );

        let result = tool.handler.call(json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[test]
    fn info_uses_the_composite_name() {
        let tool = ToolDescriptor::new(
            "search",
            "Search documents",
            InputSchema::object().property("Query", ParamType::String, "Search text", true),
            |_args: Value| async move { Ok(Value::Null) },
        );

        let info = tool.info("document_search");
        assert_eq!(info.name, "document_search");
        assert_eq!(info.description, "Search documents");
        assert_eq!(info.input_schema.required, vec!["Query"]);
    }
}
