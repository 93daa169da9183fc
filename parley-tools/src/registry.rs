//! Tool registry

use super::base::Tool;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new tool registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("Tool '{}' registered twice, keeping the latest", name);
        }
    }

    /// Unregister a tool by name
    pub fn unregister(&mut self, name: &str) {
        self.tools.remove(name);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool is registered
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Get all tool declarations, ordered by name
    pub fn get_definitions(&self) -> Vec<Value> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools.into_iter().map(|tool| tool.to_schema()).collect()
    }

    /// Execute a tool by name; failures come back as text for the model
    pub async fn execute(&self, name: &str, params: Value) -> String {
        let tool = match self.tools.get(name) {
            Some(tool) => tool,
            None => return format!("Error: Tool '{}' not found", name),
        };

        let errors = tool.validate_params(&params);
        if !errors.is_empty() {
            return format!(
                "Error: Invalid parameters for tool '{}': {}",
                name,
                errors.join("; ")
            );
        }

        match tool.execute(params).await {
            Ok(result) => result,
            Err(e) => {
                debug!("Tool {} failed: {}", name, e);
                format!("Error executing {}: {}", name, e)
            }
        }
    }

    /// Get list of registered tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::ToolError;
    use async_trait::async_trait;

    struct MockTool {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Tool for MockTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "A mock tool"
        }

        fn parameters(&self) -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            })
        }

        async fn execute(&self, _args: Value) -> crate::base::Result<String> {
            if self.fail {
                Err(ToolError::ExecutionFailed("upstream unavailable".to_string()))
            } else {
                Ok("mock result".to_string())
            }
        }
    }

    fn mock(name: &'static str) -> Arc<dyn Tool> {
        Arc::new(MockTool { name, fail: false })
    }

    #[test]
    fn test_register_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(mock("mock"));
        assert_eq!(registry.len(), 1);
        assert!(registry.has("mock"));
    }

    #[test]
    fn test_unregister_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(mock("mock"));
        registry.unregister("mock");
        assert!(registry.is_empty());
        assert!(!registry.has("mock"));
    }

    #[test]
    fn test_definitions_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(mock("zeta"));
        registry.register(mock("alpha"));

        let names: Vec<_> = registry
            .get_definitions()
            .iter()
            .map(|d| d["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(registry.tool_names(), vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn test_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(mock("mock"));
        let result = registry
            .execute("mock", serde_json::json!({"name": "Ana"}))
            .await;
        assert_eq!(result, "mock result");
    }

    #[tokio::test]
    async fn test_execute_reports_errors_as_text() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(MockTool {
            name: "flaky",
            fail: true,
        }));

        let missing = registry.execute("nope", serde_json::json!({})).await;
        assert_eq!(missing, "Error: Tool 'nope' not found");

        let invalid = registry.execute("flaky", serde_json::json!({})).await;
        assert!(invalid.starts_with("Error: Invalid parameters for tool 'flaky'"));

        let failed = registry
            .execute("flaky", serde_json::json!({"name": "Ana"}))
            .await;
        assert_eq!(
            failed,
            "Error executing flaky: Execution failed: upstream unavailable"
        );
    }
}
