//! Recipe generation with structured model output

use crate::base::{required_str, Result, Tool, ToolError};
use async_trait::async_trait;
use parley_providers::{LLMProvider, Message};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// A generated recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub title: String,
    pub description: String,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: u32,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
}

impl Recipe {
    /// Response schema handed to the model
    pub fn schema() -> Value {
        let string_list = json!({"type": "array", "items": {"type": "string"}});
        json!({
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "description": {"type": "string"},
                "prepTime": {"type": "string"},
                "cookTime": {"type": "string"},
                "servings": {"type": "integer"},
                "ingredients": string_list,
                "instructions": string_list,
                "tips": string_list
            },
            "required": [
                "title", "description", "prepTime", "cookTime",
                "servings", "ingredients", "instructions"
            ]
        })
    }
}

/// Strip a surrounding markdown code fence, if any
fn strip_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let body = rest.trim_start_matches("json");
            body.strip_suffix("```").unwrap_or(body).trim()
        }
        None => trimmed,
    }
}

pub struct RecipeTool {
    provider: Arc<dyn LLMProvider>,
    max_tokens: i32,
}

impl RecipeTool {
    pub fn new(provider: Arc<dyn LLMProvider>, max_tokens: i32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    fn prompt(ingredient: &str, dietary_restrictions: &str) -> String {
        format!(
            "Create a recipe with the following requirements: Main ingredient: {} Dietary restrictions: {}",
            ingredient, dietary_restrictions
        )
    }
}

#[async_trait]
impl Tool for RecipeTool {
    fn name(&self) -> &str {
        "getRecipe"
    }

    fn description(&self) -> &str {
        "Generates a recipe based on main ingredient and dietary restrictions"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ingredient": {
                    "type": "string",
                    "description": "Main ingredient or cuisine type"
                },
                "dietaryRestrictions": {
                    "type": "string",
                    "description": "Any dietary restrictions"
                }
            },
            "required": ["ingredient"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let ingredient = required_str(&args, "ingredient")?;
        let restrictions = args
            .get("dietaryRestrictions")
            .and_then(Value::as_str)
            .unwrap_or_default();
        info!(
            "Recipe tool called with ingredient {} and restrictions '{}'",
            ingredient, restrictions
        );

        let response = self
            .provider
            .chat_structured(
                vec![Message::user(Self::prompt(ingredient, restrictions))],
                Recipe::schema(),
                None,
                self.max_tokens,
                0.7,
            )
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to generate recipe: {}", e)))?;

        let raw = response.content.unwrap_or_default();
        let recipe: Recipe = serde_json::from_str(strip_fence(&raw)).map_err(|e| {
            warn!("Unparseable recipe output: {}", parley_core::utils::preview(&raw, 120));
            ToolError::ExecutionFailed(format!("failed to generate recipe: {}", e))
        })?;

        serde_json::to_string(&recipe).map_err(|e| ToolError::Error(e.to_string()))
    }
}
