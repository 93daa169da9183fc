//! Name-based age and gender estimates from agify.io and genderize.io

use crate::base::{required_str, Result, Tool, ToolError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Shared HTTP client for the estimate tools
pub fn http_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

fn name_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {
                "type": "string",
                "description": "First name of the person"
            }
        },
        "required": ["name"]
    })
}

/// GET `{base}/?name=...` and decode the JSON body
async fn lookup<T: DeserializeOwned>(
    client: &Client,
    base: &str,
    name: &str,
    api: &str,
) -> Result<T> {
    let url = format!("{}/", base.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[("name", name)])
        .send()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("failed to call {} API: {}", api, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::ExecutionFailed(format!(
            "{} API returned HTTP {}",
            api, status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("failed to decode response: {}", e)))
}

#[derive(Debug, Deserialize)]
struct AgeEstimate {
    age: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenderEstimate {
    gender: Option<String>,
    #[serde(default)]
    probability: f64,
}

/// Guesses a person's age from their first name
pub struct GuessAgeTool {
    client: Client,
    base_url: String,
}

impl GuessAgeTool {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Tool for GuessAgeTool {
    fn name(&self) -> &str {
        "guessAge"
    }

    fn description(&self) -> &str {
        "Guesses the age of a person based on their name"
    }

    fn parameters(&self) -> Value {
        name_parameters()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let name = required_str(&args, "name")?;
        info!("Age tool called for {}", name);

        let estimate: AgeEstimate = lookup(&self.client, &self.base_url, name, "age").await?;
        estimate
            .age
            .map(|age| age.to_string())
            .ok_or_else(|| ToolError::ExecutionFailed(format!("no age estimate for '{}'", name)))
    }
}

/// Guesses a person's gender from their first name
pub struct GuessGenderTool {
    client: Client,
    base_url: String,
}

impl GuessGenderTool {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Tool for GuessGenderTool {
    fn name(&self) -> &str {
        "guessGender"
    }

    fn description(&self) -> &str {
        "Guesses the gender of a person based on their name"
    }

    fn parameters(&self) -> Value {
        name_parameters()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let name = required_str(&args, "name")?;
        info!("Gender tool called for {}", name);

        let estimate: GenderEstimate =
            lookup(&self.client, &self.base_url, name, "gender").await?;
        let gender = estimate.gender.ok_or_else(|| {
            ToolError::ExecutionFailed(format!("no gender estimate for '{}'", name))
        })?;

        Ok(format!(
            "{} (with probability {:.2})",
            gender, estimate.probability
        ))
    }
}
