//! Canned weather lookup

use crate::base::{required_str, Result, Tool};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

/// Reports fixed weather for any location
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "getWeather"
    }

    fn description(&self) -> &str {
        "Gets the current weather in a given location"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place name"
                }
            },
            "required": ["location"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let location = required_str(&args, "location")?;
        info!("Weather tool called for {}", location);
        Ok(format!(
            "The current weather in {} is 63°F and sunny.",
            location
        ))
    }
}
