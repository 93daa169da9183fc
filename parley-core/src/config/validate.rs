//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
///
/// The provider API key is not checked here; it is only required once a
/// provider is built, so commands that never talk to the model still load.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if config.provider.api_base.trim().is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    }
    if config.agent.max_output_tokens == 0 {
        errors.push("agent.max_output_tokens must be > 0".to_string());
    }
    if !(0.0..=2.0).contains(&config.agent.temperature) {
        errors.push("agent.temperature must be in [0.0, 2.0]".to_string());
    }
    if config.agent.max_tool_iterations == 0 {
        errors.push("agent.max_tool_iterations must be > 0".to_string());
    }
    if config.agent.request_timeout_secs == 0 {
        errors.push("agent.request_timeout_secs must be > 0".to_string());
    }
    if config.history.max_messages == 0 {
        errors.push("history.max_messages must be > 0".to_string());
    }
    if config.tools.http_timeout_secs == 0 {
        errors.push("tools.http_timeout_secs must be > 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        validate_config(&Config::default()).unwrap();
    }

    #[test]
    fn test_validate_aggregates_errors() {
        let mut config = Config::default();
        config.agent.max_output_tokens = 0;
        config.history.max_messages = 0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("agent.max_output_tokens"));
        assert!(err.contains("history.max_messages"));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = Config::default();
        config.provider.model = "  ".to_string();

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("provider.model"));
    }
}
