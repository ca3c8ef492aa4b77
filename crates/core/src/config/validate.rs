use super::{
    types::{AuthMethod, Config},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Batch bounds are positive and at least one MIME type is allowed
/// - Remote endpoint is set
/// - Bearer auth carries a token
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    config.batch.validate()?;

    if config.remote.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "remote.base_url cannot be empty".to_string(),
        ));
    }
    if config.remote.collection_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "remote.collection_id cannot be empty".to_string(),
        ));
    }

    if config.auth.method == AuthMethod::Bearer
        && config.auth.token.as_ref().is_none_or(|t| t.is_empty())
    {
        return Err(ConfigError::ValidationError(
            "auth.token must be set when using bearer auth".to_string(),
        ));
    }

    Ok(())
}
