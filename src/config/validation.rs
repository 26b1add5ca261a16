use super::{ConfigError, SdkConfig};

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "TRACE", "DISABLED",
];

/// Validate the full SDK config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &SdkConfig) -> Result<(), ConfigError> {
    validate_stream_config(config)?;
    validate_http_config(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_stream_config(config: &SdkConfig) -> Result<(), ConfigError> {
    if let Some(limit) = config.stream.max_buffer_bytes {
        if limit == 0 {
            return Err(validation_err(
                "stream.max_buffer_bytes must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_http_config(config: &SdkConfig) -> Result<(), ConfigError> {
    if config.http.timeout_secs == 0 {
        return Err(validation_err("http.timeout_secs must be greater than 0"));
    }
    if config.http.connect_timeout_secs == 0 {
        return Err(validation_err(
            "http.connect_timeout_secs must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_log_level(config: &SdkConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level '{}' is not one of {VALID_LOG_LEVELS:?}",
            config.features.log_level
        )));
    }
    Ok(())
}
