use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port and body limit are not 0
/// - Media batch size, fetch limit and image settings are usable
/// - Cleanup interval is not 0
/// - Orchestrator tick interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.server.max_body_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_body_bytes cannot be 0".to_string(),
        ));
    }

    if config.media.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "media.batch_size cannot be 0".to_string(),
        ));
    }

    if config.media.max_concurrent_fetches == 0 {
        return Err(ConfigError::ValidationError(
            "media.max_concurrent_fetches cannot be 0".to_string(),
        ));
    }

    if !(1..=100).contains(&config.media.image_quality) {
        return Err(ConfigError::ValidationError(format!(
            "media.image_quality must be between 1 and 100, got {}",
            config.media.image_quality
        )));
    }

    if config.media.image_max_width == 0 || config.media.image_max_height == 0 {
        return Err(ConfigError::ValidationError(
            "media.image_max_width and media.image_max_height must be positive".to_string(),
        ));
    }

    if config.cleanup.interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cleanup.interval_secs cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.tick_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.tick_interval_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}
