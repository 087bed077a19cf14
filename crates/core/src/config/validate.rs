use super::{types::Config, ConfigError};

/// Largest accepted cover edge, in pixels.
const MAX_COVER_SIZE: u32 = 4096;

/// Highest LAME VBR quality level.
const MAX_QUALITY: u8 = 9;

/// Validate configuration
/// Currently validates:
/// - Server URL is set and uses http(s)
/// - User is set
/// - Concurrency is at least 1
/// - Quality is a LAME VBR level (0-9)
/// - Cover size is within 1..=4096
/// - Every timeout is positive
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = config.server.url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError(
            "server.url is required".to_string(),
        ));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "server.url must start with http:// or https://, got '{}'",
            url
        )));
    }

    if config.server.user.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "server.user is required".to_string(),
        ));
    }

    if config.server.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "server.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.sync.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "sync.concurrency must be at least 1".to_string(),
        ));
    }

    if config.sync.quality > MAX_QUALITY {
        return Err(ConfigError::ValidationError(format!(
            "sync.quality must be between 0 and {}, got {}",
            MAX_QUALITY, config.sync.quality
        )));
    }

    if config.sync.cover_size == 0 || config.sync.cover_size > MAX_COVER_SIZE {
        return Err(ConfigError::ValidationError(format!(
            "sync.cover_size must be between 1 and {}, got {}",
            MAX_COVER_SIZE, config.sync.cover_size
        )));
    }

    for (name, secs) in config.timeouts.entries() {
        if secs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "timeouts.{} cannot be 0",
                name
            )));
        }
    }

    Ok(())
}
