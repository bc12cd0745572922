use crate::config::types::{Config, CrawlerConfig, TargetConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_targets(&config.targets)?;
    Ok(())
}

/// Validates crawler configuration
///
/// All duration fields must be positive; a zero request delay would turn
/// the crawler into a hammering client, and a zero timeout never completes.
pub fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_delay == 0 {
        return Err(ConfigError::Validation(
            "request-delay must be > 0 ms".to_string(),
        ));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation("timeout must be > 0 ms".to_string()));
    }

    if config.retry_delay == 0 {
        return Err(ConfigError::Validation(
            "retry-delay must be > 0 ms".to_string(),
        ));
    }

    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates target entries: unique ids, parseable entry URLs
fn validate_targets(targets: &[TargetConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for target in targets {
        if target.id.is_empty() {
            return Err(ConfigError::Validation(
                "target id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(&target.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate target id: {}",
                target.id
            )));
        }
        if target.entry_urls.is_empty() {
            return Err(ConfigError::Validation(format!(
                "target {} has no entry URLs",
                target.id
            )));
        }
        for entry in &target.entry_urls {
            Url::parse(entry).map_err(|e| {
                ConfigError::InvalidUrl(format!("target {}: {} ({})", target.id, entry, e))
            })?;
        }
    }
    Ok(())
}
