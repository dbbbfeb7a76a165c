use crate::config::types::{ApiConfig, Config, CrawlerConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_categories(&config.categories)?;
    validate_api_config(&config.api)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates configured category ids
fn validate_categories(categories: &[String]) -> Result<(), ConfigError> {
    if let Some(pos) = categories.iter().position(|c| c.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "categories[{}] cannot be empty",
            pos
        )));
    }
    Ok(())
}

/// Validates API configuration
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    validate_http_url("base-url", &config.base_url)?;
    validate_http_url("catalog-url", &config.catalog_url)?;

    if config.city.trim().is_empty() {
        return Err(ConfigError::Validation("city cannot be empty".to_string()));
    }

    for name in config.headers.keys() {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ConfigError::Validation(format!(
                "header name must contain only ASCII alphanumerics and hyphens, got '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.sort_key.trim().is_empty() {
        return Err(ConfigError::Validation(
            "sort_key cannot be empty".to_string(),
        ));
    }

    if config.max_concurrent_categories < 1 || config.max_concurrent_categories > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_categories must be between 1 and 64, got {}",
            config.max_concurrent_categories
        )));
    }

    if config.max_concurrent_detail_fetches < 1 || config.max_concurrent_detail_fetches > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_detail_fetches must be between 1 and 64, got {}",
            config.max_concurrent_detail_fetches
        )));
    }

    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "queue_capacity must be >= 1, got {}",
            config.queue_capacity
        )));
    }

    if config.per_request_timeout < 100 {
        return Err(ConfigError::Validation(format!(
            "per_request_timeout must be >= 100ms, got {}ms",
            config.per_request_timeout
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses http or https
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
