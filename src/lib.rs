//! Catalog Crawler: a paginated catalog harvester
//!
//! This crate walks every page of a catalog API per category, fetches the
//! detail document of every listed item and normalizes it into one canonical
//! record shape before handing it to an output sink.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod normalize;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for crawl operations
///
/// Only conditions that stop a whole run end up here. Per-category and
/// per-item failures are reported as [`crawler::CrawlFailure`] events.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No categories to crawl")]
    NoCategories,

    #[error("Invalid category id: {0:?}")]
    InvalidCategory(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Output error: {0}")]
    Write(#[from] output::WriteError),

    #[error("Crawl task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Transport-level failure of a listing or detail request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    /// Returns the URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url } | Self::Transport { url, .. } | Self::Status { url, .. } => url,
        }
    }

    /// Returns true if a fetch collaborator may retry this failure
    ///
    /// Timeouts, connection errors, HTTP 429 and HTTP 5xx are retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
        }
    }
}

/// A listing page that is not in the expected shape
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Listing response from {url} is not valid JSON: {message}")]
    NotJson { url: String, message: String },

    #[error("Unexpected listing shape from {url}: {message}")]
    UnexpectedShape { url: String, message: String },
}

/// A detail payload that cannot be turned into a canonical record
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NormalizationError {
    #[error("Item {item} has no variants")]
    NoVariants { item: String },

    #[error("Item {item} is missing required field `{field}`")]
    MissingField { item: String, field: &'static str },

    #[error("Item {item} has invalid price {value}")]
    InvalidPrice { item: String, value: f64 },

    #[error("Detail payload for {item} is malformed: {message}")]
    Malformed { item: String, message: String },
}

impl NormalizationError {
    /// Returns the identifier of the failing item
    pub fn item(&self) -> &str {
        match self {
            Self::NoVariants { item }
            | Self::MissingField { item, .. }
            | Self::InvalidPrice { item, .. }
            | Self::Malformed { item, .. } => item,
        }
    }
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{CanonicalRecord, CategoryId, ItemReference};
pub use config::Config;
pub use crawler::{Coordinator, CrawlEvent, CrawlFailure, CrawlSummary};
pub use normalize::Normalizer;
pub use output::Sink;
pub use state::{PageCursor, WalkState};
