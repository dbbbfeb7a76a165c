use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for the catalog crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Category ids crawled when none are given on the command line
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Builds a configuration with every optional section at its default
    pub fn new(output: OutputConfig) -> Self {
        Self {
            categories: Vec::new(),
            api: ApiConfig::default(),
            crawler: CrawlerConfig::default(),
            filter: FilterConfig::default(),
            output,
        }
    }
}

/// Upstream API location and request headers
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Root of the buyer API (listing and detail endpoints live below it)
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Public catalog root used to build item URLs in records
    #[serde(rename = "catalog-url", default = "default_catalog_url")]
    pub catalog_url: String,

    /// City id sent as `x-city`; prices and stock are per city
    #[serde(default = "default_city")]
    pub city: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    #[serde(default = "default_origin")]
    pub origin: String,

    #[serde(default = "default_referer")]
    pub referer: String,

    /// Extra headers; these override the built-in ones on name collision
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl ApiConfig {
    /// Listing endpoint for one category, without query parameters
    pub fn listing_endpoint(&self, category: &str) -> String {
        format!(
            "{}/product/in/{}",
            self.base_url.trim_end_matches('/'),
            category
        )
    }

    /// Detail endpoint for one item slug
    pub fn detail_endpoint(&self, item_url: &str) -> String {
        format!(
            "{}/product/{}",
            self.base_url.trim_end_matches('/'),
            item_url.trim_start_matches('/')
        )
    }

    /// Headers sent with every request, in a stable order
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = [
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", self.accept_language.as_str()),
            ("content-type", "application/json"),
            ("origin", self.origin.as_str()),
            ("referer", self.referer.as_str()),
            ("user-agent", self.user_agent.as_str()),
            ("x-city", self.city.as_str()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        for (name, value) in &self.headers {
            let name = name.to_ascii_lowercase();
            match headers.iter_mut().find(|(k, _)| *k == name) {
                Some(existing) => existing.1 = value.clone(),
                None => headers.push((name, value.clone())),
            }
        }

        headers
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            catalog_url: default_catalog_url(),
            city: default_city(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            origin: default_origin(),
            referer: default_referer(),
            headers: BTreeMap::new(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Items requested per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Listing sort order
    #[serde(rename = "sort-key", default = "default_sort_key")]
    pub sort_key: String,

    /// Maximum number of categories walked at the same time
    #[serde(
        rename = "max-concurrent-categories",
        default = "default_max_concurrent_categories"
    )]
    pub max_concurrent_categories: u32,

    /// Number of detail fetch workers
    #[serde(
        rename = "max-concurrent-detail-fetches",
        default = "default_max_concurrent_detail_fetches"
    )]
    pub max_concurrent_detail_fetches: u32,

    /// Capacity of the queue between listing walkers and detail workers
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: u32,

    /// Timeout of each individual request (milliseconds)
    #[serde(rename = "per-request-timeout", default = "default_per_request_timeout")]
    pub per_request_timeout: u64,

    /// Retries of a failed request inside the HTTP fetcher
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(rename = "retry-delay", default = "default_retry_delay")]
    pub retry_delay: u64,
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.per_request_timeout)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    /// Upper bound of one fetch call including every retry
    ///
    /// `per-request-timeout` bounds a single HTTP attempt; the crawl core
    /// wraps the whole collaborator call in this budget.
    pub fn fetch_budget(&self) -> Duration {
        let attempts = self.max_retries + 1;
        self.request_timeout() * attempts + self.retry_delay() * self.max_retries
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            sort_key: default_sort_key(),
            max_concurrent_categories: default_max_concurrent_categories(),
            max_concurrent_detail_fetches: default_max_concurrent_detail_fetches(),
            queue_capacity: default_queue_capacity(),
            per_request_timeout: default_per_request_timeout(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

/// Listing filters sent in the listing request body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub brand: Vec<String>,

    #[serde(default)]
    pub price: Vec<String>,

    #[serde(rename = "is-divided-price", default)]
    pub is_divided_price: bool,

    #[serde(rename = "is-new", default)]
    pub is_new: bool,

    #[serde(rename = "is-hit", default)]
    pub is_hit: bool,

    #[serde(rename = "is-special-price", default)]
    pub is_special_price: bool,
}

impl FilterConfig {
    /// JSON body of the listing request for one category
    pub fn listing_body(&self, category: &str) -> Value {
        json!({
            "category": category,
            "brand": self.brand,
            "price": self.price,
            "isDividedPrice": self.is_divided_price,
            "isNew": self.is_new,
            "isHit": self.is_hit,
            "isSpecialPrice": self.is_special_price,
        })
    }
}

/// Which sink records are written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// SQLite database
    Sqlite,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub kind: SinkKind,

    /// Path of the JSON Lines file or SQLite database
    pub path: String,
}

impl OutputConfig {
    pub fn new(kind: SinkKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.fix-price.com/buyer/v1".to_string()
}

fn default_catalog_url() -> String {
    "https://fix-price.com/catalog".to_string()
}

fn default_city() -> String {
    "55".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36".to_string()
}

fn default_accept_language() -> String {
    "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7".to_string()
}

fn default_origin() -> String {
    "https://fix-price.com".to_string()
}

fn default_referer() -> String {
    "https://fix-price.com/".to_string()
}

fn default_page_size() -> u32 {
    24
}

fn default_sort_key() -> String {
    "sold".to_string()
}

fn default_max_concurrent_categories() -> u32 {
    3
}

fn default_max_concurrent_detail_fetches() -> u32 {
    8
}

fn default_queue_capacity() -> u32 {
    64
}

fn default_per_request_timeout() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> u64 {
    1_000
}
