//! Paginated listing walker
//!
//! A walker owns the cursor of one category and turns listing pages into
//! item references, strictly in page order. An empty page ends the walk
//! successfully; a fetch or schema failure ends it as failed.

use super::fetcher::{fetch_with_timeout, Fetch, FetchRequest};
use crate::catalog::{CategoryId, ItemReference, ListingEntry};
use crate::config::{ApiConfig, Config};
use crate::state::{PageCursor, WalkState};
use crate::{FetchError, SchemaError};
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Reason a walk ended in `Failed`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WalkError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Builds the listing URL for the cursor's current page
pub fn listing_url(api: &ApiConfig, cursor: &PageCursor) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&api.listing_endpoint(cursor.category.as_str()))?;
    url.query_pairs_mut().extend_pairs(cursor.query_pairs());
    Ok(url)
}

/// Parses one listing page into item references
///
/// `null` is read as an empty page. Anything else that is not an array of
/// objects carrying a `url` is a schema error.
pub fn parse_listing(
    body: &str,
    url: &str,
    category: &CategoryId,
) -> Result<Vec<ItemReference>, SchemaError> {
    let value: Value = serde_json::from_str(body).map_err(|e| SchemaError::NotJson {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let entries: Vec<ListingEntry> = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(_) => {
            serde_json::from_value(value).map_err(|e| SchemaError::UnexpectedShape {
                url: url.to_string(),
                message: e.to_string(),
            })?
        }
        other => {
            return Err(SchemaError::UnexpectedShape {
                url: url.to_string(),
                message: format!("expected an array, got {}", json_kind(&other)),
            })
        }
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| -> Result<ItemReference, SchemaError> {
            let item_url = entry
                .url
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| SchemaError::UnexpectedShape {
                    url: url.to_string(),
                    message: format!("entry {} has no url", index),
                })?;
            let title = entry
                .category
                .and_then(|c| c.title)
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| category.to_string());
            Ok(ItemReference::new(item_url, category.clone(), title))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Walks the listing pages of one category
pub struct ListingWalker {
    cursor: PageCursor,
    state: WalkState,
    fetcher: Arc<dyn Fetch>,
    config: Arc<Config>,
    timeout: Duration,
    pages_fetched: u32,
    items_emitted: u64,
}

impl ListingWalker {
    pub fn new(category: CategoryId, fetcher: Arc<dyn Fetch>, config: Arc<Config>) -> Self {
        let cursor = PageCursor::new(
            category,
            config.crawler.page_size,
            config.crawler.sort_key.clone(),
        );
        let timeout = config.crawler.fetch_budget();

        Self {
            cursor,
            state: WalkState::Active,
            fetcher,
            config,
            timeout,
            pages_fetched: 0,
            items_emitted: 0,
        }
    }

    pub fn category(&self) -> &CategoryId {
        &self.cursor.category
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn state(&self) -> WalkState {
        self.state
    }

    /// Listing pages requested so far, including the terminating empty page
    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    pub fn items_emitted(&self) -> u64 {
        self.items_emitted
    }

    /// Builds the request for the current page
    pub fn page_request(&self) -> Result<FetchRequest, FetchError> {
        let endpoint = self.config.api.listing_endpoint(self.cursor.category.as_str());
        let url = listing_url(&self.config.api, &self.cursor).map_err(|e| {
            FetchError::Transport {
                url: endpoint,
                message: format!("invalid listing URL: {}", e),
            }
        })?;
        let body = self
            .config
            .filter
            .listing_body(self.cursor.category.as_str())
            .to_string();

        Ok(FetchRequest::post(url.as_str(), body).with_headers(self.config.api.request_headers()))
    }

    /// Fetches the next page
    ///
    /// # Returns
    ///
    /// * `Ok(Some(items))` - A non-empty page; the cursor moved forward
    /// * `Ok(None)` - The walk is over (exhausted or already failed)
    /// * `Err(WalkError)` - This page failed; the walk is now `Failed`
    pub async fn next_page(&mut self) -> Result<Option<Vec<ItemReference>>, WalkError> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        let result = self.fetch_page().await;
        self.pages_fetched += 1;

        match result {
            Ok(items) if items.is_empty() => {
                tracing::debug!(
                    "Category {} exhausted at page {}",
                    self.cursor.category,
                    self.cursor.page()
                );
                self.state = WalkState::Exhausted;
                Ok(None)
            }
            Ok(items) => {
                tracing::debug!(
                    "Category {} page {}: {} items",
                    self.cursor.category,
                    self.cursor.page(),
                    items.len()
                );
                self.items_emitted += items.len() as u64;
                self.cursor.advance();
                Ok(Some(items))
            }
            Err(error) => {
                self.state = WalkState::Failed;
                Err(error)
            }
        }
    }

    async fn fetch_page(&self) -> Result<Vec<ItemReference>, WalkError> {
        let request = self.page_request()?;
        let url = request.url.clone();
        let body = fetch_with_timeout(self.fetcher.as_ref(), request, self.timeout).await?;
        Ok(parse_listing(&body, &url, &self.cursor.category)?)
    }

    /// Turns the walker into a lazy stream of references
    ///
    /// Pages are requested only as the stream is polled. A failure is
    /// yielded once, after which the stream ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<ItemReference, WalkError>> {
        stream::unfold(self, |mut walker| async move {
            match walker.next_page().await {
                Ok(Some(items)) => {
                    let page: Vec<_> = items.into_iter().map(Ok).collect();
                    Some((stream::iter(page), walker))
                }
                Ok(None) => None,
                Err(error) => Some((stream::iter(vec![Err(error)]), walker)),
            }
        })
        .flatten()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{OutputConfig, SinkKind};
    use crate::crawler::fetcher::{FetchResponse, Method};
    use async_trait::async_trait;
    use futures::TryStreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fetcher that replays scripted responses and records every request
    pub(crate) struct ScriptedFetch {
        responses: Mutex<VecDeque<Result<FetchResponse, FetchError>>>,
        pub requests: Mutex<Vec<FetchRequest>>,
    }

    impl ScriptedFetch {
        pub fn new(responses: Vec<Result<FetchResponse, FetchError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Fetch for ScriptedFetch {
        async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(FetchResponse::new(200, "[]")))
        }
    }

    fn page(slugs: &[&str]) -> Result<FetchResponse, FetchError> {
        let entries: Vec<Value> = slugs
            .iter()
            .map(|s| serde_json::json!({"url": s, "category": {"title": "Игрушки"}}))
            .collect();
        Ok(FetchResponse::new(200, Value::Array(entries).to_string()))
    }

    fn walker(fetch: Arc<ScriptedFetch>) -> ListingWalker {
        let mut config = Config::new(OutputConfig::new(SinkKind::Jsonl, "products.jsonl"));
        config.crawler.page_size = 2;
        ListingWalker::new(
            CategoryId::new("igrushki").unwrap(),
            fetch,
            Arc::new(config),
        )
    }

    #[tokio::test]
    async fn test_walks_until_empty_page() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            page(&["a", "b"]),
            page(&["c"]),
            page(&[]),
        ]));
        let mut walker = walker(fetch.clone());

        assert_eq!(walker.next_page().await.unwrap().unwrap().len(), 2);
        assert_eq!(walker.next_page().await.unwrap().unwrap().len(), 1);
        assert!(walker.next_page().await.unwrap().is_none());
        assert_eq!(walker.state(), WalkState::Exhausted);

        // Terminal walkers never hit the network again
        assert!(walker.next_page().await.unwrap().is_none());
        assert_eq!(fetch.request_count(), 3);
        assert_eq!(walker.pages_fetched(), 3);
        assert_eq!(walker.items_emitted(), 3);
    }

    #[tokio::test]
    async fn test_page_requests_in_order() {
        let fetch = Arc::new(ScriptedFetch::new(vec![page(&["a", "b"]), page(&[])]));
        let mut walker = walker(fetch.clone());
        while walker.next_page().await.unwrap().is_some() {}

        let requests = fetch.requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::Post);
        assert!(requests[0].url.contains("/product/in/igrushki?page=1&limit=2&sort=sold"));
        assert!(requests[1].url.contains("page=2"));

        let body: Value = serde_json::from_str(requests[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["category"], "igrushki");
        assert!(requests[0]
            .headers
            .iter()
            .any(|(k, v)| k == "x-city" && !v.is_empty()));
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let fetch = Arc::new(ScriptedFetch::new(vec![page(&[])]));
        let mut walker = walker(fetch.clone());

        assert!(walker.next_page().await.unwrap().is_none());
        assert_eq!(walker.state(), WalkState::Exhausted);
        assert_eq!(walker.items_emitted(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_terminal() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            page(&["a"]),
            Ok(FetchResponse::new(500, "oops")),
        ]));
        let mut walker = walker(fetch.clone());

        assert!(walker.next_page().await.unwrap().is_some());
        let err = walker.next_page().await.unwrap_err();
        assert!(matches!(err, WalkError::Fetch(FetchError::Status { status: 500, .. })));
        assert_eq!(walker.state(), WalkState::Failed);

        assert!(walker.next_page().await.unwrap().is_none());
        assert_eq!(fetch.request_count(), 2);
    }

    #[tokio::test]
    async fn test_schema_failure_is_terminal() {
        let fetch = Arc::new(ScriptedFetch::new(vec![Ok(FetchResponse::new(
            200,
            r#"{"error": "bad request"}"#,
        ))]));
        let mut walker = walker(fetch);

        let err = walker.next_page().await.unwrap_err();
        assert!(matches!(err, WalkError::Schema(SchemaError::UnexpectedShape { .. })));
        assert_eq!(walker.state(), WalkState::Failed);
    }

    #[tokio::test]
    async fn test_stream_yields_every_item() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            page(&["a", "b"]),
            page(&["c", "d"]),
            page(&["e"]),
            page(&[]),
        ]));
        let items: Vec<ItemReference> = walker(fetch).into_stream().try_collect().await.unwrap();

        let slugs: Vec<_> = items.iter().map(|i| i.item_url.as_str()).collect();
        assert_eq!(slugs, ["a", "b", "c", "d", "e"]);
        assert!(items.iter().all(|i| i.category_title == "Игрушки"));
    }

    #[tokio::test]
    async fn test_stream_ends_after_error() {
        let fetch = Arc::new(ScriptedFetch::new(vec![
            page(&["a"]),
            Ok(FetchResponse::new(200, "<html>")),
        ]));
        let results: Vec<_> = walker(fetch).into_stream().collect().await;

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(WalkError::Schema(SchemaError::NotJson { .. }))));
    }

    #[test]
    fn test_parse_listing_title_fallback() {
        let category = CategoryId::new("kantstovary").unwrap();
        let items = parse_listing(
            r#"[{"url": "p-1"}, {"url": "p-2", "category": {"title": "Канцтовары"}}]"#,
            "u",
            &category,
        )
        .unwrap();
        assert_eq!(items[0].category_title, "kantstovary");
        assert_eq!(items[1].category_title, "Канцтовары");
    }

    #[test]
    fn test_parse_listing_rejects_entry_without_url() {
        let category = CategoryId::new("kantstovary").unwrap();
        let err = parse_listing(r#"[{"url": "p-1"}, {"id": 2}]"#, "u", &category).unwrap_err();
        assert!(matches!(err, SchemaError::UnexpectedShape { .. }));
        assert!(err.to_string().contains("entry 1"));
    }

    #[test]
    fn test_parse_listing_null_is_empty() {
        let category = CategoryId::new("kantstovary").unwrap();
        assert!(parse_listing("null", "u", &category).unwrap().is_empty());
    }
}
