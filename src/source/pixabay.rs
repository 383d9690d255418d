use super::{page_slice, DataSource, SourceError};
use crate::model::{Category, Image};
use futures::stream::{self, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://pixabay.com/api/";

const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Hits requested per category when resolving its thumbnail.
const CATEGORY_THUMBNAIL_FETCH_COUNT: u32 = 3;

/// Upper bound on concurrent thumbnail lookups in one category page.
const MAX_CONCURRENT_THUMBNAILS: usize = 10;

/// `per_page` range accepted by the endpoint.
const MIN_PER_PAGE: u32 = 3;
const MAX_PER_PAGE: u32 = 200;

const ERR_WALLPAPERS: &str = "Failed to load wallpapers";
const ERR_SEARCH: &str = "Failed to search wallpapers";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Request timed out after 30s")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// A catalog category backed by a fixed search phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub search_query: &'static str,
}

/// The remote catalog. Order here is the order categories are listed in.
pub const CATEGORY_DEFINITIONS: &[CategoryDefinition] = &[
    CategoryDefinition { id: "1", name: "Nature", search_query: "nature landscape" },
    CategoryDefinition { id: "2", name: "Abstract", search_query: "abstract colorful" },
    CategoryDefinition { id: "3", name: "Architecture", search_query: "architecture building" },
    CategoryDefinition { id: "4", name: "Space", search_query: "space galaxy stars" },
    CategoryDefinition { id: "5", name: "Animals", search_query: "animals wildlife" },
    CategoryDefinition { id: "6", name: "Ocean", search_query: "ocean sea beach" },
    CategoryDefinition { id: "7", name: "Mountains", search_query: "mountains peaks" },
    CategoryDefinition { id: "8", name: "Cityscapes", search_query: "city skyline night" },
    CategoryDefinition { id: "9", name: "Flowers", search_query: "flowers bloom" },
    CategoryDefinition { id: "10", name: "Sunset", search_query: "sunset sunrise sky" },
];

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: u64,
    #[serde(rename = "webformatURL", default)]
    webformat_url: String,
    #[serde(rename = "largeImageURL", default)]
    large_image_url: String,
}

/// One search request against the endpoint. Defaults match the endpoint's
/// own: photos, vertical orientation, 30 per page, safe search on.
#[derive(Debug, Clone)]
struct SearchRequest<'a> {
    query: &'a str,
    image_type: &'a str,
    orientation: &'a str,
    per_page: u32,
    page: u32,
    safe_search: bool,
}

impl<'a> SearchRequest<'a> {
    fn new(query: &'a str) -> Self {
        Self {
            query,
            image_type: "photo",
            orientation: "vertical",
            per_page: 30,
            page: 1,
            safe_search: true,
        }
    }

    fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.clamp(MIN_PER_PAGE, MAX_PER_PAGE);
        self
    }

    fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }
}

/// Endpoint pages covering one caller page.
///
/// The endpoint only serves 3..=200 hits per page, so a caller page of any
/// other size is mapped to the absolute hit window
/// `(page-1)*page_size .. page*page_size` and read from whichever endpoint
/// pages overlap it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageWindow {
    per_page: u32,
    first_page: u32,
    last_page: u32,
    /// Hits to drop from the start of `first_page`.
    skip: usize,
    take: usize,
}

impl PageWindow {
    fn new(page: u32, page_size: u32) -> Self {
        let per_page = page_size.clamp(MIN_PER_PAGE, MAX_PER_PAGE);
        let start = u64::from(page.max(1) - 1) * u64::from(page_size);
        let end = start + u64::from(page_size);
        let per = u64::from(per_page);
        let first = start / per;
        let last = end.saturating_sub(1) / per;
        Self {
            per_page,
            first_page: u32::try_from(first + 1).unwrap_or(u32::MAX),
            last_page: u32::try_from(last + 1).unwrap_or(u32::MAX),
            skip: (start - first * per) as usize,
            take: page_size as usize,
        }
    }
}

/// [`DataSource`] over the Pixabay image search API.
///
/// A missing or blank key is a supported state: every operation returns an
/// empty result without touching the network.
///
/// Custom `Debug` impl keeps the key out of logs.
#[derive(Clone)]
pub struct PixabaySource {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl std::fmt::Debug for PixabaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixabaySource")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl PixabaySource {
    pub fn new(client: reqwest::Client, api_key: Option<SecretString>) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Points the source at a different endpoint.
    ///
    /// Non-HTTPS URLs are only accepted for localhost, so the key never
    /// travels in clear text.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, RemoteError> {
        let base_url = base_url.into();
        if !base_url.starts_with("https://") {
            let is_localhost = base_url.starts_with("http://127.0.0.1")
                || base_url.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %base_url, "Rejecting non-HTTPS base URL (HTTPS required except for localhost)");
                return Err(RemoteError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base_url, "Using non-HTTPS Pixabay base URL (localhost only)");
        }
        Url::parse(&base_url)?;
        self.base_url = base_url;
        Ok(self)
    }

    fn api_key(&self) -> Result<&str, SourceError> {
        match &self.api_key {
            Some(key) if !key.expose_secret().trim().is_empty() => Ok(key.expose_secret()),
            _ => Err(SourceError::DataUnavailable),
        }
    }

    async fn search(&self, key: &str, request: &SearchRequest<'_>) -> Result<Vec<Hit>, RemoteError> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("key", key.to_string()),
                ("q", request.query.to_string()),
                ("image_type", request.image_type.to_string()),
                ("orientation", request.orientation.to_string()),
                ("per_page", request.per_page.to_string()),
                ("page", request.page.to_string()),
                ("safesearch", request.safe_search.to_string()),
            ],
        )?;

        tracing::debug!(
            query = %request.query,
            page = request.page,
            per_page = request.per_page,
            "Pixabay search"
        );

        // The timeout covers the body as well as the headers.
        let download = async {
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(RemoteError::HttpStatus(response.status().as_u16()));
            }
            read_limited_bytes(response, MAX_RESPONSE_SIZE).await
        };
        let body = tokio::time::timeout(REQUEST_TIMEOUT, download)
            .await
            .map_err(|_| RemoteError::Timeout)??;
        let parsed: SearchResponse = serde_json::from_slice(&body)?;
        Ok(parsed.hits)
    }

    /// Resolves one category's thumbnail. Failures are absorbed here: the
    /// category is still listed, just without a thumbnail.
    async fn resolve_category(&self, key: &str, def: &CategoryDefinition) -> Category {
        let request = SearchRequest::new(def.search_query).per_page(CATEGORY_THUMBNAIL_FETCH_COUNT);
        let thumbnail_url = match self.search(key, &request).await {
            Ok(hits) => hits
                .into_iter()
                .next()
                .map(|hit| hit.webformat_url)
                .unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    category = def.name,
                    error = %e,
                    "Thumbnail lookup failed, listing category without thumbnail"
                );
                String::new()
            }
        };
        Category::new(def.id, def.name, thumbnail_url)
    }

    async fn fetch_images(
        &self,
        query: &str,
        category_id: &str,
        page: u32,
        page_size: u32,
        context: &'static str,
    ) -> Result<Vec<Image>, SourceError> {
        let key = match self.api_key() {
            Ok(key) => key,
            Err(_) => {
                tracing::debug!("No Pixabay API key configured, returning no images");
                return Ok(Vec::new());
            }
        };

        let window = PageWindow::new(page, page_size);
        let mut hits = Vec::new();
        for endpoint_page in window.first_page..=window.last_page {
            let request = SearchRequest::new(query)
                .per_page(window.per_page)
                .page(endpoint_page);
            let batch = self
                .search(key, &request)
                .await
                .map_err(|source| SourceError::FetchFailed { context, source })?;
            let short = batch.len() < window.per_page as usize;
            hits.extend(batch);
            if short {
                break;
            }
        }

        Ok(hits
            .into_iter()
            .skip(window.skip)
            .take(window.take)
            .map(|hit| Image::new(hit.id.to_string(), hit.large_image_url, category_id))
            .collect())
    }
}

impl DataSource for PixabaySource {
    async fn list_categories(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Category>, SourceError> {
        let key = match self.api_key() {
            Ok(key) => key,
            Err(_) => {
                tracing::debug!("No Pixabay API key configured, returning no categories");
                return Ok(Vec::new());
            }
        };

        let definitions = page_slice(CATEGORY_DEFINITIONS, page, page_size);
        if definitions.is_empty() {
            return Ok(Vec::new());
        }

        // `buffered` keeps definition order while running lookups concurrently.
        let categories: Vec<Category> = stream::iter(definitions.iter().copied())
            .map(|def| async move { self.resolve_category(key, &def).await })
            .buffered(MAX_CONCURRENT_THUMBNAILS)
            .collect()
            .await;

        tracing::debug!(page, count = categories.len(), "Loaded category page");
        Ok(categories)
    }

    async fn list_images(
        &self,
        category_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Image>, SourceError> {
        let Some(def) = CATEGORY_DEFINITIONS.iter().find(|d| d.id == category_id) else {
            tracing::debug!(category_id = %category_id, "Unknown category, returning no images");
            return Ok(Vec::new());
        };
        self.fetch_images(def.search_query, category_id, page, page_size, ERR_WALLPAPERS)
            .await
    }

    async fn search_images(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Image>, SourceError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.fetch_images(query, "", page, page_size, ERR_SEARCH).await
    }
}

/// Reads a response body, refusing anything over `limit` bytes.
pub(crate) async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, RemoteError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(RemoteError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(RemoteError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(RemoteError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
