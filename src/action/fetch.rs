use super::ActionError;
use crate::source::{read_limited_bytes, RemoteError};
use std::future::Future;
use std::time::Duration;
use url::Url;

const MAX_IMAGE_SIZE: usize = 25 * 1024 * 1024; // 25MB
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves raw image bytes.
pub trait ImageFetcher: Send + Sync + 'static {
    fn fetch(&self, image_url: &str) -> impl Future<Output = Result<Vec<u8>, ActionError>> + Send;
}

/// Fetches images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, image_url: &str) -> Result<Vec<u8>, ActionError> {
        let url = Url::parse(image_url).map_err(|_| ActionError::InvalidUrl(image_url.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ActionError::InvalidUrl(image_url.to_string()));
        }

        // The timeout covers the body as well as the headers.
        let download = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(RemoteError::Network)?;
            if !response.status().is_success() {
                return Err(RemoteError::HttpStatus(response.status().as_u16()));
            }
            read_limited_bytes(response, MAX_IMAGE_SIZE).await
        };
        let bytes = tokio::time::timeout(REQUEST_TIMEOUT, download)
            .await
            .map_err(|_| RemoteError::Timeout)??;
        tracing::debug!(url = %image_url, bytes = bytes.len(), "Fetched image");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let fetcher = HttpImageFetcher::new(reqwest::Client::new());
        let bytes = fetcher
            .fetch(&format!("{}/img.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpImageFetcher::new(reqwest::Client::new());
        let err = fetcher
            .fetch(&format!("{}/missing.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::Fetch(RemoteError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_non_http_scheme_rejected() {
        let fetcher = HttpImageFetcher::new(reqwest::Client::new());
        let err = fetcher.fetch("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidUrl(_)));

        let err = fetcher.fetch("not a url").await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidUrl(_)));
    }
}
