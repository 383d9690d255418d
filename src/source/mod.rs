//! Data sources for the catalog.
//!
//! Every screen talks to the catalog through the [`DataSource`] capability
//! set. Two implementations exist:
//!
//! - [`fixture`] - a static in-memory dataset, useful offline and in tests
//! - [`pixabay`] - adapts the keyed Pixabay search API into catalog entities
//!
//! The concrete variant is chosen by the composition root; nothing below the
//! screens knows which one it is talking to.

mod fixture;
mod pixabay;

pub use fixture::FixtureSource;
pub use pixabay::{
    CategoryDefinition, PixabaySource, RemoteError, CATEGORY_DEFINITIONS, DEFAULT_BASE_URL,
};
pub(crate) use pixabay::read_limited_bytes;

use crate::model::{Category, Image};
use std::future::Future;
use thiserror::Error;

/// Errors reported by a [`DataSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// No credential or configuration is present. Sources resolve this to an
    /// empty result before it reaches a caller.
    #[error("Data source is not configured")]
    DataUnavailable,

    /// The underlying fetch failed. `context` is a stable, human-readable
    /// prefix such as "Failed to load categories".
    #[error("{context}: {source}")]
    FetchFailed {
        context: &'static str,
        #[source]
        source: RemoteError,
    },
}

/// Read-only, paged access to categories and images.
///
/// Pages are 1-based. A page beyond the end of the data yields an empty
/// vector, never an error, and no implementation returns more than
/// `page_size` items.
pub trait DataSource: Send + Sync + 'static {
    fn list_categories(
        &self,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Category>, SourceError>> + Send;

    fn list_images(
        &self,
        category_id: &str,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Image>, SourceError>> + Send;

    fn search_images(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Image>, SourceError>> + Send;
}

/// Returns the `page`-th slice of `items`, treating page 0 as page 1.
pub(crate) fn page_slice<T>(items: &[T], page: u32, page_size: u32) -> &[T] {
    let page_size = page_size as usize;
    let from = (page.max(1) as usize - 1).saturating_mul(page_size);
    if from >= items.len() {
        return &[];
    }
    let to = from.saturating_add(page_size).min(items.len());
    &items[from..to]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_slice_bounds() {
        let items: Vec<u32> = (1..=7).collect();
        assert_eq!(page_slice(&items, 1, 3), &[1, 2, 3]);
        assert_eq!(page_slice(&items, 3, 3), &[7]);
        assert!(page_slice(&items, 4, 3).is_empty());
        assert_eq!(page_slice(&items, 0, 3), &[1, 2, 3]);
    }

    #[test]
    fn test_page_slice_zero_size_is_empty() {
        let items = [1, 2, 3];
        assert!(page_slice(&items, 1, 0).is_empty());
    }

    #[test]
    fn test_fetch_failed_message_keeps_prefix() {
        let err = SourceError::FetchFailed {
            context: "Failed to load categories",
            source: RemoteError::HttpStatus(503),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load categories: HTTP error: status 503"
        );
    }
}
