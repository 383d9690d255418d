//! Static in-memory catalog.

use super::{page_slice, DataSource, SourceError};
use crate::model::{Category, Image};
use std::time::Duration;

const CATEGORIES: &[(&str, &str, &str)] = &[
    ("1", "Nature", "https://images.unsplash.com/photo-1469474968028-56623f02e42e?w=400"),
    ("2", "Abstract", "https://images.unsplash.com/photo-1541701494587-cb58502866ab?w=400"),
    ("3", "Architecture", "https://images.unsplash.com/photo-1486325212027-8081e485255e?w=400"),
    ("4", "Space", "https://images.unsplash.com/photo-1462331940025-496dfbfc7564?w=400"),
    ("5", "Animals", "https://images.unsplash.com/photo-1474511320723-9a56873571b7?w=400"),
    ("6", "Ocean", "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?w=400"),
    ("7", "Mountains", "https://images.unsplash.com/photo-1464822759023-fed622ff2c3b?w=400"),
    ("8", "Cityscapes", "https://images.unsplash.com/photo-1477959858617-67f85cf4f1df?w=400"),
    ("9", "Forest", "https://images.unsplash.com/photo-1448375240586-882707db888b?w=400"),
    ("10", "Desert", "https://images.unsplash.com/photo-1509316785289-025f5b846b35?w=400"),
    ("11", "Waterfall", "https://images.unsplash.com/photo-1432405972618-c6b0cfba8673?w=400"),
    ("12", "Winter", "https://images.unsplash.com/photo-1457269449834-928af64c684d?w=400"),
    ("13", "Autumn", "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=400"),
    ("14", "Cars", "https://images.unsplash.com/photo-1494976388531-d1058494cdd8?w=400"),
    ("15", "Food", "https://images.unsplash.com/photo-1504674900247-0877df9cc836?w=400"),
    ("16", "Music", "https://images.unsplash.com/photo-1511379938547-c1f69419868d?w=400"),
];

const IMAGES: &[(&str, &str, &str)] = &[
    // Nature
    ("n1", "https://images.unsplash.com/photo-1469474968028-56623f02e42e?w=1080", "1"),
    ("n2", "https://images.unsplash.com/photo-1447752875215-b2761acb3c5d?w=1080", "1"),
    ("n3", "https://images.unsplash.com/photo-1433086966358-54859d0ed716?w=1080", "1"),
    ("n4", "https://images.unsplash.com/photo-1470071459604-3b5ec3a7fe05?w=1080", "1"),
    ("n5", "https://images.unsplash.com/photo-1441974231531-c6227db76b6e?w=1080", "1"),
    ("n6", "https://images.unsplash.com/photo-1472214103451-9374bd1c798e?w=1080", "1"),
    // Abstract
    ("a1", "https://images.unsplash.com/photo-1541701494587-cb58502866ab?w=1080", "2"),
    ("a2", "https://images.unsplash.com/photo-1550859492-d5da9d8e45f3?w=1080", "2"),
    ("a3", "https://images.unsplash.com/photo-1567095761054-7a02e69e5b2b?w=1080", "2"),
    ("a4", "https://images.unsplash.com/photo-1553356084-58ef4a67b2a7?w=1080", "2"),
    ("a5", "https://images.unsplash.com/photo-1579546929518-9e396f3cc809?w=1080", "2"),
    // Architecture
    ("ar1", "https://images.unsplash.com/photo-1486325212027-8081e485255e?w=1080", "3"),
    ("ar2", "https://images.unsplash.com/photo-1487958449943-2429e8be8625?w=1080", "3"),
    ("ar3", "https://images.unsplash.com/photo-1448630360428-65456885c650?w=1080", "3"),
    ("ar4", "https://images.unsplash.com/photo-1431576901776-e539bd916ba2?w=1080", "3"),
    // Space
    ("s1", "https://images.unsplash.com/photo-1462331940025-496dfbfc7564?w=1080", "4"),
    ("s2", "https://images.unsplash.com/photo-1446776811953-b23d57bd21aa?w=1080", "4"),
    ("s3", "https://images.unsplash.com/photo-1451187580459-43490279c0fa?w=1080", "4"),
    ("s4", "https://images.unsplash.com/photo-1419242902214-272b3f66ee7a?w=1080", "4"),
    ("s5", "https://images.unsplash.com/photo-1464802686167-b939a6910659?w=1080", "4"),
    // Animals
    ("an1", "https://images.unsplash.com/photo-1474511320723-9a56873571b7?w=1080", "5"),
    ("an2", "https://images.unsplash.com/photo-1437622368342-7a3d73a34c8f?w=1080", "5"),
    ("an3", "https://images.unsplash.com/photo-1425082661705-1834bfd09dca?w=1080", "5"),
    ("an4", "https://images.unsplash.com/photo-1484406566174-2da7ec519411?w=1080", "5"),
    // Ocean
    ("o1", "https://images.unsplash.com/photo-1507525428034-b723cf961d3e?w=1080", "6"),
    ("o2", "https://images.unsplash.com/photo-1505118380757-91f5f5632de0?w=1080", "6"),
    ("o3", "https://images.unsplash.com/photo-1518837695005-2083093ee35b?w=1080", "6"),
    ("o4", "https://images.unsplash.com/photo-1471922694854-ff1b63b20054?w=1080", "6"),
    // Mountains
    ("m1", "https://images.unsplash.com/photo-1464822759023-fed622ff2c3b?w=1080", "7"),
    ("m2", "https://images.unsplash.com/photo-1506905925346-21bda4d32df4?w=1080", "7"),
    ("m3", "https://images.unsplash.com/photo-1454496522488-7a8e488e8606?w=1080", "7"),
    ("m4", "https://images.unsplash.com/photo-1519681393784-d120267933ba?w=1080", "7"),
    // Cityscapes
    ("c1", "https://images.unsplash.com/photo-1477959858617-67f85cf4f1df?w=1080", "8"),
    ("c2", "https://images.unsplash.com/photo-1449824913935-59a10b8d2000?w=1080", "8"),
    ("c3", "https://images.unsplash.com/photo-1480714378408-67cf0d13bc1b?w=1080", "8"),
    ("c4", "https://images.unsplash.com/photo-1514565131-fce0801e5785?w=1080", "8"),
];

/// In-memory catalog of 16 categories and 36 images.
///
/// `search_images` ignores the query and returns every categorized image.
/// Callers rely on that stand-in behaving the same everywhere, so it stays.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    categories: Vec<Category>,
    images: Vec<Image>,
    latency: Duration,
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::from_parts(
            CATEGORIES
                .iter()
                .map(|(id, name, thumb)| Category::new(*id, *name, *thumb))
                .collect(),
            IMAGES
                .iter()
                .map(|(id, url, category)| Image::new(*id, *url, *category))
                .collect(),
        )
    }

    /// Builds a fixture over caller-supplied data.
    pub fn from_parts(categories: Vec<Category>, images: Vec<Image>) -> Self {
        Self {
            categories,
            images,
            latency: Duration::ZERO,
        }
    }

    /// Delays every call by `latency`, simulating a slow backend.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl DataSource for FixtureSource {
    async fn list_categories(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Category>, SourceError> {
        self.simulate_latency().await;
        Ok(page_slice(&self.categories, page, page_size).to_vec())
    }

    async fn list_images(
        &self,
        category_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Image>, SourceError> {
        self.simulate_latency().await;
        let matching: Vec<Image> = self
            .images
            .iter()
            .filter(|image| image.category_id == category_id)
            .cloned()
            .collect();
        Ok(page_slice(&matching, page, page_size).to_vec())
    }

    async fn search_images(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Image>, SourceError> {
        self.simulate_latency().await;
        tracing::trace!(query = %query, "Fixture search ignores query text");
        let categorized: Vec<Image> = self
            .images
            .iter()
            .filter(|image| !image.category_id.is_empty())
            .cloned()
            .collect();
        Ok(page_slice(&categorized, page, page_size).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_list_categories_pages() {
        let source = FixtureSource::new();

        let first = source.list_categories(1, 10).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].name, "Nature");

        let second = source.list_categories(2, 10).await.unwrap();
        assert_eq!(second.len(), 6);
        assert_eq!(second[5].name, "Music");

        let third = source.list_categories(3, 10).await.unwrap();
        assert!(third.is_empty());
    }

    #[tokio::test]
    async fn test_list_images_filters_by_category() {
        let source = FixtureSource::new();

        let nature = source.list_images("1", 1, 4).await.unwrap();
        let ids: Vec<&str> = nature.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n2", "n3", "n4"]);

        let rest = source.list_images("1", 2, 4).await.unwrap();
        let ids: Vec<&str> = rest.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["n5", "n6"]);
    }

    #[tokio::test]
    async fn test_list_images_unknown_category_is_empty() {
        let source = FixtureSource::new();
        assert!(source.list_images("404", 1, 10).await.unwrap().is_empty());
        assert!(source.list_images("", 1, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_ignores_query_text() {
        let source = FixtureSource::new();
        let a = source.search_images("kittens", 1, 50).await.unwrap();
        let b = source.search_images("", 1, 50).await.unwrap();
        assert_eq!(a.len(), 36);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_search_skips_uncategorized_images() {
        let source = FixtureSource::from_parts(
            Vec::new(),
            vec![
                Image::new("x", "https://example.com/x.jpg", ""),
                Image::new("y", "https://example.com/y.jpg", "1"),
            ],
        );
        let found = source.search_images("anything", 1, 10).await.unwrap();
        assert_eq!(found, vec![Image::new("y", "https://example.com/y.jpg", "1")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_is_simulated() {
        let source = FixtureSource::new().with_latency(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        source.list_categories(1, 5).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
