//! Immutable catalog entities shared by every data source and screen.

/// Id prefix reserved for categories fabricated from free-text filter input.
///
/// A catalog id that happens to start with this prefix is indistinguishable
/// from a synthetic one; catalogs are expected not to use it.
pub const SEARCH_CATEGORY_PREFIX: &str = "search:";

/// A browsable category of images.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Category {
    pub id: String,
    pub name: String,
    /// Empty when no thumbnail could be resolved; renderers show a placeholder.
    pub thumbnail_url: String,
}

impl Category {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        thumbnail_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            thumbnail_url: thumbnail_url.into(),
        }
    }

    /// Builds the synthetic "search for this text" category offered when a
    /// filter does not exactly name a catalog category.
    pub fn search(query: &str) -> Self {
        Self {
            id: format!("{SEARCH_CATEGORY_PREFIX}{query}"),
            name: query.to_string(),
            thumbnail_url: String::new(),
        }
    }

    /// True for categories built by [`Category::search`].
    pub fn is_search(&self) -> bool {
        self.id.starts_with(SEARCH_CATEGORY_PREFIX)
    }
}

/// A single full-resolution image (a "wallpaper").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Image {
    /// Stable within one data source only.
    pub id: String,
    pub image_url: String,
    /// Owning category, or empty when the image came from free-text search.
    pub category_id: String,
}

impl Image {
    pub fn new(
        id: impl Into<String>,
        image_url: impl Into<String>,
        category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            image_url: image_url.into(),
            category_id: category_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_category_shape() {
        let category = Category::search("red cars");
        assert_eq!(category.id, "search:red cars");
        assert_eq!(category.name, "red cars");
        assert!(category.thumbnail_url.is_empty());
        assert!(category.is_search());
    }

    #[test]
    fn test_catalog_category_is_not_search() {
        let category = Category::new("1", "Nature", "https://example.com/n.jpg");
        assert!(!category.is_search());
    }
}
