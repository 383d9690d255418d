//! The two paged screens: the category browser and the image grid.
//!
//! Both are thin layers over [`PagedListController`]; they decide what a
//! page means for their entity and which mutation entry points exist.

use super::controller::{PageSource, PagedListController};
use super::filter::project_categories;
use super::state::{Subscription, UiState};
use crate::model::{Category, Image};
use crate::source::{DataSource, SourceError};
use std::sync::Arc;

// ============================================================================
// Page sources
// ============================================================================

/// Category pages, filtered client-side.
#[derive(Debug)]
pub struct CategoryPages<S> {
    source: Arc<S>,
}

impl<S: DataSource> PageSource for CategoryPages<S> {
    type Item = Category;
    type Query = ();

    async fn fetch_page(
        &self,
        _query: &(),
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Category>, SourceError> {
        self.source.list_categories(page, page_size).await
    }

    fn project(items: &[Category], filter: &str) -> Vec<Category> {
        project_categories(items, filter)
    }
}

/// What the image screen is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageQuery {
    /// Browse one catalog category.
    Category(String),
    /// Free-text search, answered by the data source.
    Search(String),
}

impl ImageQuery {
    /// The query for opening `category`: synthetic search categories search
    /// for their name, catalog categories browse their id.
    pub fn for_category(category: &Category) -> Self {
        if category.is_search() {
            ImageQuery::Search(category.name.clone())
        } else {
            ImageQuery::Category(category.id.clone())
        }
    }
}

/// Image pages, either by category or by server-side search.
#[derive(Debug)]
pub struct ImagePages<S> {
    source: Arc<S>,
}

impl<S: DataSource> PageSource for ImagePages<S> {
    type Item = Image;
    type Query = ImageQuery;

    async fn fetch_page(
        &self,
        query: &ImageQuery,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Image>, SourceError> {
        match query {
            ImageQuery::Category(id) => self.source.list_images(id, page, page_size).await,
            ImageQuery::Search(text) => self.source.search_images(text, page, page_size).await,
        }
    }
}

// ============================================================================
// Category screen
// ============================================================================

/// Paged category list with an instant text filter.
#[derive(Debug)]
pub struct CategoryScreen<S: DataSource> {
    controller: PagedListController<CategoryPages<S>>,
}

impl<S: DataSource> CategoryScreen<S> {
    pub fn new(source: Arc<S>, page_size: u32) -> Self {
        Self {
            controller: PagedListController::new(CategoryPages { source }, (), page_size),
        }
    }

    /// Loads page 1 from scratch. Also the retry action after an error.
    pub async fn reset(&self) {
        self.controller.reset().await;
    }

    /// Scroll-near-end trigger.
    pub async fn load_more(&self) {
        self.controller.load_more().await;
    }

    /// Filters already-loaded categories; never fetches.
    pub fn set_filter(&self, text: &str) {
        self.controller.set_filter(text);
    }

    pub fn launch_reset(&mut self) {
        self.controller.launch_reset();
    }

    pub fn launch_load_more(&mut self) {
        self.controller.launch_load_more();
    }

    /// Tears the screen down: in-flight work is aborted.
    pub fn close(&mut self) {
        self.controller.close();
    }

    pub async fn settle(&mut self) {
        self.controller.settle().await;
    }

    pub fn ui_state(&self) -> UiState<Vec<Category>> {
        self.controller.ui_state()
    }

    pub fn subscribe(&self) -> Subscription<UiState<Vec<Category>>> {
        self.controller.subscribe()
    }

    pub fn is_loading_more(&self) -> bool {
        self.controller.is_loading_more()
    }

    pub fn subscribe_loading_more(&self) -> Subscription<bool> {
        self.controller.subscribe_loading_more()
    }

    pub fn has_more(&self) -> bool {
        self.controller.has_more()
    }

    pub fn filter(&self) -> String {
        self.controller.filter()
    }
}

// ============================================================================
// Image screen
// ============================================================================

/// Paged image grid for one category, switchable to server-side search.
#[derive(Debug)]
pub struct ImageScreen<S: DataSource> {
    controller: PagedListController<ImagePages<S>>,
    /// Category browsed when no search is active; empty when the screen was
    /// opened from a search.
    category_id: String,
}

impl<S: DataSource> ImageScreen<S> {
    pub fn new(source: Arc<S>, query: ImageQuery, page_size: u32) -> Self {
        let category_id = match &query {
            ImageQuery::Category(id) => id.clone(),
            ImageQuery::Search(_) => String::new(),
        };
        Self {
            controller: PagedListController::new(ImagePages { source }, query, page_size),
            category_id,
        }
    }

    /// Opens the screen for a category picked on the category screen.
    pub fn for_category(source: Arc<S>, category: &Category, page_size: u32) -> Self {
        Self::new(source, ImageQuery::for_category(category), page_size)
    }

    /// Reloads page 1 of whatever is currently shown (retry action).
    pub async fn reset(&self) {
        self.controller.reset().await;
    }

    pub async fn load_more(&self) {
        self.controller.load_more().await;
    }

    /// Submits a search. Blank input goes back to browsing the category.
    pub async fn search(&self, query: &str) {
        self.controller.reset_with(self.query_for(query)).await;
    }

    pub fn launch_reset(&mut self) {
        self.controller.launch_reset();
    }

    pub fn launch_load_more(&mut self) {
        self.controller.launch_load_more();
    }

    pub fn launch_search(&mut self, query: &str) {
        let query = self.query_for(query);
        self.controller.launch_reset_with(query);
    }

    pub fn close(&mut self) {
        self.controller.close();
    }

    pub async fn settle(&mut self) {
        self.controller.settle().await;
    }

    /// The search phrase in effect, if any. Passed on to the preview screen.
    pub fn active_search_query(&self) -> Option<String> {
        match self.controller.query() {
            ImageQuery::Search(text) => Some(text),
            ImageQuery::Category(_) => None,
        }
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn ui_state(&self) -> UiState<Vec<Image>> {
        self.controller.ui_state()
    }

    pub fn subscribe(&self) -> Subscription<UiState<Vec<Image>>> {
        self.controller.subscribe()
    }

    pub fn is_loading_more(&self) -> bool {
        self.controller.is_loading_more()
    }

    pub fn subscribe_loading_more(&self) -> Subscription<bool> {
        self.controller.subscribe_loading_more()
    }

    pub fn has_more(&self) -> bool {
        self.controller.has_more()
    }

    fn query_for(&self, input: &str) -> ImageQuery {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            ImageQuery::Category(self.category_id.clone())
        } else {
            ImageQuery::Search(trimmed.to_string())
        }
    }
}
