//! Generic paged-list state machine.
//!
//! A [`PagedListController`] accumulates pages from a [`PageSource`] and
//! publishes the result as a [`UiState`]. It knows nothing about which
//! concrete data source sits behind the page source.
//!
//! # Epochs
//!
//! Every reset starts a new generation. Fetches remember the generation they
//! were issued in, and a completion whose generation is no longer current is
//! dropped without touching state. A `load_more` racing a `reset` therefore
//! can never append to the freshly reset list.

use super::state::{StateCell, Subscription, UiState};
use crate::source::SourceError;
use crate::task::spawn_owned;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinSet;

/// One kind of paged content: how to fetch a page and how to present the
/// accumulated items under a filter.
pub trait PageSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;
    /// What to fetch, e.g. a category id or a search phrase.
    type Query: Clone + Send + Sync + 'static;

    fn fetch_page(
        &self,
        query: &Self::Query,
        page: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Vec<Self::Item>, SourceError>> + Send;

    /// Maps accumulated items to what is displayed. Identity by default.
    fn project(items: &[Self::Item], _filter: &str) -> Vec<Self::Item> {
        items.to_vec()
    }
}

/// Accumulation state. Only ever touched under the controller's lock.
#[derive(Debug)]
struct PageState<T, Q> {
    items: Vec<T>,
    current_page: u32,
    has_more: bool,
    filter: String,
    is_loading_more: bool,
    /// Set once page 1 of the current generation has arrived.
    first_page_loaded: bool,
    generation: u64,
    query: Q,
}

impl<T, Q> PageState<T, Q> {
    fn new(query: Q) -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            has_more: true,
            filter: String::new(),
            is_loading_more: false,
            first_page_loaded: false,
            generation: 0,
            query,
        }
    }
}

struct Shared<P: PageSource> {
    source: P,
    page_size: u32,
    state: Mutex<PageState<P::Item, P::Query>>,
    ui: StateCell<UiState<Vec<P::Item>>>,
    loading_more: StateCell<bool>,
}

/// Drives "first page / next page / reset" over a [`PageSource`].
///
/// Operations can be awaited directly, or launched onto tasks owned by the
/// controller with the `launch_*` methods. Dropping the controller (or
/// calling [`close`](Self::close)) aborts every launched task; an aborted
/// task publishes nothing further.
pub struct PagedListController<P: PageSource> {
    shared: Arc<Shared<P>>,
    tasks: JoinSet<()>,
}

impl<P: PageSource> std::fmt::Debug for PagedListController<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("PagedListController")
            .field("page_size", &self.shared.page_size)
            .field("items", &state.items.len())
            .field("current_page", &state.current_page)
            .field("has_more", &state.has_more)
            .field("is_loading_more", &state.is_loading_more)
            .field("generation", &state.generation)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl<P: PageSource> PagedListController<P> {
    /// Creates a controller in the `Loading` state. Nothing is fetched until
    /// [`reset`](Self::reset) is called.
    pub fn new(source: P, query: P::Query, page_size: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                page_size: page_size.max(1),
                state: Mutex::new(PageState::new(query)),
                ui: StateCell::new(UiState::Loading),
                loading_more: StateCell::new(false),
            }),
            tasks: JoinSet::new(),
        }
    }

    /// Discards accumulated items and loads page 1 again.
    pub async fn reset(&self) {
        self.shared.reset(None).await;
    }

    /// Resets with a new fetch query; later pages use the same query.
    pub async fn reset_with(&self, query: P::Query) {
        self.shared.reset(Some(query)).await;
    }

    /// Loads and appends the next page. A no-op while another next-page load
    /// is in flight, when the end has been reached, or before page 1 loaded.
    pub async fn load_more(&self) {
        self.shared.load_more().await;
    }

    /// Stores `text` (trimmed) as the active filter and republishes the
    /// projected items. Never fetches.
    pub fn set_filter(&self, text: &str) {
        self.shared.set_filter(text);
    }

    pub fn launch_reset(&mut self) {
        let shared = Arc::clone(&self.shared);
        spawn_owned(&mut self.tasks, "reset", async move {
            shared.reset(None).await;
        });
    }

    pub fn launch_reset_with(&mut self, query: P::Query) {
        let shared = Arc::clone(&self.shared);
        spawn_owned(&mut self.tasks, "reset", async move {
            shared.reset(Some(query)).await;
        });
    }

    pub fn launch_load_more(&mut self) {
        let shared = Arc::clone(&self.shared);
        spawn_owned(&mut self.tasks, "load_more", async move {
            shared.load_more().await;
        });
    }

    /// Aborts every launched task.
    pub fn close(&mut self) {
        self.tasks.abort_all();
    }

    /// Waits for every launched task to finish.
    pub async fn settle(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    pub fn ui_state(&self) -> UiState<Vec<P::Item>> {
        self.shared.ui.get()
    }

    pub fn subscribe(&self) -> Subscription<UiState<Vec<P::Item>>> {
        self.shared.ui.subscribe()
    }

    pub fn is_loading_more(&self) -> bool {
        self.shared.loading_more.get()
    }

    pub fn subscribe_loading_more(&self) -> Subscription<bool> {
        self.shared.loading_more.subscribe()
    }

    /// Every accumulated item, before filter projection.
    pub fn items(&self) -> Vec<P::Item> {
        self.shared.lock().items.clone()
    }

    pub fn current_page(&self) -> u32 {
        self.shared.lock().current_page
    }

    pub fn has_more(&self) -> bool {
        self.shared.lock().has_more
    }

    pub fn filter(&self) -> String {
        self.shared.lock().filter.clone()
    }

    pub fn query(&self) -> P::Query {
        self.shared.lock().query.clone()
    }

    pub fn page_size(&self) -> u32 {
        self.shared.page_size
    }
}

impl<P: PageSource> Shared<P> {
    fn lock(&self) -> MutexGuard<'_, PageState<P::Item, P::Query>> {
        // State is only mutated in short synchronous sections that cannot
        // panic midway, so a poisoned lock still holds consistent data.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn reset(&self, query: Option<P::Query>) {
        let (generation, query) = self.begin_reset(query);
        let result = self.source.fetch_page(&query, 1, self.page_size).await;
        self.finish_reset(generation, result);
    }

    fn begin_reset(&self, query: Option<P::Query>) -> (u64, P::Query) {
        let mut state = self.lock();
        let query = query.unwrap_or_else(|| state.query.clone());
        let mut fresh = PageState::new(query);
        fresh.filter = std::mem::take(&mut state.filter);
        fresh.generation = state.generation.wrapping_add(1);
        let generation = fresh.generation;
        *state = fresh;
        self.ui.publish(UiState::Loading);
        self.loading_more.publish_if_changed(false);
        tracing::debug!(generation, page_size = self.page_size, "Resetting paged list");
        (generation, state.query.clone())
    }

    fn finish_reset(&self, generation: u64, result: Result<Vec<P::Item>, SourceError>) {
        let mut state = self.lock();
        if state.generation != generation {
            tracing::debug!(
                expected = state.generation,
                got = generation,
                "Ignoring stale first page (generation mismatch)"
            );
            return;
        }

        match result {
            Ok(page) => {
                state.has_more = page.len() >= self.page_size as usize;
                state.items = page;
                state.first_page_loaded = true;
                tracing::debug!(
                    count = state.items.len(),
                    has_more = state.has_more,
                    "First page loaded"
                );
                self.ui
                    .publish(UiState::Success(P::project(&state.items, &state.filter)));
            }
            Err(e) => {
                tracing::warn!(error = %e, "First page failed");
                self.ui.publish(UiState::Error(e.to_string()));
            }
        }
    }

    async fn load_more(&self) {
        let Some((generation, page, query)) = self.begin_load_more() else {
            return;
        };
        let mut guard = LoadMoreGuard {
            shared: self,
            generation,
            armed: true,
        };
        let result = self.source.fetch_page(&query, page, self.page_size).await;
        guard.armed = false;
        self.finish_load_more(generation, page, result);
    }

    fn begin_load_more(&self) -> Option<(u64, u32, P::Query)> {
        let mut state = self.lock();
        if state.is_loading_more || !state.has_more || !state.first_page_loaded {
            tracing::trace!(
                is_loading_more = state.is_loading_more,
                has_more = state.has_more,
                first_page_loaded = state.first_page_loaded,
                "Skipping load_more"
            );
            return None;
        }
        state.is_loading_more = true;
        self.loading_more.publish_if_changed(true);
        let page = state.current_page.saturating_add(1);
        tracing::debug!(page, generation = state.generation, "Loading next page");
        Some((state.generation, page, state.query.clone()))
    }

    fn finish_load_more(
        &self,
        generation: u64,
        page: u32,
        result: Result<Vec<P::Item>, SourceError>,
    ) {
        let mut state = self.lock();
        if state.generation != generation {
            // The reset that replaced this generation already cleared the
            // loading flag; leave the new generation alone.
            tracing::debug!(
                expected = state.generation,
                got = generation,
                page,
                "Ignoring stale page (generation mismatch)"
            );
            return;
        }

        state.is_loading_more = false;
        match result {
            Ok(next) => {
                state.has_more = next.len() >= self.page_size as usize;
                if !next.is_empty() {
                    state.current_page = page;
                    state.items.extend(next);
                }
                tracing::debug!(
                    page,
                    total = state.items.len(),
                    has_more = state.has_more,
                    "Next page loaded"
                );
                self.ui
                    .publish(UiState::Success(P::project(&state.items, &state.filter)));
            }
            Err(e) => {
                // Items and page counter stay put so the next call retries
                // the same page.
                tracing::warn!(page, error = %e, "Next page failed");
                self.ui.publish(UiState::Error(e.to_string()));
            }
        }
        self.loading_more.publish_if_changed(false);
    }

    fn set_filter(&self, text: &str) {
        let mut state = self.lock();
        state.filter = text.trim().to_string();
        if state.first_page_loaded {
            self.ui
                .publish(UiState::Success(P::project(&state.items, &state.filter)));
        }
    }
}

/// Clears the loading flag if a next-page fetch is dropped before it
/// completes (task abort or a caller giving up on the future).
struct LoadMoreGuard<'a, P: PageSource> {
    shared: &'a Shared<P>,
    generation: u64,
    armed: bool,
}

impl<P: PageSource> Drop for LoadMoreGuard<'_, P> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.shared.lock();
        if state.generation == self.generation && state.is_loading_more {
            state.is_loading_more = false;
            self.shared.loading_more.publish_if_changed(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RemoteError;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves `0..total` in pages and counts fetches. Scripted failures are
    /// consumed one per fetch before falling back to real pages.
    #[derive(Clone)]
    struct Numbers {
        total: u32,
        fetches: Arc<AtomicUsize>,
        failures: Arc<Mutex<VecDeque<bool>>>,
        latency: Duration,
    }

    impl Numbers {
        fn new(total: u32) -> Self {
            Self {
                total,
                fetches: Arc::new(AtomicUsize::new(0)),
                failures: Arc::new(Mutex::new(VecDeque::new())),
                latency: Duration::ZERO,
            }
        }

        fn fail_next(&self, pattern: &[bool]) {
            self.failures.lock().unwrap().extend(pattern.iter().copied());
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl PageSource for Numbers {
        type Item = u32;
        type Query = u32; // offset added to every value

        async fn fetch_page(
            &self,
            offset: &u32,
            page: u32,
            page_size: u32,
        ) -> Result<Vec<u32>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
            if fail {
                return Err(SourceError::FetchFailed {
                    context: "Failed to load numbers",
                    source: RemoteError::HttpStatus(500),
                });
            }
            let start = (page - 1) * page_size;
            let end = (start + page_size).min(self.total);
            Ok((start..end.max(start)).map(|n| n + offset).collect())
        }
    }

    #[tokio::test]
    async fn test_reset_publishes_loading_then_success() {
        let controller = PagedListController::new(Numbers::new(25), 0, 10);
        let mut sub = controller.subscribe();

        controller.reset().await;

        assert_eq!(
            sub.drain(),
            vec![
                UiState::Loading,
                UiState::Loading,
                UiState::Success((0..10).collect()),
            ]
        );
        assert!(controller.has_more());
        assert_eq!(controller.current_page(), 1);
    }

    #[tokio::test]
    async fn test_load_more_appends_until_short_page() {
        let source = Numbers::new(25);
        let controller = PagedListController::new(source.clone(), 0, 10);

        controller.reset().await;
        controller.load_more().await;
        assert_eq!(controller.items(), (0..20).collect::<Vec<_>>());
        assert_eq!(controller.current_page(), 2);
        assert!(controller.has_more());

        controller.load_more().await;
        assert_eq!(controller.items(), (0..25).collect::<Vec<_>>());
        assert_eq!(controller.current_page(), 3);
        assert!(!controller.has_more());

        // End reached: no further fetch happens.
        controller.load_more().await;
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_exact_multiple_ends_on_empty_page() {
        let source = Numbers::new(20);
        let controller = PagedListController::new(source.clone(), 0, 10);

        controller.reset().await;
        controller.load_more().await;
        assert!(controller.has_more());

        controller.load_more().await;
        assert!(!controller.has_more());
        assert_eq!(controller.current_page(), 2, "empty page does not advance");
        assert_eq!(controller.items().len(), 20);
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_first_page_failure_publishes_error() {
        let source = Numbers::new(5);
        source.fail_next(&[true]);
        let controller = PagedListController::new(source.clone(), 0, 10);

        controller.reset().await;
        assert_eq!(
            controller.ui_state(),
            UiState::Error("Failed to load numbers: HTTP error: status 500".into())
        );

        // load_more cannot run before a first page exists.
        controller.load_more().await;
        assert_eq!(source.fetches(), 1);

        controller.reset().await;
        assert_eq!(controller.ui_state(), UiState::Success((0..5).collect()));
    }

    #[tokio::test]
    async fn test_load_more_failure_keeps_items_for_retry() {
        let source = Numbers::new(30);
        let controller = PagedListController::new(source.clone(), 0, 10);
        controller.reset().await;

        source.fail_next(&[true]);
        controller.load_more().await;
        assert!(controller.ui_state().error().is_some());
        assert_eq!(controller.items().len(), 10);
        assert_eq!(controller.current_page(), 1);
        assert!(!controller.is_loading_more());

        controller.load_more().await;
        assert_eq!(controller.ui_state(), UiState::Success((0..20).collect()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_load_more_is_single_flight() {
        let mut source = Numbers::new(100);
        source.latency = Duration::from_millis(50);
        let controller = PagedListController::new(source.clone(), 0, 10);
        controller.reset().await;

        let mut flags = controller.subscribe_loading_more();
        tokio::join!(
            controller.load_more(),
            controller.load_more(),
            controller.load_more()
        );

        assert_eq!(source.fetches(), 2, "one first page plus one next page");
        assert_eq!(controller.items().len(), 20);
        assert_eq!(flags.drain(), vec![false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_load_more_does_not_append_after_reset() {
        let mut source = Numbers::new(100);
        source.latency = Duration::from_millis(50);
        let controller = PagedListController::new(source.clone(), 0, 10);
        controller.reset().await;

        // The next page is in flight when a reset with a new query starts.
        let load = controller.load_more();
        let reset = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.reset_with(1000).await;
        };
        tokio::join!(load, reset);

        assert_eq!(controller.items(), (1000..1010).collect::<Vec<_>>());
        assert_eq!(controller.current_page(), 1);
        assert!(!controller.is_loading_more());
        assert_eq!(
            controller.ui_state(),
            UiState::Success((1000..1010).collect())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_reset_wins_over_older_reset() {
        let mut source = Numbers::new(100);
        source.latency = Duration::from_millis(50);
        let controller = PagedListController::new(source, 0, 5);

        let first = controller.reset_with(0);
        let second = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.reset_with(500).await;
        };
        tokio::join!(first, second);

        assert_eq!(controller.ui_state(), UiState::Success((500..505).collect()));
    }

    #[tokio::test]
    async fn test_filter_is_client_side() {
        struct Words;
        impl PageSource for Words {
            type Item = &'static str;
            type Query = ();
            async fn fetch_page(
                &self,
                _: &(),
                page: u32,
                _: u32,
            ) -> Result<Vec<&'static str>, SourceError> {
                Ok(if page == 1 { vec!["apple", "banana", "apricot"] } else { vec![] })
            }
            fn project(items: &[&'static str], filter: &str) -> Vec<&'static str> {
                items.iter().copied().filter(|w| w.starts_with(filter)).collect()
            }
        }

        let controller = PagedListController::new(Words, (), 10);
        controller.set_filter("  ap ");
        assert_eq!(controller.ui_state(), UiState::Loading, "no items yet");

        controller.reset().await;
        assert_eq!(controller.filter(), "ap");
        assert_eq!(controller.ui_state(), UiState::Success(vec!["apple", "apricot"]));

        controller.set_filter("");
        assert_eq!(
            controller.ui_state(),
            UiState::Success(vec!["apple", "banana", "apricot"])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_aborts_launched_tasks() {
        let mut source = Numbers::new(100);
        source.latency = Duration::from_millis(50);
        let mut controller = PagedListController::new(source.clone(), 0, 10);
        controller.reset().await;

        let mut sub = controller.subscribe();
        controller.launch_load_more();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(controller.is_loading_more());

        controller.close();
        controller.settle().await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(sub.drain(), vec![UiState::Success((0..10).collect())]);
        assert_eq!(controller.items().len(), 10);
        assert!(!controller.is_loading_more());
    }

    #[tokio::test]
    async fn test_launched_operations_complete() {
        let mut controller = PagedListController::new(Numbers::new(15), 0, 10);
        controller.launch_reset();
        controller.settle().await;
        controller.launch_load_more();
        controller.settle().await;
        assert_eq!(controller.items(), (0..15).collect::<Vec<_>>());
        assert!(!controller.has_more());
    }
}
