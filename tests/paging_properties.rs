//! Property tests for page accumulation over an arbitrary-length source.

use proptest::prelude::*;
use wallpapers::paging::{PageSource, PagedListController, UiState};
use wallpapers::source::SourceError;

/// `0..len` served in pages.
struct Range {
    len: u32,
}

impl PageSource for Range {
    type Item = u32;
    type Query = ();

    async fn fetch_page(&self, _query: &(), page: u32, page_size: u32) -> Result<Vec<u32>, SourceError> {
        let start = (page - 1).saturating_mul(page_size).min(self.len);
        let end = start.saturating_add(page_size).min(self.len);
        Ok((start..end).collect())
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn accumulated_items_are_a_source_prefix(len in 0u32..120, page_size in 1u32..25, loads in 1u32..10) {
        let items = runtime().block_on(async {
            let controller = PagedListController::new(Range { len }, (), page_size);
            controller.reset().await;
            for _ in 1..loads {
                controller.load_more().await;
            }
            controller.items()
        });

        let expected = len.min(loads * page_size);
        prop_assert_eq!(items, (0..expected).collect::<Vec<_>>());
    }

    #[test]
    fn has_more_clears_on_first_short_page(len in 0u32..120, page_size in 1u32..25) {
        let (has_more, pages, state) = runtime().block_on(async {
            let controller = PagedListController::new(Range { len }, (), page_size);
            controller.reset().await;
            let mut guard = 0;
            while controller.has_more() && guard < 200 {
                controller.load_more().await;
                guard += 1;
            }
            (controller.has_more(), controller.current_page(), controller.ui_state())
        });

        prop_assert!(!has_more);
        // An empty trailing page is fetched but not counted.
        prop_assert_eq!(pages, len.div_ceil(page_size).max(1));
        prop_assert_eq!(state, UiState::Success((0..len).collect::<Vec<_>>()));
    }
}
