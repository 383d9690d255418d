//! Incremental, filterable, cancellable paging over a `DataSource`.

mod controller;
mod filter;
mod screens;
mod state;

pub use controller::{PageSource, PagedListController};
pub use filter::project_categories;
pub use screens::{CategoryPages, CategoryScreen, ImagePages, ImageQuery, ImageScreen};
pub use state::{StateCell, Subscription, UiState};
