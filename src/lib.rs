//! Core of a paged wallpaper catalog browser: data sources, paging
//! controllers, and download/apply actions.

pub mod action;
pub mod config;
pub mod model;
pub mod paging;
pub mod source;

mod task;
