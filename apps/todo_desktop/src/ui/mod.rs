//! UI layer for the desktop client: sign-in view, list view and alert modal.

pub mod app;

pub use app::{TodoApp, APP_TITLE};
