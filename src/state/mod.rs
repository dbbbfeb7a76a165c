//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageCursor`: the pagination position of one category's listing walk
//! - `WalkState`: whether a category walk is still active or how it ended

mod cursor;
mod walk_state;

// Re-export main types
pub use cursor::PageCursor;
pub use walk_state::WalkState;
