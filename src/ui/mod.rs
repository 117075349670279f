//! Plain-text rendering for each page.
//!
//! Renderers return `String`s; printing is left to the caller.

pub mod format;
pub mod views;
