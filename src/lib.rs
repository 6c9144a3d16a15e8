// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. watcher::SheetWatcher)
    clippy::module_name_repetitions
)]

//! # lesheets
//!
//! An editor and batch renderer for lesheet chord charts.
//!
//! - A terminal editor with a live chord-grid preview, re-rendered after a
//!   short idle delay
//! - HTML pages with embedded ABC notation turned into SVG by a pluggable
//!   renderer
//! - `html`, `json`, `fmt` and `watch` batch commands
//!
//! ## Architecture
//!
//! The editor uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`sheet`]: Lexer, parser, document model, chord formatter, printer
//! - [`html`]: HTML pages and ABC substitution
//! - [`pipeline`]: Debounced edit-to-preview rendering
//! - [`app`]: Main application loop and state
//! - [`editor`]: Rope-backed text buffer and vim key state
//! - [`ui`]: Terminal UI components
//! - [`commands`]: Batch commands
//! - [`watcher`]: File watching

pub mod actions;
pub mod app;
pub mod commands;
pub mod config;
pub mod editor;
pub mod files;
pub mod html;
pub mod perf;
pub mod pipeline;
pub mod sheet;
pub mod storage;
pub mod theme;
pub mod ui;
pub mod watcher;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::sheet::{Song, parse};
}
