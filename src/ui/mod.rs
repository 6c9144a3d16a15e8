//! Terminal UI components.
//!
//! - [`layout`]: Toolbar, editor, divider and preview rectangles
//! - [`preview`]: The chord grid shown in the preview pane
//! - [`style`]: Light and dark palettes

pub mod layout;
pub mod preview;
pub mod style;

mod overlays;
mod render;
mod status;

pub use render::{editor_gutter_width, editor_hscroll, line_number_width, render};
pub use status::toolbar_message_at;
