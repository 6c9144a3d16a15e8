//! Sheet text editing.
//!
//! A rope-backed buffer with cursor management plus the optional modal
//! (vim-style) key state.

mod buffer;
mod vim;

pub use buffer::{Cursor, Direction, EditorBuffer};
pub use vim::{PendingOperator, VimMode, VimState};
