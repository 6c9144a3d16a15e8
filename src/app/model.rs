use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::editor::{EditorBuffer, VimState};
use crate::sheet::{ParseError, Song};
use crate::theme::Theme;
use crate::ui::layout::{PaneLayout, default_editor_width, split_panes};

/// How long a toast stays on screen.
const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Editor,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Open,
    Save,
}

impl PromptKind {
    pub const fn title(self) -> &'static str {
        match self {
            Self::Open => "Open sheet",
            Self::Save => "Save sheet as",
        }
    }
}

/// A one-line filename prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// Divider drag in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDrag {
    pub start_width: u16,
    pub start_x: u16,
}

/// The complete application state.
///
/// All state lives here - no global or scattered state. Storage, the render
/// pipeline and the file watcher belong to the event loop.
pub struct Model {
    /// Sheet being edited, `None` until first saved or opened
    pub file_path: Option<PathBuf>,
    pub buffer: EditorBuffer,
    /// Line index of the first visible editor line
    pub editor_scroll: usize,
    /// Latest render; `None` before the first one finishes
    pub preview: Option<Result<Song, ParseError>>,
    pub preview_scroll: usize,
    /// HTML of the latest render, ABC already substituted
    pub html: String,
    pub render_generation: u64,
    pub theme: Theme,
    pub vim: VimState,
    /// Requested editor width; clamped against the terminal when laid out
    pub editor_width: u16,
    pub editor_collapsed: bool,
    pub resize_drag: Option<ResizeDrag>,
    pub snippet_menu_open: bool,
    pub prompt: Option<Prompt>,
    pub help_visible: bool,
    pub focus: Focus,
    /// Terminal size (columns, rows)
    pub size: (u16, u16),
    /// Global config path shown in help
    pub config_global_path: Option<PathBuf>,
    /// Local override path shown in help
    pub config_local_path: Option<PathBuf>,
    toast: Option<Toast>,
    /// Whether the app should quit
    pub should_quit: bool,
    /// Set after a first quit attempt with unsaved changes
    pub quit_confirmed: bool,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("file_path", &self.file_path)
            .field("theme", &self.theme)
            .field("vim", &self.vim)
            .field("editor_width", &self.editor_width)
            .field("editor_collapsed", &self.editor_collapsed)
            .field("render_generation", &self.render_generation)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(file_path: Option<PathBuf>, text: &str, terminal_size: (u16, u16)) -> Self {
        Self {
            file_path,
            buffer: EditorBuffer::from_text(text),
            editor_scroll: 0,
            preview: None,
            preview_scroll: 0,
            html: String::new(),
            render_generation: 0,
            theme: Theme::default(),
            vim: VimState::default(),
            editor_width: default_editor_width(terminal_size.0),
            editor_collapsed: false,
            resize_drag: None,
            snippet_menu_open: false,
            prompt: None,
            help_visible: false,
            focus: Focus::Editor,
            size: terminal_size,
            config_global_path: None,
            config_local_path: None,
            toast: None,
            should_quit: false,
            quit_confirmed: false,
        }
    }

    #[must_use]
    pub const fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    #[must_use]
    pub const fn with_vim(mut self, enabled: bool) -> Self {
        self.vim = VimState::new(enabled);
        self
    }

    pub fn layout(&self) -> PaneLayout {
        let area = ratatui::layout::Rect::new(0, 0, self.size.0, self.size.1);
        split_panes(
            area,
            self.editor_width,
            self.editor_collapsed,
            self.active_toast().is_some(),
        )
    }

    /// Rows of text the editor pane shows.
    pub fn editor_rows(&self) -> usize {
        self.layout()
            .editor
            .map_or(0, |rect| usize::from(rect.height))
    }

    pub fn preview_rows(&self) -> usize {
        usize::from(self.layout().preview.height)
    }

    pub fn file_name(&self) -> String {
        self.file_path
            .as_deref()
            .and_then(Path::file_name)
            .map_or_else(|| "untitled".to_string(), |s| s.to_string_lossy().to_string())
    }

    /// Unsaved changes relative to the file on disk.
    pub const fn is_dirty(&self) -> bool {
        self.buffer.is_dirty()
    }

    pub fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + TOAST_DURATION,
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    /// Keep the cursor line inside the editor viewport.
    pub(super) fn ensure_cursor_visible(&mut self) {
        let cursor_line = self.buffer.cursor().line;
        let visible = self.editor_rows();
        if visible == 0 {
            self.editor_scroll = cursor_line;
            return;
        }
        if cursor_line < self.editor_scroll {
            self.editor_scroll = cursor_line;
        } else if cursor_line >= self.editor_scroll + visible {
            self.editor_scroll = cursor_line + 1 - visible;
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(None, "", (80, 24))
    }
}
