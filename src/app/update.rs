use crate::actions::Snippet;
use crate::app::model::{Focus, Model, Prompt, PromptKind, ResizeDrag, ToastLevel};
use crate::editor::{Direction, PendingOperator};
use crate::files::suggested_save_name;
use crate::pipeline::RenderOutput;
use crate::ui::layout::{clamp_editor_width, drag_editor_width};

/// Normal-mode commands of the vim key handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimCommand {
    /// `i`
    Insert,
    /// `a`
    Append,
    /// `A`
    AppendEnd,
    /// `I`
    InsertLineStart,
    /// `o`
    OpenBelow,
    /// `O`
    OpenAbove,
    /// `x`
    DeleteChar,
    /// `dd`
    DeleteLine,
    /// `0`
    LineStart,
    /// `^`
    FirstNonBlank,
    /// `gg`
    Top,
    /// `G`
    Bottom,
    /// First key of `dd` / `gg`
    Pending(PendingOperator),
    /// Esc in insert mode
    Normal,
}

/// All possible events and actions in the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Editing
    InsertChar(char),
    /// Bracketed paste
    InsertText(String),
    InsertSnippet(Snippet),
    DeleteBack,
    DeleteForward,
    SplitLine,
    MoveCursor(Direction),
    MoveHome,
    MoveEnd,
    MoveWordLeft,
    MoveWordRight,
    MoveToStart,
    MoveToEnd,
    /// Mouse click at (line, display column)
    MoveTo(usize, usize),
    EditorScrollUp(usize),
    EditorScrollDown(usize),
    Vim(VimCommand),

    // Preview
    PreviewScrollUp(usize),
    PreviewScrollDown(usize),
    /// Debounced render finished
    PreviewReady(RenderOutput),

    // Toolbar
    ToggleSnippetMenu,
    CloseSnippetMenu,
    ToggleTheme,
    ToggleVimMode,
    ToggleEditorCollapse,
    CopySheet,
    SwitchFocus,
    ToggleHelp,
    HideHelp,

    // Divider
    StartResize(u16),
    DragResize(u16),
    EndResize,

    // Files
    OpenPrompt(PromptKind),
    PromptInput(String),
    PromptSubmit(PromptKind, String),
    PromptCancel,
    Save,
    /// Sheet changed on disk
    FileChanged,

    // Window
    Resize(u16, u16),

    // Application
    Quit,
}

impl Message {
    /// Messages that change the buffer or move the cursor.
    const fn moves_cursor(&self) -> bool {
        matches!(
            self,
            Self::InsertChar(_)
                | Self::InsertText(_)
                | Self::InsertSnippet(_)
                | Self::DeleteBack
                | Self::DeleteForward
                | Self::SplitLine
                | Self::MoveCursor(_)
                | Self::MoveHome
                | Self::MoveEnd
                | Self::MoveWordLeft
                | Self::MoveWordRight
                | Self::MoveToStart
                | Self::MoveToEnd
                | Self::MoveTo(..)
                | Self::Vim(_)
        )
    }
}

/// Pure function that updates the model based on a message.
///
/// File, clipboard and storage work happens afterwards in the effects pass.
pub fn update(mut model: Model, msg: Message) -> Model {
    if !matches!(msg, Message::Quit | Message::Save) {
        model.quit_confirmed = false;
    }
    if !matches!(msg, Message::Vim(VimCommand::Pending(_))) {
        model.vim.pending = None;
    }
    let follow_cursor = msg.moves_cursor();

    match msg {
        Message::InsertChar(ch) => model.buffer.insert_char(ch),
        Message::InsertText(text) => model.buffer.insert_str(&text),
        Message::InsertSnippet(snippet) => {
            model.buffer.insert_str(snippet.text());
            model.snippet_menu_open = false;
            model.focus = Focus::Editor;
        }
        Message::DeleteBack => {
            model.buffer.delete_back();
        }
        Message::DeleteForward => {
            model.buffer.delete_forward();
        }
        Message::SplitLine => model.buffer.split_line(),
        Message::MoveCursor(direction) => model.buffer.move_cursor(direction),
        Message::MoveHome => model.buffer.move_home(),
        Message::MoveEnd => model.buffer.move_end(),
        Message::MoveWordLeft => model.buffer.move_word_left(),
        Message::MoveWordRight => model.buffer.move_word_right(),
        Message::MoveToStart => model.buffer.move_to_start(),
        Message::MoveToEnd => model.buffer.move_to_end(),
        Message::MoveTo(line, display_col) => {
            model.buffer.move_to_display(line, display_col);
            model.focus = Focus::Editor;
        }
        Message::EditorScrollUp(n) => {
            model.editor_scroll = model.editor_scroll.saturating_sub(n);
        }
        Message::EditorScrollDown(n) => {
            let max = model.buffer.line_count().saturating_sub(1);
            model.editor_scroll = (model.editor_scroll + n).min(max);
        }
        Message::Vim(command) => apply_vim(&mut model, command),

        Message::PreviewScrollUp(n) => {
            model.preview_scroll = model.preview_scroll.saturating_sub(n);
        }
        Message::PreviewScrollDown(n) => {
            model.preview_scroll = model.preview_scroll.saturating_add(n);
        }
        Message::PreviewReady(output) => {
            model.render_generation = output.generation;
            model.html = output.html;
            model.preview = Some(output.song);
        }

        Message::ToggleSnippetMenu => model.snippet_menu_open = !model.snippet_menu_open,
        Message::CloseSnippetMenu => model.snippet_menu_open = false,
        Message::ToggleVimMode => model.vim.toggle(),
        Message::ToggleEditorCollapse => {
            model.editor_collapsed = !model.editor_collapsed;
            model.resize_drag = None;
            model.focus = if model.editor_collapsed {
                Focus::Preview
            } else {
                Focus::Editor
            };
        }
        Message::SwitchFocus => {
            model.focus = match model.focus {
                Focus::Editor => Focus::Preview,
                Focus::Preview if model.editor_collapsed => Focus::Preview,
                Focus::Preview => Focus::Editor,
            };
        }
        Message::ToggleHelp => model.help_visible = !model.help_visible,
        Message::HideHelp => model.help_visible = false,
        // Handled entirely by the effects pass.
        Message::ToggleTheme | Message::CopySheet | Message::FileChanged => {}

        Message::StartResize(x) => {
            if !model.editor_collapsed {
                model.resize_drag = Some(ResizeDrag {
                    start_width: clamp_editor_width(model.editor_width, model.size.0),
                    start_x: x,
                });
            }
        }
        Message::DragResize(x) => {
            if let Some(drag) = model.resize_drag {
                model.editor_width =
                    drag_editor_width(drag.start_width, drag.start_x, x, model.size.0);
            }
        }
        Message::EndResize => model.resize_drag = None,

        Message::OpenPrompt(kind) => {
            let input = match kind {
                PromptKind::Open => String::new(),
                PromptKind::Save => suggested_save_name(model.file_path.as_deref()),
            };
            model.snippet_menu_open = false;
            model.prompt = Some(Prompt { kind, input });
        }
        Message::PromptInput(input) => {
            if let Some(prompt) = &mut model.prompt {
                prompt.input = input;
            }
        }
        Message::PromptSubmit(..) | Message::PromptCancel => model.prompt = None,
        Message::Save => {
            if model.file_path.is_none() {
                model.prompt = Some(Prompt {
                    kind: PromptKind::Save,
                    input: suggested_save_name(None),
                });
            }
        }

        Message::Resize(width, height) => {
            model.size = (width, height);
            model.editor_width = clamp_editor_width(model.editor_width, width);
        }

        Message::Quit => {
            if model.is_dirty() && !model.quit_confirmed {
                model.show_toast(
                    ToastLevel::Warning,
                    "Unsaved changes! Press Ctrl+Q again to quit, or Ctrl+S to save",
                );
                model.quit_confirmed = true;
            } else {
                model.should_quit = true;
            }
        }
    }

    if follow_cursor {
        model.ensure_cursor_visible();
    }
    model
}

fn apply_vim(model: &mut Model, command: VimCommand) {
    if let VimCommand::Pending(operator) = command {
        model.vim.pending = Some(operator);
        return;
    }
    let buffer = &mut model.buffer;
    match command {
        VimCommand::Insert => {}
        VimCommand::Append => {
            if buffer.cursor().col < buffer.line_len(buffer.cursor().line) {
                buffer.move_cursor(Direction::Right);
            }
        }
        VimCommand::AppendEnd => buffer.move_end(),
        VimCommand::InsertLineStart => buffer.move_first_non_blank(),
        VimCommand::OpenBelow => buffer.open_line_below(),
        VimCommand::OpenAbove => buffer.open_line_above(),
        VimCommand::DeleteChar => {
            buffer.delete_under_cursor();
        }
        VimCommand::DeleteLine => buffer.delete_line(),
        VimCommand::LineStart => buffer.move_home(),
        VimCommand::FirstNonBlank => buffer.move_first_non_blank(),
        VimCommand::Top => buffer.move_to_start(),
        VimCommand::Bottom => {
            let last = buffer.line_count().saturating_sub(1);
            buffer.move_to(last, 0);
        }
        VimCommand::Normal => {
            model.vim.enter_normal();
            return;
        }
        VimCommand::Pending(_) => return,
    }
    if matches!(
        command,
        VimCommand::Insert
            | VimCommand::Append
            | VimCommand::AppendEnd
            | VimCommand::InsertLineStart
            | VimCommand::OpenBelow
            | VimCommand::OpenAbove
    ) {
        model.vim.enter_insert();
    }
}
