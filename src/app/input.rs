use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;

use crate::actions::Snippet;
use crate::app::model::{Focus, Model, PromptKind};
use crate::app::update::{Message, VimCommand};
use crate::app::App;
use crate::editor::{Direction, PendingOperator};
use crate::ui::layout::contains;

/// Lines moved per mouse wheel notch.
const WHEEL_LINES: usize = 3;

impl App {
    pub(super) fn handle_event(event: Event, model: &Model) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => Self::handle_key(key, model),
            Event::Mouse(mouse) => Self::handle_mouse(mouse, model),
            Event::Paste(text) if Self::accepts_text(model) => Some(Message::InsertText(text)),
            Event::Resize(width, height) => Some(Message::Resize(width, height)),
            _ => None,
        }
    }

    fn accepts_text(model: &Model) -> bool {
        model.focus == Focus::Editor
            && !model.editor_collapsed
            && model.prompt.is_none()
            && !model.vim.is_normal()
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if model.help_visible {
            return Some(Message::HideHelp);
        }

        if let Some(prompt) = &model.prompt {
            return match key.code {
                KeyCode::Esc => Some(Message::PromptCancel),
                KeyCode::Enter => Some(Message::PromptSubmit(prompt.kind, prompt.input.clone())),
                KeyCode::Backspace => {
                    let mut next = prompt.input.clone();
                    next.pop();
                    Some(Message::PromptInput(next))
                }
                KeyCode::Char('c') if ctrl => Some(Message::PromptCancel),
                KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                    let mut next = prompt.input.clone();
                    next.push(c);
                    Some(Message::PromptInput(next))
                }
                _ => None,
            };
        }

        if model.snippet_menu_open {
            return match key.code {
                KeyCode::Char(c) => Snippet::from_menu_key(c)
                    .map(Message::InsertSnippet)
                    .or(Some(Message::CloseSnippetMenu)),
                _ => Some(Message::CloseSnippetMenu),
            };
        }

        // Toolbar shortcuts work in every mode.
        match key.code {
            KeyCode::Char('s') if ctrl => return Some(Message::Save),
            KeyCode::Char('o') if ctrl => return Some(Message::OpenPrompt(PromptKind::Open)),
            KeyCode::Char('q' | 'c') if ctrl => return Some(Message::Quit),
            KeyCode::Char('d') if ctrl => return Some(Message::ToggleTheme),
            KeyCode::Char('b') if ctrl => return Some(Message::ToggleEditorCollapse),
            KeyCode::Char('y') if ctrl => return Some(Message::CopySheet),
            KeyCode::Char('n') if ctrl => return Some(Message::ToggleSnippetMenu),
            KeyCode::F(1) => return Some(Message::ToggleHelp),
            KeyCode::F(2) => return Some(Message::ToggleVimMode),
            KeyCode::Tab => return Some(Message::SwitchFocus),
            _ => {}
        }

        if model.focus == Focus::Preview || model.editor_collapsed {
            let page = model.preview_rows().max(1);
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Some(Message::PreviewScrollDown(1)),
                KeyCode::Char('k') | KeyCode::Up => Some(Message::PreviewScrollUp(1)),
                KeyCode::PageDown | KeyCode::Char(' ') => Some(Message::PreviewScrollDown(page)),
                KeyCode::PageUp => Some(Message::PreviewScrollUp(page)),
                KeyCode::Char('g') | KeyCode::Home => Some(Message::PreviewScrollUp(usize::MAX)),
                KeyCode::Esc => Some(Message::SwitchFocus),
                _ => None,
            };
        }

        if model.vim.is_normal() {
            return Self::handle_vim_normal_key(key, model);
        }

        let page = model.editor_rows().max(1);
        match key.code {
            KeyCode::Esc if model.vim.enabled => Some(Message::Vim(VimCommand::Normal)),
            KeyCode::Enter => Some(Message::SplitLine),
            KeyCode::Backspace => Some(Message::DeleteBack),
            KeyCode::Delete => Some(Message::DeleteForward),
            KeyCode::Left if ctrl => Some(Message::MoveWordLeft),
            KeyCode::Right if ctrl => Some(Message::MoveWordRight),
            KeyCode::Left => Some(Message::MoveCursor(Direction::Left)),
            KeyCode::Right => Some(Message::MoveCursor(Direction::Right)),
            KeyCode::Up => Some(Message::MoveCursor(Direction::Up)),
            KeyCode::Down => Some(Message::MoveCursor(Direction::Down)),
            KeyCode::Home if ctrl => Some(Message::MoveToStart),
            KeyCode::End if ctrl => Some(Message::MoveToEnd),
            KeyCode::Home => Some(Message::MoveHome),
            KeyCode::End => Some(Message::MoveEnd),
            KeyCode::PageUp => Some(Message::EditorScrollUp(page)),
            KeyCode::PageDown => Some(Message::EditorScrollDown(page)),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                Some(Message::InsertChar(c))
            }
            _ => None,
        }
    }

    fn handle_vim_normal_key(key: KeyEvent, model: &Model) -> Option<Message> {
        let KeyCode::Char(c) = key.code else {
            return match key.code {
                KeyCode::Left => Some(Message::MoveCursor(Direction::Left)),
                KeyCode::Right => Some(Message::MoveCursor(Direction::Right)),
                KeyCode::Up => Some(Message::MoveCursor(Direction::Up)),
                KeyCode::Down => Some(Message::MoveCursor(Direction::Down)),
                KeyCode::Home => Some(Message::MoveHome),
                KeyCode::End => Some(Message::MoveEnd),
                _ => None,
            };
        };
        match (model.vim.pending, c) {
            (Some(PendingOperator::Delete), 'd') => {
                return Some(Message::Vim(VimCommand::DeleteLine));
            }
            (Some(PendingOperator::Go), 'g') => return Some(Message::Vim(VimCommand::Top)),
            _ => {}
        }
        let msg = match c {
            'h' => Message::MoveCursor(Direction::Left),
            'j' => Message::MoveCursor(Direction::Down),
            'k' => Message::MoveCursor(Direction::Up),
            'l' => Message::MoveCursor(Direction::Right),
            'w' => Message::MoveWordRight,
            'b' => Message::MoveWordLeft,
            '$' => Message::MoveEnd,
            '0' => Message::Vim(VimCommand::LineStart),
            '^' => Message::Vim(VimCommand::FirstNonBlank),
            'x' => Message::Vim(VimCommand::DeleteChar),
            'i' => Message::Vim(VimCommand::Insert),
            'a' => Message::Vim(VimCommand::Append),
            'A' => Message::Vim(VimCommand::AppendEnd),
            'I' => Message::Vim(VimCommand::InsertLineStart),
            'o' => Message::Vim(VimCommand::OpenBelow),
            'O' => Message::Vim(VimCommand::OpenAbove),
            'G' => Message::Vim(VimCommand::Bottom),
            'd' => Message::Vim(VimCommand::Pending(PendingOperator::Delete)),
            'g' => Message::Vim(VimCommand::Pending(PendingOperator::Go)),
            _ => return None,
        };
        Some(msg)
    }

    pub(super) fn view(model: &Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }

    pub(super) fn handle_mouse(mouse: MouseEvent, model: &Model) -> Option<Message> {
        if model.help_visible || model.prompt.is_some() || model.snippet_menu_open {
            return None;
        }
        let layout = model.layout();
        let (col, row) = (mouse.column, mouse.row);

        if model.resize_drag.is_some() {
            return match mouse.kind {
                MouseEventKind::Drag(MouseButton::Left) => Some(Message::DragResize(col)),
                MouseEventKind::Up(MouseButton::Left) => Some(Message::EndResize),
                _ => None,
            };
        }

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if contains(layout.toolbar, col, row) {
                    return crate::ui::toolbar_message_at(col);
                }
                if layout.divider.is_some_and(|divider| contains(divider, col, row)) {
                    return Some(Message::StartResize(col));
                }
                if let Some(editor) = layout.editor.filter(|rect| contains(*rect, col, row)) {
                    let gutter = crate::ui::editor_gutter_width(model.buffer.line_count());
                    let hscroll =
                        crate::ui::editor_hscroll(model, editor.width.saturating_sub(gutter));
                    let line = model.editor_scroll + usize::from(row - editor.y);
                    let display_col =
                        usize::from(col.saturating_sub(editor.x + gutter)) + usize::from(hscroll);
                    return Some(Message::MoveTo(line, display_col));
                }
                if contains(layout.preview, col, row) && model.focus == Focus::Editor {
                    return Some(Message::SwitchFocus);
                }
                None
            }
            MouseEventKind::ScrollDown | MouseEventKind::ScrollUp => {
                let down = matches!(mouse.kind, MouseEventKind::ScrollDown);
                if layout.editor.is_some_and(|rect| contains(rect, col, row)) {
                    Some(if down {
                        Message::EditorScrollDown(WHEEL_LINES)
                    } else {
                        Message::EditorScrollUp(WHEEL_LINES)
                    })
                } else if contains(layout.preview, col, row) {
                    Some(if down {
                        Message::PreviewScrollDown(WHEEL_LINES)
                    } else {
                        Message::PreviewScrollUp(WHEEL_LINES)
                    })
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}
