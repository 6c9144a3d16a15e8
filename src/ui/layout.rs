//! Screen layout: toolbar, editor and preview panes, footer rows.

use ratatui::layout::Rect;

/// Narrowest either pane may get while dragging the divider.
pub const MIN_PANE_WIDTH: u16 = 20;
pub const TOOLBAR_HEIGHT: u16 = 1;
pub const DIVIDER_WIDTH: u16 = 1;

/// Clamp an editor width to `[MIN_PANE_WIDTH, total - MIN_PANE_WIDTH]`.
///
/// Terminals too narrow for two minimum panes split evenly.
pub fn clamp_editor_width(width: u16, total: u16) -> u16 {
    let max = total.saturating_sub(MIN_PANE_WIDTH);
    if max < MIN_PANE_WIDTH {
        return total / 2;
    }
    width.clamp(MIN_PANE_WIDTH, max)
}

/// Editor width while dragging: `start_width + (x - start_x)`, clamped.
pub fn drag_editor_width(start_width: u16, start_x: u16, x: u16, total: u16) -> u16 {
    let width = i32::from(start_width) + i32::from(x) - i32::from(start_x);
    let width = u16::try_from(width.max(0)).unwrap_or(u16::MAX);
    clamp_editor_width(width, total)
}

pub fn default_editor_width(total: u16) -> u16 {
    clamp_editor_width(total / 2, total)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub toolbar: Rect,
    /// `None` while the editor is collapsed.
    pub editor: Option<Rect>,
    pub divider: Option<Rect>,
    pub preview: Rect,
    pub toast: Option<Rect>,
    pub status: Rect,
}

/// Split the screen. `editor_width` is clamped against the current width.
pub fn split_panes(
    area: Rect,
    editor_width: u16,
    collapsed: bool,
    toast_active: bool,
) -> PaneLayout {
    let footer_rows = 1 + u16::from(toast_active);
    let toolbar = Rect {
        height: TOOLBAR_HEIGHT.min(area.height),
        ..area
    };
    let body_y = area.y + toolbar.height;
    let body_height = area.height.saturating_sub(toolbar.height + footer_rows);
    let status = Rect {
        y: area.y + area.height.saturating_sub(1),
        height: area.height.min(1),
        ..area
    };
    let toast = toast_active.then(|| Rect {
        y: area.y + area.height.saturating_sub(2),
        height: 1,
        ..area
    });

    if collapsed {
        return PaneLayout {
            toolbar,
            editor: None,
            divider: None,
            preview: Rect::new(area.x, body_y, area.width, body_height),
            toast,
            status,
        };
    }

    let editor_width = clamp_editor_width(editor_width, area.width);
    let divider_x = area.x + editor_width;
    let preview_x = (divider_x + DIVIDER_WIDTH).min(area.x + area.width);
    PaneLayout {
        toolbar,
        editor: Some(Rect::new(area.x, body_y, editor_width, body_height)),
        divider: Some(Rect::new(
            divider_x,
            body_y,
            DIVIDER_WIDTH.min(area.width.saturating_sub(editor_width)),
            body_height,
        )),
        preview: Rect::new(
            preview_x,
            body_y,
            (area.x + area.width).saturating_sub(preview_x),
            body_height,
        ),
        toast,
        status,
    }
}

pub const fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x + rect.width
        && row >= rect.y
        && row < rect.y + rect.height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_adds_mouse_delta() {
        assert_eq!(drag_editor_width(40, 40, 55, 120), 55);
        assert_eq!(drag_editor_width(40, 40, 30, 120), 30);
    }

    #[test]
    fn test_drag_clamps_to_minimum_panes() {
        assert_eq!(drag_editor_width(40, 40, 0, 120), MIN_PANE_WIDTH);
        assert_eq!(drag_editor_width(40, 40, 119, 120), 100);
        assert_eq!(drag_editor_width(40, 10, 0, 120), 30);
    }

    #[test]
    fn test_narrow_terminal_splits_evenly() {
        assert_eq!(clamp_editor_width(5, 30), 15);
        assert_eq!(clamp_editor_width(25, 30), 15);
    }

    #[test]
    fn test_split_panes_leaves_room_for_divider_and_footer() {
        let layout = split_panes(Rect::new(0, 0, 100, 30), 40, false, true);
        let editor = layout.editor.unwrap();
        let divider = layout.divider.unwrap();
        assert_eq!(layout.toolbar, Rect::new(0, 0, 100, 1));
        assert_eq!(editor, Rect::new(0, 1, 40, 27));
        assert_eq!(divider, Rect::new(40, 1, 1, 27));
        assert_eq!(layout.preview, Rect::new(41, 1, 59, 27));
        assert_eq!(layout.toast, Some(Rect::new(0, 28, 100, 1)));
        assert_eq!(layout.status, Rect::new(0, 29, 100, 1));
    }

    #[test]
    fn test_collapsed_editor_gives_preview_full_width() {
        let layout = split_panes(Rect::new(0, 0, 80, 24), 40, true, false);
        assert_eq!(layout.editor, None);
        assert_eq!(layout.divider, None);
        assert_eq!(layout.preview, Rect::new(0, 1, 80, 22));
    }

    #[test]
    fn test_contains_excludes_far_edges() {
        let rect = Rect::new(2, 3, 4, 5);
        assert!(contains(rect, 2, 3));
        assert!(contains(rect, 5, 7));
        assert!(!contains(rect, 6, 7));
        assert!(!contains(rect, 5, 8));
    }
}
