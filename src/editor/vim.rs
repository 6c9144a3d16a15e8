/// Modal editing state for the optional vim key handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VimMode {
    #[default]
    Normal,
    Insert,
}

/// First key of a two-key normal-mode command (`dd`, `gg`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingOperator {
    Delete,
    Go,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VimState {
    pub enabled: bool,
    pub mode: VimMode,
    pub pending: Option<PendingOperator>,
}

impl VimState {
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled,
            mode: VimMode::Normal,
            pending: None,
        }
    }

    /// Keys are commands rather than text.
    pub fn is_normal(&self) -> bool {
        self.enabled && self.mode == VimMode::Normal
    }

    pub const fn toggle(&mut self) {
        self.enabled = !self.enabled;
        self.mode = VimMode::Normal;
        self.pending = None;
    }

    pub const fn enter_insert(&mut self) {
        self.mode = VimMode::Insert;
        self.pending = None;
    }

    pub const fn enter_normal(&mut self) {
        self.mode = VimMode::Normal;
        self.pending = None;
    }

    /// Status bar label; empty when vim mode is off.
    pub const fn label(&self) -> &'static str {
        match (self.enabled, self.mode) {
            (false, _) => "",
            (true, VimMode::Normal) => "NORMAL",
            (true, VimMode::Insert) => "INSERT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_state_is_never_normal() {
        let state = VimState::new(false);
        assert!(!state.is_normal());
        assert_eq!(state.label(), "");
    }

    #[test]
    fn test_toggle_starts_in_normal_mode() {
        let mut state = VimState::new(false);
        state.toggle();
        assert!(state.is_normal());
        assert_eq!(state.label(), "NORMAL");
    }

    #[test]
    fn test_insert_and_back_clears_pending() {
        let mut state = VimState::new(true);
        state.pending = Some(PendingOperator::Delete);
        state.enter_insert();
        assert_eq!(state.pending, None);
        assert_eq!(state.label(), "INSERT");
        state.enter_normal();
        assert!(state.is_normal());
    }
}
