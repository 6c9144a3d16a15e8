//! Toolbar actions: template snippets and clipboard copy.

use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use arboard::Clipboard;

#[cfg(target_os = "linux")]
use arboard::{LinuxClipboardKind, SetExtLinux};

/// Kept alive for the whole session: on X11 the copied text disappears
/// when its owning clipboard handle is dropped.
static CLIPBOARD: Mutex<Option<Clipboard>> = Mutex::new(None);

/// Text inserted at the cursor by a toolbar action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Snippet {
    Section,
    Header,
    Push,
    Hold,
    Fermata,
    Diamond,
    DiamondFermata,
    RepeatStart,
    RepeatEnd,
}

impl Snippet {
    /// Menu order.
    pub const ALL: [Self; 9] = [
        Self::Section,
        Self::Header,
        Self::Push,
        Self::Hold,
        Self::Fermata,
        Self::Diamond,
        Self::DiamondFermata,
        Self::RepeatStart,
        Self::RepeatEnd,
    ];

    pub const fn text(self) -> &'static str {
        match self {
            Self::Section => "# ",
            Self::Header => {
                "---\ntitle: Title\nsubtitle: Subtitle\ntempo: 123bpm\nkey: C\nL: 1/8\n---\n"
            }
            Self::Push => "!push!",
            Self::Hold => "!hold!",
            Self::Fermata => "!fermata!",
            Self::Diamond => "!diamond!",
            Self::DiamondFermata => "!diamond-fermata!",
            Self::RepeatStart => "||: ",
            Self::RepeatEnd => " :||",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Section => "Section",
            Self::Header => "Header",
            Self::Push => "Push",
            Self::Hold => "Hold",
            Self::Fermata => "Fermata",
            Self::Diamond => "Diamond",
            Self::DiamondFermata => "Diamond fermata",
            Self::RepeatStart => "Repeat start",
            Self::RepeatEnd => "Repeat end",
        }
    }

    /// Snippet bound to menu key `1`..`9`.
    pub fn from_menu_key(key: char) -> Option<Self> {
        let index = key.to_digit(10)?.checked_sub(1)?;
        Self::ALL.get(usize::try_from(index).ok()?).copied()
    }
}

/// Copy the sheet to the system clipboard.
///
/// # Errors
/// Fails for empty text or when no clipboard is reachable.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    if text.is_empty() {
        return Err(anyhow!("Nothing to copy"));
    }
    let mut guard = CLIPBOARD
        .lock()
        .map_err(|err| anyhow!("Clipboard lock poisoned: {err}"))?;
    if guard.is_none() {
        *guard = Some(Clipboard::new().context("Clipboard unavailable")?);
    }
    let clipboard = guard
        .as_mut()
        .ok_or_else(|| anyhow!("Clipboard unavailable"))?;

    #[cfg(target_os = "linux")]
    clipboard
        .set()
        .clipboard(LinuxClipboardKind::Clipboard)
        .text(text.to_string())
        .context("Failed to set clipboard text")?;

    #[cfg(not(target_os = "linux"))]
    clipboard
        .set_text(text)
        .context("Failed to set clipboard text")?;

    Ok(())
}
