use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app::{App, Message, Model, PromptKind, ToastLevel};
use crate::pipeline::RenderPipeline;
use crate::storage::Storage;
use crate::watcher::SheetWatcher;

/// Everything with side effects that the pure update cannot touch.
pub(super) struct Services {
    pub(super) storage: Storage,
    pub(super) pipeline: RenderPipeline,
    pub(super) watcher: Option<SheetWatcher>,
    pub(super) watch_debounce: Duration,
    /// HTML page rewritten after every render
    pub(super) preview_page: Option<PathBuf>,
}

impl Services {
    pub(super) const fn new(
        storage: Storage,
        pipeline: RenderPipeline,
        watch_debounce: Duration,
    ) -> Self {
        Self {
            storage,
            pipeline,
            watcher: None,
            watch_debounce,
            preview_page: None,
        }
    }

    pub(super) fn with_preview_page(mut self, path: Option<PathBuf>) -> Self {
        self.preview_page = path;
        self
    }

    /// Watch `path` for external changes, replacing any previous watcher.
    pub(super) fn rewatch(&mut self, model: &mut Model, path: Option<&Path>) {
        self.watcher = None;
        let Some(path) = path else {
            return;
        };
        if !path.exists() {
            return;
        }
        match SheetWatcher::new(&[path], self.watch_debounce) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(err) => {
                model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                crate::perf::log_event(
                    "watcher.error",
                    format!("failed path={} err={err}", path.display()),
                );
            }
        }
    }

    pub(super) fn take_file_changed(&mut self) -> bool {
        self.watcher
            .as_mut()
            .is_some_and(|watcher| !watcher.take_changed().is_empty())
    }
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

impl App {
    pub(super) fn handle_message_side_effects(
        model: &mut Model,
        services: &mut Services,
        msg: &Message,
    ) {
        match msg {
            Message::Save => {
                if let Some(path) = model.file_path.clone() {
                    Self::save_to(model, &path);
                }
            }
            Message::PromptSubmit(PromptKind::Save, answer) => {
                let Some(path) = crate::files::resolve_prompt_path(answer) else {
                    model.show_toast(ToastLevel::Info, "Save cancelled");
                    return;
                };
                if Self::save_to(model, &path) {
                    services.pipeline.set_source_file(&display_name(&path));
                    services.rewatch(model, Some(path.as_path()));
                    model.file_path = Some(path);
                }
            }
            Message::PromptSubmit(PromptKind::Open, answer) => {
                let Some(path) = crate::files::resolve_prompt_path(answer) else {
                    model.show_toast(ToastLevel::Info, "Open cancelled");
                    return;
                };
                match crate::files::open_sheet(&path) {
                    Ok(text) => {
                        model.buffer.replace_text(&text);
                        model.buffer.move_to_start();
                        model.buffer.mark_clean();
                        model.editor_scroll = 0;
                        model.preview_scroll = 0;
                        services.pipeline.set_source_file(&display_name(&path));
                        services.rewatch(model, Some(path.as_path()));
                        model.show_toast(
                            ToastLevel::Info,
                            format!("Opened {}", display_name(&path)),
                        );
                        model.file_path = Some(path);
                    }
                    Err(err) => {
                        model.show_toast(ToastLevel::Error, format!("Open failed: {err:#}"));
                    }
                }
            }
            Message::ToggleTheme => {
                model.theme = crate::theme::toggle_theme(model.theme, &mut services.storage);
            }
            Message::ToggleVimMode => {
                if let Err(err) = services.storage.set_vim_mode(model.vim.enabled) {
                    tracing::warn!("Failed to store vim mode: {err}");
                }
                let state = if model.vim.enabled { "on" } else { "off" };
                model.show_toast(ToastLevel::Info, format!("Vim mode {state}"));
            }
            Message::CopySheet => match crate::actions::copy_to_clipboard(&model.buffer.text()) {
                Ok(()) => model.show_toast(ToastLevel::Info, "Copied sheet to clipboard"),
                Err(err) => model.show_toast(ToastLevel::Error, format!("Copy failed: {err:#}")),
            },
            Message::FileChanged => Self::reload_from_disk(model),
            Message::PreviewReady(_) => Self::publish_preview(model, services),
            _ => {}
        }
    }

    /// Write the buffer to `path`. Returns whether it succeeded.
    fn save_to(model: &mut Model, path: &Path) -> bool {
        match crate::files::save_sheet(path, &model.buffer.text()) {
            Ok(()) => {
                model.buffer.mark_clean();
                model.quit_confirmed = false;
                model.show_toast(ToastLevel::Info, format!("Saved {}", display_name(path)));
                true
            }
            Err(err) => {
                model.show_toast(ToastLevel::Error, format!("Save failed: {err:#}"));
                crate::perf::log_event(
                    "save.error",
                    format!("path={} err={err:#}", path.display()),
                );
                false
            }
        }
    }

    /// Write the latest render to the preview page, if one is configured.
    fn publish_preview(model: &mut Model, services: &Services) {
        let Some(path) = &services.preview_page else {
            return;
        };
        if let Err(err) = crate::files::save_sheet(path, &model.html) {
            model.show_toast(ToastLevel::Error, format!("Preview page failed: {err:#}"));
            crate::perf::log_event(
                "preview.error",
                format!("path={} err={err:#}", path.display()),
            );
        }
    }

    fn reload_from_disk(model: &mut Model) {
        let Some(path) = model.file_path.clone() else {
            return;
        };
        if model.is_dirty() {
            model.show_toast(
                ToastLevel::Warning,
                format!("{} changed on disk; save to overwrite", display_name(&path)),
            );
            return;
        }
        match crate::files::open_sheet(&path) {
            Ok(text) if text == model.buffer.text() => {}
            Ok(text) => {
                model.buffer.replace_text(&text);
                model.buffer.mark_clean();
                model.show_toast(ToastLevel::Info, "Reloaded from disk");
            }
            Err(err) => {
                model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
                crate::perf::log_event(
                    "reload.error",
                    format!("failed path={} err={err:#}", path.display()),
                );
            }
        }
    }
}
