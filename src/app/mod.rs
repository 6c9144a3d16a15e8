//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{Focus, Model, Prompt, PromptKind, ResizeDrag, ToastLevel};
pub use update::{Message, VimCommand, update};

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::ThemeMode;
use crate::html::{AbcRenderer, PlaceholderRenderer, RenderConfig, renderer_for};
use crate::pipeline::{LesheetConverter, RenderPipeline, clamp_delay_ms};
use crate::storage::Storage;

use effects::Services;

/// Debounce applied to change events for the open sheet.
const FILE_WATCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Main application struct that owns the terminal and runs the event loop.
#[derive(Debug, Default)]
pub struct App {
    file_path: Option<PathBuf>,
    theme_mode: ThemeMode,
    force_vim: bool,
    abc_command: Option<String>,
    debounce_ms: Option<u64>,
    storage_path: Option<PathBuf>,
    preview_html: Option<PathBuf>,
    config_global_path: Option<PathBuf>,
    config_local_path: Option<PathBuf>,
}

impl App {
    /// Create an application editing `file_path`, or the stored buffer when `None`.
    pub fn new(file_path: Option<PathBuf>) -> Self {
        Self {
            file_path,
            ..Self::default()
        }
    }

    pub const fn with_theme_mode(mut self, mode: ThemeMode) -> Self {
        self.theme_mode = mode;
        self
    }

    /// Start in vim mode regardless of the stored preference.
    pub const fn with_vim(mut self, enabled: bool) -> Self {
        self.force_vim = enabled;
        self
    }

    /// Shell command that turns ABC on stdin into SVG on stdout.
    pub fn with_abc_command(mut self, command: Option<String>) -> Self {
        self.abc_command = command;
        self
    }

    /// Idle delay before a render; clamped to the supported range.
    pub const fn with_debounce_ms(mut self, delay: Option<u64>) -> Self {
        self.debounce_ms = delay;
        self
    }

    pub fn with_storage_path(mut self, path: Option<PathBuf>) -> Self {
        self.storage_path = path;
        self
    }

    /// Keep an HTML page of the preview current; it reloads itself in a browser.
    pub fn with_preview_html(mut self, path: Option<PathBuf>) -> Self {
        self.preview_html = path;
        self
    }

    /// Set config paths to show in help.
    pub fn with_config_paths(
        mut self,
        global_path: Option<PathBuf>,
        local_path: Option<PathBuf>,
    ) -> Self {
        self.config_global_path = global_path;
        self.config_local_path = local_path;
        self
    }

    fn open_storage(&self) -> Storage {
        let path = self
            .storage_path
            .clone()
            .unwrap_or_else(Storage::default_path);
        Storage::open_or_empty(path)
    }

    fn initial_text(&self, storage: &Storage) -> Result<String> {
        match &self.file_path {
            Some(path) if path.exists() => crate::files::open_sheet(path),
            // A new sheet; created on first save.
            Some(_) => Ok(String::new()),
            None => Ok(storage.load_code()),
        }
    }

    fn source_name(path: Option<&Path>) -> String {
        path.and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Build the services the event loop drives.
    ///
    /// Without a preview page the HTML is never shown, so ABC blocks stay as
    /// text instead of spawning the renderer on every render.
    fn build_services(&self, storage: Storage) -> Result<Services> {
        let renderer: Box<dyn AbcRenderer> = if self.preview_html.is_some() {
            renderer_for(self.abc_command.as_deref()).context("Invalid --abc-command")?
        } else {
            Box::new(PlaceholderRenderer)
        };
        let config = RenderConfig {
            live_reload: self.preview_html.is_some(),
            ..RenderConfig::page()
        };
        let converter =
            LesheetConverter::new(config, Self::source_name(self.file_path.as_deref()));
        let delay = Duration::from_millis(clamp_delay_ms(self.debounce_ms));
        let pipeline = RenderPipeline::new(delay, Box::new(converter), renderer);
        Ok(Services::new(storage, pipeline, FILE_WATCH_DEBOUNCE)
            .with_preview_page(self.preview_html.clone()))
    }

    /// Run the editor until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the sheet cannot be read, the ABC command is
    /// malformed, or terminal I/O fails.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        let mut storage = self.open_storage();
        let text = self.initial_text(&storage)?;
        // Asks the terminal for its background, so it runs before raw mode.
        let theme = crate::theme::resolve_theme(
            &mut storage,
            self.theme_mode,
            crate::theme::detect_prefers_dark,
        );
        let vim = self.force_vim || storage.vim_mode();
        let mut services = self.build_services(storage)?;

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal - lesheets requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);

        let mut model = Model::new(self.file_path.clone(), &text, (size.width, size.height))
            .with_theme(theme)
            .with_vim(vim);
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);
        services.rewatch(&mut model, self.file_path.as_deref());

        // First preview without waiting for an edit.
        let output = services.pipeline.render_now(&text, &mut services.storage);
        Self::dispatch(&mut model, &mut services, Message::PreviewReady(output));

        let result = Self::event_loop(&mut terminal, &mut model, &mut services);

        ratatui::restore();

        result
    }
}
