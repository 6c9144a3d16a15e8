//! lesheets - a terminal editor and batch renderer for lesheet chord charts.
//!
//! # Usage
//!
//! ```bash
//! lesheets Song.lesheet
//! lesheets html -d output songs/*.nns
//! lesheets watch songs/blue.nns
//! lesheets --preview-html /tmp/preview.html Song.lesheet
//! lesheets --vim --theme dark --save
//! ```

use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use lesheets::app::App;
use lesheets::commands::{self, HtmlOptions};
use lesheets::config::{
    ConfigFlags, ThemeMode, clear_config_flags, global_config_path, load_config_flags,
    local_override_path, parse_flag_tokens, save_config_flags,
};
use lesheets::html::abc::renderer_for;
use lesheets::perf;
use lesheets::pipeline::clamp_delay_ms;

/// A terminal editor with live preview for lesheet chord charts
#[derive(Parser, Debug)]
#[command(name = "lesheets", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Sheet to edit; without one the last buffer is restored
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Force the light or dark theme
    #[arg(long, value_enum, global = true)]
    theme: Option<ThemeMode>,

    /// Start the editor in vim mode
    #[arg(long, global = true)]
    vim: bool,

    /// Shell command that reads ABC on stdin and writes SVG to stdout
    #[arg(long, value_name = "CMD", global = true)]
    abc_command: Option<String>,

    /// Key/value store used for the buffer and preferences
    #[arg(long, value_name = "PATH", global = true)]
    storage: Option<PathBuf>,

    /// Idle delay before re-rendering (100-200)
    #[arg(long, value_name = "MS", global = true)]
    debounce_ms: Option<u64>,

    /// Enable performance logging
    #[arg(long, global = true)]
    perf: bool,

    /// Write detailed render debug events to a file
    #[arg(long, value_name = "PATH", global = true)]
    render_debug_log: Option<PathBuf>,

    /// Keep an HTML page of the editor preview at PATH, reloading in a browser
    #[arg(long, value_name = "PATH", global = true)]
    preview_html: Option<PathBuf>,

    /// Save current command-line flags as defaults in the global config
    #[arg(long, global = true)]
    save: bool,

    /// Clear saved defaults in the global config
    #[arg(long, global = true)]
    clear: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Edit a sheet with live preview (the default)
    Edit {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
    /// Render sheets to HTML pages plus an index
    Html {
        /// Output directory
        #[arg(short = 'd', long = "output-dir", default_value = "output")]
        out_dir: PathBuf,
        /// Print the token stream of each file
        #[arg(short = 't', long = "tokens")]
        print_tokens: bool,
        /// Print the parsed document outline of each file
        #[arg(short = 'p', long = "print")]
        print_song: bool,
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the parsed document model as JSON
    Json {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
    /// Print canonical lesheet source
    Fmt {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-render HTML whenever a sheet changes
    Watch {
        /// Output directory
        #[arg(short = 'd', long = "output-dir", default_value = "output")]
        out_dir: PathBuf,
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("LESHEETS_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            "Failed to initialize render debug log {}: {err}",
            render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
        );
    }

    let debounce = Duration::from_millis(clamp_delay_ms(effective.debounce_ms));
    let preview_html = cli.preview_html;
    let mut out = stdout().lock();

    match cli.command {
        Some(Command::Html {
            out_dir,
            print_tokens,
            print_song,
            files,
        }) => {
            let renderer = renderer_for(effective.abc_command.as_deref())?;
            let options = HtmlOptions {
                out_dir,
                print_tokens,
                print_song,
            };
            let failures = commands::html_command(&files, &options, renderer.as_ref(), &mut out)?;
            if failures > 0 {
                anyhow::bail!("{failures} of {} sheets failed to render", files.len());
            }
            Ok(())
        }
        Some(Command::Json { files }) => commands::json_command(&files, &mut out),
        Some(Command::Fmt { files }) => commands::fmt_command(&files, &mut out),
        Some(Command::Watch { out_dir, files }) => {
            let renderer = renderer_for(effective.abc_command.as_deref())?;
            commands::watch_command(&files, &out_dir, debounce, renderer.as_ref(), &mut out)
        }
        Some(Command::Edit { file }) => {
            run_editor(file, preview_html, &effective, global_path, local_path)
        }
        None => run_editor(cli.file, preview_html, &effective, global_path, local_path),
    }
}

fn run_editor(
    file: Option<PathBuf>,
    preview_html: Option<PathBuf>,
    effective: &ConfigFlags,
    global_path: PathBuf,
    local_path: PathBuf,
) -> Result<()> {
    if let Some(dir) = file.as_ref().filter(|f| f.is_dir()) {
        anyhow::bail!("{} is a directory, not a sheet", dir.display());
    }

    let mut app = App::new(file)
        .with_theme_mode(effective.theme.unwrap_or_default())
        .with_vim(effective.vim)
        .with_abc_command(effective.abc_command.clone())
        .with_debounce_ms(effective.debounce_ms)
        .with_storage_path(effective.storage.clone())
        .with_preview_html(preview_html)
        .with_config_paths(
            Some(global_path),
            local_path.exists().then_some(local_path),
        );

    app.run().context("Application error")
}
