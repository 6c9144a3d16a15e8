//! Saved default flags.
//!
//! Config files hold one CLI flag per line, with its value after the first
//! whitespace (`--abc-command abcm2ps -g -O -`). `#` starts a comment line.
//! The global file is merged with `.lesheetsrc` in the working directory,
//! then with the flags given on the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub theme: Option<ThemeMode>,
    pub vim: bool,
    pub perf: bool,
    pub abc_command: Option<String>,
    pub storage: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub render_debug_log: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge with `other` taking precedence for valued options.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            theme: other.theme.or(self.theme),
            vim: self.vim || other.vim,
            perf: self.perf || other.perf,
            abc_command: other
                .abc_command
                .clone()
                .or_else(|| self.abc_command.clone()),
            storage: other.storage.clone().or_else(|| self.storage.clone()),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            render_debug_log: other
                .render_debug_log
                .clone()
                .or_else(|| self.render_debug_log.clone()),
        }
    }

    fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(theme) = self.theme {
            lines.push(format!("--theme {}", theme.as_str()));
        }
        if self.vim {
            lines.push("--vim".to_string());
        }
        if self.perf {
            lines.push("--perf".to_string());
        }
        if let Some(command) = &self.abc_command {
            lines.push(format!("--abc-command {command}"));
        }
        if let Some(path) = &self.storage {
            lines.push(format!("--storage {}", path.display()));
        }
        if let Some(ms) = self.debounce_ms {
            lines.push(format!("--debounce-ms {ms}"));
        }
        if let Some(path) = &self.render_debug_log {
            lines.push(format!("--render-debug-log {}", path.display()));
        }
        lines
    }
}

pub fn global_config_path() -> PathBuf {
    dirs::config_dir().map_or_else(local_override_path, |dir| {
        dir.join("lesheets").join("config")
    })
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".lesheetsrc")
}

/// Load flags from a config file. A missing file yields no flags.
///
/// # Errors
/// Fails if the file exists but cannot be read.
pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| match line.split_once(char::is_whitespace) {
            Some((flag, value)) => vec![flag.to_string(), value.trim().to_string()],
            None => vec![line.to_string()],
        })
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

/// # Errors
/// Fails if the directory or file cannot be written.
pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# lesheets defaults (saved with --save)".to_string()];
    lines.extend(flags.to_lines());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

/// # Errors
/// Fails if the file exists and cannot be removed.
pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick out the known global flags from raw arguments. Unknown tokens,
/// subcommands and file names are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        let (name, inline_value) = match token.split_once('=') {
            Some((name, value)) if name.starts_with("--") => (name, Some(value)),
            _ => (token, None),
        };
        let mut value = || {
            inline_value.map(ToOwned::to_owned).or_else(|| {
                let next = tokens.get(i + 1).cloned();
                if next.is_some() {
                    i += 1;
                }
                next
            })
        };
        match name {
            "--vim" => flags.vim = true,
            "--perf" => flags.perf = true,
            "--theme" => flags.theme = value().as_deref().and_then(ThemeMode::parse),
            "--abc-command" => flags.abc_command = value().filter(|v| !v.trim().is_empty()),
            "--storage" => flags.storage = value().map(PathBuf::from),
            "--debounce-ms" => flags.debounce_ms = value().and_then(|v| v.parse().ok()),
            "--render-debug-log" => flags.render_debug_log = value().map(PathBuf::from),
            _ => {}
        }
        i += 1;
    }
    flags
}
