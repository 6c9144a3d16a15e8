//! ABC notation blocks and the SVG renderers that replace them.

use std::io::Write;
use std::process::{Command, Stdio};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use thiserror::Error;

use super::escape_html;

/// Opening tag of an embedded ABC block.
pub const ABC_SCRIPT_OPEN: &str = "<script type=\"text/vnd.abc\">";
/// Replacement for a block the renderer could not handle.
pub const RENDER_ERROR_HTML: &str = "<pre>Error rendering svg</pre>";

static ABC_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script type="text/vnd\.abc"[^>]*>(.*?)</script>"#)
        .expect("abc script pattern")
});

/// Settings for a full-width ABC block.
pub fn full_width_preamble() -> &'static str {
    "%%topspace 0\n\
     %%musicfont\n\
     %%pagewidth 700px\n\
     %%scale 1.1\n\
     %%topmargin      0px\n\
     %%botmargin      0px\n\
     %%leftmargin     0px\n\
     %%rightmargin    0px\n\
     %%titlespace     0px\n"
}

/// Settings for an ABC snippet inside a bar: no staff, no clef, all notes on one line.
pub fn inline_preamble(default_length: &str) -> String {
    format!(
        "%%topspace 0\n\
         %%musicfont\n\
         %%pagewidth 300px\n\
         %%scale 1.1\n\
         %%topmargin      0px\n\
         %%botmargin      0px\n\
         %%leftmargin     20px\n\
         %%rightmargin    0px\n\
         %%titlespace     0px\n\
         %%map all2A * print=F\n\
         X:1\n\
         M:none\n\
         L:{default_length}\n\
         K:none clef=none stafflines=0 stem=up\n\
         %%voicemap all2A\n"
    )
}

#[derive(Debug, Error)]
pub enum AbcError {
    #[error("no ABC render command configured")]
    NoCommand,
    #[error("failed to run ABC renderer `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("ABC renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("ABC renderer produced invalid UTF-8")]
    InvalidOutput(#[from] std::string::FromUtf8Error),
}

/// Turns ABC notation into SVG markup.
pub trait AbcRenderer {
    /// # Errors
    /// Returns an [`AbcError`] when the notation cannot be rendered.
    fn render_svg(&self, abc: &str) -> Result<String, AbcError>;
}

/// Pipes ABC into an external program and reads SVG from its stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRenderer {
    program: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a command line such as `abcm2ps -g -O - -` on whitespace.
    ///
    /// # Errors
    /// Returns [`AbcError::NoCommand`] for a blank command line.
    pub fn from_command_line(command: &str) -> Result<Self, AbcError> {
        let mut words = command.split_whitespace().map(ToOwned::to_owned);
        let program = words.next().ok_or(AbcError::NoCommand)?;
        Ok(Self::new(program, words.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl AbcRenderer for CommandRenderer {
    fn render_svg(&self, abc: &str) -> Result<String, AbcError> {
        let _scope = crate::perf::scope("abc.render_svg");
        let spawn_error = |source| AbcError::Spawn {
            program: self.program.clone(),
            source,
        };
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error)?;
        let stdin = child.stdin.take();
        // stdin is fed from its own thread so a renderer that streams output
        // before reading all of its input cannot fill both pipes.
        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => match stdin.write_all(abc.as_bytes()) {
                    Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => Err(err),
                    _ => Ok(()),
                },
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(std::io::Error::other("stdin writer panicked")));
            (written, output)
        });
        let output = output.map_err(spawn_error)?;
        written.map_err(spawn_error)?;
        if !output.status.success() {
            return Err(AbcError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let svg = String::from_utf8(output.stdout)?;
        // Some abc2svg front ends print "undefined" ahead of the markup.
        Ok(svg
            .trim_start()
            .strip_prefix("undefined")
            .unwrap_or(svg.trim_start())
            .to_string())
    }
}

/// Keeps the notation visible as preformatted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaceholderRenderer;

impl AbcRenderer for PlaceholderRenderer {
    fn render_svg(&self, abc: &str) -> Result<String, AbcError> {
        Ok(format!("<pre class=\"abc\">{}</pre>", escape_html(abc)))
    }
}

/// Build the renderer for an optional `--abc-command`.
///
/// # Errors
/// Returns [`AbcError::NoCommand`] for a blank command line.
pub fn renderer_for(command: Option<&str>) -> Result<Box<dyn AbcRenderer>, AbcError> {
    match command {
        Some(command) => Ok(Box::new(CommandRenderer::from_command_line(command)?)),
        None => Ok(Box::new(PlaceholderRenderer)),
    }
}

/// Number of ABC blocks in an HTML fragment.
pub fn count_abc_scripts(html: &str) -> usize {
    ABC_SCRIPT.find_iter(html).count()
}

/// Replace every ABC script block with the SVG the renderer returns.
pub fn substitute_abc_scripts(html: &str, renderer: &dyn AbcRenderer) -> String {
    ABC_SCRIPT
        .replace_all(html, |caps: &Captures<'_>| {
            let abc = caps.get(1).map_or("", |m| m.as_str()).trim();
            match renderer.render_svg(abc) {
                Ok(svg) => svg,
                Err(err) => {
                    tracing::warn!("ABC render failed: {err}");
                    crate::perf::log_event("abc.error", err.to_string());
                    RENDER_ERROR_HTML.to_string()
                }
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    struct Recording {
        calls: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl AbcRenderer for Recording {
        fn render_svg(&self, abc: &str) -> Result<String, AbcError> {
            self.calls.borrow_mut().push(abc.to_string());
            if self.fail_on.is_some_and(|needle| abc.contains(needle)) {
                return Err(AbcError::Failed {
                    status: "exit status: 1".into(),
                    stderr: "bad".into(),
                });
            }
            Ok(format!("<svg>{}</svg>", abc.len()))
        }
    }

    #[test]
    fn test_inline_preamble_carries_default_length() {
        let preamble = inline_preamble("1/8");
        assert!(preamble.contains("L:1/8\n"));
        assert!(preamble.contains("%%pagewidth 300px"));
        assert!(preamble.contains("K:none clef=none stafflines=0 stem=up"));
        assert!(preamble.ends_with("%%voicemap all2A\n"));
    }

    #[test]
    fn test_full_width_preamble_settings() {
        let preamble = full_width_preamble();
        assert!(preamble.starts_with("%%topspace 0\n"));
        assert!(preamble.contains("%%pagewidth 700px"));
        assert!(!preamble.contains("clef"));
    }

    #[test]
    fn test_each_script_block_is_rendered_once() {
        let html = format!(
            "<div>{ABC_SCRIPT_OPEN}\nabc\n</script></div><p>x</p>{ABC_SCRIPT_OPEN}de</script>"
        );
        let renderer = Recording {
            calls: RefCell::new(Vec::new()),
            fail_on: None,
        };
        let out = substitute_abc_scripts(&html, &renderer);
        assert_eq!(out, "<div><svg>3</svg></div><p>x</p><svg>2</svg>");
        assert_eq!(*renderer.calls.borrow(), vec!["abc", "de"]);
    }

    #[test]
    fn test_failed_block_becomes_error_markup() {
        let html = format!("{ABC_SCRIPT_OPEN}good</script>{ABC_SCRIPT_OPEN}bad</script>");
        let renderer = Recording {
            calls: RefCell::new(Vec::new()),
            fail_on: Some("bad"),
        };
        let out = substitute_abc_scripts(&html, &renderer);
        assert_eq!(out, format!("<svg>4</svg>{RENDER_ERROR_HTML}"));
    }

    #[test]
    fn test_html_without_scripts_is_unchanged() {
        let renderer = PlaceholderRenderer;
        let html = "<script>alert(1)</script><p>A</p>";
        assert_eq!(substitute_abc_scripts(html, &renderer), html);
        assert_eq!(count_abc_scripts(html), 0);
    }

    #[test]
    fn test_placeholder_escapes_notation() {
        let svg = PlaceholderRenderer.render_svg("K:C\nA<B").unwrap();
        assert_eq!(svg, "<pre class=\"abc\">K:C\nA&lt;B</pre>");
    }

    #[test]
    fn test_command_line_splitting() {
        let renderer = CommandRenderer::from_command_line("abcm2ps -g -O -").unwrap();
        assert_eq!(renderer.program(), "abcm2ps");
        assert!(matches!(
            CommandRenderer::from_command_line("   "),
            Err(AbcError::NoCommand)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_pipes_through_program() {
        let renderer = CommandRenderer::new("cat", Vec::new());
        assert_eq!(renderer.render_svg("<svg/>").unwrap(), "<svg/>");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_strips_undefined_prefix() {
        let renderer = CommandRenderer::new("cat", Vec::new());
        assert_eq!(renderer.render_svg("undefined<svg/>").unwrap(), "<svg/>");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_handles_output_larger_than_pipe_buffer() {
        let input = "A".repeat(1 << 20);
        let (tx, rx) = std::sync::mpsc::channel();
        let expected = input.clone();
        std::thread::spawn(move || {
            let renderer = CommandRenderer::new("cat", Vec::new());
            let _ = tx.send(renderer.render_svg(&input).map(|svg| svg.len()));
        });
        let rendered = rx
            .recv_timeout(std::time::Duration::from_secs(10))
            .expect("renderer did not finish");
        assert_eq!(rendered.unwrap(), expected.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_renderer_reports_failure() {
        let renderer = CommandRenderer::new("false", Vec::new());
        assert!(matches!(
            renderer.render_svg("X:1"),
            Err(AbcError::Failed { .. })
        ));
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let renderer = CommandRenderer::new("lesheets-no-such-renderer", Vec::new());
        assert!(matches!(
            renderer.render_svg("X:1"),
            Err(AbcError::Spawn { .. })
        ));
    }
}
