use super::DisplaySurface;
use crate::render::DisplayEvent;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const PLACEHOLDER_HTML: &str = "<p>Thinking...</p>";

const STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif;
            line-height: 1.6;
            padding: 1em;
        }
        code {
            background-color: rgba(0,0,0,0.2);
            padding: 0.2em 0.4em;
            border-radius: 3px;
            font-family: 'Courier New', Courier, monospace;
        }
        pre {
            background-color: rgba(0,0,0,0.2);
            padding: 1em;
            border-radius: 5px;
            white-space: pre-wrap;
            word-wrap: break-word;
        }
        .cursor {
            display: inline-block;
            width: 10px;
            height: 1.2em;
            background-color: currentColor;
            animation: blink 1s step-end infinite;
        }
        @keyframes blink {
            50% { background-color: transparent; }
        }
        .error {
            margin-top: 1em;
            padding: 0.5em 1em;
            border-left: 4px solid #c33;
        }
"#;

/// Full HTML document for the panel.
///
/// While `typing`, the page shows a blinking cursor and asks the viewer to
/// reload every second.
pub fn page(title: &str, body_html: &str, typing: bool, error: Option<&str>) -> String {
    let title = escape_html(title);
    let refresh = if typing {
        "\n    <meta http-equiv=\"refresh\" content=\"1\">"
    } else {
        ""
    };
    let cursor = if typing {
        "\n    <span id=\"cursor\" class=\"cursor\"></span>"
    } else {
        ""
    };
    let error = match error {
        Some(msg) => format!("\n    <div class=\"error\">{}</div>", escape_html(msg)),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">{refresh}
    <title>{title}</title>
    <style>{STYLE}    </style>
</head>
<body>
    <div id="response">{body_html}</div>{cursor}{error}
</body>
</html>
"#
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// An HTML page on disk that a browser or editor preview can watch.
#[derive(Debug)]
pub struct PanelFile {
    path: PathBuf,
    title: String,
    body: String,
}

impl PanelFile {
    /// Create the page with its "Thinking..." placeholder.
    pub fn create(path: impl Into<PathBuf>, title: impl Into<String>) -> anyhow::Result<Self> {
        let panel = Self {
            path: path.into(),
            title: title.into(),
            body: PLACEHOLDER_HTML.to_string(),
        };
        panel.write(true, None)?;
        tracing::info!(path = %panel.path.display(), "panel created");
        Ok(panel)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, typing: bool, error: Option<&str>) -> anyhow::Result<()> {
        write_atomic(&self.path, &page(&self.title, &self.body, typing, error))
    }
}

impl DisplaySurface for PanelFile {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()> {
        match event {
            DisplayEvent::Update { rendered_markup } => {
                self.body.clone_from(rendered_markup);
                self.write(true, None)
            }
            DisplayEvent::Complete => self.write(false, None),
            DisplayEvent::Error { message } => self.write(false, Some(message.as_str())),
        }
    }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create panel directory: {}", dir.display()))?;

    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents)
        .with_context(|| format!("failed to write temp panel: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move panel into place: {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "panel.html".to_string());
    p.set_file_name(format!(".{file}.tmp"));
    p
}
