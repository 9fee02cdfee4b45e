use crate::cli::{Args, Command, Selection};
use crate::config::Config;
use crate::dispatch::ollama::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::dispatch::OllamaDispatcher;
use crate::paths;
use crate::prompt::{PromptRequest, Task, TaskTemplate};
use crate::render::{MarkdownHtml, Markup, Passthrough};
use crate::session::{self, SessionOutcome};
use crate::surface::{DisplaySurface, EventLines, PanelFile, SurfaceKind, Terminal};
use anyhow::Context;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncReadExt;

pub const CONNECT_HINT: &str = "Error connecting to CodeCapsule server. Is Ollama running?";

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Effective settings after flags, environment, and config are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub model: String,
    pub output: SurfaceKind,
    pub panel_path: PathBuf,
    pub raw: bool,
    pub connect_timeout: Duration,
}

impl Settings {
    /// Flag, then environment, then config file, then default.
    pub fn resolve(args: &Args, cfg: Option<&Config>) -> Self {
        Self::resolve_with(args, cfg, |key| std::env::var(key).ok())
    }

    pub fn resolve_with(
        args: &Args,
        cfg: Option<&Config>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let endpoint = args
            .endpoint
            .clone()
            .or_else(|| non_empty(env("OLLAMA_HOST")))
            .or_else(|| cfg.and_then(|c| c.endpoint.clone()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let model = args
            .model
            .clone()
            .or_else(|| non_empty(env("CODECAPSULE_MODEL")))
            .or_else(|| cfg.and_then(|c| c.model.clone()))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let output = args
            .output
            .or_else(|| cfg.and_then(|c| c.output))
            .unwrap_or_default();

        let panel_path = args
            .panel_path
            .clone()
            .or_else(|| cfg.and_then(|c| c.panel_path.clone()))
            .unwrap_or_else(paths::default_panel_path);

        let connect_timeout = cfg
            .and_then(|c| c.connect_timeout_secs)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT);

        Self {
            endpoint,
            model,
            output,
            panel_path,
            raw: args.raw,
            connect_timeout,
        }
    }

    /// HTML for surfaces that show markup, unless `--raw` was asked for.
    pub fn markup(&self) -> Box<dyn Markup + Send + Sync> {
        if self.raw || !self.output.wants_html() {
            Box::new(Passthrough)
        } else {
            Box::new(MarkdownHtml::default())
        }
    }
}

/// Template for `task`: `--template` first, then config, then built-in.
pub fn template_for(
    task: Task,
    flag: Option<&str>,
    cfg: Option<&Config>,
) -> anyhow::Result<TaskTemplate> {
    let override_text = flag.or_else(|| cfg.and_then(|c| c.templates.get(task)));
    Ok(TaskTemplate::resolve(task, override_text)?)
}

/// Selected text from args, a file, or piped stdin.
///
/// An interactive stdin with nothing piped counts as an empty selection.
pub async fn read_selection(sel: &Selection) -> anyhow::Result<String> {
    if !sel.text.is_empty() {
        return Ok(sel.text.join(" "));
    }

    if let Some(path) = &sel.file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read selection: {}", path.display()));
    }

    if std::io::stdin().is_terminal() {
        return Ok(String::new());
    }

    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read selection from stdin")?;
    Ok(buf)
}

pub fn build_http(settings: &Settings) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(settings.connect_timeout)
        .build()
        .context("failed to build HTTP client")
}

pub fn build_surface(
    settings: &Settings,
    task: Task,
) -> anyhow::Result<Box<dyn DisplaySurface + Send>> {
    match settings.output {
        SurfaceKind::Events => Ok(Box::new(EventLines::stdout())),
        SurfaceKind::Panel => {
            let panel = PanelFile::create(&settings.panel_path, task.title())?;
            Ok(Box::new(panel))
        }
        SurfaceKind::Terminal => Ok(Box::new(Terminal::stdio())),
    }
}

/// Run one task command.
pub async fn cmd_run(cmd: &Command, settings: &Settings, cfg: Option<&Config>) -> anyhow::Result<()> {
    let (task, selection, flag) = match cmd {
        Command::Explain(s) | Command::FindBugs(s) | Command::Refactor(s) | Command::Generate(s) => {
            (cmd.task(), s, None)
        }
        Command::Custom {
            template,
            selection,
        } => (cmd.task(), selection, template.as_deref()),
        Command::Templates => return cmd_templates(cfg),
    };
    let task = task.context("command has no task")?;

    let template = template_for(task, flag, cfg)?;
    let request = PromptRequest::new(template, read_selection(selection).await?);
    if request.is_empty() {
        tracing::info!(task = task.name(), "nothing selected");
        return Ok(());
    }

    let http = build_http(settings)?;
    let dispatcher = OllamaDispatcher::new(http, &settings.endpoint, settings.model.clone())?;
    tracing::debug!(url = %dispatcher.generate_url(), model = %settings.model, output = ?settings.output, "dispatching");

    let mut surface = build_surface(settings, task)?;
    let outcome = session::run_session(&dispatcher, &request, settings.markup(), &mut surface).await?;

    match outcome {
        SessionOutcome::Skipped | SessionOutcome::Completed { .. } => Ok(()),
        SessionOutcome::Failed { text, message } if text.is_empty() => {
            tracing::error!(endpoint = %settings.endpoint, "{CONNECT_HINT}");
            anyhow::bail!("{CONNECT_HINT} ({message})")
        }
        SessionOutcome::Failed { message, .. } => anyhow::bail!("response stream failed: {message}"),
    }
}

/// Print each task and the template it would use.
pub fn cmd_templates(cfg: Option<&Config>) -> anyhow::Result<()> {
    for task in Task::ALL {
        let override_text = cfg.and_then(|c| c.templates.get(task));
        let source = if override_text.is_some() { "config" } else { "built-in" };
        match TaskTemplate::resolve(task, override_text) {
            Ok(t) => println!("{} ({source}):\n{}\n", task.name(), t.as_str()),
            Err(e) => println!("{}: {e}\n", task.name()),
        }
    }
    Ok(())
}
