use crate::prompt::Task;
use crate::surface::SurfaceKind;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// Ask a local model about the selected code and stream the answer.
#[derive(Debug, Parser)]
#[command(name = "codecapsule")]
#[command(version)]
#[command(about = "Ask a local LLM about selected code", long_about = None)]
pub struct Args {
    /// Model name (default: config/model or "gpt-oss:20b")
    #[arg(short = 'm', long = "model", global = true)]
    pub model: Option<String>,

    /// Inference server base URL (default: $OLLAMA_HOST, config/endpoint or http://localhost:11434)
    #[arg(long = "endpoint", global = true)]
    pub endpoint: Option<String>,

    /// Where to show the response
    #[arg(short = 'o', long = "output", value_enum, global = true)]
    pub output: Option<SurfaceKind>,

    /// HTML file written by `--output panel`
    #[arg(long = "panel-path", value_name = "FILE", global = true)]
    pub panel_path: Option<PathBuf>,

    /// Send the raw response text instead of rendered HTML
    #[arg(long = "raw", global = true)]
    pub raw: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Explain the selected code
    Explain(Selection),

    /// Review the selected code for bugs
    FindBugs(Selection),

    /// Refactor the selected code
    Refactor(Selection),

    /// Generate a complete program from the selected request
    Generate(Selection),

    /// Use your own prompt template
    Custom {
        /// Template text; `{selection}` is replaced by the selection
        #[arg(short = 't', long = "template")]
        template: Option<String>,

        #[command(flatten)]
        selection: Selection,
    },

    /// Print every task with its effective template
    Templates,
}

impl Command {
    pub fn task(&self) -> Option<Task> {
        match self {
            Command::Explain(_) => Some(Task::Explain),
            Command::FindBugs(_) => Some(Task::FindBugs),
            Command::Refactor(_) => Some(Task::Refactor),
            Command::Generate(_) => Some(Task::Generate),
            Command::Custom { .. } => Some(Task::Custom),
            Command::Templates => None,
        }
    }
}

/// Where the selected text comes from. With neither, stdin is read.
#[derive(Debug, Clone, Default, ClapArgs)]
pub struct Selection {
    /// Read the selection from a file
    #[arg(short = 'f', long = "file", value_name = "PATH", conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Selection text (positional)
    #[arg(value_name = "TEXT")]
    pub text: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn task_with_positional_text() {
        let args = Args::parse_from(["codecapsule", "find-bugs", "let", "x", "=", "1;"]);
        assert_eq!(args.cmd.task(), Some(Task::FindBugs));
        match args.cmd {
            Command::FindBugs(sel) => assert_eq!(sel.text.join(" "), "let x = 1;"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::parse_from([
            "codecapsule",
            "explain",
            "--file",
            "src/main.rs",
            "-o",
            "panel",
            "--model",
            "llama3",
        ]);
        assert_eq!(args.output, Some(SurfaceKind::Panel));
        assert_eq!(args.model.as_deref(), Some("llama3"));
        match args.cmd {
            Command::Explain(sel) => assert_eq!(sel.file, Some(PathBuf::from("src/main.rs"))),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn custom_takes_template() {
        let args = Args::parse_from(["codecapsule", "custom", "-t", "Port to Go: {selection}", "x"]);
        match args.cmd {
            Command::Custom { template, selection } => {
                assert_eq!(template.as_deref(), Some("Port to Go: {selection}"));
                assert_eq!(selection.text, vec!["x".to_string()]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn file_and_text_conflict() {
        assert!(Args::try_parse_from(["codecapsule", "explain", "-f", "a.rs", "text"]).is_err());
    }
}
