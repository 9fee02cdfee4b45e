use crate::prompt::Task;
use crate::surface::SurfaceKind;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Inference server base URL, e.g. "http://localhost:11434".
    pub endpoint: Option<String>,

    /// Model to ask.
    pub model: Option<String>,

    /// Default display surface.
    pub output: Option<SurfaceKind>,

    /// Where the HTML panel is written.
    pub panel_path: Option<PathBuf>,

    /// Connect timeout in seconds. There is no overall request timeout.
    pub connect_timeout_secs: Option<u64>,

    /// Per-task prompt overrides; each must contain `{selection}`.
    #[serde(default)]
    pub templates: Templates,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct Templates {
    pub explain: Option<String>,
    #[serde(alias = "find_bugs")]
    pub find_bugs: Option<String>,
    pub refactor: Option<String>,
    pub generate: Option<String>,
    pub custom: Option<String>,
}

impl Templates {
    pub fn get(&self, task: Task) -> Option<&str> {
        match task {
            Task::Explain => self.explain.as_deref(),
            Task::FindBugs => self.find_bugs.as_deref(),
            Task::Refactor => self.refactor.as_deref(),
            Task::Generate => self.generate.as_deref(),
            Task::Custom => self.custom.as_deref(),
        }
    }
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> anyhow::Result<Option<Self>> {
        let path = path.as_ref();
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("failed to read config: {}", path.display()))
            }
        };

        let s = String::from_utf8(bytes).context("config is not valid UTF-8")?;
        let cfg: Config = toml::from_str(&s)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        Ok(Some(cfg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_optional(dir.path().join("config.toml")).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn parses_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
endpoint = "http://gpu-box:11434"
model = "qwen2.5-coder:7b"
output = "panel"
panel_path = "/tmp/capsule.html"
connect_timeout_secs = 3

[templates]
find-bugs = "List bugs:\n{selection}"
custom = "Translate to Rust: {selection}"
"#,
        )
        .unwrap();

        let cfg = Config::load_optional(&path).unwrap().unwrap();
        assert_eq!(cfg.endpoint.as_deref(), Some("http://gpu-box:11434"));
        assert_eq!(cfg.model.as_deref(), Some("qwen2.5-coder:7b"));
        assert_eq!(cfg.output, Some(SurfaceKind::Panel));
        assert_eq!(cfg.panel_path, Some(PathBuf::from("/tmp/capsule.html")));
        assert_eq!(cfg.connect_timeout_secs, Some(3));
        assert_eq!(cfg.templates.get(Task::FindBugs), Some("List bugs:\n{selection}"));
        assert_eq!(cfg.templates.get(Task::Custom), Some("Translate to Rust: {selection}"));
        assert_eq!(cfg.templates.get(Task::Explain), None);
    }

    #[test]
    fn snake_case_task_key_accepted() {
        let cfg: Config = toml::from_str("[templates]\nfind_bugs = \"{selection}\"\n").unwrap();
        assert_eq!(cfg.templates.get(Task::FindBugs), Some("{selection}"));
    }

    #[test]
    fn bad_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = ").unwrap();
        assert!(Config::load_optional(&path).is_err());
    }
}
