use thiserror::Error;

/// Marker substituted with the selected text.
pub const PLACEHOLDER: &str = "{selection}";

/// Editor commands the CLI exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Explain,
    FindBugs,
    Refactor,
    Generate,
    Custom,
}

impl Task {
    pub const ALL: [Task; 5] = [
        Task::Explain,
        Task::FindBugs,
        Task::Refactor,
        Task::Generate,
        Task::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Task::Explain => "explain",
            Task::FindBugs => "find-bugs",
            Task::Refactor => "refactor",
            Task::Generate => "generate",
            Task::Custom => "custom",
        }
    }

    /// Title shown on the response panel.
    pub fn title(self) -> &'static str {
        match self {
            Task::Explain => "Code Explanation",
            Task::FindBugs => "Bug Analysis",
            Task::Refactor => "Code Refactor",
            Task::Generate => "Generated Program",
            Task::Custom => "CodeCapsule Response",
        }
    }

    /// Built-in template; `Custom` has none and must be given one.
    pub fn default_template(self) -> Option<&'static str> {
        match self {
            Task::Explain => Some(
                "You are an expert programmer. Explain the following code snippet using Markdown:\n\n---\n\n{selection}",
            ),
            Task::FindBugs => Some(
                "You are a code analysis expert. Review the following code for bugs. Format findings as a Markdown list:\n\n---\n\n{selection}",
            ),
            Task::Refactor => Some(
                "You are an expert in writing clean code. Refactor the following snippet. Provide the refactored code in a Markdown code block, followed by an explanation:\n\n---\n\n{selection}",
            ),
            Task::Generate => Some(
                "You are an expert code generator. Based on the following request, generate a complete program. Start your response directly with the code in a Markdown code block:\n\n---\n\nRequest: \"{selection}\"",
            ),
            Task::Custom => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template for `{task}` does not contain the {{selection}} placeholder")]
    MissingPlaceholder { task: &'static str },

    #[error("task `{task}` needs a template (pass --template or set templates.{task} in config.toml)")]
    Missing { task: &'static str },
}

/// A prompt template known to contain [`PLACEHOLDER`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    task: Task,
    text: String,
}

impl TaskTemplate {
    pub fn new(task: Task, text: impl Into<String>) -> Result<Self, TemplateError> {
        let text = text.into();
        if !text.contains(PLACEHOLDER) {
            return Err(TemplateError::MissingPlaceholder { task: task.name() });
        }
        Ok(Self { task, text })
    }

    /// Pick the override if present, else the task's built-in template.
    pub fn resolve(task: Task, override_text: Option<&str>) -> Result<Self, TemplateError> {
        match override_text.or_else(|| task.default_template()) {
            Some(text) => Self::new(task, text),
            None => Err(TemplateError::Missing { task: task.name() }),
        }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Replace every placeholder occurrence with `selection`.
    pub fn fill(&self, selection: &str) -> String {
        self.text.replace(PLACEHOLDER, selection)
    }
}

/// One invocation's input: what to ask and about which text.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    template: TaskTemplate,
    selected_text: String,
}

impl PromptRequest {
    pub fn new(template: TaskTemplate, selected_text: impl Into<String>) -> Self {
        Self {
            template,
            selected_text: selected_text.into(),
        }
    }

    pub fn template(&self) -> &TaskTemplate {
        &self.template
    }

    pub fn selected_text(&self) -> &str {
        &self.selected_text
    }

    /// Whitespace-only selections count as nothing selected.
    pub fn is_empty(&self) -> bool {
        self.selected_text.trim().is_empty()
    }

    pub fn prompt(&self) -> String {
        self.template.fill(&self.selected_text)
    }
}
