mod events;
mod panel;
mod terminal;

use crate::render::DisplayEvent;
use serde::{Deserialize, Serialize};

pub use events::EventLines;
pub use panel::{escape_html, page, PanelFile, PLACEHOLDER_HTML};
pub use terminal::Terminal;

/// Where display events go. The pipeline knows nothing else about the UI.
pub trait DisplaySurface {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()>;
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for &mut S {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()> {
        (**self).emit(event)
    }
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()> {
        (**self).emit(event)
    }
}

/// Collects events in memory.
impl DisplaySurface for Vec<DisplayEvent> {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()> {
        self.push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// JSON lines on stdout, one message per event (for editor hosts)
    #[default]
    Events,
    /// Self-contained HTML page rewritten on every event
    Panel,
    /// Plain text streamed to the terminal
    Terminal,
}

impl SurfaceKind {
    /// Whether the surface expects HTML rather than plain text.
    pub fn wants_html(self) -> bool {
        !matches!(self, SurfaceKind::Terminal)
    }
}
