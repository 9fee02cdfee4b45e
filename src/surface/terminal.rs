use super::DisplaySurface;
use crate::render::DisplayEvent;
use anyhow::Context;
use std::io::Write;

/// Prints text as it grows.
///
/// Only the part not yet shown is written. If the markup stops extending
/// what was printed (a transform that rewrites earlier text), the whole
/// markup is printed again on a fresh line.
#[derive(Debug)]
pub struct Terminal<W, E> {
    out: W,
    err: E,
    shown: String,
}

impl Terminal<std::io::Stdout, std::io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(std::io::stdout(), std::io::stderr())
    }
}

impl<W: Write, E: Write> Terminal<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self {
            out,
            err,
            shown: String::new(),
        }
    }

    pub fn into_parts(self) -> (W, E) {
        (self.out, self.err)
    }
}

impl<W: Write, E: Write> DisplaySurface for Terminal<W, E> {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()> {
        match event {
            DisplayEvent::Update { rendered_markup } => {
                let written = match rendered_markup.strip_prefix(self.shown.as_str()) {
                    Some(suffix) => write!(self.out, "{suffix}"),
                    None => write!(self.out, "\n{rendered_markup}"),
                };
                written.context("failed to write to terminal")?;
                self.out.flush().ok();
                self.shown.clone_from(rendered_markup);
            }
            DisplayEvent::Complete => {
                writeln!(self.out).context("failed to write to terminal")?;
                self.out.flush().ok();
            }
            DisplayEvent::Error { message } => {
                if !self.shown.is_empty() {
                    writeln!(self.out).ok();
                }
                writeln!(self.err, "error: {message}").context("failed to write to terminal")?;
            }
        }
        Ok(())
    }
}
