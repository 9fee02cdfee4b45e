use super::DisplaySurface;
use crate::render::DisplayEvent;
use anyhow::Context;
use std::io::Write;

/// Writes each event as one JSON line, mirroring the webview message protocol.
#[derive(Debug)]
pub struct EventLines<W> {
    out: W,
}

impl EventLines<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> EventLines<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DisplaySurface for EventLines<W> {
    fn emit(&mut self, event: &DisplayEvent) -> anyhow::Result<()> {
        serde_json::to_writer(&mut self.out, event).context("failed to encode display event")?;
        self.out.write_all(b"\n").context("failed to write display event")?;
        self.out.flush().context("failed to flush display event")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_line_per_event() {
        let mut surface = EventLines::new(Vec::new());
        surface
            .emit(&DisplayEvent::Update { rendered_markup: "<p>a\nb</p>".into() })
            .unwrap();
        surface.emit(&DisplayEvent::Complete).unwrap();

        let out = String::from_utf8(surface.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"command":"update","html":"<p>a\nb</p>"}"#,
                r#"{"command":"complete"}"#,
            ]
        );
    }
}
