pub mod decoder;
pub mod markup;

use serde::Serialize;

pub use decoder::{GenerateRecord, RecordDecoder};
pub use markup::{Markup, MarkdownHtml, Passthrough};

/// What the display surface is told.
///
/// Serializes to the webview message shape:
/// `{"command":"update","html":...}`, `{"command":"complete"}`,
/// `{"command":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum DisplayEvent {
    Update {
        #[serde(rename = "html")]
        rendered_markup: String,
    },
    Complete,
    Error {
        message: String,
    },
}

impl DisplayEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DisplayEvent::Update { .. })
    }
}

/// Text received so far in one session. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    pub accumulated_text: String,
    pub is_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Streaming,
    Complete,
    Failed,
}

/// Turns body chunks into display events for one streaming session.
///
/// Every update re-renders the whole buffer, so half-written constructs
/// (an open code fence, a list still growing) come out right as soon as
/// enough text has arrived. After `Complete` or `Error` it emits nothing.
#[derive(Debug)]
pub struct Renderer<M> {
    markup: M,
    decoder: RecordDecoder,
    state: StreamState,
    phase: Phase,
    records: usize,
}

impl<M: Markup> Renderer<M> {
    pub fn new(markup: M) -> Self {
        Self {
            markup,
            decoder: RecordDecoder::new(),
            state: StreamState::default(),
            phase: Phase::Streaming,
            records: 0,
        }
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn into_state(self) -> StreamState {
        self.state
    }

    /// Feed one body chunk.
    ///
    /// Yields at most one `Update` (only if the chunk added text), followed by
    /// an `Error` if the server reported one in-band.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<DisplayEvent> {
        if self.phase != Phase::Streaming {
            return Vec::new();
        }

        let mut appended = false;
        let mut server_error = None;

        for record in self.decoder.push(chunk) {
            self.records += 1;

            if let Some(delta) = record.response.as_deref().filter(|d| !d.is_empty()) {
                self.state.accumulated_text.push_str(delta);
                appended = true;
            }

            if record.done {
                tracing::debug!(
                    done_reason = record.done_reason.as_deref().unwrap_or("-"),
                    eval_count = record.eval_count,
                    total_duration_ns = record.total_duration,
                    "generation finished"
                );
            }

            if let Some(err) = record.error {
                server_error = Some(err);
                break;
            }
        }

        let mut events = Vec::with_capacity(2);
        if appended {
            events.push(DisplayEvent::Update {
                rendered_markup: self.markup.render(&self.state.accumulated_text),
            });
        }
        if let Some(message) = server_error {
            events.extend(self.fail(message));
        }
        events
    }

    /// The body closed normally.
    pub fn finish(&mut self) -> Option<DisplayEvent> {
        if self.phase != Phase::Streaming {
            return None;
        }
        self.decoder.finish();
        self.phase = Phase::Complete;
        self.state.is_complete = true;
        tracing::debug!(
            records = self.records,
            chars = self.state.accumulated_text.chars().count(),
            "stream complete"
        );
        Some(DisplayEvent::Complete)
    }

    /// The session failed. Text already rendered is left as is.
    pub fn fail(&mut self, message: impl Into<String>) -> Option<DisplayEvent> {
        if self.phase != Phase::Streaming {
            return None;
        }
        self.decoder.finish();
        self.phase = Phase::Failed;
        Some(DisplayEvent::Error {
            message: message.into(),
        })
    }
}
