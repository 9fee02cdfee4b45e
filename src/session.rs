use crate::dispatch::{self, Dispatcher};
use crate::prompt::PromptRequest;
use crate::render::{DisplayEvent, Markup, Renderer};
use crate::surface::DisplaySurface;
use tokio_stream::StreamExt;

/// How one invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Nothing was selected; no request went out.
    Skipped,
    Completed { text: String },
    /// `text` is whatever arrived before the failure.
    Failed { text: String, message: String },
}

/// Run one request end to end: dispatch, stream, render, display.
///
/// Errors returned here come from the display surface only. Network and
/// server failures are reported through a `DisplayEvent::Error` and the
/// `Failed` outcome.
pub async fn run_session<D, M, S>(
    dispatcher: &D,
    request: &PromptRequest,
    markup: M,
    surface: &mut S,
) -> anyhow::Result<SessionOutcome>
where
    D: Dispatcher + ?Sized,
    M: Markup,
    S: DisplaySurface + ?Sized,
{
    let task = request.template().task().name();
    let mut renderer = Renderer::new(markup);

    let mut stream = match dispatch::dispatch(dispatcher, request).await {
        Ok(Some(stream)) => stream,
        Ok(None) => return Ok(SessionOutcome::Skipped),
        Err(e) => {
            tracing::warn!(task, error = %e, "request failed");
            let message = e.to_string();
            if let Some(ev) = renderer.fail(message.clone()) {
                surface.emit(&ev)?;
            }
            return Ok(SessionOutcome::Failed {
                text: String::new(),
                message,
            });
        }
    };

    let mut updates = 0usize;
    let mut failure = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                for ev in renderer.push_chunk(&chunk) {
                    match &ev {
                        DisplayEvent::Update { .. } => updates += 1,
                        DisplayEvent::Error { message } => failure = Some(message.clone()),
                        DisplayEvent::Complete => {}
                    }
                    surface.emit(&ev)?;
                }
                if failure.is_some() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(task, error = %e, "stream failed");
                let message = e.to_string();
                if let Some(ev) = renderer.fail(message.clone()) {
                    surface.emit(&ev)?;
                }
                failure = Some(message);
                break;
            }
        }
    }

    if failure.is_none() {
        if let Some(ev) = renderer.finish() {
            surface.emit(&ev)?;
        }
    }

    let text = renderer.into_state().accumulated_text;
    tracing::info!(task, updates, chars = text.chars().count(), ok = failure.is_none(), "session ended");

    Ok(match failure {
        None => SessionOutcome::Completed { text },
        Some(message) => SessionOutcome::Failed { text, message },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{ScriptStep, ScriptedDispatcher};
    use crate::prompt::{Task, TaskTemplate};
    use crate::render::Passthrough;

    fn request(text: &str) -> PromptRequest {
        PromptRequest::new(TaskTemplate::resolve(Task::Explain, None).unwrap(), text)
    }

    #[tokio::test]
    async fn streams_updates_then_completes() {
        let d = ScriptedDispatcher::new(vec![
            ScriptStep::chunk(r#"{"response":"Hel"}"#),
            ScriptStep::chunk(r#"{"response":"lo"}"#),
        ]);
        let mut events = Vec::new();

        let outcome = run_session(&d, &request("x"), Passthrough, &mut events).await.unwrap();

        assert_eq!(
            events,
            vec![
                DisplayEvent::Update { rendered_markup: "Hel".into() },
                DisplayEvent::Update { rendered_markup: "Hello".into() },
                DisplayEvent::Complete,
            ]
        );
        assert_eq!(outcome, SessionOutcome::Completed { text: "Hello".into() });
    }

    #[tokio::test]
    async fn empty_selection_sends_nothing() {
        let d = ScriptedDispatcher::new(vec![ScriptStep::chunk(r#"{"response":"x"}"#)]);
        let mut events = Vec::new();

        let outcome = run_session(&d, &request("   "), Passthrough, &mut events).await.unwrap();

        assert_eq!(outcome, SessionOutcome::Skipped);
        assert!(events.is_empty());
        assert!(d.prompts().is_empty());
    }

    #[tokio::test]
    async fn refused_request_is_one_error() {
        let d = ScriptedDispatcher::refusing(404, "model not found");
        let mut events = Vec::new();

        let outcome = run_session(&d, &request("x"), Passthrough, &mut events).await.unwrap();

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DisplayEvent::Error { message } if message.contains("404")));
        assert!(matches!(outcome, SessionOutcome::Failed { ref text, .. } if text.is_empty()));
    }

    #[tokio::test]
    async fn interrupted_stream_keeps_partial_text() {
        let d = ScriptedDispatcher::new(vec![
            ScriptStep::chunk("{\"response\":\"part\"}\n"),
            ScriptStep::Interrupt("connection reset".into()),
        ]);
        let mut events = Vec::new();

        let outcome = run_session(&d, &request("x"), Passthrough, &mut events).await.unwrap();

        assert_eq!(events.len(), 2);
        assert!(matches!(events.last(), Some(DisplayEvent::Error { .. })));
        assert!(!events.contains(&DisplayEvent::Complete));
        match outcome {
            SessionOutcome::Failed { text, message } => {
                assert_eq!(text, "part");
                assert!(message.contains("connection reset"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_band_error_stops_consumption() {
        let d = ScriptedDispatcher::new(vec![
            ScriptStep::chunk("{\"error\":\"model is loading\"}\n"),
            ScriptStep::chunk(r#"{"response":"ignored"}"#),
        ]);
        let mut events = Vec::new();

        let outcome = run_session(&d, &request("x"), Passthrough, &mut events).await.unwrap();

        assert_eq!(
            events,
            vec![DisplayEvent::Error { message: "model is loading".into() }]
        );
        assert!(matches!(outcome, SessionOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn prompt_is_filled_template() {
        let d = ScriptedDispatcher::new(Vec::new());
        let mut events = Vec::new();

        run_session(&d, &request("let x = 1;"), Passthrough, &mut events).await.unwrap();

        let prompts = d.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].ends_with("---\n\nlet x = 1;"));
        assert_eq!(events, vec![DisplayEvent::Complete]);
    }

    #[tokio::test]
    async fn slow_producer_still_terminates_once() {
        let steps = (0..20)
            .map(|i| ScriptStep::chunk(format!("{{\"response\":\"{i} \"}}\n")))
            .collect();
        let d = ScriptedDispatcher::new(steps).with_delay(std::time::Duration::from_millis(1));
        let mut events = Vec::new();

        run_session(&d, &request("x"), Passthrough, &mut events).await.unwrap();

        let terminal: Vec<_> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(terminal, vec![&DisplayEvent::Complete]);
        assert_eq!(events.last(), Some(&DisplayEvent::Complete));
        assert_eq!(events.len(), 21);
    }
}
