use super::{ChunkStream, DispatchError, Dispatcher, CHUNK_CHANNEL_CAPACITY};
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// One step of a canned response body.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Chunk(Bytes),
    /// Break the body mid-stream.
    Interrupt(String),
}

impl ScriptStep {
    pub fn chunk(s: impl Into<String>) -> Self {
        ScriptStep::Chunk(Bytes::from(s.into()))
    }
}

/// Replays a fixed body without touching the network.
///
/// Records every prompt it receives so callers can check what was sent.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDispatcher {
    steps: Vec<ScriptStep>,
    refuse_with: Option<(u16, String)>,
    delay: Option<std::time::Duration>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDispatcher {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Answer every request with a non-success status.
    pub fn refusing(status: u16, body: impl Into<String>) -> Self {
        Self {
            refuse_with: Some((status, body.into())),
            ..Self::default()
        }
    }

    /// Pause between steps, to exercise the channel under a slow producer.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Dispatcher for ScriptedDispatcher {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn open(
        &self,
        prompt: String,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ChunkStream, DispatchError>> + Send>,
    > {
        let ScriptedDispatcher {
            steps,
            refuse_with,
            delay,
            prompts,
        } = self.clone();

        Box::pin(async move {
            if let Ok(mut prompts) = prompts.lock() {
                prompts.push(prompt);
            }

            if let Some((status, body)) = refuse_with {
                return Err(DispatchError::Status { status, body });
            }

            let (tx, rx) = mpsc::channel::<Result<Bytes, DispatchError>>(CHUNK_CHANNEL_CAPACITY);

            tokio::spawn(async move {
                for step in steps {
                    if let Some(d) = delay {
                        tokio::time::sleep(d).await;
                    }
                    let item = match step {
                        ScriptStep::Chunk(b) => Ok(b),
                        ScriptStep::Interrupt(msg) => Err(DispatchError::Interrupted(msg)),
                    };
                    let stop = item.is_err();
                    if tx.send(item).await.is_err() || stop {
                        return;
                    }
                }
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as ChunkStream)
        })
    }
}
