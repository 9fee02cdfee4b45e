pub mod ollama;
pub mod scripted;

use crate::prompt::PromptRequest;
use bytes::Bytes;
use futures_core::stream::BoxStream;
use thiserror::Error;

pub use ollama::OllamaDispatcher;
pub use scripted::{ScriptStep, ScriptedDispatcher};

/// Raw body fragments in arrival order. Boundaries carry no meaning.
pub type ChunkStream = BoxStream<'static, Result<Bytes, DispatchError>>;

/// Capacity of the channel between the network reader and the renderer.
pub const CHUNK_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("inference server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response stream interrupted: {0}")]
    Interrupted(String),
}

/// Sends one prompt and exposes the streamed response body.
pub trait Dispatcher {
    fn name(&self) -> &'static str;

    /// Open exactly one streaming request. No retries.
    fn open(
        &self,
        prompt: String,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ChunkStream, DispatchError>> + Send>,
    >;
}

/// Build the prompt and open the stream, or do nothing for an empty selection.
pub async fn dispatch<D>(
    dispatcher: &D,
    request: &PromptRequest,
) -> Result<Option<ChunkStream>, DispatchError>
where
    D: Dispatcher + ?Sized,
{
    if request.is_empty() {
        tracing::debug!(task = request.template().task().name(), "empty selection, not dispatching");
        return Ok(None);
    }

    let prompt = request.prompt();
    tracing::debug!(
        dispatcher = dispatcher.name(),
        prompt_len = prompt.len(),
        "opening stream"
    );
    dispatcher.open(prompt).await.map(Some)
}
