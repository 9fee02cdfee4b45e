use super::{ChunkStream, DispatchError, Dispatcher, CHUNK_CHANNEL_CAPACITY};
use anyhow::Context;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Url;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "gpt-oss:20b";

/// Talks to an Ollama-compatible `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaDispatcher {
    http: reqwest::Client,
    generate_url: Url,
    model: String,
}

impl OllamaDispatcher {
    pub fn new(http: reqwest::Client, endpoint: &str, model: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            http,
            generate_url: generate_url(endpoint)?,
            model: model.into(),
        })
    }

    pub fn generate_url(&self) -> &Url {
        &self.generate_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(ACCEPT, HeaderValue::from_static("application/x-ndjson"));
        h
    }
}

/// Resolve `<endpoint>/api/generate`.
///
/// Accepts the forms `OLLAMA_HOST` commonly takes: a bare `host:port`, a
/// full URL, or a URL with a path prefix (reverse-proxied servers).
pub fn generate_url(endpoint: &str) -> anyhow::Result<Url> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        anyhow::bail!("inference endpoint is empty");
    }

    let mut base = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    };
    if !base.ends_with('/') {
        base.push('/');
    }

    let base = Url::parse(&base).with_context(|| format!("invalid inference endpoint: {endpoint}"))?;
    base.join("api/generate")
        .with_context(|| format!("invalid inference endpoint: {endpoint}"))
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

impl Dispatcher for OllamaDispatcher {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn open(
        &self,
        prompt: String,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<ChunkStream, DispatchError>> + Send>,
    > {
        let this = self.clone();

        Box::pin(async move {
            let url = this.generate_url.clone();
            let body = GenerateRequest {
                model: &this.model,
                prompt: &prompt,
                stream: true,
            };

            let resp = this
                .http
                .post(url.clone())
                .headers(Self::headers())
                .json(&body)
                .send()
                .await
                .map_err(|source| DispatchError::Connect {
                    url: url.to_string(),
                    source,
                })?;

            let status = resp.status();
            if !status.is_success() {
                let text = resp.text().await.unwrap_or_default();
                return Err(DispatchError::Status {
                    status: status.as_u16(),
                    body: text.trim().to_string(),
                });
            }
            tracing::debug!(%url, model = %this.model, "stream opened");

            let (tx, rx) = mpsc::channel::<Result<Bytes, DispatchError>>(CHUNK_CHANNEL_CAPACITY);

            tokio::spawn(async move {
                let mut stream = resp.bytes_stream();
                let mut chunks = 0usize;

                while let Some(item) = stream.next().await {
                    let bytes = match item {
                        Ok(b) => b,
                        Err(e) => {
                            tracing::debug!(error = %e, chunks, "body read failed");
                            let _ = tx.send(Err(DispatchError::Interrupted(e.to_string()))).await;
                            return;
                        }
                    };
                    if bytes.is_empty() {
                        continue;
                    }

                    chunks += 1;
                    if tx.send(Ok(bytes)).await.is_err() {
                        // Consumer went away; stop reading.
                        return;
                    }
                }
                tracing::trace!(chunks, "response body closed");
            });

            Ok(Box::pin(ReceiverStream::new(rx)) as ChunkStream)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_resolves_generate_path() {
        let url = generate_url(DEFAULT_ENDPOINT).unwrap();
        assert_eq!(url.as_str(), "http://localhost:11434/api/generate");
    }

    #[test]
    fn bare_host_port_gets_http_scheme() {
        let url = generate_url("127.0.0.1:11434").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:11434/api/generate");
    }

    #[test]
    fn path_prefix_is_kept() {
        let url = generate_url("https://example.com/ollama").unwrap();
        assert_eq!(url.as_str(), "https://example.com/ollama/api/generate");

        let url = generate_url("https://example.com/ollama/").unwrap();
        assert_eq!(url.as_str(), "https://example.com/ollama/api/generate");
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(generate_url("  ").is_err());
    }

    #[test]
    fn request_body_asks_for_stream() {
        let body = GenerateRequest {
            model: DEFAULT_MODEL,
            prompt: "hi",
            stream: true,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(
            v,
            serde_json::json!({"model": "gpt-oss:20b", "prompt": "hi", "stream": true})
        );
    }

    #[test]
    fn dispatcher_keeps_model() {
        let d = OllamaDispatcher::new(reqwest::Client::new(), DEFAULT_ENDPOINT, "llama3").unwrap();
        assert_eq!(d.model(), "llama3");
        assert_eq!(d.generate_url().path(), "/api/generate");
    }
}
