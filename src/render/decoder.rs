use serde::Deserialize;

/// Largest incomplete fragment kept across chunks before it is discarded.
pub const MAX_PENDING: usize = 1_048_576;

/// One object of the `/api/generate` NDJSON body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateRecord {
    /// Incremental text delta.
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    /// In-band failure reported by the server.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub eval_count: Option<u64>,
    #[serde(default)]
    pub total_duration: Option<u64>,
}

/// Frames JSON records out of arbitrarily split body chunks.
///
/// - Records may be separated by newlines, other whitespace, or nothing
/// - A trailing incomplete record is kept and completed by the next chunk
/// - Malformed records are dropped; decoding resumes at the next newline or `{`
#[derive(Debug, Default)]
pub struct RecordDecoder {
    buf: Vec<u8>,
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back waiting for the rest of a record.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<GenerateRecord> {
        self.buf.extend_from_slice(chunk);
        let mut out = Vec::new();
        let mut consumed = 0;

        while consumed < self.buf.len() {
            let rest = &self.buf[consumed..];
            let mut records = serde_json::Deserializer::from_slice(rest).into_iter::<GenerateRecord>();

            match records.next() {
                // Only whitespace left.
                None => consumed = self.buf.len(),
                Some(Ok(record)) => {
                    consumed += records.byte_offset();
                    out.push(record);
                }
                Some(Err(e)) if e.is_eof() => {
                    consumed += records.byte_offset();
                    break;
                }
                Some(Err(e)) => {
                    let start = consumed + records.byte_offset();
                    let next = resync(&self.buf, start);
                    tracing::trace!(error = %e, dropped = next - start, "skipping malformed record");
                    consumed = next;
                }
            }
        }

        self.buf.drain(..consumed);

        if self.buf.len() > MAX_PENDING {
            tracing::warn!(pending = self.buf.len(), "discarding oversized partial record");
            self.buf.clear();
        }

        out
    }

    /// Drop whatever incomplete fragment is left at end of stream.
    pub fn finish(&mut self) {
        if !self.buf.is_empty() {
            tracing::debug!(pending = self.buf.len(), "stream ended inside a record");
            self.buf.clear();
        }
    }
}

/// Position to restart after a malformed record starting at `start`.
fn resync(buf: &[u8], start: usize) -> usize {
    let after = start + 1;
    if after >= buf.len() {
        return buf.len();
    }

    let tail = &buf[after..];
    let newline = tail.iter().position(|&b| b == b'\n').map(|i| after + i + 1);
    let brace = tail.iter().position(|&b| b == b'{').map(|i| after + i);

    match (newline, brace) {
        (Some(n), Some(b)) => n.min(b),
        (Some(n), None) => n,
        (None, Some(b)) => b,
        (None, None) => buf.len(),
    }
}
