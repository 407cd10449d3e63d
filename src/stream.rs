//! Line-buffered decoding of streaming LLM responses.
//!
//! Both backends stream text over HTTP one line at a time. The local server
//! sends one JSON object per line; the hosted API sends server-sent events
//! (`data: {...}` lines, terminated by `data: [DONE]`). Network chunks do not
//! respect line boundaries, so bytes are buffered until a newline arrives and
//! only complete lines are decoded.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::warn;

use crate::error::AssistantError;

/// Text deltas of one streamed reply
pub type DeltaStream = BoxStream<'static, Result<String, AssistantError>>;

/// Upper bound on a single unterminated line before it is discarded
const MAX_LINE_BYTES: usize = 1_000_000;

/// Splits a byte stream into complete lines.
///
/// Bytes are held until a `\n` arrives, so a multi-byte character split across
/// two network chunks is decoded intact. Decoding is lossy.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
    discarded: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finished
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line = self.pending.split_to(pos + 1);
            let text = String::from_utf8_lossy(&line[..pos]);
            lines.push(text.trim_end_matches('\r').to_string());
        }

        if self.pending.len() > MAX_LINE_BYTES {
            warn!(
                bytes = self.pending.len(),
                limit = MAX_LINE_BYTES,
                "Discarding unterminated stream line over the size limit"
            );
            self.discarded += self.pending.len();
            self.pending.clear();
        }
        lines
    }

    /// Bytes thrown away because a line grew past the size limit
    pub fn discarded_bytes(&self) -> usize {
        self.discarded
    }

    /// Whatever is left once the upstream closes
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// What a decoder made of one line
#[derive(Debug)]
pub enum LineOutcome {
    Delta(String),
    /// Final delta; nothing after this line is read
    Last(String),
    /// Upstream reported an error inside the stream
    Failed(AssistantError),
    /// Upstream signalled the end of the reply
    Done,
    Skip,
}

struct LineStreamState<D> {
    body: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    lines: LineBuffer,
    queue: VecDeque<Result<String, AssistantError>>,
    decode: D,
    finished: bool,
}

impl<D: FnMut(&str) -> LineOutcome> LineStreamState<D> {
    fn handle_line(&mut self, line: &str) {
        if self.finished {
            return;
        }
        match (self.decode)(line) {
            LineOutcome::Delta(text) => self.queue.push_back(Ok(text)),
            LineOutcome::Last(text) => {
                self.queue.push_back(Ok(text));
                self.finished = true;
            }
            LineOutcome::Failed(err) => {
                self.queue.push_back(Err(err));
                self.finished = true;
            }
            LineOutcome::Done => self.finished = true,
            LineOutcome::Skip => {}
        }
    }
}

/// Turn a raw HTTP body into a stream of text deltas.
///
/// Every complete line goes through `decode`; the stream ends when the body
/// closes or the decoder reports `Done`. Lines after `Done` are ignored.
pub fn decode_lines<S, D>(body: S, decode: D) -> DeltaStream
where
    S: futures::Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    D: FnMut(&str) -> LineOutcome + Send + 'static,
{
    let state = LineStreamState {
        body: body.boxed(),
        lines: LineBuffer::new(),
        queue: VecDeque::new(),
        decode,
        finished: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.queue.pop_front() {
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => {
                    for line in st.lines.push(&chunk) {
                        st.handle_line(&line);
                    }
                }
                Some(Err(e)) => {
                    st.queue.push_back(Err(AssistantError::Network(e.to_string())));
                    st.finished = true;
                }
                None => {
                    if let Some(rest) = st.lines.finish() {
                        st.handle_line(&rest);
                    }
                    st.finished = true;
                }
            }
        }
    })
    .boxed()
}

/// One line of the local server's generate or chat stream
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OllamaChunk {
    /// Token text from `/api/generate`
    #[serde(default)]
    pub response: Option<String>,
    /// Token text from `/api/chat`
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct OllamaMessage {
    #[serde(default)]
    pub content: String,
}

impl OllamaChunk {
    /// Token text regardless of which endpoint produced the chunk
    pub fn text(&self) -> Option<&str> {
        self.response
            .as_deref()
            .or_else(|| self.message.as_ref().map(|m| m.content.as_str()))
    }
}

/// Decoder for the local server's NDJSON lines
pub fn ollama_outcome(line: &str) -> LineOutcome {
    let Some(chunk) = decode_ollama_line(line) else {
        return LineOutcome::Skip;
    };
    if let Some(err) = chunk.error {
        return LineOutcome::Failed(AssistantError::Llm(err));
    }
    match chunk.text() {
        Some(text) if !text.is_empty() && chunk.done => LineOutcome::Last(text.to_string()),
        Some(text) if !text.is_empty() => LineOutcome::Delta(text.to_string()),
        _ if chunk.done => LineOutcome::Done,
        _ => LineOutcome::Skip,
    }
}

/// Decode one NDJSON line; blank or malformed lines yield `None`
pub fn decode_ollama_line(line: &str) -> Option<OllamaChunk> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[derive(Debug, Deserialize)]
struct SseChunk {
    #[serde(default)]
    choices: Vec<SseChoice>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    #[serde(default)]
    delta: SseDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SseDelta {
    #[serde(default)]
    content: Option<String>,
}

/// A decoded server-sent event line from the hosted API
#[derive(Debug, Clone, PartialEq)]
pub enum SseEvent {
    /// Token delta text (may be empty)
    Delta(String),
    /// A choice reported a finish reason
    Finished(String),
    /// `data: [DONE]`
    Done,
    /// Comments, keep-alives, other fields, malformed JSON
    Ignore,
}

/// Decode one SSE line
pub fn decode_sse_line(line: &str) -> SseEvent {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseEvent::Ignore;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<SseChunk>(data) {
        Ok(chunk) => match chunk.choices.into_iter().next() {
            Some(choice) => match (choice.delta.content, choice.finish_reason) {
                (Some(content), _) if !content.is_empty() => SseEvent::Delta(content),
                (_, Some(reason)) => SseEvent::Finished(reason),
                _ => SseEvent::Ignore,
            },
            None => SseEvent::Ignore,
        },
        Err(_) => SseEvent::Ignore,
    }
}

/// Decoder for the hosted API's SSE lines
pub fn sse_outcome(line: &str) -> LineOutcome {
    match decode_sse_line(line) {
        SseEvent::Delta(text) => LineOutcome::Delta(text),
        SseEvent::Finished(_) | SseEvent::Done => LineOutcome::Done,
        SseEvent::Ignore => LineOutcome::Skip,
    }
}

/// Running reply assembled from deltas
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    text: String,
    deltas: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta; returns the full text so far, or `None` for empty deltas
    pub fn push(&mut self, delta: &str) -> Option<&str> {
        if delta.is_empty() {
            return None;
        }
        self.text.push_str(delta);
        self.deltas += 1;
        Some(&self.text)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn delta_count(&self) -> usize {
        self.deltas
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
