//! Parsing of the provider's streamed chat completion (SSE over HTTP).
//!
//! Frames are `data: <json>\n\n`; the stream is terminated by
//! `data: [DONE]`. Each frame is decoded into zero or more [`StreamEvent`]s.

use std::{
    collections::VecDeque,
    fmt::Display,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use chat_protocol::chat::ChatCompletionChunk;
use futures::Stream;
use memchr::memmem;
use serde_json::Value;
use tracing::{debug, warn};

use super::{sanitize_provider_message, StreamEvent, UpstreamError};

/// Maximum SSE buffer size (1 MB) for providers that send data without
/// frame delimiters.
const MAX_SSE_BUFFER_SIZE: usize = 1024 * 1024;

const DONE_MARKER: &str = "[DONE]";

/// Wrap a raw provider byte stream into a stream of completion events.
///
/// The returned stream yields at most one error and then ends. A body that
/// closes before `[DONE]` is reported as an error so truncation is never
/// mistaken for a finished reply.
pub fn chunk_stream<S, E>(inner: S) -> ChunkStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    ChunkStream {
        inner: Box::pin(inner),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        completed: false,
        done: false,
    }
}

pub struct ChunkStream<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<StreamEvent, UpstreamError>>,
    /// `[DONE]` seen
    completed: bool,
    /// Nothing more will be yielded
    done: bool,
}

impl<S> ChunkStream<S> {
    /// Drain every complete frame currently in the buffer
    fn drain_frames(&mut self) {
        while !self.completed {
            let Some(pos) = memmem::find(&self.buffer, b"\n\n") else {
                break;
            };
            let frame: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            if let Err(e) = self.process_frame(&frame[..pos]) {
                self.pending.push_back(Err(e));
                return;
            }
        }

        if !self.completed && self.buffer.len() > MAX_SSE_BUFFER_SIZE {
            self.pending.push_back(Err(UpstreamError::stream(format!(
                "SSE buffer exceeded maximum size ({} bytes)",
                MAX_SSE_BUFFER_SIZE
            ))));
        }
    }

    fn process_frame(&mut self, frame: &[u8]) -> Result<(), UpstreamError> {
        // Frames are only split on ASCII delimiters, so a complete frame is
        // always valid UTF-8 when the provider sends valid UTF-8.
        let frame = std::str::from_utf8(frame)
            .map_err(|e| UpstreamError::stream(format!("Invalid UTF-8 in stream: {}", e)))?;

        for line in frame.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_MARKER {
                self.completed = true;
                return Ok(());
            }
            self.process_data(data)?;
        }
        Ok(())
    }

    fn process_data(&mut self, data: &str) -> Result<(), UpstreamError> {
        let value: Value = serde_json::from_str(data)
            .map_err(|e| UpstreamError::stream(format!("Failed to parse stream chunk: {}", e)))?;

        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Provider reported an error mid-stream");
            let mut err = UpstreamError::stream(sanitize_provider_message(message));
            if let Some(t) = error.get("type").and_then(Value::as_str) {
                err = err.with_type(t);
            }
            return Err(err);
        }

        let chunk: ChatCompletionChunk = serde_json::from_value(value)
            .map_err(|e| UpstreamError::stream(format!("Failed to parse stream chunk: {}", e)))?;

        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.pending.push_back(Ok(StreamEvent::Delta(content)));
            }
            if let Some(reason) = choice.finish_reason {
                self.pending.push_back(Ok(StreamEvent::Finish(reason)));
            }
        }
        Ok(())
    }

    fn finish_input(&mut self) {
        if !self.completed && !self.buffer.is_empty() {
            // Trailing frame without the final blank line
            let frame = std::mem::take(&mut self.buffer);
            if let Err(e) = self.process_frame(&frame) {
                self.pending.push_back(Err(e));
                return;
            }
        }
        if !self.completed {
            warn!("Provider stream ended before [DONE]");
            self.pending.push_back(Err(UpstreamError::stream(
                "Upstream stream ended before completion",
            )));
        }
    }
}

impl<S, E> Stream for ChunkStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    type Item = Result<StreamEvent, UpstreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(item) = this.pending.pop_front() {
                if item.is_err() {
                    this.pending.clear();
                    this.done = true;
                }
                return Poll::Ready(Some(item));
            }

            if this.done {
                return Poll::Ready(None);
            }

            if this.completed {
                debug!("Provider stream completed");
                this.done = true;
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    this.buffer
                        .extend(chunk.iter().copied().filter(|b| *b != b'\r'));
                    this.drain_frames();
                }
                Poll::Ready(Some(Err(e))) => {
                    this.pending.push_back(Err(UpstreamError::stream(format!(
                        "Stream read error: {}",
                        e
                    ))));
                }
                Poll::Ready(None) => this.finish_input(),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
