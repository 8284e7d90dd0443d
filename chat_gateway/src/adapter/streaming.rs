//! Outward framing of streamed chat completions

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use chat_protocol::stream::{StreamFormat, StreamPart, DATA_STREAM_HEADER, DATA_STREAM_VERSION};
use futures::Stream;
use tracing::{debug, error, warn};

use crate::provider::{StreamEvent, TextDeltaStream};

const DEFAULT_FINISH_REASON: &str = "stop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    /// Start part not yet sent
    Start,
    Streaming,
    /// Terminal part sent; nothing more is produced
    Done,
}

/// Re-frames provider deltas into the outward stream format.
///
/// Emits one start part, a text part per delta in arrival order, then exactly
/// one terminal part: finish on completion, error if the provider stream
/// failed. Dropping this stream drops the provider connection with it.
pub struct FramedDeltaStream {
    inner: TextDeltaStream,
    format: StreamFormat,
    message_id: String,
    state: FrameState,
    finish_reason: Option<String>,
    deltas: usize,
    bytes_out: usize,
}

impl FramedDeltaStream {
    pub fn new(inner: TextDeltaStream, format: StreamFormat) -> Self {
        Self {
            inner,
            format,
            message_id: format!("msg-{}", uuid::Uuid::new_v4().simple()),
            state: FrameState::Start,
            finish_reason: None,
            deltas: 0,
            bytes_out: 0,
        }
    }

    fn frame(&mut self, part: &StreamPart) -> Bytes {
        let encoded = self.format.encode(part);
        self.bytes_out += encoded.len();
        Bytes::from(encoded)
    }
}

impl Stream for FramedDeltaStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            match this.state {
                FrameState::Done => return Poll::Ready(None),
                FrameState::Start => {
                    this.state = FrameState::Streaming;
                    let part = StreamPart::Start {
                        message_id: this.message_id.clone(),
                    };
                    return Poll::Ready(Some(Ok(this.frame(&part))));
                }
                FrameState::Streaming => match this.inner.as_mut().poll_next(cx) {
                    Poll::Ready(Some(Ok(StreamEvent::Delta(text)))) => {
                        this.deltas += 1;
                        return Poll::Ready(Some(Ok(this.frame(&StreamPart::Text(text)))));
                    }
                    Poll::Ready(Some(Ok(StreamEvent::Finish(reason)))) => {
                        this.finish_reason = Some(reason);
                    }
                    Poll::Ready(Some(Err(e))) => {
                        this.state = FrameState::Done;
                        warn!(
                            message_id = %this.message_id,
                            deltas = this.deltas,
                            error = %e,
                            "Provider stream failed, terminating client stream"
                        );
                        return Poll::Ready(Some(Ok(this.frame(&StreamPart::Error(e.message)))));
                    }
                    Poll::Ready(None) => {
                        this.state = FrameState::Done;
                        let finish_reason = this
                            .finish_reason
                            .take()
                            .unwrap_or_else(|| DEFAULT_FINISH_REASON.to_string());
                        let bytes = this.frame(&StreamPart::Finish { finish_reason });
                        debug!(
                            message_id = %this.message_id,
                            deltas = this.deltas,
                            bytes_out = this.bytes_out,
                            "Client stream completed"
                        );
                        return Poll::Ready(Some(Ok(bytes)));
                    }
                    Poll::Pending => return Poll::Pending,
                },
            }
        }
    }
}

impl Drop for FramedDeltaStream {
    fn drop(&mut self) {
        if self.state != FrameState::Done {
            debug!(
                message_id = %self.message_id,
                deltas = self.deltas,
                "Client stream dropped before completion, closing provider stream"
            );
        }
    }
}

/// Build the streaming HTTP response around the provider deltas
pub fn streaming_response(stream: TextDeltaStream, format: StreamFormat) -> Response {
    let body = Body::from_stream(FramedDeltaStream::new(stream, format));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(header::CACHE_CONTROL, "no-cache");

    builder = match format {
        StreamFormat::DataStream => builder.header(DATA_STREAM_HEADER, DATA_STREAM_VERSION),
        StreamFormat::Sse => builder.header(header::CONNECTION, "keep-alive"),
    };

    builder.body(body).unwrap_or_else(|e| {
        error!("Failed to build streaming response: {}", e);
        crate::routers::error::pipeline_fault("response_build_failed", "Failed to build response")
    })
}
