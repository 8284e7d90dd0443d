//! Outward framing for streamed chat responses.
//!
//! Two formats are supported:
//! - `DataStream`: the line-oriented protocol consumed by the browser chat
//!   hook. Every part is `<code>:<json>\n` (`f` start, `0` text, `3` error,
//!   `d` finish).
//! - `Sse`: plain server-sent events with JSON payloads and a trailing
//!   `data: [DONE]`.

use serde_json::{json, Value};

/// Header announcing the data stream protocol version
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";
pub const DATA_STREAM_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFormat {
    #[default]
    DataStream,
    Sse,
}

impl StreamFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            StreamFormat::DataStream => "text/plain; charset=utf-8",
            StreamFormat::Sse => "text/event-stream",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamFormat::DataStream => "data-stream",
            StreamFormat::Sse => "sse",
        }
    }

    /// Encode one part in this format
    pub fn encode(&self, part: &StreamPart) -> String {
        match self {
            StreamFormat::DataStream => part.encode_data_stream(),
            StreamFormat::Sse => part.encode_sse(),
        }
    }
}

impl std::str::FromStr for StreamFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "data-stream" | "data_stream" | "datastream" => Ok(StreamFormat::DataStream),
            "sse" => Ok(StreamFormat::Sse),
            other => Err(format!("unknown stream format '{}'", other)),
        }
    }
}

/// One unit of the outward stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    Start { message_id: String },
    Text(String),
    Error(String),
    Finish { finish_reason: String },
}

impl StreamPart {
    fn encode_data_stream(&self) -> String {
        match self {
            StreamPart::Start { message_id } => {
                format!("f:{}\n", json!({ "messageId": message_id }))
            }
            StreamPart::Text(text) => format!("0:{}\n", Value::String(text.clone())),
            StreamPart::Error(message) => format!("3:{}\n", Value::String(message.clone())),
            StreamPart::Finish { finish_reason } => {
                format!("d:{}\n", json!({ "finishReason": finish_reason }))
            }
        }
    }

    fn encode_sse(&self) -> String {
        match self {
            StreamPart::Start { message_id } => format!(
                "data: {}\n\n",
                json!({ "type": "start", "message_id": message_id })
            ),
            StreamPart::Text(text) => {
                format!("data: {}\n\n", json!({ "type": "text", "delta": text }))
            }
            StreamPart::Error(message) => format!(
                "event: error\ndata: {}\n\n",
                json!({ "type": "error", "message": message })
            ),
            StreamPart::Finish { finish_reason } => format!(
                "data: {}\n\ndata: [DONE]\n\n",
                json!({ "type": "finish", "finish_reason": finish_reason })
            ),
        }
    }
}
