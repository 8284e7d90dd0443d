//! Per-request state threaded through the pipeline stages

use std::time::Instant;

use axum::{body::Body, http::HeaderMap};
use serde_json::Value;

use crate::{
    config::ApiKey,
    normalize::FormData,
    provider::{UpstreamOutput, UpstreamRequest},
};

/// Decoded inbound body
#[derive(Debug)]
pub enum ParsedInput {
    Json(Value),
    Form(FormData),
    Empty,
}

impl ParsedInput {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedInput::Json(_) => "json",
            ParsedInput::Form(_) => "form",
            ParsedInput::Empty => "empty",
        }
    }
}

pub struct RequestInput {
    pub headers: HeaderMap,
    /// Taken by the parse stage
    pub body: Option<Body>,
}

#[derive(Default)]
pub struct ProcessingState {
    pub api_key: Option<ApiKey>,
    pub parsed: Option<ParsedInput>,
    pub upstream_request: Option<UpstreamRequest>,
    pub upstream_output: Option<UpstreamOutput>,
}

pub struct RequestContext {
    pub modality: &'static str,
    pub input: RequestInput,
    pub state: ProcessingState,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new(modality: &'static str, headers: HeaderMap, body: Body) -> Self {
        Self {
            modality,
            input: RequestInput {
                headers,
                body: Some(body),
            },
            state: ProcessingState::default(),
            start_time: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}
