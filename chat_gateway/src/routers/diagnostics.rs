//! Diagnostics endpoints that never contact the provider
//!
//! The key check goes through the regular pipeline (`KeyCheckModality`);
//! the handlers here only inspect what the client sent.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chat_protocol::envelope::{EchoResponse, EchoStatus, FileInfo, ImageInfoResponse};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::error::GatewayError;
use crate::{
    normalize::{read_multipart, FormData},
    server::AppState,
};

const ECHO_GET_MESSAGE: &str = "Test endpoint is working";
const ECHO_POST_MESSAGE: &str = "Test POST endpoint is working";
const IMAGE_RECEIVED_MESSAGE: &str = "Image received successfully (no processing performed)";

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn echo_get() -> Json<EchoResponse> {
    Json(EchoResponse {
        status: EchoStatus::Ok,
        message: ECHO_GET_MESSAGE.to_string(),
        received_content_type: None,
        received_body: None,
        timestamp: timestamp(),
    })
}

/// Echo the request body back, decoded according to its content type.
pub async fn echo_post(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let content_type = content_type(&parts.headers);
    let limit = state.context.config.max_payload_size;

    let received = if content_type.contains("application/json") {
        match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        }
    } else if content_type.contains("multipart/form-data") {
        read_multipart(&parts.headers, body, limit, state.context.config.max_upload_bytes)
            .await
            .map(|form| form_to_value(&form))
            .map_err(|e| match e {
                GatewayError::Parse {
                    details: Some(details),
                    ..
                } => details,
                other => other.to_string(),
            })
    } else {
        axum::body::to_bytes(body, limit)
            .await
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .map_err(|e| e.to_string())
    };

    match received {
        Ok(body) => {
            debug!(content_type = %content_type, "Echoing request body");
            Json(EchoResponse {
                status: EchoStatus::Ok,
                message: ECHO_POST_MESSAGE.to_string(),
                received_content_type: Some(content_type),
                received_body: Some(body),
                timestamp: timestamp(),
            })
            .into_response()
        }
        Err(message) => {
            warn!(content_type = %content_type, error = %message, "Echo failed to decode body");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EchoResponse {
                    status: EchoStatus::Error,
                    message,
                    received_content_type: None,
                    received_body: None,
                    timestamp: timestamp(),
                }),
            )
                .into_response()
        }
    }
}

/// Text fields as strings, uploads as `{fileName, type, size}`; a repeated
/// name keeps its last value.
fn form_to_value(form: &FormData) -> Value {
    let mut map = Map::new();
    for field in form.fields() {
        let value = if field.is_file() {
            json!({
                "fileName": field.file_name.clone().unwrap_or_default(),
                "type": field.content_type.clone().unwrap_or_default(),
                "size": field.data.len(),
            })
        } else {
            Value::String(field.text())
        };
        map.insert(field.name.clone(), value);
    }
    Value::Object(map)
}

/// Report metadata of the uploaded `image` without processing it.
pub async fn image_info(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let config = &state.context.config;

    let form = match read_multipart(
        &parts.headers,
        body,
        config.max_payload_size,
        config.max_upload_bytes,
    )
    .await
    {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    let Some(image) = form.file("image") else {
        return GatewayError::MissingInput(crate::normalize::image::NO_IMAGE_ERROR.to_string())
            .into_response();
    };

    let image_info = FileInfo {
        name: image.file_name.clone().unwrap_or_default(),
        content_type: image.content_type.clone().unwrap_or_default(),
        size: image.data.len(),
    };
    debug!(size = image_info.size, content_type = %image_info.content_type, "Image info requested");

    Json(ImageInfoResponse {
        success: true,
        image_info,
        message: IMAGE_RECEIVED_MESSAGE.to_string(),
    })
    .into_response()
}
