//! Multipart form reading

use axum::body::Body;
use bytes::Bytes;
use http::{header, HeaderMap};
use multer::{Constraints, Multipart, SizeLimit};
use tracing::debug;

use crate::routers::error::GatewayError;

pub const FORM_PARSE_ERROR: &str = "Failed to parse form data";

/// One field of a multipart form
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FormField {
    /// Only parts with a filename are uploads; a typed text part is still text
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Fully buffered multipart form, fields in arrival order
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: Vec<FormField>,
}

impl FormData {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First upload named `name`
    pub fn file(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name && f.is_file())
    }

    /// Remove and return the first upload named `name`
    pub fn take_file(&mut self, name: &str) -> Option<FormField> {
        let idx = self
            .fields
            .iter()
            .position(|f| f.name == name && f.is_file())?;
        Some(self.fields.remove(idx))
    }

    /// First plain text field named `name`
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .find(|f| f.name == name && !f.is_file())
            .map(FormField::text)
    }

    pub fn total_bytes(&self) -> usize {
        self.fields.iter().map(|f| f.data.len()).sum()
    }
}

fn parse_error(details: impl Into<String>) -> GatewayError {
    GatewayError::Parse {
        message: FORM_PARSE_ERROR.to_string(),
        details: Some(details.into()),
    }
}

/// Read a `multipart/form-data` body to completion.
///
/// `max_body` bounds the whole body; `max_upload` (when set) bounds each
/// field. A body with no content yields an empty form so that missing fields
/// are reported as missing rather than as unparsable.
pub async fn read_multipart(
    headers: &HeaderMap,
    body: Body,
    max_body: usize,
    max_upload: Option<usize>,
) -> Result<FormData, GatewayError> {
    let bytes = axum::body::to_bytes(body, max_body)
        .await
        .map_err(|e| parse_error(format!("Failed to read request body: {}", e)))?;

    if bytes.iter().all(u8::is_ascii_whitespace) {
        debug!("Empty multipart body");
        return Ok(FormData::default());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| parse_error("Missing Content-Type header"))?;
    let boundary = multer::parse_boundary(content_type).map_err(|e| parse_error(e.to_string()))?;

    let mut constraints = Constraints::new();
    if let Some(limit) = max_upload {
        constraints = constraints.size_limit(SizeLimit::new().per_field(limit as u64));
    }

    let body_len = bytes.len();
    let stream = futures::stream::once(async move { Ok::<Bytes, std::io::Error>(bytes) });
    let mut multipart = Multipart::with_constraints(stream, boundary, constraints);

    let mut fields = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(field_error(e)),
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(|m| m.to_string());
        let data = field.bytes().await.map_err(field_error)?;

        debug!(
            field = %name,
            is_upload = file_name.is_some(),
            size = data.len(),
            "Read form field"
        );
        fields.push(FormField {
            name,
            file_name,
            content_type,
            data,
        });
    }

    debug!(fields = fields.len(), body_len, "Parsed multipart body");
    Ok(FormData::new(fields))
}

fn field_error(e: multer::Error) -> GatewayError {
    match e {
        multer::Error::FieldSizeExceeded { limit, field_name } => parse_error(format!(
            "Field '{}' exceeds the upload limit of {} bytes",
            field_name.unwrap_or_default(),
            limit
        )),
        other => parse_error(other.to_string()),
    }
}
