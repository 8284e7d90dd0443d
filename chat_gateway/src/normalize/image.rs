use base64::{engine::general_purpose::STANDARD, Engine as _};
use chat_protocol::chat::{ChatCompletionRequest, ContentPart, ImageUrl, Role, UpstreamMessage};
use tracing::debug;

use super::form::FormData;
use crate::{config::ProviderConfig, routers::error::GatewayError};

pub const NO_IMAGE_ERROR: &str = "No image file provided";

pub const VISION_SYSTEM_PROMPT: &str = "You are a helpful customer service assistant analyzing images for customers. Be detailed and helpful in your analysis.";

/// Used when the form has no prompt, or an empty one
pub const DEFAULT_IMAGE_PROMPT: &str = "What's in this image?";

const FALLBACK_IMAGE_TYPE: &str = "application/octet-stream";

/// `data:<type>;base64,<payload>` for arbitrary binary content
pub fn encode_data_uri(content_type: Option<&str>, bytes: &[u8]) -> String {
    let content_type = content_type
        .filter(|t| !t.is_empty())
        .unwrap_or(FALLBACK_IMAGE_TYPE);
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

/// Build the vision completion request from the `image` + `prompt` form.
pub fn normalize_image(
    mut form: FormData,
    provider: &ProviderConfig,
) -> Result<ChatCompletionRequest, GatewayError> {
    let prompt = form
        .text("prompt")
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_PROMPT.to_string());
    let image = form
        .take_file("image")
        .ok_or_else(|| GatewayError::MissingInput(NO_IMAGE_ERROR.to_string()))?;

    debug!(
        image_size = image.data.len(),
        image_type = image.content_type.as_deref().unwrap_or(FALLBACK_IMAGE_TYPE),
        prompt_len = prompt.len(),
        "Normalized image request"
    );

    let data_uri = encode_data_uri(image.content_type.as_deref(), &image.data);
    let messages = vec![
        UpstreamMessage::text(Role::System, VISION_SYSTEM_PROMPT),
        UpstreamMessage::parts(
            Role::User,
            vec![
                ContentPart::Text { text: prompt },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_uri,
                        detail: None,
                    },
                },
            ],
        ),
    ];

    Ok(ChatCompletionRequest::new(provider.vision_model.clone(), messages)
        .with_max_tokens(provider.vision_max_tokens))
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chat_protocol::chat::{Message, MessageContent};

    use super::*;
    use crate::normalize::form::FormField;

    fn decode(uri: &str) -> Vec<u8> {
        let (_, payload) = uri.split_once(";base64,").unwrap();
        STANDARD.decode(payload).unwrap()
    }

    fn field(name: &str, file: Option<&str>, ty: Option<&str>, data: &[u8]) -> FormField {
        FormField {
            name: name.to_string(),
            file_name: file.map(str::to_string),
            content_type: ty.map(str::to_string),
            data: Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn test_data_uri_lossless_for_binary() {
        let every_byte: Vec<u8> = (0u8..=255).collect();
        let samples: [&[u8]; 4] = [b"", &[0x00], &[0xff, 0xfe, 0x00, 0x80, 0xc3], &every_byte];
        for bytes in samples {
            let uri = encode_data_uri(Some("image/png"), bytes);
            assert!(uri.starts_with("data:image/png;base64,"));
            assert_eq!(decode(&uri), bytes);
        }
    }

    #[test]
    fn test_data_uri_default_type() {
        assert_eq!(
            encode_data_uri(None, b"ab"),
            "data:application/octet-stream;base64,YWI="
        );
        assert!(encode_data_uri(Some(""), b"").starts_with("data:application/octet-stream;"));
    }

    fn user_parts(req: &ChatCompletionRequest) -> &[ContentPart] {
        match &req.messages[1] {
            UpstreamMessage::Structured(Message {
                content: MessageContent::Parts(parts),
                ..
            }) => parts,
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_image_request_shape() {
        let form = FormData::new(vec![
            field("prompt", None, None, b"describe the color"),
            field("image", Some("red.png"), Some("image/png"), &[1, 2, 3]),
        ]);
        let req = normalize_image(form, &ProviderConfig::default()).unwrap();

        assert_eq!(req.model, "gpt-4o");
        assert_eq!(req.max_tokens, Some(500));
        assert!(!req.stream);
        assert_eq!(
            req.messages[0],
            UpstreamMessage::text(Role::System, VISION_SYSTEM_PROMPT)
        );
        let parts = user_parts(&req);
        assert_eq!(
            parts[0],
            ContentPart::Text {
                text: "describe the color".to_string()
            }
        );
        match &parts[1] {
            ContentPart::ImageUrl { image_url } => assert_eq!(decode(&image_url.url), vec![1, 2, 3]),
            other => panic!("unexpected part: {other:?}"),
        }
    }

    #[test]
    fn test_typed_prompt_is_used() {
        let form = FormData::new(vec![
            field(
                "prompt",
                None,
                Some("text/plain; charset=utf-8"),
                b"describe the color",
            ),
            field("image", Some("red.png"), Some("image/png"), &[1]),
        ]);
        let req = normalize_image(form, &ProviderConfig::default()).unwrap();
        assert_eq!(
            user_parts(&req)[0],
            ContentPart::Text {
                text: "describe the color".to_string()
            }
        );
    }

    #[test]
    fn test_default_prompt() {
        for prompt in [None, Some("")] {
            let mut fields = vec![field("image", Some("a.jpg"), Some("image/jpeg"), b"x")];
            if let Some(p) = prompt {
                fields.push(field("prompt", None, None, p.as_bytes()));
            }
            let req = normalize_image(FormData::new(fields), &ProviderConfig::default()).unwrap();
            assert_eq!(
                user_parts(&req)[0],
                ContentPart::Text {
                    text: DEFAULT_IMAGE_PROMPT.to_string()
                }
            );
        }
    }

    #[test]
    fn test_missing_image() {
        let form = FormData::new(vec![field("prompt", None, None, b"hi")]);
        let err = normalize_image(form, &ProviderConfig::default()).unwrap_err();
        assert!(matches!(err, GatewayError::MissingInput(ref m) if m == NO_IMAGE_ERROR));
    }
}
