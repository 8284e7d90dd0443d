use chat_protocol::chat::{ChatCompletionRequest, InboundMessage, Role, UpstreamMessage};
use serde_json::Value;
use tracing::debug;

use crate::{
    config::ProviderConfig,
    routers::error::{GatewayError, BODY_PARSE_ERROR},
};

pub const NO_MESSAGES_ERROR: &str = "No messages provided";

/// Instruction block placed ahead of every conversation
pub const CUSTOMER_SERVICE_SYSTEM_PROMPT: &str = "\
You are an advanced customer service AI assistant that can understand context and user preferences.
You are helpful, friendly, and concise in your responses.
You can assist with product information, troubleshooting, order status, and general inquiries.
Always maintain a professional and supportive tone.
If you need more information to help the user, ask clarifying questions.
Remember details from earlier in the conversation to provide personalized assistance.";

/// Build the streaming chat request from a parsed `{messages: [...]}` body.
///
/// Entries are not deeply validated: anything that is not a well-formed
/// chat message is forwarded as-is.
pub fn normalize_chat(
    body: Value,
    provider: &ProviderConfig,
) -> Result<ChatCompletionRequest, GatewayError> {
    let messages = match body {
        Value::Object(mut obj) => obj.remove("messages").unwrap_or(Value::Null),
        other => {
            return Err(GatewayError::Parse {
                message: BODY_PARSE_ERROR.to_string(),
                details: Some(format!(
                    "request body must be an object, got {}",
                    json_kind(&other)
                )),
            })
        }
    };

    let entries = match messages {
        Value::Null => return Err(GatewayError::MissingInput(NO_MESSAGES_ERROR.to_string())),
        Value::Array(entries) => entries,
        other => {
            return Err(GatewayError::Parse {
                message: BODY_PARSE_ERROR.to_string(),
                details: Some(format!(
                    "`messages` must be an array, got {}",
                    json_kind(&other)
                )),
            })
        }
    };

    let mut upstream = Vec::with_capacity(entries.len() + 1);
    upstream.push(UpstreamMessage::text(
        Role::System,
        CUSTOMER_SERVICE_SYSTEM_PROMPT,
    ));

    let mut passthrough = 0usize;
    for entry in entries {
        let inbound = serde_json::from_value::<InboundMessage>(entry)
            .map_err(|e| GatewayError::Parse {
                message: BODY_PARSE_ERROR.to_string(),
                details: Some(e.to_string()),
            })?;
        if matches!(inbound, InboundMessage::Raw(_)) {
            passthrough += 1;
        }
        upstream.push(inbound.into());
    }

    debug!(
        message_count = upstream.len() - 1,
        passthrough,
        model = %provider.chat_model,
        "Normalized chat request"
    );

    Ok(ChatCompletionRequest::new(provider.chat_model.clone(), upstream).streaming())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
