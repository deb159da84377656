//! Stream Codec
//!
//! JSON codec for the Alpaca stock stream. The server sends arrays of message
//! objects; control replies occasionally arrive as a bare object.

use serde_json::Value;

use super::messages::{
    AlpacaMessage, ErrorMessage, StockBarMessage, SubscriptionMessage, SuccessMessage,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid message format.
    #[error("invalid message format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for stock market data streams.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into messages.
    pub fn decode(&self, text: &str) -> Result<Vec<AlpacaMessage>, CodecError> {
        let trimmed = text.trim();

        if trimmed.starts_with('[') {
            let values: Vec<Value> = serde_json::from_str(trimmed)?;
            values.into_iter().map(decode_value).collect()
        } else if trimmed.starts_with('{') {
            Ok(vec![decode_value(serde_json::from_str(trimmed)?)?])
        } else {
            Err(CodecError::InvalidFormat(format!(
                "expected JSON array or object, got: {}...",
                trimmed.chars().take(50).collect::<String>()
            )))
        }
    }

    /// Encode a request as a JSON string.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

fn decode_value(value: Value) -> Result<AlpacaMessage, CodecError> {
    let tag = value
        .get("T")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CodecError::InvalidFormat("message has no \"T\" field".to_string()))?;

    let message = match tag.as_str() {
        "success" => AlpacaMessage::Success(serde_json::from_value::<SuccessMessage>(value)?),
        "error" => AlpacaMessage::Error(serde_json::from_value::<ErrorMessage>(value)?),
        "subscription" => {
            AlpacaMessage::Subscription(serde_json::from_value::<SubscriptionMessage>(value)?)
        }
        "b" => AlpacaMessage::Bar(serde_json::from_value::<StockBarMessage>(value)?),
        _ => AlpacaMessage::Ignored(tag),
    };
    Ok(message)
}
