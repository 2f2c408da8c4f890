//! Wire frames for the relay endpoint, and inbound query resolution.

use serde::Serialize;
use serde_json::Value;

use crate::generator::{Answer, GeneratorError};

/// Resolve the query carried by an inbound text frame.
///
/// A frame that parses as a JSON object with a string `message` field
/// yields that field's value; any other fields are ignored. Everything else
/// (invalid JSON, JSON without `message`, a non-string `message`, or
/// non-object JSON) yields the raw frame text verbatim. Malformed JSON is a
/// normal input shape (plain text), never an error.
pub fn resolve_query(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(fields)) => match fields.get("message") {
            Some(Value::String(message)) => message.clone(),
            _ => raw.to_string(),
        },
        _ => raw.to_string(),
    }
}

/// Frames sent back to the client. Every inbound text frame produces
/// exactly one of these.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Successful answer: the rendered text and its character count.
    Reply { reply: String, length: usize },

    /// Per-message failure: category plus a human-readable detail. The
    /// session stays open after sending one of these.
    Error {
        error: &'static str,
        detail: String,
    },
}

impl OutboundFrame {
    pub fn reply(answer: Answer) -> Self {
        let length = answer.char_len();
        Self::Reply {
            reply: answer.into_text(),
            length,
        }
    }
}

impl From<&GeneratorError> for OutboundFrame {
    fn from(err: &GeneratorError) -> Self {
        Self::Error {
            error: err.category(),
            detail: err.detail().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_json_with_message_field() {
        assert_eq!(resolve_query(r#"{"message": "What is 2+2?"}"#), "What is 2+2?");
    }

    #[test]
    fn test_resolve_json_extra_fields_ignored() {
        assert_eq!(
            resolve_query(r#"{"message": "hi", "session": 7, "foo": null}"#),
            "hi"
        );
    }

    #[test]
    fn test_resolve_plain_text_passes_through() {
        assert_eq!(resolve_query("hello world"), "hello world");
    }

    #[test]
    fn test_resolve_json_without_message_falls_back_to_raw() {
        assert_eq!(resolve_query(r#"{"foo":1}"#), r#"{"foo":1}"#);
    }

    #[test]
    fn test_resolve_non_string_message_falls_back_to_raw() {
        assert_eq!(resolve_query(r#"{"message": 42}"#), r#"{"message": 42}"#);
    }

    #[test]
    fn test_resolve_non_object_json_falls_back_to_raw() {
        assert_eq!(resolve_query(r#""hi""#), r#""hi""#);
        assert_eq!(resolve_query("[1,2]"), "[1,2]");
    }

    #[test]
    fn test_resolve_empty_frame_is_empty_query() {
        assert_eq!(resolve_query(""), "");
    }

    #[test]
    fn test_reply_frame_length_counts_chars() {
        let frame = OutboundFrame::reply(Answer::new("héllo"));
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["reply"], "héllo");
        assert_eq!(json["length"], 5);
    }

    #[test]
    fn test_error_frame_shape() {
        let err = GeneratorError::GenerationFailed("backend melted".to_string());
        let frame = OutboundFrame::from(&err);
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["error"], "generation_failed");
        assert_eq!(json["detail"], "backend melted");
        assert!(json.get("reply").is_none());
    }
}
