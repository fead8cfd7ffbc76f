//! Error types for language model calls.

use labeeb_core::LabeebError;

/// Errors from the chat layer.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("language model is not configured: {0}")]
    Unavailable(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("model endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("empty completion")]
    EmptyCompletion,
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<LabeebError> for ChatError {
    fn from(err: LabeebError) -> Self {
        match err {
            LabeebError::Config(msg) => ChatError::Config(msg),
            other => ChatError::Request(other.to_string()),
        }
    }
}

impl From<ChatError> for LabeebError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Config(msg) => LabeebError::Config(msg),
            other => LabeebError::Llm(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::Unavailable("OPENAI_API_KEY is not set".to_string());
        assert_eq!(
            err.to_string(),
            "language model is not configured: OPENAI_API_KEY is not set"
        );

        let err = ChatError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "model endpoint returned 429: rate limited");

        assert_eq!(ChatError::EmptyCompletion.to_string(), "empty completion");
    }

    #[test]
    fn test_chat_error_from_labeeb_error() {
        let err: ChatError = LabeebError::Config("missing key".to_string()).into();
        assert!(matches!(err, ChatError::Config(_)));

        let err: ChatError = LabeebError::Llm("boom".to_string()).into();
        assert!(matches!(err, ChatError::Request(_)));
    }

    #[test]
    fn test_chat_error_into_labeeb_error() {
        let err: LabeebError = ChatError::EmptyCompletion.into();
        assert!(matches!(err, LabeebError::Llm(_)));

        let err: LabeebError = ChatError::Config("bad".to_string()).into();
        assert!(matches!(err, LabeebError::Config(_)));
    }
}
