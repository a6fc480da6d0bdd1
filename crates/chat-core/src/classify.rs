//! Maps transport and protocol failures onto the `StreamError` taxonomy.

use serde_json::Value;

use chat_types::{
    ChatError,
    error::{ProtocolFailure, StreamError},
};

/// HTTP status families the backend is known to return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    RateLimited,
    ServerError,
    BadGateway,
    Unavailable,
    GatewayTimeout,
    Other,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => StatusClass::BadRequest,
            401 => StatusClass::Unauthorized,
            403 => StatusClass::Forbidden,
            404 => StatusClass::NotFound,
            408 => StatusClass::RequestTimeout,
            429 => StatusClass::RateLimited,
            500 => StatusClass::ServerError,
            502 => StatusClass::BadGateway,
            503 => StatusClass::Unavailable,
            504 => StatusClass::GatewayTimeout,
            _ => StatusClass::Other,
        }
    }

    /// Timeout- and network-class statuses, where trying again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StatusClass::RequestTimeout
                | StatusClass::RateLimited
                | StatusClass::BadGateway
                | StatusClass::Unavailable
                | StatusClass::GatewayTimeout
        )
    }
}

/// Classify a non-success response from its status and diagnostic body.
pub fn classify_status(status: u16, body: &str) -> StreamError {
    StreamError::Transport {
        status: Some(status),
        message: diagnostic_message(status, body),
        retryable: StatusClass::from_status(status).is_retryable(),
    }
}

/// Classify an error returned by the transport itself.
pub fn classify_transport(err: &ChatError) -> StreamError {
    match err {
        ChatError::Http { status, message } => classify_status(*status, message),
        ChatError::Network(_) | ChatError::Timeout(_) => StreamError::Transport {
            status: None,
            message: err.to_string(),
            retryable: true,
        },
        other => StreamError::Transport {
            status: None,
            message: other.to_string(),
            retryable: false,
        },
    }
}

pub fn server_error(message: impl Into<String>) -> StreamError {
    StreamError::Protocol(ProtocolFailure::Server(message.into()))
}

pub fn empty_stream() -> StreamError {
    StreamError::Protocol(ProtocolFailure::EmptyStream)
}

/// The backend wraps errors as `{"detail": ...}`; fall back to the raw text.
fn diagnostic_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        body.to_string()
    }
}
