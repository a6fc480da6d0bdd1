use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Conversation not found: {0}")]
    ConversationNotFound(String),

    #[error("Message not found: {0}")]
    MessageNotFound(String),

    #[error("A reply is already streaming in conversation {0}")]
    StreamActive(String),

    #[error("Cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JS interop error: {0}")]
    JsInterop(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}

/// Coarse category of a stream failure, for callers that map failures to UI text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    DecodeWarning,
}

/// A failure that terminates a streaming session.
/// Delivered exactly once through the session's error callback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    /// Non-2xx response or connection failure
    #[error("Transport error{}: {message}", status_suffix(.status))]
    Transport {
        status: Option<u16>,
        message: String,
        /// Hint for the caller; the session itself never retries
        retryable: bool,
    },

    #[error("Protocol error: {0}")]
    Protocol(ProtocolFailure),
}

impl StreamError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Transport { .. } => ErrorKind::Transport,
            StreamError::Protocol(_) => ErrorKind::Protocol,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::Transport { retryable: true, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StreamError::Transport { status, .. } => *status,
            StreamError::Protocol(_) => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolFailure {
    /// An `error` record sent by the server
    #[error("{0}")]
    Server(String),

    /// The body closed before any content or terminal record arrived
    #[error("empty stream")]
    EmptyStream,
}

/// Recoverable problems with individual stream lines. Logged, never surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    #[error("malformed record: {reason}: {line}")]
    MalformedJson { line: String, reason: String },

    #[error("unknown record type: {0}")]
    UnknownType(String),
}

impl DecodeWarning {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::DecodeWarning
    }
}
