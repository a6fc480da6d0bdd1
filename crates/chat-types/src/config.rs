use serde::{Deserialize, Serialize};

/// Connection settings for the chat backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api_base: String,
    /// Bearer token sent with every request, supplied by the auth layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Upper bound on waiting for the response headers of a request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            access_token: None,
            request_timeout_ms: None,
        }
    }
}

impl ClientConfig {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Default::default()
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Join a path onto the API base, tolerating a trailing slash on the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}

/// Per-conversation generation parameters sent with each streamed message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub provider: Provider,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub include_history: bool,
    pub system_prompt: Option<String>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model: None,
            max_tokens: 1000,
            temperature: 0.7,
            include_history: true,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAI,
    Anthropic,
    Google,
}

impl Provider {
    /// Name used on the wire and in the backend's `api_provider` column
    pub fn wire_name(&self) -> &'static str {
        match self {
            Provider::OpenAI => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|p| p.wire_name() == name)
    }

    pub fn all() -> &'static [Provider] {
        &[Provider::OpenAI, Provider::Anthropic, Provider::Google]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OpenAI",
            Provider::Anthropic => "Claude",
            Provider::Google => "Gemini",
        }
    }
}

const DEFAULT_API_BASE: &str = "http://localhost:8000";
