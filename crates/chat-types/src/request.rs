use serde::{Deserialize, Serialize};

use crate::config::{GenerationSettings, Provider};
use crate::message::ImageAttachment;

/// What the caller asks for when starting a stream
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub conversation_id: String,
    pub message: String,
    pub settings: GenerationSettings,
    pub images: Vec<ImageAttachment>,
}

impl StreamRequest {
    pub fn new(conversation_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            settings: GenerationSettings::default(),
            images: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_images(mut self, images: Vec<ImageAttachment>) -> Self {
        self.images = images;
        self
    }

    /// Build the JSON body the backend expects.
    pub fn body(&self) -> RequestBody {
        let images: Vec<ImagePayload> = self
            .images
            .iter()
            .filter(|img| img.has_payload())
            .map(ImagePayload::from_attachment)
            .collect();

        RequestBody {
            message: self.message.clone(),
            provider: self.settings.provider,
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            include_history: self.settings.include_history,
            system_prompt: self.settings.system_prompt.clone(),
            images,
        }
    }
}

/// Wire body of `POST /api/v1/ai/chat/{conversation_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub message: String,
    pub provider: Provider,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub include_history: bool,
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImagePayload>,
}

/// An image normalised for transmission: every field is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub data: String,
    pub content_type: String,
    pub filename: String,
    pub size: u64,
}

impl ImagePayload {
    pub fn from_attachment(img: &ImageAttachment) -> Self {
        Self {
            data: img.data.clone(),
            content_type: img
                .content_type
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_TYPE.to_string()),
            filename: img
                .filename
                .clone()
                .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string()),
            size: img.size.unwrap_or_else(|| estimate_decoded_size(&img.data)),
        }
    }
}

/// Decoded size of a base64 payload: four encoded bytes carry three.
pub fn estimate_decoded_size(base64: &str) -> u64 {
    (base64.len() as u64 * 3).div_ceil(4)
}

const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";
const DEFAULT_IMAGE_NAME: &str = "image.jpg";
