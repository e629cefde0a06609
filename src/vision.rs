use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};

/// An image encoded for inline transport to a hosted model.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Self {
        InlineImage {
            mime_type: mime_type.to_string(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// A hosted vision-language model: one prompt plus one image in, text out.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn infer(&self, prompt: &str, image: &InlineImage) -> Result<String, AppError>;
}
