//! Image analysis through a hosted vision-language model.
//!
//! The analyzer builds a prompt from the optional user context and the
//! normalized metadata, sends it together with the inline image, and reads a
//! structured result out of the model's free-text reply.

pub mod prompt;
pub mod reply;

use crate::error::AnalysisError;
use crate::metadata::{round2, MetadataRecord};
use crate::upload::UploadedImage;
use crate::vision::{InlineImage, VisionModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use reply::{parse_reply, ParsedReply};

/// Largest image accepted for analysis: 20 MB.
pub const MAX_ANALYSIS_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Case-insensitive; anything unrecognized is treated as medium.
    pub fn parse_lenient(text: &str) -> Priority {
        match text.trim().to_ascii_lowercase().as_str() {
            "high" => Priority::High,
            "low" => Priority::Low,
            _ => Priority::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancementSuggestion {
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub description: String,
    pub tags: Vec<String>,
    pub hashtags: Vec<String>,
    pub enhancement_suggestions: Vec<EnhancementSuggestion>,
}

/// Rejects images above `MAX_ANALYSIS_BYTES`, reporting the size in MB.
pub fn check_size(len: usize) -> Result<(), AnalysisError> {
    if len > MAX_ANALYSIS_BYTES {
        return Err(AnalysisError::TooLarge {
            size_mb: round2(len as f64 / (1024.0 * 1024.0)),
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct ImageAnalyzer {
    model: Arc<dyn VisionModel>,
}

impl ImageAnalyzer {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self { model }
    }

    pub async fn analyze(
        &self,
        image: &UploadedImage,
        context: Option<&str>,
        metadata: Option<&MetadataRecord>,
    ) -> Result<AnalysisResult, AnalysisError> {
        check_size(image.len())?;

        let prompt = prompt::build_prompt(context, metadata);
        log::trace!("Analysis prompt:\n{}", prompt);

        let inline = InlineImage::encode(&image.mime_type, &image.bytes);
        log::info!(
            "Requesting analysis for {} ({} bytes)",
            image.file_name,
            image.len()
        );

        let reply = self.model.infer(&prompt, &inline).await.map_err(|e| {
            log::error!("Analysis request for {} failed: {}", image.file_name, e);
            AnalysisError::Unavailable(e.to_string())
        })?;
        log::debug!("Model reply ({} chars)", reply.len());

        let parsed = parse_reply(&reply);
        if let ParsedReply::Degraded(_) = parsed {
            log::info!("Falling back to plain-text description for {}", image.file_name);
        }
        Ok(parsed.into_result())
    }
}
