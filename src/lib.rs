pub mod analysis;
pub mod config;
pub mod decoder;
pub mod decoders;
pub mod error;
pub mod geocoder;
pub mod metadata;
pub mod normalizer;
pub mod processor;
pub mod upload;
pub mod vision;
pub mod vision_clients;
pub mod web_server;

use crate::analysis::ImageAnalyzer;
use crate::config::AppConfig;
use crate::decoders::{exif::ExifTagDecoder, image::ImageCrateProbe};
use crate::error::AppError;
use crate::geocoder::NominatimResolver;
use crate::normalizer::MetadataNormalizer;
use crate::processor::UploadProcessor;
use crate::vision_clients::gemini::GeminiVisionModel;
use std::sync::Arc;
use std::time::Duration;

/// Wires the production collaborators described by `config`.
pub fn build_processor(config: &AppConfig) -> Result<UploadProcessor, AppError> {
    let mut normalizer =
        MetadataNormalizer::new(Arc::new(ExifTagDecoder::new()), Arc::new(ImageCrateProbe::new()));
    if let Some(url) = config.geocoder_url.as_deref().filter(|u| !u.trim().is_empty()) {
        log::info!("Reverse geocoding enabled via {}", url);
        let timeout = Duration::from_secs(config.geocoder_timeout_secs);
        let resolver = NominatimResolver::new(url, timeout)?;
        normalizer = normalizer.with_place_resolver(Arc::new(resolver));
    }

    if config.gemini_api_key.trim().is_empty() {
        log::warn!("No Gemini API key configured; analysis requests will fail");
    }
    let model = GeminiVisionModel::new(&config.gemini_endpoint(), config.gemini_api_key.clone())?;

    Ok(UploadProcessor::new(normalizer, ImageAnalyzer::new(Arc::new(model))))
}
