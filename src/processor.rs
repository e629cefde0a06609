use crate::analysis::{AnalysisResult, ImageAnalyzer};
use crate::error::AnalysisError;
use crate::metadata::MetadataRecord;
use crate::normalizer::MetadataNormalizer;
use crate::upload::UploadedImage;
use serde::Serialize;

/// Metadata and analysis for one upload. The analysis may fail on its own
/// without affecting the metadata.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub metadata: MetadataRecord,
    pub analysis: Result<AnalysisResult, AnalysisError>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutcomeBody<'a> {
    metadata: &'a MetadataRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<serde_json::Value>,
}

impl UploadOutcome {
    pub fn to_json(&self) -> serde_json::Value {
        let body = match &self.analysis {
            Ok(result) => OutcomeBody {
                metadata: &self.metadata,
                analysis: Some(result),
                error: None,
            },
            Err(e) => OutcomeBody {
                metadata: &self.metadata,
                analysis: None,
                error: Some(e.to_json()),
            },
        };
        serde_json::to_value(body).unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct UploadProcessor {
    normalizer: MetadataNormalizer,
    analyzer: ImageAnalyzer,
}

impl UploadProcessor {
    pub fn new(normalizer: MetadataNormalizer, analyzer: ImageAnalyzer) -> Self {
        Self {
            normalizer,
            analyzer,
        }
    }

    pub fn normalizer(&self) -> &MetadataNormalizer {
        &self.normalizer
    }

    pub fn analyzer(&self) -> &ImageAnalyzer {
        &self.analyzer
    }

    pub async fn process(&self, upload: &UploadedImage, context: Option<&str>) -> UploadOutcome {
        log::info!("Processing upload {}", upload.file_name);
        let metadata = self.normalizer.normalize(upload).await;
        let analysis = self.analyzer.analyze(upload, context, Some(&metadata)).await;
        match &analysis {
            Ok(_) => log::info!("Processing finished for {}", upload.file_name),
            Err(e) => log::warn!("Analysis failed for {}: {}", upload.file_name, e),
        }
        UploadOutcome { metadata, analysis }
    }
}
