use crate::config::AppConfig;
use crate::error::AppError;
use crate::processor::UploadProcessor;
use crate::upload::UploadedImage;
use actix_web::http::header::CONTENT_TYPE;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde::Deserialize;
use std::sync::Arc;

const FILE_NAME_HEADER: &str = "X-File-Name";

#[derive(Deserialize, Debug)]
struct AnalyzeQuery {
    context: Option<String>,
}

/// Builds an upload from a raw request body. The MIME type comes from
/// `Content-Type`, the file name from `X-File-Name`.
fn upload_from_request(req: &HttpRequest, body: web::Bytes) -> Result<UploadedImage, AppError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mime: mime::Mime = content_type
        .parse()
        .map_err(|_| AppError::UnsupportedMediaType(content_type.to_string()))?;
    if mime.type_() != mime::IMAGE {
        return Err(AppError::UnsupportedMediaType(mime.to_string()));
    }

    let file_name = req
        .headers()
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let extension = mime_guess::get_mime_extensions(&mime)
                .and_then(|exts| exts.first())
                .copied()
                .unwrap_or("bin");
            format!("upload.{}", extension)
        });

    log::debug!(
        "Received upload {} ({}, {} bytes)",
        file_name,
        mime.essence_str(),
        body.len()
    );
    Ok(UploadedImage::new(file_name, mime.essence_str(), body.to_vec()))
}

async fn post_metadata(
    req: HttpRequest,
    body: web::Bytes,
    processor: web::Data<UploadProcessor>,
) -> Result<HttpResponse, AppError> {
    let upload = upload_from_request(&req, body)?;
    let record = processor.normalizer().normalize(&upload).await;
    Ok(HttpResponse::Ok().json(record))
}

async fn post_analyze(
    req: HttpRequest,
    body: web::Bytes,
    query: web::Query<AnalyzeQuery>,
    processor: web::Data<UploadProcessor>,
) -> Result<HttpResponse, actix_web::Error> {
    let upload = upload_from_request(&req, body)?;
    let outcome = processor.process(&upload, query.context.as_deref()).await;
    let analysis = outcome.analysis?;
    Ok(HttpResponse::Ok().json(analysis))
}

async fn post_process(
    req: HttpRequest,
    body: web::Bytes,
    query: web::Query<AnalyzeQuery>,
    processor: web::Data<UploadProcessor>,
) -> Result<HttpResponse, AppError> {
    let upload = upload_from_request(&req, body)?;
    let outcome = processor.process(&upload, query.context.as_deref()).await;
    Ok(HttpResponse::Ok().json(outcome.to_json()))
}

/// Registers the API routes with a body-size limit of `max_body_bytes`.
pub fn configure(max_body_bytes: usize) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::PayloadConfig::new(max_body_bytes))
            .service(web::resource("/api/metadata").route(web::post().to(post_metadata)))
            .service(web::resource("/api/analyze").route(web::post().to(post_analyze)))
            .service(web::resource("/api/process").route(web::post().to(post_process)));
    }
}

pub async fn start_web_server(
    config: Arc<AppConfig>,
    processor: UploadProcessor,
) -> std::io::Result<()> {
    let port = config.web_port;
    let max_body_bytes = config.max_body_bytes;
    let processor_data = web::Data::new(processor);

    log::info!("Starting web server on port: {}", port);
    log::debug!("Maximum request body: {} bytes", max_body_bytes);

    HttpServer::new(move || {
        App::new()
            .app_data(processor_data.clone())
            .configure(configure(max_body_bytes))
    })
    .bind(format!("0.0.0.0:{}", port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{ImageAnalyzer, MAX_ANALYSIS_BYTES};
    use crate::decoder::{ImageProbe, TagDecoder, TagDescriptor, TagMap};
    use crate::normalizer::MetadataNormalizer;
    use crate::vision::{InlineImage, VisionModel};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use async_trait::async_trait;

    struct CameraTags;

    impl TagDecoder for CameraTags {
        fn decode(&self, _bytes: &[u8]) -> Result<TagMap, AppError> {
            let mut tags = TagMap::new();
            tags.insert("Make".to_string(), TagDescriptor::text("Leica"));
            Ok(tags)
        }
    }

    struct Landscape;

    impl ImageProbe for Landscape {
        fn dimensions(&self, _bytes: &[u8]) -> Result<(u32, u32), AppError> {
            Ok((300, 200))
        }
    }

    struct CannedModel;

    #[async_trait]
    impl VisionModel for CannedModel {
        async fn infer(&self, prompt: &str, _image: &InlineImage) -> Result<String, AppError> {
            let description = if prompt.contains("Camera Make: Leica") {
                "Shot on a Leica."
            } else {
                "Unknown camera."
            };
            Ok(format!(
                "```json\n{{\"description\":\"{}\",\"tags\":[\"street\"]}}\n```",
                description
            ))
        }
    }

    fn processor() -> web::Data<UploadProcessor> {
        web::Data::new(UploadProcessor::new(
            MetadataNormalizer::new(Arc::new(CameraTags), Arc::new(Landscape)),
            ImageAnalyzer::new(Arc::new(CannedModel)),
        ))
    }

    #[actix_web::test]
    async fn test_metadata_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(processor())
                .configure(configure(1024 * 1024)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/metadata")
            .insert_header((CONTENT_TYPE, "image/jpeg"))
            .insert_header((FILE_NAME_HEADER, "street.JPEG"))
            .set_payload(vec![0u8; 2048])
            .to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["fileName"], "street.JPEG");
        assert_eq!(body["fileSize"], "2 KB");
        assert_eq!(body["extension"], "jpeg");
        assert_eq!(body["width"], 300);
        assert_eq!(body["aspectRatio"], 1.5);
        assert_eq!(body["make"], "Leica");
    }

    #[actix_web::test]
    async fn test_analyze_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(processor())
                .configure(configure(1024 * 1024)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/analyze?context=evening%20walk")
            .insert_header((CONTENT_TYPE, "image/png"))
            .set_payload(vec![1u8; 16])
            .to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["description"], "Shot on a Leica.");
        assert_eq!(body["tags"], serde_json::json!(["street"]));
        assert_eq!(body["hashtags"], serde_json::json!([]));
        assert_eq!(body["enhancementSuggestions"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn test_analyze_rejects_oversized_image() {
        let app = test::init_service(
            App::new()
                .app_data(processor())
                .configure(configure(MAX_ANALYSIS_BYTES * 2)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/analyze")
            .insert_header((CONTENT_TYPE, "image/jpeg"))
            .set_payload(vec![0u8; MAX_ANALYSIS_BYTES + 1])
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["kind"], "too_large");
        assert_eq!(body["sizeMb"], 20.0);
    }

    #[actix_web::test]
    async fn test_process_endpoint_returns_both_parts() {
        let app = test::init_service(
            App::new()
                .app_data(processor())
                .configure(configure(1024 * 1024)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/process")
            .insert_header((CONTENT_TYPE, "image/webp"))
            .set_payload(vec![1u8; 16])
            .to_request();

        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert!(body["metadata"]["fileName"]
            .as_str()
            .unwrap()
            .starts_with("upload."));
        assert_eq!(body["metadata"]["mimeType"], "image/webp");
        assert_eq!(body["analysis"]["description"], "Shot on a Leica.");
    }

    #[actix_web::test]
    async fn test_non_image_upload_is_rejected() {
        let app = test::init_service(
            App::new()
                .app_data(processor())
                .configure(configure(1024 * 1024)),
        )
        .await;
        let req = test::TestRequest::post()
            .uri("/api/metadata")
            .insert_header((CONTENT_TYPE, "text/plain"))
            .set_payload("hello")
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
