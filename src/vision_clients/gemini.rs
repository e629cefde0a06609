use crate::error::AppError;
use crate::vision::{InlineImage, VisionModel};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use url::Url;

// --- Gemini request and response structures ---

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize, Debug)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    text: Option<String>,
}

/// `VisionModel` backed by the Gemini `generateContent` endpoint.
#[derive(Clone, Debug)]
pub struct GeminiVisionModel {
    client: ReqwestClient,
    endpoint: Url,
    api_key: String,
}

impl GeminiVisionModel {
    pub fn new(endpoint: &str, api_key: String) -> Result<Self, AppError> {
        let endpoint = Url::parse(endpoint)?;
        let client = ReqwestClient::builder().build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl VisionModel for GeminiVisionModel {
    async fn infer(&self, prompt: &str, image: &InlineImage) -> Result<String, AppError> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::MissingApiKey);
        }

        let request_body = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text { text: prompt },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: &image.mime_type,
                            data: &image.data,
                        },
                    },
                ],
            }],
        };

        log::debug!(
            "Sending analysis request to {} ({} prompt chars, {} base64 chars)",
            self.endpoint,
            prompt.len(),
            image.data.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Gemini API returned {}: {}", status, body);
            return Err(AppError::UpstreamApi {
                status: status.as_u16(),
                body,
            });
        }

        let gemini_response: GeminiResponse = response.json().await?;
        let text = gemini_response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(AppError::Generic(
                "Gemini response contained no text".to_string(),
            ));
        }

        log::debug!("Received {} chars from Gemini", text.len());
        Ok(text)
    }
}
