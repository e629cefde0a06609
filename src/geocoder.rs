use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Resolves coordinates to a human-readable place name.
#[async_trait]
pub trait PlaceResolver: Send + Sync {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<Option<String>, AppError>;
}

#[derive(Deserialize, Debug)]
struct ReverseResponse {
    display_name: Option<String>,
}

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
/// Every request, body included, must finish within the configured timeout.
#[derive(Clone, Debug)]
pub struct NominatimResolver {
    client: ReqwestClient,
    reverse_url: Url,
}

impl NominatimResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        let reverse_url = base.join("reverse")?;
        let client = ReqwestClient::builder()
            .user_agent(concat!("image-insight/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            reverse_url,
        })
    }
}

#[async_trait]
impl PlaceResolver for NominatimResolver {
    async fn resolve(&self, latitude: f64, longitude: f64) -> Result<Option<String>, AppError> {
        log::debug!("Reverse geocoding {}, {}", latitude, longitude);
        let response = self
            .client
            .get(self.reverse_url.clone())
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", latitude.to_string()),
                ("lon", longitude.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamApi { status, body });
        }

        let reverse: ReverseResponse = response.json().await?;
        Ok(reverse.display_name.filter(|name| !name.trim().is_empty()))
    }
}
