use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub gemini_api_base: String,
    pub gemini_model: String,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default)]
    pub geocoder_url: Option<String>,
    pub geocoder_timeout_secs: u64,
    pub web_port: u16,
    pub max_body_bytes: usize,
    pub log_level: String,
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .set_default(
                "gemini_api_base",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("gemini_model", "gemini-2.0-flash")?
            .set_default("geocoder_timeout_secs", 5_i64)?
            .set_default("web_port", 8080_i64)?
            .set_default("max_body_bytes", 64_i64 * 1024 * 1024)?
            .set_default("log_level", "info")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.gemini_api_key = key;
        }
        Ok(config)
    }

    /// Full `generateContent` endpoint for the configured model.
    pub fn gemini_endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.gemini_api_base.trim_end_matches('/'),
            self.gemini_model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_endpoint_trims_trailing_slash() {
        let config = AppConfig {
            gemini_api_base: "https://example.test/v1beta/".to_string(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_api_key: String::new(),
            geocoder_url: None,
            geocoder_timeout_secs: 5,
            web_port: 8080,
            max_body_bytes: 1024,
            log_level: "info".to_string(),
        };

        assert_eq!(
            config.gemini_endpoint(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
