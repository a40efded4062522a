use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::config::TranslatorConfig;

const API_VERSION: &str = "3.0";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Upstream(String),
}

/// Stateless proxy to one remote text-translation service.
///
/// The proxy stays dumb on purpose: response bodies pass through verbatim
/// so the remote schema is interpreted at a single point upstream.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn supported_languages(&self) -> Result<String, TranslateError>;
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError>;
}

#[derive(Serialize)]
struct TranslateItem<'a> {
    #[serde(rename = "Text")]
    text: &'a str,
}

pub struct HttpTranslator {
    client: Client,
    base_url: String,
    api_key: String,
    region: String,
}

impl HttpTranslator {
    pub fn new(config: &TranslatorConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            region: config.region.clone(),
        }
    }

    fn require(value: &str, what: &str) -> Result<(), TranslateError> {
        if value.trim().is_empty() {
            return Err(TranslateError::InvalidArgument(format!(
                "{what} is required"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn supported_languages(&self) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(format!("{}/languages", self.base_url))
            .query(&[("api-version", API_VERSION)])
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .send()
            .await
            .map_err(|err| TranslateError::Upstream(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Upstream(format!(
                "failed to retrieve supported languages: {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|err| TranslateError::Upstream(err.to_string()))
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        // reject malformed input before any network round-trip
        Self::require(text, "text to translate")?;
        Self::require(from, "source language")?;
        Self::require(to, "target language")?;

        let body = [TranslateItem { text }];
        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .query(&[("api-version", API_VERSION), ("from", from), ("to", to)])
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .header("Ocp-Apim-Subscription-Region", &self.region)
            .json(&body)
            .send()
            .await
            .map_err(|err| TranslateError::Upstream(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TranslateError::Upstream(format!(
                "translate {from}->{to} failed: {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|err| TranslateError::Upstream(err.to_string()))
    }
}
