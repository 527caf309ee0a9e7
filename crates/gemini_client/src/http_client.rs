//! HTTP client implementation for the Gemini generative language API.
//!
//! This module provides a reqwest-based implementation of the [`GenerationClient`](crate::GenerationClient) trait.

use crate::config::{Config, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL};
use crate::{GeminiError, GenerationClient, ImageOptions};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters<'a>,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    sample_count: u32,
    aspect_ratio: &'a str,
    safety_filter_level: &'static str,
    person_generation: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestGeminiClient {
    base_url: String,
    api_key: SecretString,
    text_model: String,
    image_model: String,
    client: reqwest::Client,
}

impl ReqwestGeminiClient {
    /// Create a new client instance with the default models.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "https://generativelanguage.googleapis.com")
    /// * `api_key` - The API key sent in the `x-goog-api-key` header
    pub fn new(base_url: &str, api_key: SecretString) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            text_model: DEFAULT_TEXT_MODEL.into(),
            image_model: DEFAULT_IMAGE_MODEL.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Build a client from [`Config`], applying the optional request timeout.
    pub fn from_config(config: &Config) -> Result<Self, GeminiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
            client: builder.build()?,
        })
    }

    pub fn with_models(mut self, text_model: impl Into<String>, image_model: impl Into<String>) -> Self {
        self.text_model = text_model.into();
        self.image_model = image_model.into();
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }

    /// Build an authenticated POST request.
    fn post_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GeminiError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        let text = resp.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| {
            let body_snippet: String = text.chars().take(256).collect();
            GeminiError::Decode(format!("{} - body: {}", e, body_snippet))
        })
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> GeminiError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(256).collect());

        match status {
            401 | 403 => GeminiError::Config(format!("authentication rejected: {message}")),
            _ => GeminiError::from_status(status, message),
        }
    }
}

#[async_trait]
impl GenerationClient for ReqwestGeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let url = self.model_url(&self.text_model, "generateContent");
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: prompt }],
            }],
        };
        debug!(model = %self.text_model, prompt_len = prompt.len(), "sending generateContent");

        let resp: GenerateContentResponse =
            self.execute_json(self.post_request(&url).json(&body)).await?;

        let text: String = resp
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(text)
    }

    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError> {
        let url = self.model_url(&self.image_model, "predict");
        let body = PredictRequest {
            instances: vec![PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: options.number_of_images,
                aspect_ratio: &options.aspect_ratio,
                safety_filter_level: options.safety_filter_level.as_str(),
                person_generation: options.person_generation.as_str(),
            },
        };
        debug!(model = %self.image_model, "sending predict");

        let resp: PredictResponse = self.execute_json(self.post_request(&url).json(&body)).await?;

        let Some(encoded) = resp
            .predictions
            .into_iter()
            .find_map(|p| p.bytes_base64_encoded)
        else {
            return Ok(None);
        };
        STANDARD
            .decode(encoded.as_bytes())
            .map(Some)
            .map_err(|e| GeminiError::Decode(format!("image payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_new_trims_base_url() {
        let client = ReqwestGeminiClient::new("http://localhost/", SecretString::new("key".into()));
        assert_eq!(
            client.model_url("m", "generateContent"),
            "http://localhost/v1beta/models/m:generateContent"
        );
    }

    #[test]
    fn with_models_overrides_defaults() {
        let client = ReqwestGeminiClient::new("http://localhost", SecretString::new("key".into()))
            .with_models("text-x", "image-y");
        assert_eq!(client.model_url(&client.text_model, "a"), "http://localhost/v1beta/models/text-x:a");
        assert_eq!(client.image_model, "image-y");
    }

    #[test]
    fn predict_parameters_serialize_camel_case() {
        let p = PredictParameters {
            sample_count: 1,
            aspect_ratio: "1:1",
            safety_filter_level: "block_some",
            person_generation: "allow_adult",
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["sampleCount"], 1);
        assert_eq!(v["aspectRatio"], "1:1");
        assert_eq!(v["safetyFilterLevel"], "block_some");
        assert_eq!(v["personGeneration"], "allow_adult");
    }
}
