//! Minimal `GenerationClient` trait and a reqwest-based Gemini implementation.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod observability;
pub mod retry;

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("empty response from generation service")]
    EmptyResponse,
    #[error("decode error: {0}")]
    Decode(String),
}

impl GeminiError {
    /// Build an error from a non-success HTTP status and a body snippet.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => GeminiError::RateLimited(message),
            _ => GeminiError::Api { status, message },
        }
    }

    /// Whether a retry could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            GeminiError::Http(_) | GeminiError::RateLimited(_) | GeminiError::EmptyResponse => {
                true
            }
            GeminiError::Api { status, .. } => *status >= 500,
            GeminiError::Config(_) | GeminiError::Decode(_) => false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SafetyFilterLevel {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockSome,
    BlockOnlyHigh,
    BlockNone,
}

impl SafetyFilterLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyFilterLevel::BlockLowAndAbove => "block_low_and_above",
            SafetyFilterLevel::BlockMediumAndAbove => "block_medium_and_above",
            SafetyFilterLevel::BlockSome => "block_some",
            SafetyFilterLevel::BlockOnlyHigh => "block_only_high",
            SafetyFilterLevel::BlockNone => "block_none",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    DontAllow,
    AllowAdult,
    AllowAll,
}

impl PersonGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonGeneration::DontAllow => "dont_allow",
            PersonGeneration::AllowAdult => "allow_adult",
            PersonGeneration::AllowAll => "allow_all",
        }
    }
}

/// Options sent alongside an image prompt.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
pub struct ImageOptions {
    pub number_of_images: u32,
    /// e.g. "1:1", "16:9"
    pub aspect_ratio: String,
    pub safety_filter_level: SafetyFilterLevel,
    pub person_generation: PersonGeneration,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            number_of_images: 1,
            aspect_ratio: "1:1".into(),
            safety_filter_level: SafetyFilterLevel::BlockSome,
            person_generation: PersonGeneration::AllowAdult,
        }
    }
}

/// One-shot access to a generative text and image service.
///
/// Implementations carry no retry or timeout policy of their own beyond what
/// the underlying transport is configured with; see [`retry::RetryingGenerationClient`].
#[async_trait]
pub trait GenerationClient: Send + Sync + 'static {
    /// Send a single free-form instruction and return the raw text payload.
    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError>;

    /// Request images for `prompt` and return the bytes of the first candidate, if any.
    async fn generate_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_maps_to_rate_limited() {
        let e = GeminiError::from_status(429, "slow down".into());
        assert!(matches!(e, GeminiError::RateLimited(_)));
        assert!(e.is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let e = GeminiError::from_status(400, "bad".into());
        assert!(!e.is_transient());
        assert!(GeminiError::from_status(503, "down".into()).is_transient());
    }

    #[test]
    fn image_options_default_matches_meal_photos() {
        let o = ImageOptions::default();
        assert_eq!(o.number_of_images, 1);
        assert_eq!(o.aspect_ratio, "1:1");
        assert_eq!(o.safety_filter_level.as_str(), "block_some");
        assert_eq!(o.person_generation.as_str(), "allow_adult");
    }
}
