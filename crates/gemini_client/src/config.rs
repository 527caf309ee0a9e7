use crate::GeminiError;
use secrecy::SecretString;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-001";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: SecretString,
    pub base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub timeout: Option<Duration>,
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, GeminiError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function. This avoids mutating global environment in tests and keeps
    /// `from_env()` small and safe.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GeminiError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api = get("GEMINI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GeminiError::Config("GEMINI_API_KEY missing".into()))?;
        let base_url = get("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let text_model = get("GEMINI_TEXT_MODEL").unwrap_or_else(|| DEFAULT_TEXT_MODEL.into());
        let image_model = get("GEMINI_IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.into());
        let timeout = match get("GEMINI_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                GeminiError::Config(format!("GEMINI_TIMEOUT_SECS is not a number: {raw}"))
            })?)),
            None => None,
        };
        let max_retries = match get("GEMINI_MAX_RETRIES") {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                GeminiError::Config(format!("GEMINI_MAX_RETRIES is not a number: {raw}"))
            })?,
            None => 0,
        };
        Ok(Self {
            api_key: SecretString::new(api.into()),
            base_url,
            text_model,
            image_model,
            timeout,
            max_retries,
        })
    }
}
