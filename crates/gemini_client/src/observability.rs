use serde::Serialize;

use crate::config::Config;

/// Readiness snapshot reported by the service health endpoint.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Health {
    pub ready: bool,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
}

impl Health {
    /// Ready with a configured generation backend.
    pub fn readiness(config: &Config) -> Self {
        Self {
            ready: true,
            text_model: Some(config.text_model.clone()),
            image_model: Some(config.image_model.clone()),
        }
    }

    /// Still serving, but every plan will come from the offline fallback.
    pub fn degraded() -> Self {
        Self {
            ready: true,
            text_model: None,
            image_model: None,
        }
    }
}
