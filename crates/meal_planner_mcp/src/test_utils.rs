//! Scripted `GenerationClient` fakes shared by unit tests.
#![cfg(test)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use gemini_client::{GeminiError, GenerationClient, ImageOptions};
use serde_json::json;

/// Replays queued responses in order and records every prompt it sees.
/// Once a queue runs dry the client answers with a 503.
pub struct ScriptedClient {
    texts: Mutex<VecDeque<Result<String, GeminiError>>>,
    images: Mutex<VecDeque<Result<Option<Vec<u8>>, GeminiError>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    pub fn with_texts(texts: Vec<Result<String, GeminiError>>) -> Self {
        Self {
            texts: Mutex::new(texts.into()),
            images: Mutex::new(VecDeque::new()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_images(images: Vec<Result<Option<Vec<u8>>, GeminiError>>) -> Self {
        let client = Self::with_texts(vec![]);
        *client.images.lock().unwrap() = images.into();
        client
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }
}

fn exhausted() -> GeminiError {
    GeminiError::Api {
        status: 503,
        message: "script exhausted".into(),
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.texts.lock().unwrap().pop_front().unwrap_or_else(|| Err(exhausted()))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        _options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.images.lock().unwrap().pop_front().unwrap_or_else(|| Err(exhausted()))
    }
}

/// A valid day-keyed plan payload with `days` days and distinct item names.
pub fn plan_json(days: u32) -> String {
    let mut root = serde_json::Map::new();
    for d in 1..=days {
        root.insert(
            d.to_string(),
            json!({
                "breakfast": [
                    {"name": format!("Porridge {d}"), "calories": 400, "protein": 15, "carbs": 60, "fat": 10},
                    {"name": format!("Berries {d}"), "calories": 100, "protein": 1, "carbs": 24, "fat": 0}
                ],
                "lunch": [
                    {"name": format!("Lentil Bowl {d}"), "calories": 600, "protein": 30, "carbs": 80, "fat": 15},
                    {"name": format!("Side Salad {d}"), "calories": 200, "protein": 4, "carbs": 10, "fat": 15}
                ],
                "dinner": [
                    {"name": format!("Curry {d}"), "calories": 700, "protein": 35, "carbs": 70, "fat": 25}
                ]
            }),
        );
    }
    serde_json::Value::Object(root).to_string()
}
