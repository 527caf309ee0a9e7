#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use gemini_client::{GeminiError, GenerationClient, ImageOptions};
use meal_planner_mcp::{InMemoryPlanStore, MealPlanService, PlannerSettings};

/// Answers text prompts from a queue; every prompt is recorded.
pub struct FakeGemini {
    texts: Mutex<VecDeque<Result<String, GeminiError>>>,
    images: Mutex<VecDeque<Option<Vec<u8>>>>,
    pub prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeGemini {
    pub fn new(texts: Vec<Result<String, GeminiError>>) -> Self {
        Self {
            texts: Mutex::new(texts.into()),
            images: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    pub fn with_images(mut self, images: Vec<Option<Vec<u8>>>) -> Self {
        self.images = Mutex::new(images.into());
        self
    }

    /// Hold every text call for `delay` so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl GenerationClient for FakeGemini {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.texts.lock().unwrap().pop_front();
        next.unwrap_or(Err(GeminiError::EmptyResponse))
    }

    async fn generate_image(
        &self,
        prompt: &str,
        _options: &ImageOptions,
    ) -> Result<Option<Vec<u8>>, GeminiError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.images.lock().unwrap().pop_front();
        next.ok_or(GeminiError::EmptyResponse)
    }
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

pub fn service(store: InMemoryPlanStore, client: Arc<FakeGemini>) -> MealPlanService {
    MealPlanService::new(Arc::new(store), client, PlannerSettings::default()).with_clock(today)
}

/// 30 year old male, 180 cm, 80 kg: 2872 kcal/day at moderate activity.
pub fn profile() -> serde_json::Value {
    serde_json::json!({
        "height_cm": 180,
        "weight_kg": 80,
        "date_of_birth": "1994-01-01",
        "gender": "male",
        "fitness_goal": "maintain"
    })
}

/// A valid plan with `days` days of 2000 kcal each.
pub fn plan_json(days: u32) -> String {
    let mut root = serde_json::Map::new();
    for d in 1..=days {
        root.insert(
            d.to_string(),
            serde_json::json!({
                "breakfast": [
                    {"name": format!("Granola {d}"), "calories": 450, "protein": 15, "carbs": 60, "fat": 14}
                ],
                "lunch": [
                    {"name": format!("Chickpea Wrap {d}"), "calories": 650, "protein": 25, "carbs": 80, "fat": 20},
                    {"name": format!("Apple {d}"), "calories": 100, "protein": 0, "carbs": 25, "fat": 0}
                ],
                "dinner": [
                    {"name": format!("Salmon Bowl {d}"), "calories": 800, "protein": 45, "carbs": 70, "fat": 30}
                ]
            }),
        );
    }
    serde_json::Value::Object(root).to_string()
}
